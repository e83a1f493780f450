use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use axum_extra::extract::CookieJar;

use crate::constants::SESSION_COOKIE_NAME;
use crate::db::sessions;
use crate::error::{AppError, Result};
use crate::security::hash_token;
use crate::AppState;

/// The signed-in caller, resolved from a bearer token or the session cookie
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    /// Stored form of the presented token, needed to end the session
    pub token_hash: String,
}

/// Raw session token from `Authorization: Bearer` or the session cookie
///
/// The header wins when both are present.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

/// Resolve the caller's live session, if any
pub async fn current_session(state: &AppState, headers: &HeaderMap) -> Result<Option<AuthUser>> {
    let Some(token) = session_token(headers) else {
        return Ok(None);
    };

    let token_hash = hash_token(&token, &state.config.session_secret);
    let db = state.db.clone();
    let lookup = token_hash.clone();
    let session = tokio::task::spawn_blocking(move || sessions::find_session(&db, &lookup)).await??;

    Ok(session.map(|session| AuthUser {
        user_id: session.user_id,
        token_hash,
    }))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        current_session(state, &parts.headers)
            .await?
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    #[test]
    fn test_bearer_token_preferred() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer abc123".parse().unwrap());
        headers.insert(
            COOKIE,
            format!("{}=from-cookie", SESSION_COOKIE_NAME).parse().unwrap(),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_cookie_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            format!("theme=dark; {}=from-cookie", SESSION_COOKIE_NAME)
                .parse()
                .unwrap(),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_missing_or_malformed_token() {
        assert!(session_token(&HeaderMap::new()).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        assert!(session_token(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer   ".parse().unwrap());
        assert!(session_token(&headers).is_none());
    }
}
