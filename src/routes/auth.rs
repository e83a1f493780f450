use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

use crate::constants::{
    ERR_INVALID_EMAIL, ERR_INVALID_USERNAME, ERR_PASSWORDS_DO_NOT_MATCH, ERR_PASSWORD_TOO_SHORT,
    PASSWORD_MIN_LEN, SESSION_COOKIE_NAME,
};
use crate::db::{
    sessions,
    users::{self, NewUser, OAuthProfile},
};
use crate::error::{AppError, Result};
use crate::models::User;
use crate::routes::extract::{current_session, AuthUser};
use crate::routes::validation::{timestamp_to_rfc3339, validate_signed_request};
use crate::security::{generate_token, hash_password, hash_token, verify_password};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm: String,
}

#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    /// Username, or email when it contains `@`
    pub identifier: String,
    pub password: String,
}

/// Signed identity handed over by the upstream OAuth gateway
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthCallbackRequest {
    pub provider: String,
    pub provider_user_id: String,
    pub login: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub timestamp: i64,
    pub signature: String,
}

impl OAuthCallbackRequest {
    /// The exact string the gateway signs
    fn signed_payload(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.provider,
            self.provider_user_id,
            self.login,
            self.email.as_deref().unwrap_or(""),
            self.timestamp
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub success: bool,
    pub user: User,
    pub access_token: String,
    pub expires_at: String,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub user: Option<User>,
}

#[derive(Debug, Serialize)]
pub struct SignOutResponse {
    pub success: bool,
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .build()
}

/// Mint a session for `user` and attach its cookie
async fn open_session(
    state: &AppState,
    jar: CookieJar,
    user: User,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let token = generate_token();
    let token_hash = hash_token(&token, &state.config.session_secret);
    let ttl = state.config.session_ttl_secs;

    let db = state.db.clone();
    let user_id = user.id.clone();
    let session =
        tokio::task::spawn_blocking(move || sessions::create_session(&db, &token_hash, &user_id, ttl))
            .await??;

    let jar = jar.add(session_cookie(token.clone(), state.config.is_production()));

    Ok((
        jar,
        Json(SessionResponse {
            success: true,
            user,
            access_token: token,
            expires_at: timestamp_to_rfc3339(session.expires_at),
        }),
    ))
}

/// Check identifier + password; the bcrypt verify runs on the blocking pool
async fn authenticate(state: &AppState, identifier: String, password: String) -> Result<User> {
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || {
        let Some((user_id, record)) = users::find_by_identifier(&db, &identifier)? else {
            return Err(AppError::InvalidCredentials);
        };

        let valid = record
            .password_hash
            .as_deref()
            .map(|hash| verify_password(&password, hash))
            .unwrap_or(false);

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        Ok(User::from_record(&user_id, &record))
    })
    .await?
}

/// Register a new account
///
/// Validation order mirrors what users see on the form: username rules,
/// password confirmation, email, password length.
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<SignUpResponse>)> {
    // Checked as typed; surrounding spaces make it invalid
    let username = payload.username;
    if !User::validate_username(&username) {
        return Err(AppError::InvalidInput(ERR_INVALID_USERNAME.to_string()));
    }
    if payload.password != payload.confirm {
        return Err(AppError::InvalidInput(ERR_PASSWORDS_DO_NOT_MATCH.to_string()));
    }
    let email = payload.email.trim().to_string();
    if !User::validate_email(&email) {
        return Err(AppError::InvalidInput(ERR_INVALID_EMAIL.to_string()));
    }
    if payload.password.chars().count() < PASSWORD_MIN_LEN {
        return Err(AppError::InvalidInput(ERR_PASSWORD_TOO_SHORT.to_string()));
    }

    let db = state.db.clone();
    let cost = state.config.password_hash_cost;
    let user = tokio::task::spawn_blocking(move || {
        // Cheap index check before paying for bcrypt
        if !users::username_available(&db, &username)? {
            return Err(AppError::UsernameTaken);
        }
        let password_hash = hash_password(&payload.password, cost)?;
        users::create_user(
            &db,
            NewUser {
                username,
                email,
                password_hash: Some(password_hash),
                is_guest: false,
            },
        )
    })
    .await??;

    Ok((StatusCode::CREATED, Json(SignUpResponse { user })))
}

/// Sign in with username or email
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<SignInRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    if payload.identifier.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::InvalidCredentials);
    }

    let user = authenticate(&state, payload.identifier, payload.password).await?;
    tracing::info!("User signed in: {}", user.username);
    open_session(&state, jar, user).await
}

/// Sign in to the shared demo account
pub async fn guest_sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let guest = state
        .config
        .guest
        .clone()
        .ok_or(AppError::FeatureDisabled("Guest sign-in"))?;

    let user = match authenticate(&state, guest.email, guest.password).await {
        Ok(user) => user,
        Err(AppError::InvalidCredentials) => {
            tracing::error!("Guest account credentials were rejected");
            return Err(AppError::InvalidInput(
                "Guest sign-in failed: Invalid login credentials".to_string(),
            ));
        }
        Err(e) => return Err(e),
    };

    if !user.is_guest {
        tracing::error!("Guest credentials resolve to regular account {}", user.username);
        return Err(AppError::InvalidInput(
            "Guest sign-in failed: account is not a guest account".to_string(),
        ));
    }

    open_session(&state, jar, user).await
}

/// Accept a verified identity from the OAuth gateway
pub async fn oauth_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<OAuthCallbackRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let secret = state
        .config
        .oauth_shared_secret
        .as_deref()
        .ok_or(AppError::FeatureDisabled("OAuth sign-in"))?;

    validate_signed_request(
        &payload.signed_payload(),
        &payload.signature,
        payload.timestamp,
        secret,
    )?;

    let provider = payload.provider.trim().to_lowercase();
    let provider_user_id = payload.provider_user_id.trim().to_string();
    if provider.is_empty() || provider_user_id.is_empty() {
        return Err(AppError::InvalidInput(
            "Provider and provider user id are required".to_string(),
        ));
    }

    let email = payload
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());
    if let Some(email) = &email {
        if !User::validate_email(email) {
            return Err(AppError::InvalidInput(ERR_INVALID_EMAIL.to_string()));
        }
    }

    let profile = OAuthProfile {
        provider,
        provider_user_id,
        login: payload.login.trim().to_string(),
        email,
        avatar_url: payload.avatar_url.filter(|url| !url.trim().is_empty()),
    };

    let db = state.db.clone();
    let user = tokio::task::spawn_blocking(move || users::resolve_oauth_user(&db, &profile)).await??;

    tracing::info!("OAuth sign-in for {}", user.username);
    open_session(&state, jar, user).await
}

/// End the current session; succeeds even without one
pub async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SignOutResponse>)> {
    if let Some(session) = current_session(&state, &headers).await? {
        let db = state.db.clone();
        tokio::task::spawn_blocking(move || sessions::delete_session(&db, &session.token_hash))
            .await??;
    }

    // Always emit the removal, even when the token came from a bearer header
    let mut removal = Cookie::build((SESSION_COOKIE_NAME, "")).path("/").build();
    removal.make_removal();
    Ok((jar.add(removal), Json(SignOutResponse { success: true })))
}

/// Report whether the caller holds a live session
pub async fn session_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionStatus>> {
    let user = match current_session(&state, &headers).await? {
        Some(session) => {
            let db = state.db.clone();
            tokio::task::spawn_blocking(move || users::get_user(&db, &session.user_id)).await??
        }
        None => None,
    };

    Ok(Json(SessionStatus {
        authenticated: user.is_some(),
        user,
    }))
}

pub async fn me(State(state): State<AppState>, auth: AuthUser) -> Result<Json<User>> {
    let db = state.db.clone();
    let user = tokio::task::spawn_blocking(move || users::get_user(&db, &auth.user_id))
        .await??
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(user))
}
