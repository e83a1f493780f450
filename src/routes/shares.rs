use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::db::snippets;
use crate::error::Result;
use crate::models::SharedSnippet;
use crate::routes::extract::AuthUser;
use crate::routes::snippets::publish_snippet;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    pub share_token: String,
}

#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    pub success: bool,
}

pub async fn create_share(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(snippet_id): Path<String>,
) -> Result<(StatusCode, Json<ShareResponse>)> {
    let db = state.db.clone();
    let owner = auth.user_id.clone();
    let (share_token, snippet) =
        tokio::task::spawn_blocking(move || snippets::create_share(&db, &owner, &snippet_id))
            .await??;

    publish_snippet(&state, &auth, snippet);
    Ok((StatusCode::CREATED, Json(ShareResponse { share_token })))
}

pub async fn revoke_share(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((snippet_id, token)): Path<(String, String)>,
) -> Result<Json<RevokeResponse>> {
    let db = state.db.clone();
    let owner = auth.user_id.clone();
    let snippet = tokio::task::spawn_blocking(move || {
        snippets::revoke_share(&db, &owner, &snippet_id, &token)
    })
    .await??;

    publish_snippet(&state, &auth, snippet);
    Ok(Json(RevokeResponse { success: true }))
}

/// Public read of a shared snippet; no session needed
pub async fn get_shared(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<SharedSnippet>> {
    let db = state.db.clone();
    let shared = tokio::task::spawn_blocking(move || snippets::get_shared(&db, &token)).await??;
    Ok(Json(shared))
}
