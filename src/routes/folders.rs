use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::folders;
use crate::error::Result;
use crate::models::{ChangeEvent, Folder};
use crate::routes::extract::AuthUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FolderRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

pub async fn list_folders(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Folder>>> {
    let db = state.db.clone();
    let folders = tokio::task::spawn_blocking(move || folders::list_folders(&db, &auth.user_id)).await??;
    Ok(Json(folders))
}

pub async fn create_folder(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<FolderRequest>,
) -> Result<(StatusCode, Json<Folder>)> {
    let name = Folder::validate_name(&payload.name)?;

    let db = state.db.clone();
    let owner = auth.user_id.clone();
    let folder = tokio::task::spawn_blocking(move || folders::create_folder(&db, &owner, &name)).await??;

    state.publish(
        &auth.user_id,
        ChangeEvent::FolderUpserted {
            folder: folder.clone(),
        },
    );
    Ok((StatusCode::CREATED, Json(folder)))
}

pub async fn rename_folder(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(folder_id): Path<String>,
    Json(payload): Json<FolderRequest>,
) -> Result<Json<Folder>> {
    let name = Folder::validate_name(&payload.name)?;

    let db = state.db.clone();
    let owner = auth.user_id.clone();
    let folder =
        tokio::task::spawn_blocking(move || folders::rename_folder(&db, &owner, &folder_id, &name))
            .await??;

    state.publish(
        &auth.user_id,
        ChangeEvent::FolderUpserted {
            folder: folder.clone(),
        },
    );
    Ok(Json(folder))
}

/// Delete a folder; its snippets stay and may fall back to the desktop
pub async fn delete_folder(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(folder_id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let db = state.db.clone();
    let owner = auth.user_id.clone();
    let id = folder_id.clone();
    let affected =
        tokio::task::spawn_blocking(move || folders::delete_folder(&db, &owner, &id)).await??;

    state.publish(&auth.user_id, ChangeEvent::FolderDeleted { id: folder_id });
    for snippet in affected {
        state.publish(&auth.user_id, ChangeEvent::SnippetUpserted { snippet });
    }

    Ok(Json(DeleteResponse { success: true }))
}
