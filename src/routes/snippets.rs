use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::{
    folders,
    snippets::{self, SnippetChanges, SnippetDraft},
    users,
};
use crate::error::{AppError, Result};
use crate::models::{
    normalize_tags, validate_content, validate_description, validate_title, ChangeEvent, Folder,
    Language, Snippet, User,
};
use crate::routes::extract::AuthUser;
use crate::search::{SnippetCounts, SnippetFilter, ViewKind};
use crate::AppState;

/// Query parameters of the snippet list
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub view: Option<String>,
    pub folder: Option<String>,
    pub q: Option<String>,
    pub language: Option<String>,
    pub tag: Option<String>,
}

impl ListParams {
    fn into_filter(self) -> Result<SnippetFilter> {
        let view = match self.view.as_deref() {
            Some(view) => Some(ViewKind::parse(view)?),
            None => None,
        };
        SnippetFilter::new(
            view,
            self.folder,
            self.q.as_deref(),
            self.language.as_deref(),
            self.tag.as_deref(),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSnippetRequest {
    pub title: String,
    pub language: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub folder_ids: Vec<String>,
}

impl CreateSnippetRequest {
    fn into_draft(self) -> Result<SnippetDraft> {
        let title = validate_title(&self.title)?;
        let language: Language = self.language.parse()?;
        validate_content(&self.content)?;

        Ok(SnippetDraft {
            title,
            language,
            content: self.content,
            tags: normalize_tags(&self.tags)?,
            description: validate_description(self.description.as_deref())?,
            is_favorite: self.is_favorite,
            folder_ids: self.folder_ids,
        })
    }
}

/// Partial update; a blank `description` clears it
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSnippetRequest {
    pub title: Option<String>,
    pub language: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub description: Option<String>,
}

impl UpdateSnippetRequest {
    fn into_changes(self) -> Result<SnippetChanges> {
        let title = self.title.as_deref().map(validate_title).transpose()?;
        let language = self
            .language
            .as_deref()
            .map(str::parse::<Language>)
            .transpose()?;
        if let Some(content) = &self.content {
            validate_content(content)?;
        }
        let tags = self.tags.as_deref().map(normalize_tags).transpose()?;
        let description = self
            .description
            .as_deref()
            .map(|d| validate_description(Some(d)))
            .transpose()?;

        Ok(SnippetChanges {
            title,
            language,
            content: self.content,
            tags,
            description,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    pub is_favorite: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    #[serde(default)]
    pub folder_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub user: User,
    pub folders: Vec<Folder>,
    pub desktop_count: usize,
    pub total_count: usize,
    pub favorite_count: usize,
    pub shared_count: usize,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// List the caller's snippets for one dashboard view, optionally searched
pub async fn list_snippets(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Snippet>>> {
    let filter = params.into_filter()?;

    let db = state.db.clone();
    let all = tokio::task::spawn_blocking(move || snippets::list_snippets(&db, &auth.user_id)).await??;

    Ok(Json(filter.apply(all)))
}

/// Everything the dashboard sidebar needs in one call
pub async fn dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<DashboardResponse>> {
    let db = state.db.clone();
    let (user, folders, all) = tokio::task::spawn_blocking(move || -> Result<_> {
        let user = users::get_user(&db, &auth.user_id)?.ok_or(AppError::Unauthorized)?;
        let folders = folders::list_folders(&db, &auth.user_id)?;
        let all = snippets::list_snippets(&db, &auth.user_id)?;
        Ok((user, folders, all))
    })
    .await??;

    let counts = SnippetCounts::tally(&all);
    Ok(Json(DashboardResponse {
        user,
        folders,
        desktop_count: counts.desktop,
        total_count: counts.total,
        favorite_count: counts.favorites,
        shared_count: counts.shared,
    }))
}

pub async fn create_snippet(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateSnippetRequest>,
) -> Result<(StatusCode, Json<Snippet>)> {
    let draft = payload.into_draft()?;

    let db = state.db.clone();
    let owner = auth.user_id.clone();
    let snippet =
        tokio::task::spawn_blocking(move || snippets::create_snippet(&db, &owner, draft)).await??;

    state.publish(
        &auth.user_id,
        ChangeEvent::SnippetUpserted {
            snippet: snippet.clone(),
        },
    );
    Ok((StatusCode::CREATED, Json(snippet)))
}

pub async fn get_snippet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(snippet_id): Path<String>,
) -> Result<Json<Snippet>> {
    let db = state.db.clone();
    let snippet =
        tokio::task::spawn_blocking(move || snippets::get_snippet(&db, &auth.user_id, &snippet_id))
            .await??;
    Ok(Json(snippet))
}

pub async fn update_snippet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(snippet_id): Path<String>,
    Json(payload): Json<UpdateSnippetRequest>,
) -> Result<Json<Snippet>> {
    let changes = payload.into_changes()?;
    if changes.is_empty() {
        return Err(AppError::InvalidInput("Nothing to update".to_string()));
    }

    let db = state.db.clone();
    let owner = auth.user_id.clone();
    let snippet = tokio::task::spawn_blocking(move || {
        snippets::update_snippet(&db, &owner, &snippet_id, changes)
    })
    .await??;

    Ok(Json(publish_snippet(&state, &auth, snippet)))
}

pub async fn delete_snippet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(snippet_id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let db = state.db.clone();
    let owner = auth.user_id.clone();
    let id = snippet_id.clone();
    tokio::task::spawn_blocking(move || snippets::delete_snippet(&db, &owner, &id)).await??;

    state.publish(&auth.user_id, ChangeEvent::SnippetDeleted { id: snippet_id });
    Ok(Json(DeleteResponse { success: true }))
}

/// Idempotent favorite toggle; re-sending the old value undoes it
pub async fn set_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(snippet_id): Path<String>,
    Json(payload): Json<FavoriteRequest>,
) -> Result<Json<Snippet>> {
    let db = state.db.clone();
    let owner = auth.user_id.clone();
    let snippet = tokio::task::spawn_blocking(move || {
        snippets::set_favorite(&db, &owner, &snippet_id, payload.is_favorite)
    })
    .await??;

    Ok(Json(publish_snippet(&state, &auth, snippet)))
}

/// Replace every folder association with one folder, or none
pub async fn move_to_folder(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(snippet_id): Path<String>,
    Json(payload): Json<MoveRequest>,
) -> Result<Json<Snippet>> {
    let folder_id = payload.folder_id.filter(|id| !id.trim().is_empty());

    let db = state.db.clone();
    let owner = auth.user_id.clone();
    let snippet = tokio::task::spawn_blocking(move || {
        snippets::move_to_folder(&db, &owner, &snippet_id, folder_id.as_deref())
    })
    .await??;

    Ok(Json(publish_snippet(&state, &auth, snippet)))
}

pub async fn add_to_folder(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((snippet_id, folder_id)): Path<(String, String)>,
) -> Result<Json<Snippet>> {
    let db = state.db.clone();
    let owner = auth.user_id.clone();
    let snippet = tokio::task::spawn_blocking(move || {
        snippets::add_to_folder(&db, &owner, &snippet_id, &folder_id)
    })
    .await??;

    Ok(Json(publish_snippet(&state, &auth, snippet)))
}

pub async fn remove_from_folder(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((snippet_id, folder_id)): Path<(String, String)>,
) -> Result<Json<Snippet>> {
    let db = state.db.clone();
    let owner = auth.user_id.clone();
    let snippet = tokio::task::spawn_blocking(move || {
        snippets::remove_from_folder(&db, &owner, &snippet_id, &folder_id)
    })
    .await??;

    Ok(Json(publish_snippet(&state, &auth, snippet)))
}

pub(crate) fn publish_snippet(state: &AppState, auth: &AuthUser, snippet: Snippet) -> Snippet {
    state.publish(
        &auth.user_id,
        ChangeEvent::SnippetUpserted {
            snippet: snippet.clone(),
        },
    );
    snippet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_blank_description_clears() {
        let changes = UpdateSnippetRequest {
            description: Some("   ".to_string()),
            ..Default::default()
        }
        .into_changes()
        .unwrap();

        assert_eq!(changes.description, Some(None));
        assert!(!changes.is_empty());
    }

    #[test]
    fn test_update_request_validates_fields() {
        let bad_language = UpdateSnippetRequest {
            language: Some("brainfuck".to_string()),
            ..Default::default()
        };
        assert!(bad_language.into_changes().is_err());

        let blank_title = UpdateSnippetRequest {
            title: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(blank_title.into_changes().is_err());

        assert!(UpdateSnippetRequest::default().into_changes().unwrap().is_empty());
    }

    #[test]
    fn test_list_params_reject_unknown_view() {
        let params = ListParams {
            view: Some("archive".to_string()),
            ..Default::default()
        };
        assert!(params.into_filter().is_err());
    }
}
