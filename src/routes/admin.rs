use axum::{
    extract::{Query, State},
    Json,
};
use redb::ReadableTableMetadata;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::{db::tables, error::Result, security::secrets_match, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    pub key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatsResponse {
    pub user_count: u64,
    pub snippet_count: u64,
    pub folder_count: u64,
    pub session_count: u64,
    pub database_size_bytes: u64,
    pub database_size_human: String,
}

/// Format bytes into human-readable string
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Admin stats endpoint
///
/// GET /admin/stats?key=<admin_secret_key>
pub async fn admin_stats(
    State(state): State<AppState>,
    Query(params): Query<AdminQuery>,
) -> Result<Json<AdminStatsResponse>> {
    let admin_key = state
        .config
        .admin_secret_key
        .as_ref()
        .ok_or(AppError::Unauthorized)?;

    if !secrets_match(&params.key, admin_key) {
        tracing::warn!("Invalid admin key attempt");
        return Err(AppError::Unauthorized);
    }

    let database_size_bytes = fs::metadata(&state.config.database_path)
        .map(|m| m.len())
        .unwrap_or(0);

    let db = state.db.clone();
    let [user_count, snippet_count, folder_count, session_count] =
        tokio::task::spawn_blocking(move || -> Result<[u64; 4]> {
            let read_txn = db.begin_read()?;
            Ok([
                read_txn.open_table(tables::USERS)?.len()?,
                read_txn.open_table(tables::SNIPPETS)?.len()?,
                read_txn.open_table(tables::FOLDERS)?.len()?,
                read_txn.open_table(tables::SESSIONS)?.len()?,
            ])
        })
        .await??;

    tracing::info!(
        "Admin stats requested: {} users, {} snippets, {} database",
        user_count,
        snippet_count,
        format_bytes(database_size_bytes)
    );

    Ok(Json(AdminStatsResponse {
        user_count,
        snippet_count,
        folder_count,
        session_count,
        database_size_bytes,
        database_size_human: format_bytes(database_size_bytes),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }
}
