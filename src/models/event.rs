use serde::Serialize;

use super::{Folder, Snippet};

/// A change to one user's data, pushed to their realtime subscribers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    SnippetUpserted { snippet: Snippet },
    SnippetDeleted { id: String },
    FolderUpserted { folder: Folder },
    FolderDeleted { id: String },
}

/// Broadcast envelope; `owner_id` selects the receiving subscribers
#[derive(Debug, Clone)]
pub struct ChangeNotice {
    pub owner_id: String,
    pub event: ChangeEvent,
}
