use serde::{Deserialize, Serialize};

use crate::constants::FOLDER_NAME_MAX_CHARS;
use crate::error::{AppError, Result};
use crate::routes::timestamp_to_rfc3339;

/// Folder record stored in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderRecord {
    pub owner: String,
    pub name: String,
    pub created_at: i64,
}

/// Folder model for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub snippet_count: usize,
}

impl Folder {
    pub fn from_record(id: &str, record: &FolderRecord, snippet_count: usize) -> Self {
        Self {
            id: id.to_string(),
            name: record.name.clone(),
            created_at: timestamp_to_rfc3339(record.created_at),
            snippet_count,
        }
    }

    /// Trim and bound-check a folder name
    pub fn validate_name(name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput("Folder name is required".to_string()));
        }
        if name.chars().count() > FOLDER_NAME_MAX_CHARS {
            return Err(AppError::InvalidInput(format!(
                "Folder name must be at most {} characters",
                FOLDER_NAME_MAX_CHARS
            )));
        }
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(Folder::validate_name("  Work  ").unwrap(), "Work");
        assert!(Folder::validate_name("").is_err());
        assert!(Folder::validate_name(&"f".repeat(51)).is_err());
    }
}
