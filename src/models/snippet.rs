use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    DESCRIPTION_MAX_CHARS, MAX_CONTENT_BYTES, MAX_TAGS, TAG_MAX_CHARS, TITLE_MAX_CHARS,
};
use crate::error::{AppError, Result};
use crate::routes::timestamp_to_rfc3339;

/// Languages a snippet can be saved as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Bash,
    C,
    #[serde(rename = "CPP")]
    Cpp,
    #[serde(rename = "CSS")]
    Css,
    Go,
    #[serde(rename = "HTML")]
    Html,
    Java,
    JavaScript,
    Python,
    Ruby,
    Rust,
    #[serde(rename = "SQL")]
    Sql,
    TypeScript,
}

impl Language {
    pub const ALL: [Language; 13] = [
        Language::Bash,
        Language::C,
        Language::Cpp,
        Language::Css,
        Language::Go,
        Language::Html,
        Language::Java,
        Language::JavaScript,
        Language::Python,
        Language::Ruby,
        Language::Rust,
        Language::Sql,
        Language::TypeScript,
    ];

    /// Canonical spelling, as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Bash => "Bash",
            Language::C => "C",
            Language::Cpp => "CPP",
            Language::Css => "CSS",
            Language::Go => "Go",
            Language::Html => "HTML",
            Language::Java => "Java",
            Language::JavaScript => "JavaScript",
            Language::Python => "Python",
            Language::Ruby => "Ruby",
            Language::Rust => "Rust",
            Language::Sql => "SQL",
            Language::TypeScript => "TypeScript",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = AppError;

    /// Case-insensitive match against the canonical names
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Language::ALL
            .iter()
            .copied()
            .find(|lang| lang.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let names: Vec<&str> = Language::ALL.iter().map(Language::as_str).collect();
                AppError::InvalidInput(format!(
                    "Unsupported language '{}'. Expected one of: {}",
                    wanted,
                    names.join(", ")
                ))
            })
    }
}

/// Snippet record stored in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnippetRecord {
    pub owner: String,
    pub title: String,
    pub language: Language,
    pub content: String,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub is_favorite: bool,
    pub share_tokens: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShareRef {
    pub share_token: String,
}

/// Snippet model for API responses, joined with its folder associations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub language: Language,
    pub content: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub is_favorite: bool,
    pub folder_ids: Vec<String>,
    pub shares: Vec<ShareRef>,
    pub created_at: String,
    pub updated_at: String,
    /// Sort key, not part of the wire format
    #[serde(skip)]
    pub updated_at_ts: i64,
}

impl Snippet {
    pub fn from_record(id: &str, record: &SnippetRecord, folder_ids: Vec<String>) -> Self {
        Self {
            id: id.to_string(),
            owner: record.owner.clone(),
            title: record.title.clone(),
            language: record.language,
            content: record.content.clone(),
            description: record.description.clone(),
            tags: record.tags.clone(),
            is_favorite: record.is_favorite,
            folder_ids,
            shares: record
                .share_tokens
                .iter()
                .map(|token| ShareRef {
                    share_token: token.clone(),
                })
                .collect(),
            created_at: timestamp_to_rfc3339(record.created_at),
            updated_at: timestamp_to_rfc3339(record.updated_at),
            updated_at_ts: record.updated_at,
        }
    }
}

/// Public view of a snippet reached through a share token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedSnippet {
    pub title: String,
    pub language: Language,
    pub content: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub author: String,
    pub updated_at: String,
}

/// Trim and bound-check a snippet title
pub fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidInput("Title is required".to_string()));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(AppError::InvalidInput(format!(
            "Title must be at most {} characters",
            TITLE_MAX_CHARS
        )));
    }
    Ok(title.to_string())
}

pub fn validate_content(content: &str) -> Result<()> {
    if content.len() > MAX_CONTENT_BYTES {
        return Err(AppError::InvalidInput(format!(
            "Content exceeds {} bytes",
            MAX_CONTENT_BYTES
        )));
    }
    Ok(())
}

/// Blank descriptions are stored as absent
pub fn validate_description(description: Option<&str>) -> Result<Option<String>> {
    let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(None);
    };
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(AppError::InvalidInput(format!(
            "Description must be at most {} characters",
            DESCRIPTION_MAX_CHARS
        )));
    }
    Ok(Some(description.to_string()))
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '#' | '.' | '-')
}

/// Trim, validate and de-duplicate tags, keeping the first spelling of each
pub fn normalize_tags(tags: &[String]) -> Result<Vec<String>> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());

    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || tag.chars().count() > TAG_MAX_CHARS || !tag.chars().all(is_tag_char) {
            return Err(AppError::InvalidInput(format!(
                "Invalid tag '{}': tags are 1-{} characters of letters, digits, and _ + # . -",
                tag, TAG_MAX_CHARS
            )));
        }
        if !normalized.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            normalized.push(tag.to_string());
        }
    }

    if normalized.len() > MAX_TAGS {
        return Err(AppError::InvalidInput(format!(
            "A snippet can have at most {} tags",
            MAX_TAGS
        )));
    }

    Ok(normalized)
}
