//! Dashboard views and search over a user's snippets.

use crate::error::{AppError, Result};
use crate::models::{Language, Snippet};

/// Which slice of the snippet list the dashboard is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewKind {
    #[default]
    All,
    /// Snippets that sit in no folder
    Desktop,
    Folder,
    Favorites,
    Shared,
}

impl ViewKind {
    /// Parse the `view` query parameter (case-insensitive)
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "" | "all" => Ok(ViewKind::All),
            "desktop" => Ok(ViewKind::Desktop),
            "folder" => Ok(ViewKind::Folder),
            "favorites" => Ok(ViewKind::Favorites),
            "shared" => Ok(ViewKind::Shared),
            other => Err(AppError::InvalidInput(format!(
                "Unknown view '{}'. Expected all, desktop, folder, favorites or shared",
                other
            ))),
        }
    }
}

/// A parsed, validated snippet query
#[derive(Debug, Clone, Default)]
pub struct SnippetFilter {
    pub view: ViewKind,
    pub folder_id: Option<String>,
    /// Lowercased search text; `None` matches everything
    pub query: Option<String>,
    pub language: Option<Language>,
    /// Lowercased tag
    pub tag: Option<String>,
}

impl SnippetFilter {
    pub fn new(
        view: Option<ViewKind>,
        folder_id: Option<String>,
        query: Option<&str>,
        language: Option<&str>,
        tag: Option<&str>,
    ) -> Result<Self> {
        let view = view.unwrap_or_default();
        let folder_id = folder_id.filter(|id| !id.trim().is_empty());

        if view == ViewKind::Folder && folder_id.is_none() {
            return Err(AppError::InvalidInput(
                "The folder view needs a folder id".to_string(),
            ));
        }

        let language = match language.map(str::trim).filter(|l| !l.is_empty()) {
            Some(name) => Some(name.parse::<Language>()?),
            None => None,
        };

        Ok(Self {
            view,
            folder_id,
            query: blank_to_none(query),
            language,
            tag: blank_to_none(tag),
        })
    }

    fn in_view(&self, snippet: &Snippet) -> bool {
        match self.view {
            ViewKind::All => true,
            ViewKind::Desktop => snippet.folder_ids.is_empty(),
            ViewKind::Folder => self
                .folder_id
                .as_ref()
                .map(|id| snippet.folder_ids.contains(id))
                .unwrap_or(false),
            ViewKind::Favorites => snippet.is_favorite,
            ViewKind::Shared => !snippet.shares.is_empty(),
        }
    }

    /// Whether one snippet passes every part of the filter
    pub fn matches(&self, snippet: &Snippet) -> bool {
        if !self.in_view(snippet) {
            return false;
        }

        if let Some(language) = self.language {
            if snippet.language != language {
                return false;
            }
        }

        if let Some(tag) = &self.tag {
            if !snippet.tags.iter().any(|t| t.to_lowercase() == *tag) {
                return false;
            }
        }

        match &self.query {
            Some(query) => matches_text(snippet, query),
            None => true,
        }
    }

    /// Filter and order snippets: most recently updated first, ties by title
    pub fn apply(&self, snippets: Vec<Snippet>) -> Vec<Snippet> {
        let mut result: Vec<Snippet> = snippets.into_iter().filter(|s| self.matches(s)).collect();
        result.sort_by(|a, b| {
            b.updated_at_ts
                .cmp(&a.updated_at_ts)
                .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
                .then_with(|| a.id.cmp(&b.id))
        });
        result
    }
}

fn blank_to_none(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

/// Case-insensitive substring search over the text fields of a snippet
fn matches_text(snippet: &Snippet, query: &str) -> bool {
    let contains = |field: &str| field.to_lowercase().contains(query);

    contains(snippet.title.as_str())
        || contains(snippet.content.as_str())
        || snippet.description.as_deref().map(contains).unwrap_or(false)
        || contains(snippet.language.as_str())
        || snippet.tags.iter().any(|tag| contains(tag.as_str()))
}

/// Counters shown next to the dashboard navigation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnippetCounts {
    pub total: usize,
    pub desktop: usize,
    pub favorites: usize,
    pub shared: usize,
}

impl SnippetCounts {
    pub fn tally(snippets: &[Snippet]) -> Self {
        snippets.iter().fold(Self::default(), |mut counts, snippet| {
            counts.total += 1;
            if snippet.folder_ids.is_empty() {
                counts.desktop += 1;
            }
            if snippet.is_favorite {
                counts.favorites += 1;
            }
            if !snippet.shares.is_empty() {
                counts.shared += 1;
            }
            counts
        })
    }
}
