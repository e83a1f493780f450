//! Snippets, their folder associations and share tokens.

use chrono::Utc;
use redb::{Database, ReadableTable, WriteTransaction};
use uuid::Uuid;

use super::{encode, folders::owned_folder, read_ids, read_record, read_str, tables};
use crate::error::{AppError, Result};
use crate::models::{Language, SharedSnippet, Snippet, SnippetRecord, UserRecord};
use crate::security::generate_share_token;

/// Validated fields of a new snippet
#[derive(Debug, Clone)]
pub struct SnippetDraft {
    pub title: String,
    pub language: Language,
    pub content: String,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub is_favorite: bool,
    pub folder_ids: Vec<String>,
}

/// Validated partial update; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct SnippetChanges {
    pub title: Option<String>,
    pub language: Option<Language>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
}

impl SnippetChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.language.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.description.is_none()
    }
}

fn owned_snippet<Tbl>(snippets: &Tbl, owner: &str, snippet_id: &str) -> Result<SnippetRecord>
where
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    match read_record::<SnippetRecord, _>(snippets, snippet_id)? {
        Some(record) if record.owner == owner => Ok(record),
        _ => Err(AppError::NotFound("Snippet")),
    }
}

/// Fail with `NotFound("Folder")` unless every id is one of the owner's folders
fn check_folders(write_txn: &WriteTransaction, owner: &str, folder_ids: &[String]) -> Result<()> {
    let folders = write_txn.open_table(tables::FOLDERS)?;
    for folder_id in folder_ids {
        owned_folder(&folders, owner, folder_id)?;
    }
    Ok(())
}

fn dedup_ids(ids: &mut Vec<String>) {
    let mut seen = Vec::with_capacity(ids.len());
    ids.retain(|id| {
        if seen.contains(id) {
            false
        } else {
            seen.push(id.clone());
            true
        }
    });
}

/// Load an owned snippet, let `change` edit it inside the write transaction,
/// then store the record and its folder list
///
/// `change` must not keep the snippets or snippet_folders tables open.
fn modify_snippet<F>(db: &Database, owner: &str, snippet_id: &str, change: F) -> Result<Snippet>
where
    F: FnOnce(&WriteTransaction, &mut SnippetRecord, &mut Vec<String>) -> Result<()>,
{
    let write_txn = db.begin_write()?;
    let snippet = {
        let mut record = {
            let snippets = write_txn.open_table(tables::SNIPPETS)?;
            owned_snippet(&snippets, owner, snippet_id)?
        };
        let mut folder_ids = {
            let snippet_folders = write_txn.open_table(tables::SNIPPET_FOLDERS)?;
            read_ids(&snippet_folders, snippet_id)?
        };

        change(&write_txn, &mut record, &mut folder_ids)?;

        let mut snippets = write_txn.open_table(tables::SNIPPETS)?;
        let bytes = encode(&record)?;
        snippets.insert(snippet_id, bytes.as_slice())?;

        let mut snippet_folders = write_txn.open_table(tables::SNIPPET_FOLDERS)?;
        if folder_ids.is_empty() {
            snippet_folders.remove(snippet_id)?;
        } else {
            let ids_bytes = encode(&folder_ids)?;
            snippet_folders.insert(snippet_id, ids_bytes.as_slice())?;
        }

        Snippet::from_record(snippet_id, &record, folder_ids)
    };
    write_txn.commit()?;

    Ok(snippet)
}

/// Store a new snippet and its folder associations
pub fn create_snippet(db: &Database, owner: &str, draft: SnippetDraft) -> Result<Snippet> {
    let now = Utc::now().timestamp();
    let snippet_id = Uuid::new_v4().to_string();
    let mut folder_ids = draft.folder_ids;
    dedup_ids(&mut folder_ids);

    let record = SnippetRecord {
        owner: owner.to_string(),
        title: draft.title,
        language: draft.language,
        content: draft.content,
        tags: draft.tags,
        description: draft.description,
        is_favorite: draft.is_favorite,
        share_tokens: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    let write_txn = db.begin_write()?;
    {
        check_folders(&write_txn, owner, &folder_ids)?;

        let mut snippets = write_txn.open_table(tables::SNIPPETS)?;
        let bytes = encode(&record)?;
        snippets.insert(snippet_id.as_str(), bytes.as_slice())?;

        let mut user_snippets = write_txn.open_table(tables::USER_SNIPPETS)?;
        let mut ids = read_ids(&user_snippets, owner)?;
        ids.push(snippet_id.clone());
        let ids_bytes = encode(&ids)?;
        user_snippets.insert(owner, ids_bytes.as_slice())?;

        if !folder_ids.is_empty() {
            let mut snippet_folders = write_txn.open_table(tables::SNIPPET_FOLDERS)?;
            let folder_bytes = encode(&folder_ids)?;
            snippet_folders.insert(snippet_id.as_str(), folder_bytes.as_slice())?;
        }
    }
    write_txn.commit()?;

    tracing::info!(
        "Snippet created for user {}: {} bytes of {}",
        owner,
        record.content.len(),
        record.language
    );
    Ok(Snippet::from_record(&snippet_id, &record, folder_ids))
}

/// Load one of the owner's snippets
pub fn get_snippet(db: &Database, owner: &str, snippet_id: &str) -> Result<Snippet> {
    let read_txn = db.begin_read()?;
    let snippets = read_txn.open_table(tables::SNIPPETS)?;
    let snippet_folders = read_txn.open_table(tables::SNIPPET_FOLDERS)?;

    let record = owned_snippet(&snippets, owner, snippet_id)?;
    let folder_ids = read_ids(&snippet_folders, snippet_id)?;
    Ok(Snippet::from_record(snippet_id, &record, folder_ids))
}

/// Load every snippet of an owner, unordered
pub fn list_snippets(db: &Database, owner: &str) -> Result<Vec<Snippet>> {
    let read_txn = db.begin_read()?;
    let snippets = read_txn.open_table(tables::SNIPPETS)?;
    let user_snippets = read_txn.open_table(tables::USER_SNIPPETS)?;
    let snippet_folders = read_txn.open_table(tables::SNIPPET_FOLDERS)?;

    let mut result = Vec::new();
    for snippet_id in read_ids(&user_snippets, owner)? {
        match read_record::<SnippetRecord, _>(&snippets, &snippet_id)? {
            Some(record) => {
                let folder_ids = read_ids(&snippet_folders, &snippet_id)?;
                result.push(Snippet::from_record(&snippet_id, &record, folder_ids));
            }
            None => tracing::warn!("Snippet index of {} lists missing {}", owner, snippet_id),
        }
    }
    Ok(result)
}

/// Apply a partial update and bump `updated_at`
pub fn update_snippet(
    db: &Database,
    owner: &str,
    snippet_id: &str,
    changes: SnippetChanges,
) -> Result<Snippet> {
    modify_snippet(db, owner, snippet_id, |_, record, _| {
        if let Some(title) = changes.title {
            record.title = title;
        }
        if let Some(language) = changes.language {
            record.language = language;
        }
        if let Some(content) = changes.content {
            record.content = content;
        }
        if let Some(tags) = changes.tags {
            record.tags = tags;
        }
        if let Some(description) = changes.description {
            record.description = description;
        }
        record.updated_at = Utc::now().timestamp();
        Ok(())
    })
}

/// Delete a snippet with its associations and share tokens
pub fn delete_snippet(db: &Database, owner: &str, snippet_id: &str) -> Result<()> {
    let write_txn = db.begin_write()?;
    {
        let mut snippets = write_txn.open_table(tables::SNIPPETS)?;
        let record = owned_snippet(&snippets, owner, snippet_id)?;

        let mut shares = write_txn.open_table(tables::SHARES)?;
        for token in &record.share_tokens {
            shares.remove(token.as_str())?;
        }

        let mut snippet_folders = write_txn.open_table(tables::SNIPPET_FOLDERS)?;
        snippet_folders.remove(snippet_id)?;

        let mut user_snippets = write_txn.open_table(tables::USER_SNIPPETS)?;
        let mut ids = read_ids(&user_snippets, owner)?;
        ids.retain(|id| id != snippet_id);
        let ids_bytes = encode(&ids)?;
        user_snippets.insert(owner, ids_bytes.as_slice())?;

        snippets.remove(snippet_id)?;
    }
    write_txn.commit()?;

    tracing::info!("Snippet deleted for user {}", owner);
    Ok(())
}

/// Set the favorite flag; repeating a value is a no-op
///
/// Favoriting is metadata only and leaves `updated_at` alone.
pub fn set_favorite(db: &Database, owner: &str, snippet_id: &str, favorite: bool) -> Result<Snippet> {
    modify_snippet(db, owner, snippet_id, |_, record, _| {
        record.is_favorite = favorite;
        Ok(())
    })
}

/// Replace all folder associations with `folder_id`, or clear them for `None`
pub fn move_to_folder(
    db: &Database,
    owner: &str,
    snippet_id: &str,
    folder_id: Option<&str>,
) -> Result<Snippet> {
    modify_snippet(db, owner, snippet_id, |write_txn, _, folder_ids| {
        folder_ids.clear();
        if let Some(folder_id) = folder_id {
            check_folders(write_txn, owner, &[folder_id.to_string()])?;
            folder_ids.push(folder_id.to_string());
        }
        Ok(())
    })
}

/// Associate a snippet with one more folder
pub fn add_to_folder(db: &Database, owner: &str, snippet_id: &str, folder_id: &str) -> Result<Snippet> {
    modify_snippet(db, owner, snippet_id, |write_txn, _, folder_ids| {
        check_folders(write_txn, owner, &[folder_id.to_string()])?;
        if !folder_ids.iter().any(|id| id == folder_id) {
            folder_ids.push(folder_id.to_string());
        }
        Ok(())
    })
}

/// Drop one folder association; absent associations are ignored
pub fn remove_from_folder(
    db: &Database,
    owner: &str,
    snippet_id: &str,
    folder_id: &str,
) -> Result<Snippet> {
    modify_snippet(db, owner, snippet_id, |write_txn, _, folder_ids| {
        check_folders(write_txn, owner, &[folder_id.to_string()])?;
        folder_ids.retain(|id| id != folder_id);
        Ok(())
    })
}

/// Mint a share token for a snippet
pub fn create_share(db: &Database, owner: &str, snippet_id: &str) -> Result<(String, Snippet)> {
    let token = generate_share_token();
    let snippet = modify_snippet(db, owner, snippet_id, |write_txn, record, _| {
        let mut shares = write_txn.open_table(tables::SHARES)?;
        shares.insert(token.as_str(), snippet_id)?;
        record.share_tokens.push(token.clone());
        Ok(())
    })?;

    tracing::info!("Share token created for a snippet of user {}", owner);
    Ok((token, snippet))
}

/// Revoke one of a snippet's share tokens
pub fn revoke_share(db: &Database, owner: &str, snippet_id: &str, token: &str) -> Result<Snippet> {
    modify_snippet(db, owner, snippet_id, |write_txn, record, _| {
        if !record.share_tokens.iter().any(|t| t == token) {
            return Err(AppError::NotFound("Share"));
        }
        let mut shares = write_txn.open_table(tables::SHARES)?;
        shares.remove(token)?;
        record.share_tokens.retain(|t| t != token);
        Ok(())
    })
}

/// Resolve a share token to the public view of its snippet
pub fn get_shared(db: &Database, token: &str) -> Result<SharedSnippet> {
    let read_txn = db.begin_read()?;
    let shares = read_txn.open_table(tables::SHARES)?;
    let snippets = read_txn.open_table(tables::SNIPPETS)?;
    let users = read_txn.open_table(tables::USERS)?;

    let snippet_id = read_str(&shares, token)?.ok_or(AppError::NotFound("Shared snippet"))?;
    let record: SnippetRecord =
        read_record(&snippets, &snippet_id)?.ok_or(AppError::NotFound("Shared snippet"))?;
    let author = read_record::<UserRecord, _>(&users, &record.owner)?
        .map(|user| user.username)
        .unwrap_or_default();

    Ok(SharedSnippet {
        title: record.title,
        language: record.language,
        content: record.content,
        description: record.description,
        tags: record.tags,
        author,
        updated_at: crate::routes::timestamp_to_rfc3339(record.updated_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::folders::create_folder;
    use crate::db::test_support::temp_db;

    fn draft(title: &str) -> SnippetDraft {
        SnippetDraft {
            title: title.to_string(),
            language: Language::Python,
            content: "print('hi')".to_string(),
            tags: vec!["demo".to_string()],
            description: None,
            is_favorite: false,
            folder_ids: vec![],
        }
    }

    #[test]
    fn test_create_and_get() {
        let (_dir, db) = temp_db();

        let created = create_snippet(&db, "owner", draft("hello")).unwrap();
        let loaded = get_snippet(&db, "owner", &created.id).unwrap();

        assert_eq!(loaded.title, "hello");
        assert_eq!(loaded.language, Language::Python);
        assert_eq!(loaded.tags, vec!["demo"]);
        assert!(loaded.folder_ids.is_empty());
    }

    #[test]
    fn test_other_owner_sees_not_found() {
        let (_dir, db) = temp_db();
        let created = create_snippet(&db, "owner", draft("mine")).unwrap();

        assert!(matches!(
            get_snippet(&db, "intruder", &created.id),
            Err(AppError::NotFound("Snippet"))
        ));
        assert!(matches!(
            delete_snippet(&db, "intruder", &created.id),
            Err(AppError::NotFound("Snippet"))
        ));
    }

    #[test]
    fn test_create_rejects_foreign_folder() {
        let (_dir, db) = temp_db();
        let theirs = create_folder(&db, "other", "Theirs").unwrap();

        let mut bad = draft("x");
        bad.folder_ids = vec![theirs.id];

        assert!(matches!(
            create_snippet(&db, "owner", bad),
            Err(AppError::NotFound("Folder"))
        ));
        assert!(list_snippets(&db, "owner").unwrap().is_empty());
    }

    #[test]
    fn test_update_partial_fields() {
        let (_dir, db) = temp_db();
        let created = create_snippet(&db, "owner", draft("old")).unwrap();

        let updated = update_snippet(
            &db,
            "owner",
            &created.id,
            SnippetChanges {
                title: Some("new".to_string()),
                description: Some(Some("explained".to_string())),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(updated.title, "new");
        assert_eq!(updated.content, "print('hi')");
        assert_eq!(updated.description.as_deref(), Some("explained"));
    }

    #[test]
    fn test_set_favorite_is_idempotent() {
        let (_dir, db) = temp_db();
        let created = create_snippet(&db, "owner", draft("fav")).unwrap();

        assert!(set_favorite(&db, "owner", &created.id, true).unwrap().is_favorite);
        assert!(set_favorite(&db, "owner", &created.id, true).unwrap().is_favorite);
        assert!(!set_favorite(&db, "owner", &created.id, false).unwrap().is_favorite);
    }

    #[test]
    fn test_move_and_associate() {
        let (_dir, db) = temp_db();
        let work = create_folder(&db, "owner", "Work").unwrap();
        let play = create_folder(&db, "owner", "Play").unwrap();
        let created = create_snippet(&db, "owner", draft("s")).unwrap();

        let moved = move_to_folder(&db, "owner", &created.id, Some(&work.id)).unwrap();
        assert_eq!(moved.folder_ids, vec![work.id.clone()]);

        let both = add_to_folder(&db, "owner", &created.id, &play.id).unwrap();
        assert_eq!(both.folder_ids, vec![work.id.clone(), play.id.clone()]);

        // Adding twice keeps a single association
        let again = add_to_folder(&db, "owner", &created.id, &play.id).unwrap();
        assert_eq!(again.folder_ids.len(), 2);

        let one = remove_from_folder(&db, "owner", &created.id, &work.id).unwrap();
        assert_eq!(one.folder_ids, vec![play.id.clone()]);

        let cleared = move_to_folder(&db, "owner", &created.id, None).unwrap();
        assert!(cleared.folder_ids.is_empty());
    }

    #[test]
    fn test_share_lifecycle() {
        let (_dir, db) = temp_db();
        let created = create_snippet(&db, "owner", draft("shared")).unwrap();

        let (token, snippet) = create_share(&db, "owner", &created.id).unwrap();
        assert_eq!(snippet.shares.len(), 1);
        assert_eq!(get_shared(&db, &token).unwrap().title, "shared");

        revoke_share(&db, "owner", &created.id, &token).unwrap();
        assert!(matches!(get_shared(&db, &token), Err(AppError::NotFound(_))));
        assert!(matches!(
            revoke_share(&db, "owner", &created.id, &token),
            Err(AppError::NotFound("Share"))
        ));
    }

    #[test]
    fn test_delete_removes_shares_and_index() {
        let (_dir, db) = temp_db();
        let created = create_snippet(&db, "owner", draft("gone")).unwrap();
        let (token, _) = create_share(&db, "owner", &created.id).unwrap();

        delete_snippet(&db, "owner", &created.id).unwrap();

        assert!(list_snippets(&db, "owner").unwrap().is_empty());
        assert!(get_shared(&db, &token).is_err());
    }
}
