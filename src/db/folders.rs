//! Folders and the per-folder snippet counts derived from the association table.

use chrono::Utc;
use redb::{Database, ReadableTable, WriteTransaction};
use std::collections::HashMap;
use uuid::Uuid;

use super::{encode, index_key, read_ids, read_record, tables};
use crate::error::{AppError, Result};
use crate::models::{Folder, FolderRecord, Snippet, SnippetRecord};

/// Load a folder, treating folders of other users as missing
pub(crate) fn owned_folder<Tbl>(folders: &Tbl, owner: &str, folder_id: &str) -> Result<FolderRecord>
where
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    match read_record::<FolderRecord, _>(folders, folder_id)? {
        Some(record) if record.owner == owner => Ok(record),
        _ => Err(AppError::NotFound("Folder")),
    }
}

/// Count snippets per folder id for one owner
pub(crate) fn folder_counts<S, A>(
    user_snippets: &S,
    snippet_folders: &A,
    owner: &str,
) -> Result<HashMap<String, usize>>
where
    S: ReadableTable<&'static str, &'static [u8]>,
    A: ReadableTable<&'static str, &'static [u8]>,
{
    let mut counts = HashMap::new();
    for snippet_id in read_ids(user_snippets, owner)? {
        for folder_id in read_ids(snippet_folders, &snippet_id)? {
            *counts.entry(folder_id).or_insert(0) += 1;
        }
    }
    Ok(counts)
}

fn name_in_use<Tbl>(
    folders: &Tbl,
    folder_ids: &[String],
    name: &str,
    except: Option<&str>,
) -> Result<bool>
where
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    let wanted = index_key(name);
    for folder_id in folder_ids {
        if Some(folder_id.as_str()) == except {
            continue;
        }
        if let Some(record) = read_record::<FolderRecord, _>(folders, folder_id)? {
            if index_key(&record.name) == wanted {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Insert a folder inside an open write transaction
pub(crate) fn insert_folder(
    write_txn: &WriteTransaction,
    owner: &str,
    name: &str,
    now: i64,
) -> Result<(String, FolderRecord)> {
    let mut folders = write_txn.open_table(tables::FOLDERS)?;
    let mut user_folders = write_txn.open_table(tables::USER_FOLDERS)?;

    let mut folder_ids = read_ids(&user_folders, owner)?;
    if name_in_use(&folders, &folder_ids, name, None)? {
        return Err(AppError::FolderNameTaken);
    }

    let folder_id = Uuid::new_v4().to_string();
    let record = FolderRecord {
        owner: owner.to_string(),
        name: name.to_string(),
        created_at: now,
    };
    let bytes = encode(&record)?;
    folders.insert(folder_id.as_str(), bytes.as_slice())?;

    folder_ids.push(folder_id.clone());
    let ids_bytes = encode(&folder_ids)?;
    user_folders.insert(owner, ids_bytes.as_slice())?;

    Ok((folder_id, record))
}

/// List a user's folders with snippet counts, oldest first
pub fn list_folders(db: &Database, owner: &str) -> Result<Vec<Folder>> {
    let read_txn = db.begin_read()?;
    let folders = read_txn.open_table(tables::FOLDERS)?;
    let user_folders = read_txn.open_table(tables::USER_FOLDERS)?;
    let user_snippets = read_txn.open_table(tables::USER_SNIPPETS)?;
    let snippet_folders = read_txn.open_table(tables::SNIPPET_FOLDERS)?;

    let counts = folder_counts(&user_snippets, &snippet_folders, owner)?;

    let mut records = Vec::new();
    for folder_id in read_ids(&user_folders, owner)? {
        if let Some(record) = read_record::<FolderRecord, _>(&folders, &folder_id)? {
            records.push((folder_id, record));
        }
    }
    records.sort_by(|(a_id, a), (b_id, b)| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a_id.cmp(b_id))
    });

    Ok(records
        .iter()
        .map(|(id, record)| Folder::from_record(id, record, counts.get(id).copied().unwrap_or(0)))
        .collect())
}

/// Create a folder; names are unique per owner, case-insensitively
pub fn create_folder(db: &Database, owner: &str, name: &str) -> Result<Folder> {
    let write_txn = db.begin_write()?;
    let (folder_id, record) = insert_folder(&write_txn, owner, name, Utc::now().timestamp())?;
    write_txn.commit()?;

    tracing::info!("Folder created for user {}", owner);
    Ok(Folder::from_record(&folder_id, &record, 0))
}

/// Rename a folder, keeping names unique per owner
pub fn rename_folder(db: &Database, owner: &str, folder_id: &str, name: &str) -> Result<Folder> {
    let write_txn = db.begin_write()?;
    let folder = {
        let mut folders = write_txn.open_table(tables::FOLDERS)?;
        let user_folders = write_txn.open_table(tables::USER_FOLDERS)?;
        let user_snippets = write_txn.open_table(tables::USER_SNIPPETS)?;
        let snippet_folders = write_txn.open_table(tables::SNIPPET_FOLDERS)?;

        let mut record = owned_folder(&folders, owner, folder_id)?;
        let folder_ids = read_ids(&user_folders, owner)?;
        if name_in_use(&folders, &folder_ids, name, Some(folder_id))? {
            return Err(AppError::FolderNameTaken);
        }

        record.name = name.to_string();
        let bytes = encode(&record)?;
        folders.insert(folder_id, bytes.as_slice())?;

        let counts = folder_counts(&user_snippets, &snippet_folders, owner)?;
        Folder::from_record(folder_id, &record, counts.get(folder_id).copied().unwrap_or(0))
    };
    write_txn.commit()?;

    Ok(folder)
}

/// Delete a folder and its associations
///
/// Snippets survive; the ones that lost an association are returned so
/// subscribers can be told about their new folder lists.
pub fn delete_folder(db: &Database, owner: &str, folder_id: &str) -> Result<Vec<Snippet>> {
    let write_txn = db.begin_write()?;
    let affected = {
        let mut folders = write_txn.open_table(tables::FOLDERS)?;
        let mut user_folders = write_txn.open_table(tables::USER_FOLDERS)?;
        let user_snippets = write_txn.open_table(tables::USER_SNIPPETS)?;
        let mut snippet_folders = write_txn.open_table(tables::SNIPPET_FOLDERS)?;
        let snippets = write_txn.open_table(tables::SNIPPETS)?;

        owned_folder(&folders, owner, folder_id)?;

        let mut affected = Vec::new();
        for snippet_id in read_ids(&user_snippets, owner)? {
            let mut folder_ids = read_ids(&snippet_folders, &snippet_id)?;
            if !folder_ids.iter().any(|id| id == folder_id) {
                continue;
            }
            folder_ids.retain(|id| id != folder_id);
            if folder_ids.is_empty() {
                snippet_folders.remove(snippet_id.as_str())?;
            } else {
                let bytes = encode(&folder_ids)?;
                snippet_folders.insert(snippet_id.as_str(), bytes.as_slice())?;
            }

            if let Some(record) = read_record::<SnippetRecord, _>(&snippets, &snippet_id)? {
                affected.push(Snippet::from_record(&snippet_id, &record, folder_ids));
            }
        }

        let mut folder_ids = read_ids(&user_folders, owner)?;
        folder_ids.retain(|id| id != folder_id);
        let bytes = encode(&folder_ids)?;
        user_folders.insert(owner, bytes.as_slice())?;

        folders.remove(folder_id)?;
        affected
    };
    write_txn.commit()?;

    tracing::info!(
        "Folder deleted for user {} ({} snippets moved out)",
        owner,
        affected.len()
    );
    Ok(affected)
}
