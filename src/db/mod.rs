pub mod folders;
pub mod sessions;
pub mod snippets;
pub mod tables;
pub mod users;

use redb::{Database, Error as RedbError, ReadableTable};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;

/// Database handle type (Arc-wrapped for sharing across handlers)
pub type Db = Arc<Database>;

const BINCODE_CONFIG: bincode::config::Configuration = bincode::config::standard();

/// Open or create the redb database at the given path
///
/// Creates all required tables on first run.
#[allow(clippy::result_large_err)]
pub fn open_database(path: impl AsRef<Path>) -> std::result::Result<Db, RedbError> {
    tracing::info!("Opening database at: {:?}", path.as_ref());

    // Create parent directory if it doesn't exist
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                tracing::error!("Failed to create database directory: {}", e);
                RedbError::Io(e)
            })?;
        }
    }

    let db = Database::create(path)?;
    init_tables(&db)?;

    tracing::info!("Database initialized successfully");

    Ok(Arc::new(db))
}

/// Create every table so read transactions never hit a missing one
#[allow(clippy::result_large_err)]
pub fn init_tables(db: &Database) -> std::result::Result<(), RedbError> {
    let write_txn = db.begin_write()?;
    {
        let _ = write_txn.open_table(tables::USERS)?;
        let _ = write_txn.open_table(tables::USERNAMES)?;
        let _ = write_txn.open_table(tables::EMAILS)?;
        let _ = write_txn.open_table(tables::OAUTH_IDENTITIES)?;
        let _ = write_txn.open_table(tables::SESSIONS)?;
        let _ = write_txn.open_table(tables::SNIPPETS)?;
        let _ = write_txn.open_table(tables::USER_SNIPPETS)?;
        let _ = write_txn.open_table(tables::FOLDERS)?;
        let _ = write_txn.open_table(tables::USER_FOLDERS)?;
        let _ = write_txn.open_table(tables::SNIPPET_FOLDERS)?;
        let _ = write_txn.open_table(tables::SHARES)?;
    }
    write_txn.commit()?;
    Ok(())
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serde::encode_to_vec(value, BINCODE_CONFIG)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let (value, _) = bincode::serde::decode_from_slice(bytes, BINCODE_CONFIG)?;
    Ok(value)
}

/// Read and decode a serialized record
pub(crate) fn read_record<T, Tbl>(table: &Tbl, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(guard) => Ok(Some(decode(guard.value())?)),
        None => Ok(None),
    }
}

/// Read an id list (user index or association row), empty when absent
pub(crate) fn read_ids<Tbl>(table: &Tbl, key: &str) -> Result<Vec<String>>
where
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    Ok(read_record(table, key)?.unwrap_or_default())
}

/// Read a plain string value (index tables)
pub(crate) fn read_str<Tbl>(table: &Tbl, key: &str) -> Result<Option<String>>
where
    Tbl: ReadableTable<&'static str, &'static str>,
{
    Ok(table.get(key)?.map(|guard| guard.value().to_string()))
}

/// Lowercased, trimmed form used as the key of case-insensitive indexes
pub fn index_key(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    /// Fresh database in a temporary directory; keep the TempDir alive
    pub fn temp_db() -> (TempDir, Db) {
        let dir = TempDir::new().unwrap();
        let db = open_database(dir.path().join("test.db")).unwrap();
        (dir, db)
    }
}
