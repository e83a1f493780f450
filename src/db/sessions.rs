use chrono::Utc;
use redb::{Database, ReadableTable, ReadableTableMetadata};

use super::{decode, encode, read_record, tables};
use crate::error::Result;
use crate::models::SessionRecord;

/// Store a session under the hashed token
pub fn create_session(
    db: &Database,
    token_hash: &str,
    user_id: &str,
    ttl_secs: i64,
) -> Result<SessionRecord> {
    let record = SessionRecord::new(user_id.to_string(), Utc::now().timestamp(), ttl_secs);

    let write_txn = db.begin_write()?;
    {
        let mut sessions = write_txn.open_table(tables::SESSIONS)?;
        let bytes = encode(&record)?;
        sessions.insert(token_hash, bytes.as_slice())?;
    }
    write_txn.commit()?;

    Ok(record)
}

/// Look up a live session; expired ones read as absent
pub fn find_session(db: &Database, token_hash: &str) -> Result<Option<SessionRecord>> {
    let read_txn = db.begin_read()?;
    let sessions = read_txn.open_table(tables::SESSIONS)?;
    let record: Option<SessionRecord> = read_record(&sessions, token_hash)?;
    let now = Utc::now().timestamp();
    Ok(record.filter(|session| !session.is_expired(now)))
}

/// Remove a session; unknown hashes are ignored
pub fn delete_session(db: &Database, token_hash: &str) -> Result<()> {
    let write_txn = db.begin_write()?;
    {
        let mut sessions = write_txn.open_table(tables::SESSIONS)?;
        sessions.remove(token_hash)?;
    }
    write_txn.commit()?;
    Ok(())
}

/// Delete every session that expired before `now`, returning how many went
pub fn purge_expired(db: &Database, now: i64) -> Result<usize> {
    let write_txn = db.begin_write()?;
    let purged = {
        let mut sessions = write_txn.open_table(tables::SESSIONS)?;

        let mut expired = Vec::new();
        for entry in sessions.iter()? {
            let (key, value) = entry?;
            let record: SessionRecord = decode(value.value())?;
            if record.is_expired(now) {
                expired.push(key.value().to_string());
            }
        }

        for key in &expired {
            sessions.remove(key.as_str())?;
        }
        expired.len()
    };
    write_txn.commit()?;

    Ok(purged)
}

/// Number of stored sessions, live or not
pub fn count_sessions(db: &Database) -> Result<u64> {
    let read_txn = db.begin_read()?;
    let sessions = read_txn.open_table(tables::SESSIONS)?;
    Ok(sessions.len()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_db;

    #[test]
    fn test_session_lifecycle() {
        let (_dir, db) = temp_db();

        create_session(&db, "hash-a", "user-1", 3600).unwrap();
        let found = find_session(&db, "hash-a").unwrap().unwrap();
        assert_eq!(found.user_id, "user-1");

        delete_session(&db, "hash-a").unwrap();
        assert!(find_session(&db, "hash-a").unwrap().is_none());

        // Deleting again is harmless
        delete_session(&db, "hash-a").unwrap();
    }

    #[test]
    fn test_expired_session_is_hidden_and_purged() {
        let (_dir, db) = temp_db();

        create_session(&db, "stale", "user-1", -10).unwrap();
        create_session(&db, "fresh", "user-2", 3600).unwrap();

        assert!(find_session(&db, "stale").unwrap().is_none());

        let purged = purge_expired(&db, Utc::now().timestamp()).unwrap();
        assert_eq!(purged, 1);
        assert_eq!(count_sessions(&db).unwrap(), 1);
        assert!(find_session(&db, "fresh").unwrap().is_some());
    }
}
