//! User accounts, their username/email indexes and linked OAuth identities.

use chrono::Utc;
use redb::{Database, ReadableTable, WriteTransaction};
use uuid::Uuid;

use super::{encode, folders, index_key, read_record, read_str, tables};
use crate::constants::{DEFAULT_FOLDER_NAME, GUEST_USERNAME, MAX_USERNAME_ATTEMPTS};
use crate::error::{AppError, Result};
use crate::models::user::{fallback_username, suffixed_username, username_from_login};
use crate::models::{User, UserRecord};

/// Fields of an account about to be created
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub is_guest: bool,
}

/// Identity handed over by the OAuth gateway after a completed sign-in
#[derive(Debug, Clone)]
pub struct OAuthProfile {
    pub provider: String,
    pub provider_user_id: String,
    pub login: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// Create an account and its default Inbox folder in one transaction
///
/// Returns `UsernameTaken` / `EmailTaken` when an index already holds the
/// case-folded key.
pub fn create_user(db: &Database, new_user: NewUser) -> Result<User> {
    let now = Utc::now().timestamp();
    let user_id = Uuid::new_v4().to_string();
    let record = UserRecord {
        username: new_user.username,
        email: new_user.email.trim().to_string(),
        github_username: None,
        avatar_url: None,
        password_hash: new_user.password_hash,
        is_guest: new_user.is_guest,
        created_at: now,
    };

    let write_txn = db.begin_write()?;
    insert_user(&write_txn, &user_id, &record)?;
    write_txn.commit()?;

    tracing::info!("New user registered: {}", record.username);
    Ok(User::from_record(&user_id, &record))
}

/// Insert user + index rows + Inbox folder inside an open write transaction
fn insert_user(write_txn: &WriteTransaction, user_id: &str, record: &UserRecord) -> Result<()> {
    {
        let mut usernames = write_txn.open_table(tables::USERNAMES)?;
        let username_key = index_key(&record.username);
        if usernames.get(username_key.as_str())?.is_some() {
            return Err(AppError::UsernameTaken);
        }

        let mut emails = write_txn.open_table(tables::EMAILS)?;
        let email_key = index_key(&record.email);
        if !email_key.is_empty() {
            if emails.get(email_key.as_str())?.is_some() {
                return Err(AppError::EmailTaken);
            }
            emails.insert(email_key.as_str(), user_id)?;
        }
        usernames.insert(username_key.as_str(), user_id)?;

        let mut users = write_txn.open_table(tables::USERS)?;
        let bytes = encode(record)?;
        users.insert(user_id, bytes.as_slice())?;
    }

    folders::insert_folder(write_txn, user_id, DEFAULT_FOLDER_NAME, record.created_at)?;
    Ok(())
}

/// Load a user profile by id
pub fn get_user(db: &Database, user_id: &str) -> Result<Option<User>> {
    let read_txn = db.begin_read()?;
    let users = read_txn.open_table(tables::USERS)?;
    let record: Option<UserRecord> = read_record(&users, user_id)?;
    Ok(record.map(|r| User::from_record(user_id, &r)))
}

/// Look up an account by username or email
///
/// Identifiers containing `@` are treated as emails.
pub fn find_by_identifier(db: &Database, identifier: &str) -> Result<Option<(String, UserRecord)>> {
    let key = index_key(identifier);
    if key.is_empty() {
        return Ok(None);
    }

    let read_txn = db.begin_read()?;
    let user_id = if key.contains('@') {
        read_str(&read_txn.open_table(tables::EMAILS)?, &key)?
    } else {
        read_str(&read_txn.open_table(tables::USERNAMES)?, &key)?
    };

    let Some(user_id) = user_id else {
        return Ok(None);
    };

    let users = read_txn.open_table(tables::USERS)?;
    let record: Option<UserRecord> = read_record(&users, &user_id)?;
    Ok(record.map(|r| (user_id, r)))
}

/// Check whether a username is free (case-insensitive)
pub fn username_available(db: &Database, username: &str) -> Result<bool> {
    let read_txn = db.begin_read()?;
    let usernames = read_txn.open_table(tables::USERNAMES)?;
    Ok(usernames.get(index_key(username).as_str())?.is_none())
}

/// Replace the stored password hash of an account
pub fn set_password_hash(db: &Database, user_id: &str, password_hash: String) -> Result<()> {
    let write_txn = db.begin_write()?;
    {
        let mut users = write_txn.open_table(tables::USERS)?;
        let mut record: UserRecord =
            read_record(&users, user_id)?.ok_or(AppError::NotFound("User"))?;
        record.password_hash = Some(password_hash);
        let bytes = encode(&record)?;
        users.insert(user_id, bytes.as_slice())?;
    }
    write_txn.commit()?;
    Ok(())
}

/// Pick a free username for an OAuth account
///
/// Tries the sanitized login, then `login_2`, `login_3`, ... and finally an
/// id-derived name.
fn unique_username<Tbl>(usernames: &Tbl, login: &str, user_id: &str) -> Result<String>
where
    Tbl: ReadableTable<&'static str, &'static str>,
{
    let taken = |name: &str| -> Result<bool> {
        Ok(usernames.get(index_key(name).as_str())?.is_some())
    };

    let base = username_from_login(login).unwrap_or_else(|| fallback_username(user_id, 8));
    if !taken(&base)? {
        return Ok(base);
    }

    for attempt in 2..(2 + MAX_USERNAME_ATTEMPTS) {
        let candidate = suffixed_username(&base, attempt);
        if !taken(&candidate)? {
            return Ok(candidate);
        }
        tracing::debug!("Username candidate {} is taken", candidate);
    }

    // "user_" plus up to 15 hex digits still fits the 20 character limit
    for len in 12..=15 {
        let candidate = fallback_username(user_id, len);
        if !taken(&candidate)? {
            return Ok(candidate);
        }
    }

    Err(AppError::UsernameTaken)
}

/// Find or create the account behind an OAuth identity
///
/// Resolution order: linked identity, account with the same email (which gets
/// linked), new account with a derived username and an Inbox folder.
pub fn resolve_oauth_user(db: &Database, profile: &OAuthProfile) -> Result<User> {
    let now = Utc::now().timestamp();
    let write_txn = db.begin_write()?;
    let user = resolve_oauth_in_txn(&write_txn, profile, now)?;
    write_txn.commit()?;
    Ok(user)
}

fn resolve_oauth_in_txn(
    write_txn: &WriteTransaction,
    profile: &OAuthProfile,
    now: i64,
) -> Result<User> {
    let identity_key = format!("{}:{}", profile.provider, profile.provider_user_id);
    let email_key = profile.email.as_deref().map(index_key).unwrap_or_default();
    let github_login = (profile.provider == "github").then(|| profile.login.clone());

    {
        let mut identities = write_txn.open_table(tables::OAUTH_IDENTITIES)?;
        let mut users = write_txn.open_table(tables::USERS)?;

        let mut existing = read_str(&identities, &identity_key)?;
        if existing.is_none() && !email_key.is_empty() {
            let emails = write_txn.open_table(tables::EMAILS)?;
            existing = read_str(&emails, &email_key)?;
        }

        if let Some(user_id) = existing {
            match read_record::<UserRecord, _>(&users, &user_id)? {
                Some(mut record) => {
                    if record.github_username.is_none() {
                        record.github_username = github_login.clone();
                    }
                    if profile.avatar_url.is_some() {
                        record.avatar_url = profile.avatar_url.clone();
                    }
                    let bytes = encode(&record)?;
                    users.insert(user_id.as_str(), bytes.as_slice())?;
                    identities.insert(identity_key.as_str(), user_id.as_str())?;

                    tracing::info!("OAuth sign-in for existing user {}", record.username);
                    return Ok(User::from_record(&user_id, &record));
                }
                None => {
                    tracing::warn!("Dropping OAuth identity that points at a missing user");
                    identities.remove(identity_key.as_str())?;
                }
            }
        }
    }

    let user_id = Uuid::new_v4().to_string();
    let username = {
        let usernames = write_txn.open_table(tables::USERNAMES)?;
        unique_username(&usernames, &profile.login, &user_id)?
    };

    let record = UserRecord {
        username,
        email: profile
            .email
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
        github_username: github_login,
        avatar_url: profile.avatar_url.clone(),
        password_hash: None,
        is_guest: false,
        created_at: now,
    };
    insert_user(write_txn, &user_id, &record)?;

    {
        let mut identities = write_txn.open_table(tables::OAUTH_IDENTITIES)?;
        identities.insert(identity_key.as_str(), user_id.as_str())?;
    }

    tracing::info!("New user registered via {}: {}", profile.provider, record.username);
    Ok(User::from_record(&user_id, &record))
}

/// Make sure the shared demo account exists
///
/// `hash` is only called when a password hash has to be written: on first
/// creation, or when the configured password no longer matches.
pub fn provision_guest<H, V>(db: &Database, email: &str, hash: H, verify: V) -> Result<User>
where
    H: FnOnce() -> Result<String>,
    V: FnOnce(&str) -> bool,
{
    if let Some((user_id, record)) = find_by_identifier(db, email)? {
        if !record.is_guest {
            tracing::error!("Guest email belongs to regular account {}", record.username);
            return Err(AppError::GuestEmailInUse);
        }
        let current = record.password_hash.as_deref().map(verify).unwrap_or(false);
        if !current {
            tracing::info!("Updating guest account password");
            set_password_hash(db, &user_id, hash()?)?;
        }
        return Ok(User::from_record(&user_id, &record));
    }

    let username = if username_available(db, GUEST_USERNAME)? {
        GUEST_USERNAME.to_string()
    } else {
        fallback_username(&Uuid::new_v4().to_string(), 8)
    };

    create_user(
        db,
        NewUser {
            username,
            email: email.to_string(),
            password_hash: Some(hash()?),
            is_guest: true,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_db;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: Some("hash".to_string()),
            is_guest: false,
        }
    }

    fn github(id: &str, login: &str, email: Option<&str>) -> OAuthProfile {
        OAuthProfile {
            provider: "github".to_string(),
            provider_user_id: id.to_string(),
            login: login.to_string(),
            email: email.map(str::to_string),
            avatar_url: Some(format!("https://avatars.example.com/{}", id)),
        }
    }

    #[test]
    fn test_create_user_creates_inbox() {
        let (_dir, db) = temp_db();

        let user = create_user(&db, new_user("alice", "alice@example.com")).unwrap();
        let folders = folders::list_folders(&db, &user.id).unwrap();

        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].name, DEFAULT_FOLDER_NAME);
        assert_eq!(folders[0].snippet_count, 0);
    }

    #[test]
    fn test_create_user_rejects_duplicates_case_insensitively() {
        let (_dir, db) = temp_db();
        create_user(&db, new_user("alice", "alice@example.com")).unwrap();

        assert!(matches!(
            create_user(&db, new_user("ALICE", "other@example.com")),
            Err(AppError::UsernameTaken)
        ));
        assert!(matches!(
            create_user(&db, new_user("alice2", "Alice@Example.com")),
            Err(AppError::EmailTaken)
        ));
    }

    #[test]
    fn test_find_by_identifier() {
        let (_dir, db) = temp_db();
        let user = create_user(&db, new_user("Alice", "alice@example.com")).unwrap();

        let (by_name, _) = find_by_identifier(&db, "alice").unwrap().unwrap();
        let (by_email, _) = find_by_identifier(&db, "ALICE@example.com").unwrap().unwrap();

        assert_eq!(by_name, user.id);
        assert_eq!(by_email, user.id);
        assert!(find_by_identifier(&db, "bob").unwrap().is_none());
        assert!(find_by_identifier(&db, "").unwrap().is_none());
    }

    #[test]
    fn test_oauth_creates_then_reuses_account() {
        let (_dir, db) = temp_db();

        let first = resolve_oauth_user(&db, &github("42", "octocat", None)).unwrap();
        let again = resolve_oauth_user(&db, &github("42", "octocat", None)).unwrap();

        assert_eq!(first.id, again.id);
        assert_eq!(first.username, "octocat");
        assert_eq!(first.github_username.as_deref(), Some("octocat"));
        assert_eq!(folders::list_folders(&db, &first.id).unwrap().len(), 1);
    }

    #[test]
    fn test_oauth_links_existing_email() {
        let (_dir, db) = temp_db();
        let user = create_user(&db, new_user("alice", "alice@example.com")).unwrap();

        let linked =
            resolve_oauth_user(&db, &github("7", "alice-gh", Some("Alice@example.com"))).unwrap();

        assert_eq!(linked.id, user.id);
        assert_eq!(linked.username, "alice");
        assert_eq!(linked.github_username.as_deref(), Some("alice-gh"));
    }

    #[test]
    fn test_oauth_username_collision_retries() {
        let (_dir, db) = temp_db();
        create_user(&db, new_user("octocat", "octo@example.com")).unwrap();
        create_user(&db, new_user("octocat_2", "octo2@example.com")).unwrap();

        let user = resolve_oauth_user(&db, &github("99", "OctoCat", None)).unwrap();

        assert_eq!(user.username, "OctoCat_3");
        assert!(User::validate_username(&user.username));
    }

    #[test]
    fn test_oauth_username_falls_back_to_id() {
        let (_dir, db) = temp_db();
        create_user(&db, new_user("dev", "dev@example.com")).unwrap();
        for attempt in 2..(2 + MAX_USERNAME_ATTEMPTS) {
            let name = suffixed_username("dev", attempt);
            create_user(&db, new_user(&name, &format!("{}@example.com", name))).unwrap();
        }

        let user = resolve_oauth_user(&db, &github("5", "dev", None)).unwrap();

        assert!(user.username.starts_with("user_"));
        assert_eq!(user.username, fallback_username(&user.id, 12));
    }

    #[test]
    fn test_provision_guest_is_idempotent() {
        let (_dir, db) = temp_db();

        let first = provision_guest(
            &db,
            "guest@example.com",
            || Ok("hash-1".to_string()),
            |_| false,
        )
        .unwrap();
        let second = provision_guest(
            &db,
            "guest@example.com",
            || panic!("password still matches"),
            |stored| stored == "hash-1",
        )
        .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.username, GUEST_USERNAME);
        assert!(first.is_guest);
    }

    #[test]
    fn test_provision_guest_refuses_regular_account() {
        let (_dir, db) = temp_db();
        create_user(&db, new_user("alice", "demo@example.com")).unwrap();

        let result = provision_guest(
            &db,
            "DEMO@example.com",
            || panic!("a regular account's password must not be rewritten"),
            |_| false,
        );
        assert!(matches!(result, Err(AppError::GuestEmailInUse)));

        let (_, record) = find_by_identifier(&db, "alice").unwrap().unwrap();
        assert_eq!(record.password_hash.as_deref(), Some("hash"));
        assert!(!record.is_guest);
    }
}
