use serde::{Deserialize, Serialize};

use crate::constants::{EMAIL_MAX_LEN, USERNAME_MAX_LEN, USERNAME_MIN_LEN};
use crate::routes::timestamp_to_rfc3339;

/// User record stored in redb
/// Uses Unix timestamp for compact storage with bincode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Display spelling; uniqueness is checked case-insensitively
    pub username: String,
    pub email: String,
    pub github_username: Option<String>,
    pub avatar_url: Option<String>,
    /// bcrypt hash, absent for accounts created through OAuth
    pub password_hash: Option<String>,
    pub is_guest: bool,
    pub created_at: i64,
}

/// User model for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub github_username: Option<String>,
    pub avatar_url: Option<String>,
    pub is_guest: bool,
    pub created_at: String,
}

impl User {
    pub fn from_record(id: &str, record: &UserRecord) -> Self {
        Self {
            id: id.to_string(),
            username: record.username.clone(),
            email: record.email.clone(),
            github_username: record.github_username.clone(),
            avatar_url: record.avatar_url.clone(),
            is_guest: record.is_guest,
            created_at: timestamp_to_rfc3339(record.created_at),
        }
    }

    /// Validate a username against `^[a-zA-Z0-9_]{3,20}$`
    pub fn validate_username(username: &str) -> bool {
        (USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&username.len())
            && username
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    /// Basic shape check: `local@domain.tld`, no whitespace
    pub fn validate_email(email: &str) -> bool {
        if email.is_empty() || email.len() > EMAIL_MAX_LEN || email.chars().any(char::is_whitespace)
        {
            return false;
        }

        match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
            }
            None => false,
        }
    }
}

/// Turn an OAuth login into a valid username, if anything usable is left
///
/// Disallowed characters become `_`, the result is cut to the maximum length
/// and padded with `_` up to the minimum.
pub fn username_from_login(login: &str) -> Option<String> {
    let login = login.trim();
    if login.is_empty() {
        return None;
    }

    let mut name: String = login
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .take(USERNAME_MAX_LEN)
        .collect();

    while name.len() < USERNAME_MIN_LEN {
        name.push('_');
    }

    Some(name)
}

/// `base` with a numeric suffix, trimmed so the whole name still fits
pub fn suffixed_username(base: &str, attempt: u32) -> String {
    let suffix = format!("_{}", attempt);
    let keep = USERNAME_MAX_LEN.saturating_sub(suffix.len());
    let prefix: String = base.chars().take(keep).collect();
    format!("{}{}", prefix, suffix)
}

/// `user_` followed by the first `len` hex digits of the user id
pub fn fallback_username(user_id: &str, len: usize) -> String {
    let digits: String = user_id.chars().filter(|c| *c != '-').take(len).collect();
    format!("user_{}", digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(User::validate_username("abc"));
        assert!(User::validate_username("Snippet_Fan_2024"));
        assert!(User::validate_username(&"a".repeat(20)));

        // Too short / too long
        assert!(!User::validate_username("ab"));
        assert!(!User::validate_username(&"a".repeat(21)));

        // Invalid characters
        assert!(!User::validate_username("bad-name"));
        assert!(!User::validate_username("has space"));
        assert!(!User::validate_username("émile"));
    }

    #[test]
    fn test_validate_email() {
        assert!(User::validate_email("dev@example.com"));
        assert!(User::validate_email("a.b+c@sub.example.org"));

        assert!(!User::validate_email(""));
        assert!(!User::validate_email("no-at-sign.com"));
        assert!(!User::validate_email("@example.com"));
        assert!(!User::validate_email("dev@localhost"));
        assert!(!User::validate_email("dev@ex ample.com"));
        assert!(!User::validate_email("a@b@c.com"));
    }

    #[test]
    fn test_username_from_login() {
        assert_eq!(username_from_login("octocat").as_deref(), Some("octocat"));
        assert_eq!(username_from_login("the-dev").as_deref(), Some("the_dev"));
        assert_eq!(username_from_login("ab").as_deref(), Some("ab_"));
        assert_eq!(
            username_from_login("a-very-long-github-login-name").as_deref(),
            Some("a_very_long_github_l")
        );
        assert_eq!(username_from_login("   "), None);

        let derived = username_from_login("x").unwrap();
        assert!(User::validate_username(&derived));
    }

    #[test]
    fn test_suffixed_username_stays_valid() {
        assert_eq!(suffixed_username("octocat", 2), "octocat_2");

        let long = "a".repeat(20);
        let name = suffixed_username(&long, 10);
        assert_eq!(name.len(), 20);
        assert!(name.ends_with("_10"));
        assert!(User::validate_username(&name));
    }

    #[test]
    fn test_fallback_username() {
        let id = "3f2b8c1d-9e4a-4b7c-8d2e-1f0a9b8c7d6e";
        assert_eq!(fallback_username(id, 8), "user_3f2b8c1d");
        assert_eq!(fallback_username(id, 12), "user_3f2b8c1d9e4a");
        assert!(User::validate_username(&fallback_username(id, 12)));
    }

    #[test]
    fn test_user_record_serialization() {
        let record = UserRecord {
            username: "octocat".to_string(),
            email: "octo@example.com".to_string(),
            github_username: Some("octocat".to_string()),
            avatar_url: None,
            password_hash: None,
            is_guest: false,
            created_at: 1733788800,
        };

        let bytes = crate::db::encode(&record).unwrap();
        let deserialized: UserRecord = crate::db::decode(&bytes).unwrap();

        assert_eq!(record.username, deserialized.username);
        assert_eq!(record.created_at, deserialized.created_at);
    }
}
