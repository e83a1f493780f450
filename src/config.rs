use std::env;
use std::str::FromStr;

use crate::constants::MAX_SESSION_TTL_SECS;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_path: String,
    pub allowed_origins: Vec<String>,
    pub environment: String,
    /// Secret used to key stored session token hashes
    pub session_secret: String,
    pub session_ttl_secs: i64,
    /// bcrypt cost factor (4..=31)
    pub password_hash_cost: u32,
    pub guest: Option<GuestAccount>,
    /// Shared secret of the upstream OAuth gateway. OAuth sign-in is off without it.
    pub oauth_shared_secret: Option<String>,
    pub admin_secret_key: Option<String>,
    pub log_requests: bool,
}

/// Credentials of the shared demo account
#[derive(Debug, Clone)]
pub struct GuestAccount {
    pub email: String,
    pub password: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = parse_var("SERVER_PORT", "8080")?;

        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/snipster.db".to_string());

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let session_secret = required_var("SESSION_SECRET")?;
        let session_ttl_secs = check_session_ttl(parse_var("SESSION_TTL_SECS", "604800")?)?;
        let password_hash_cost = check_hash_cost(parse_var("PASSWORD_HASH_COST", "12")?)?;
        let guest = guest_account(optional_var("GUEST_EMAIL"), optional_var("GUEST_PASSWORD"))?;

        let oauth_shared_secret = optional_var("OAUTH_SHARED_SECRET");
        let admin_secret_key = optional_var("ADMIN_SECRET_KEY");
        let log_requests = parse_var("LOG_REQUESTS", "false")?;

        Ok(Config {
            server_host,
            server_port,
            database_path,
            allowed_origins,
            environment,
            session_secret,
            session_ttl_secs,
            password_hash_cost,
            guest,
            oauth_shared_secret,
            admin_secret_key,
            log_requests,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &str, default: &str) -> Result<T, String> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse()
        .map_err(|_| format!("Invalid {}", name))
}

fn required_var(name: &str) -> Result<String, String> {
    optional_var(name).ok_or_else(|| format!("{} must be set", name))
}

/// bcrypt accepts costs 4..=31
fn check_hash_cost(cost: u32) -> Result<u32, String> {
    if (4..=31).contains(&cost) {
        Ok(cost)
    } else {
        Err("PASSWORD_HASH_COST must be between 4 and 31".to_string())
    }
}

fn check_session_ttl(ttl_secs: i64) -> Result<i64, String> {
    if (1..=MAX_SESSION_TTL_SECS).contains(&ttl_secs) {
        Ok(ttl_secs)
    } else {
        Err(format!(
            "SESSION_TTL_SECS must be between 1 and {}",
            MAX_SESSION_TTL_SECS
        ))
    }
}

/// The guest flow needs both halves of the credentials or neither
fn guest_account(
    email: Option<String>,
    password: Option<String>,
) -> Result<Option<GuestAccount>, String> {
    match (email, password) {
        (Some(email), Some(password)) => Ok(Some(GuestAccount { email, password })),
        (None, None) => Ok(None),
        _ => Err("GUEST_EMAIL and GUEST_PASSWORD must be set together".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_uses_default() {
        let port: u16 = parse_var("SNIPSTER_TEST_UNSET_PORT", "8080").unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_parse_var_reports_name() {
        let err = parse_var::<u16>("SNIPSTER_TEST_UNSET_BAD", "not-a-number").unwrap_err();
        assert_eq!(err, "Invalid SNIPSTER_TEST_UNSET_BAD");
    }

    #[test]
    fn test_required_var_missing() {
        let err = required_var("SNIPSTER_TEST_UNSET_SECRET").unwrap_err();
        assert_eq!(err, "SNIPSTER_TEST_UNSET_SECRET must be set");
    }

    #[test]
    fn test_hash_cost_range() {
        assert_eq!(check_hash_cost(4), Ok(4));
        assert_eq!(check_hash_cost(31), Ok(31));
        assert!(check_hash_cost(3).is_err());
        assert!(check_hash_cost(32).is_err());
    }

    #[test]
    fn test_session_ttl_range() {
        assert_eq!(check_session_ttl(604800), Ok(604800));
        assert!(check_session_ttl(0).is_err());
        assert!(check_session_ttl(-5).is_err());
        assert!(check_session_ttl(i64::MAX).is_err());
    }

    #[test]
    fn test_guest_credentials_both_or_neither() {
        assert!(guest_account(None, None).unwrap().is_none());

        let guest = guest_account(Some("g@example.com".into()), Some("pw".into()))
            .unwrap()
            .unwrap();
        assert_eq!(guest.email, "g@example.com");

        assert!(guest_account(Some("g@example.com".into()), None).is_err());
        assert!(guest_account(None, Some("pw".into())).is_err());
    }

    #[test]
    fn test_is_production() {
        let mut config = Config {
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            database_path: "test.db".to_string(),
            allowed_origins: vec![],
            environment: "production".to_string(),
            session_secret: "secret".to_string(),
            session_ttl_secs: 3600,
            password_hash_cost: 4,
            guest: None,
            oauth_shared_secret: None,
            admin_secret_key: None,
            log_requests: false,
        };
        assert!(config.is_production());
        assert_eq!(config.server_address(), "127.0.0.1:8080");

        config.environment = "development".to_string();
        assert!(!config.is_production());
    }
}
