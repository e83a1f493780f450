/// Name of the session cookie set on sign-in
pub const SESSION_COOKIE_NAME: &str = "snipster-auth-token";

/// Folder every new account starts with
pub const DEFAULT_FOLDER_NAME: &str = "Inbox";

/// Username of the shared demo account
pub const GUEST_USERNAME: &str = "Guest";

// =============================================================================
// Validation Limits
// =============================================================================

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 20;

pub const PASSWORD_MIN_LEN: usize = 6;

pub const EMAIL_MAX_LEN: usize = 254;

pub const TITLE_MAX_CHARS: usize = 100;

pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Maximum snippet content size in bytes (100KB)
pub const MAX_CONTENT_BYTES: usize = 102_400;

pub const MAX_TAGS: usize = 10;
pub const TAG_MAX_CHARS: usize = 30;

pub const FOLDER_NAME_MAX_CHARS: usize = 50;

/// Attempts at a suffixed username before falling back to an id-derived one
pub const MAX_USERNAME_ATTEMPTS: u32 = 10;

/// Maximum age of a signed OAuth assertion in seconds (5 minutes)
pub const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Longest accepted SESSION_TTL_SECS (one year)
pub const MAX_SESSION_TTL_SECS: i64 = 365 * 24 * 3600;

/// Interval between expired-session sweeps
pub const SESSION_PURGE_INTERVAL_SECS: u64 = 3600;

/// Capacity of the change feed broadcast channel
pub const CHANGE_FEED_CAPACITY: usize = 256;

// =============================================================================
// Error Messages
// =============================================================================

pub const ERR_INVALID_USERNAME: &str = "Username must be between 3 and 20 characters and can only contain letters, numbers, and underscores.";

pub const ERR_PASSWORDS_DO_NOT_MATCH: &str = "Passwords do not match.";

pub const ERR_PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters";

pub const ERR_INVALID_EMAIL: &str = "Invalid email address";

pub const ERR_INVALID_TIMESTAMP: &str = "Timestamp too old or in the future";
