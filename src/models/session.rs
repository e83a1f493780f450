use serde::{Deserialize, Serialize};

/// Session record stored in redb, keyed by the peppered hash of the session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: String,
    pub created_at: i64,
    pub expires_at: i64,
}

impl SessionRecord {
    pub fn new(user_id: String, now: i64, ttl_secs: i64) -> Self {
        Self {
            user_id,
            created_at: now,
            expires_at: now.saturating_add(ttl_secs),
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}
