//! Session and API token models

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of an API token key in hex characters
pub const API_TOKEN_LENGTH: usize = 40;

/// Session entity for browser and bearer authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (token)
    pub id: String,
    /// Associated user ID
    pub user_id: i64,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Start a new session for `user_id` lasting `days`
    pub fn start(user_id: i64, days: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::days(days),
            created_at: now,
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Long-lived API token, one per user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiToken {
    pub key: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

impl ApiToken {
    /// Generate a fresh 40 hex character key
    pub fn generate_key() -> String {
        let mut key = Uuid::new_v4().simple().to_string();
        key.push_str(&Uuid::new_v4().simple().to_string());
        key.truncate(API_TOKEN_LENGTH);
        key
    }
}
