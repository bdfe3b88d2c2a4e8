use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A row of the `telegram_user` table linking a Telegram account to its auth user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: Uuid,
    pub owner: Uuid,
    pub telegram_id: String,
    pub telegram_username: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTelegramUser {
    pub telegram_id: String,
    pub owner: Uuid,
    pub telegram_username: String,
}
