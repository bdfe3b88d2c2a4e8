use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::telegram_user::TelegramUser;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "telegramInitData required"))]
    pub telegram_init_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwaUser {
    pub id: Uuid,
    pub auth_user_id: Uuid,
    pub telegram_id: String,
    pub telegram_username: Option<String>,
    pub is_premium: bool,
    pub access_token: String,
}

impl TwaUser {
    pub fn from_row(row: TelegramUser, access_token: String) -> Self {
        Self {
            id: row.id,
            auth_user_id: row.owner,
            telegram_id: row.telegram_id,
            telegram_username: row.telegram_username,
            is_premium: row.is_premium,
            access_token,
        }
    }
}
