use async_trait::async_trait;
use uuid::Uuid;

use crate::models::auth_session::AuthSession;
use crate::models::telegram_user::{NewTelegramUser, TelegramUser};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} (status {status})")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// User store and auth service the sign-in flow provisions accounts in.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn find_user_by_telegram_id(
        &self,
        telegram_id: &str,
    ) -> Result<Option<TelegramUser>, BackendError>;

    /// Creates a confirmed auth user and returns its id.
    async fn create_auth_user(&self, email: &str, password: &str) -> Result<Uuid, BackendError>;

    async fn insert_profile_row(&self, row: NewTelegramUser) -> Result<TelegramUser, BackendError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError>;
}
