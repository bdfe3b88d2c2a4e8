use std::sync::Arc;

use tracing::{error, info};

use crate::dto::signin_dto::TwaUser;
use crate::error::{Error, Result};
use crate::models::telegram_user::NewTelegramUser;
use crate::services::auth_backend::AuthBackend;
use crate::utils::telegram_auth::{verify_init_data, InitDataConfig};

/// Turns verified init data into a signed-in backend user, creating the
/// account on first sight of a Telegram id.
#[derive(Clone)]
pub struct SignInService {
    backend: Arc<dyn AuthBackend>,
    init_data: InitDataConfig,
    password_prefix: String,
}

impl SignInService {
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        init_data: InitDataConfig,
        password_prefix: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            init_data,
            password_prefix: password_prefix.into(),
        }
    }

    pub async fn sign_in(&self, telegram_init_data: &str) -> Result<TwaUser> {
        let validated = verify_init_data(telegram_init_data, &self.init_data)?;

        let telegram_id = validated
            .user
            .id
            .as_ref()
            .map(ToString::to_string)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::BadRequest("Invalid user data".to_string()))?;
        let telegram_username = validated.user.username.clone().unwrap_or_default();

        let email = telegram_email(&telegram_id);
        let password = telegram_password(&self.password_prefix, &telegram_id);

        let twa_user = match self.backend.find_user_by_telegram_id(&telegram_id).await? {
            Some(existing) => existing,
            None => {
                info!("Provisioning new user for telegram_id: {}", telegram_id);
                let owner = self
                    .backend
                    .create_auth_user(&email, &password)
                    .await
                    .map_err(|e| {
                        error!(error = %e, "Failed to create auth user");
                        Error::Internal("Failed to create auth user".to_string())
                    })?;

                self.backend
                    .insert_profile_row(NewTelegramUser {
                        telegram_id: telegram_id.clone(),
                        owner,
                        telegram_username,
                    })
                    .await
                    .map_err(|e| {
                        error!(error = %e, "Failed to insert telegram user row");
                        Error::Internal("Failed to create telegram user".to_string())
                    })?
            }
        };

        let session = self
            .backend
            .sign_in_with_password(&email, &password)
            .await
            .map_err(|e| {
                error!(error = %e, "Password sign-in failed for telegram_id: {}", telegram_id);
                e
            })?;

        Ok(TwaUser::from_row(twa_user, session.access_token))
    }
}

pub fn telegram_email(telegram_id: &str) -> String {
    format!("{}@twa-user.com", telegram_id)
}

pub fn telegram_password(prefix: &str, telegram_id: &str) -> String {
    format!("{}_{}__", prefix, telegram_id)
}
