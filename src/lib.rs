pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::services::{
    auth_backend::AuthBackend, shaple_service::ShapleService, signin_service::SignInService,
};

#[derive(Clone)]
pub struct AppState {
    pub sign_in_service: SignInService,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let backend = ShapleService::new(
            config.shaple_url.clone(),
            config.shaple_service_key.clone(),
            config.twa_schema.clone(),
        )?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    pub fn with_backend(config: &Config, backend: Arc<dyn AuthBackend>) -> Self {
        let sign_in_service = SignInService::new(
            backend,
            config.init_data_config(),
            config.password_prefix.clone(),
        );
        Self { sign_in_service }
    }
}
