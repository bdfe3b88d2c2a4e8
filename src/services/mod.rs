pub mod auth_backend;
pub mod shaple_service;
pub mod signin_service;
