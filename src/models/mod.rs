pub mod auth_session;
pub mod telegram_user;
