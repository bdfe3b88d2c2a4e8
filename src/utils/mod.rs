pub mod telegram_auth;
pub mod time;
