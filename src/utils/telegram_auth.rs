//! Telegram Mini-App init data signing and verification.
//!
//! Init data arrives as a form-urlencoded query string. Its `hash` field is
//! `HMAC-SHA256(key = HMAC-SHA256("WebAppData", bot_token), msg = check_string)`
//! in lowercase hex, where the check string is every other `key=value` pair
//! sorted by key and joined with `\n`.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::utils::time::unix_now;

type HmacSha256 = Hmac<Sha256>;

/// Decoded init data fields. A `BTreeMap` iterates in byte order of its keys,
/// which is the order the check string requires.
pub type FieldMap = BTreeMap<String, String>;

pub const DEFAULT_MAX_AGE_SECONDS: i64 = 3 * 60 * 60;
pub const VALIDATION_SUCCESSFUL: &str = "Validation successful";

const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";
const HASH_FIELD: &str = "hash";
const AUTH_DATE_FIELD: &str = "auth_date";
const USER_FIELD: &str = "user";

#[derive(Debug, Clone)]
pub struct InitDataConfig {
    pub bot_token: String,
    /// Maximum accepted age of `auth_date`. Zero or negative disables the check.
    pub max_age_seconds: i64,
}

impl InitDataConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            max_age_seconds: DEFAULT_MAX_AGE_SECONDS,
        }
    }

    pub fn with_max_age(mut self, max_age_seconds: i64) -> Self {
        self.max_age_seconds = max_age_seconds;
        self
    }
}

/// Telegram user id. Clients send a number, hand-built fixtures often a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Numeric(id) => write!(f, "{}", id),
            UserId::Text(id) => f.write_str(id),
        }
    }
}

/// The JSON object carried in the `user` field. Untrusted until the hash matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebAppUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_bot: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allows_write_to_pm: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_to_attachment_menu: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitDataErrorKind {
    Config,
    MalformedInput,
    Stale,
    AuthenticityFailure,
    MissingUser,
    MalformedUser,
}

#[derive(Debug, thiserror::Error)]
pub enum InitDataError {
    #[error("BOT_TOKEN is not set")]
    MissingBotToken,

    #[error("Hash is missing from initData")]
    MissingHash,

    #[error("Field `{0}` appears more than once in initData")]
    DuplicateField(String),

    #[error("auth_date is missing from initData")]
    MissingAuthDate,

    #[error("auth_date `{0}` is not a valid Unix timestamp")]
    InvalidAuthDate(String),

    #[error("Telegram data is older than {}", describe_window(.max_age))]
    Stale { age: i64, max_age: i64 },

    #[error("Hash validation failed")]
    HashMismatch,

    #[error("User data is missing")]
    MissingUser,

    #[error("Error parsing user data: {0}")]
    MalformedUser(#[source] serde_json::Error),
}

impl InitDataError {
    pub fn kind(&self) -> InitDataErrorKind {
        match self {
            InitDataError::MissingBotToken => InitDataErrorKind::Config,
            InitDataError::MissingHash
            | InitDataError::DuplicateField(_)
            | InitDataError::MissingAuthDate
            | InitDataError::InvalidAuthDate(_) => InitDataErrorKind::MalformedInput,
            InitDataError::Stale { .. } => InitDataErrorKind::Stale,
            InitDataError::HashMismatch => InitDataErrorKind::AuthenticityFailure,
            InitDataError::MissingUser => InitDataErrorKind::MissingUser,
            InitDataError::MalformedUser(_) => InitDataErrorKind::MalformedUser,
        }
    }
}

/// Init data whose hash matched and whose `user` field decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInitData {
    /// Every signed field, `hash` excluded.
    pub fields: FieldMap,
    pub user: WebAppUser,
    pub auth_date: i64,
}

impl ValidatedInitData {
    pub fn status(&self) -> &'static str {
        VALIDATION_SUCCESSFUL
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn query_id(&self) -> Option<&str> {
        self.get("query_id")
    }

    pub fn start_param(&self) -> Option<&str> {
        self.get("start_param")
    }

    pub fn chat_type(&self) -> Option<&str> {
        self.get("chat_type")
    }

    pub fn chat_instance(&self) -> Option<&str> {
        self.get("chat_instance")
    }

    pub fn auth_date_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.auth_date, 0)
    }
}

pub fn verify_init_data(
    init_data: &str,
    config: &InitDataConfig,
) -> Result<ValidatedInitData, InitDataError> {
    verify_init_data_at(init_data, config, unix_now())
}

/// Same as [`verify_init_data`] with the current time supplied by the caller.
pub fn verify_init_data_at(
    init_data: &str,
    config: &InitDataConfig,
    now: i64,
) -> Result<ValidatedInitData, InitDataError> {
    if config.bot_token.is_empty() {
        return Err(InitDataError::MissingBotToken);
    }

    let mut fields = parse_fields(init_data)?;
    let hash = match fields.remove(HASH_FIELD) {
        Some(hash) if !hash.is_empty() => hash,
        _ => return Err(InitDataError::MissingHash),
    };

    let auth_date = parse_auth_date(&fields)?;
    let age = now.saturating_sub(auth_date);
    if config.max_age_seconds > 0 && age > config.max_age_seconds {
        tracing::debug!(age, max_age = config.max_age_seconds, "rejecting stale init data");
        return Err(InitDataError::Stale {
            age,
            max_age: config.max_age_seconds,
        });
    }

    let calculated_hash = calculate_hash(&config.bot_token, &fields);
    if !bool::from(calculated_hash.as_bytes().ct_eq(hash.as_bytes())) {
        tracing::debug!("init data hash mismatch");
        return Err(InitDataError::HashMismatch);
    }

    let user = match fields.get(USER_FIELD) {
        Some(raw_user) if !raw_user.is_empty() => {
            serde_json::from_str::<WebAppUser>(raw_user).map_err(|e| {
                tracing::debug!(error = %e, "failed to decode init data user");
                InitDataError::MalformedUser(e)
            })?
        }
        _ => return Err(InitDataError::MissingUser),
    };

    Ok(ValidatedInitData {
        fields,
        user,
        auth_date,
    })
}

/// Validates with the default three hour window when `expire_in_seconds` is `None`.
pub fn validate_telegram_init_data(
    init_data: &str,
    bot_token: &str,
    expire_in_seconds: Option<i64>,
) -> Result<ValidatedInitData, InitDataError> {
    let config = InitDataConfig::new(bot_token)
        .with_max_age(expire_in_seconds.unwrap_or(DEFAULT_MAX_AGE_SECONDS));
    verify_init_data(init_data, &config)
}

pub fn create_telegram_init_data(bot_token: &str, data: &FieldMap) -> Result<String, InitDataError> {
    create_telegram_init_data_at(bot_token, data, unix_now())
}

/// Signs `data` and returns it as a query string with `hash` appended.
/// `auth_date` is filled in with `now` when absent. The caller's map is not modified.
pub fn create_telegram_init_data_at(
    bot_token: &str,
    data: &FieldMap,
    now: i64,
) -> Result<String, InitDataError> {
    if bot_token.is_empty() {
        return Err(InitDataError::MissingBotToken);
    }

    let mut fields = data.clone();
    fields.remove(HASH_FIELD);
    if fields.get(AUTH_DATE_FIELD).map_or(true, |v| v.is_empty()) {
        fields.insert(AUTH_DATE_FIELD.to_string(), now.to_string());
    }

    let hash = calculate_hash(bot_token, &fields);

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in &fields {
        serializer.append_pair(key, value);
    }
    serializer.append_pair(HASH_FIELD, &hash);
    Ok(serializer.finish())
}

pub fn data_check_string(fields: &FieldMap) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}

fn calculate_hash(bot_token: &str, fields: &FieldMap) -> String {
    let secret_key = hmac_sha256(WEB_APP_DATA_KEY, bot_token.as_bytes());
    hex::encode(hmac_sha256(&secret_key, data_check_string(fields).as_bytes()))
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Vec<u8> {
    // HMAC hashes or pads keys of any length, so keying cannot fail.
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC-SHA256 accepts keys of any length");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Renders a freshness window the way the rejection message reads: whole
/// hours as hours, anything else in seconds.
fn describe_window(max_age: &i64) -> String {
    match *max_age {
        3600 => "1 hour".to_string(),
        secs if secs > 0 && secs % 3600 == 0 => format!("{} hours", secs / 3600),
        secs => format!("{} seconds", secs),
    }
}

fn parse_fields(init_data: &str) -> Result<FieldMap, InitDataError> {
    let mut fields = FieldMap::new();
    for (key, value) in url::form_urlencoded::parse(init_data.as_bytes()) {
        match fields.entry(key.into_owned()) {
            Entry::Occupied(entry) => return Err(InitDataError::DuplicateField(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(value.into_owned());
            }
        }
    }
    Ok(fields)
}

fn parse_auth_date(fields: &FieldMap) -> Result<i64, InitDataError> {
    match fields.get(AUTH_DATE_FIELD) {
        Some(raw) if !raw.is_empty() => raw
            .parse::<i64>()
            .map_err(|_| InitDataError::InvalidAuthDate(raw.clone())),
        _ => Err(InitDataError::MissingAuthDate),
    }
}
