use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::auth_session::{AuthSession, AuthUser};
use crate::models::telegram_user::{NewTelegramUser, TelegramUser};
use crate::services::auth_backend::{AuthBackend, BackendError};

const TELEGRAM_USER_TABLE: &str = "telegram_user";

/// Client for a Shaple/Supabase style backend: GoTrue under `/auth/v1`,
/// PostgREST under `/rest/v1`. Authenticates with the service role key.
#[derive(Clone)]
pub struct ShapleService {
    client: Client,
    base_url: String,
    service_key: String,
    schema: String,
}

impl ShapleService {
    pub fn new(
        base_url: impl Into<String>,
        service_key: impl Into<String>,
        schema: impl Into<String>,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        let schema = schema.into();
        info!("Shaple backend configured at {} (schema {})", base_url, schema);

        Ok(Self {
            client,
            base_url,
            service_key: service_key.into(),
            schema,
        })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }
}

async fn ensure_success(resp: Response) -> Result<Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(BackendError::Api {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Pulls the human readable message out of a GoTrue or PostgREST error body.
fn error_message(body: &str) -> String {
    let parsed: Option<JsonValue> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(JsonValue::as_str))
        })
        .map(str::to_string)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                "empty response body".to_string()
            } else {
                body.trim().to_string()
            }
        })
}

fn single_row(rows: Vec<TelegramUser>) -> Result<TelegramUser, BackendError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| BackendError::UnexpectedResponse("insert returned no rows".to_string()))
}

#[async_trait]
impl AuthBackend for ShapleService {
    async fn find_user_by_telegram_id(
        &self,
        telegram_id: &str,
    ) -> Result<Option<TelegramUser>, BackendError> {
        let filter = format!("eq.{}", telegram_id);
        let resp = self
            .authorized(self.client.get(self.rest_url(TELEGRAM_USER_TABLE)))
            .header("Accept-Profile", &self.schema)
            .query(&[("select", "*"), ("telegram_id", filter.as_str()), ("limit", "1")])
            .send()
            .await?;
        let rows: Vec<TelegramUser> = ensure_success(resp).await?.json().await?;
        debug!(telegram_id, found = !rows.is_empty(), "telegram user lookup");
        Ok(rows.into_iter().next())
    }

    async fn create_auth_user(&self, email: &str, password: &str) -> Result<Uuid, BackendError> {
        let resp = self
            .authorized(self.client.post(self.auth_url("admin/users")))
            .json(&json!({
                "email": email,
                "password": password,
                "email_confirm": true,
            }))
            .send()
            .await?;
        let user: AuthUser = ensure_success(resp).await?.json().await?;
        Ok(user.id)
    }

    async fn insert_profile_row(&self, row: NewTelegramUser) -> Result<TelegramUser, BackendError> {
        let resp = self
            .authorized(self.client.post(self.rest_url(TELEGRAM_USER_TABLE)))
            .header("Content-Profile", &self.schema)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        let rows: Vec<TelegramUser> = ensure_success(resp).await?.json().await?;
        single_row(rows)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let resp = self
            .client
            .post(self.auth_url("token"))
            .header("apikey", &self.service_key)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let session: AuthSession = ensure_success(resp).await?.json().await?;
        Ok(session)
    }
}
