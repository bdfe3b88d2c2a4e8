use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use validator::Validate;

use crate::dto::signin_dto::{SignInRequest, TwaUser};
use crate::{error::Error, error::Result, AppState};

pub async fn sign_in(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<TwaUser>> {
    // An absent, null or unparseable body is treated like a missing field.
    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!("Rejected sign-in body: {}", rejection.body_text());
        Error::BadRequest("telegramInitData required".to_string())
    })?;
    payload
        .validate()
        .map_err(|_| Error::BadRequest("telegramInitData required".to_string()))?;

    let user = state
        .sign_in_service
        .sign_in(&payload.telegram_init_data)
        .await
        .map_err(|e| {
            tracing::warn!("Sign-in rejected: {}", e);
            e
        })?;

    tracing::info!("Signed in telegram_id: {}", user.telegram_id);
    Ok(Json(user))
}
