/*
 * Responsibility
 * - /v1/onboarding の GET / PUT handler
 * - 対象は常に AuthCtx の subject_id (path/body から id は受け取らない)
 * - Datastore の row を ProfileResponse に形式チェックして返す
 * - body の不備 (JSON 構文 / 型 / email 形式) はすべて 422
 */
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::{
    api::v1::{
        dto::onboarding::{ProfileResponse, UpdateProfileRequest},
        extractors::AuthCtx,
    },
    error::AppError,
    repos::ProfileRow,
    state::AppState,
};

fn row_to_response(row: ProfileRow, context: &str) -> Result<ProfileResponse, AppError> {
    ProfileResponse::try_from(row)
        .map_err(|e| AppError::internal(format!("{context}: invalid profile row: {e}")))
}

pub async fn get_profile(
    State(state): State<AppState>,
    AuthCtx(identity): AuthCtx,
) -> Result<Json<ProfileResponse>, AppError> {
    let row = state.profiles.get(&identity).await?;

    Ok(Json(row_to_response(row, "Error fetching profile")?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthCtx(identity): AuthCtx,
    body: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<ProfileResponse>, AppError> {
    let Json(req) = body.map_err(|e| AppError::unprocessable("INVALID_BODY", e.body_text()))?;
    req.validate()
        .map_err(|msg| AppError::unprocessable("INVALID_BODY", msg))?;

    let row = state.profiles.upsert(&identity, req.into_changes()).await?;

    Ok(Json(row_to_response(row, "Error updating profile")?))
}
