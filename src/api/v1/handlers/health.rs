/*
 * Responsibility
 * - GET /health (疎通用, 認証なし)
 * - GET / (サービス情報)
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub const SERVICE_NAME: &str = "onboarding-stack";

pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({"status": "healthy", "service": SERVICE_NAME})),
    )
}

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "service": "Onboarding Profile Stack",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "onboarding": "/v1/onboarding",
        },
    }))
}
