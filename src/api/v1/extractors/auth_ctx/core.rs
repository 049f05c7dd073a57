use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::auth::Identity;

/// Handler で、検証済み Identity を受け取るための extractor
/// middleware が Identity を request.extensions() に insert 済みである前提
/// 見つからない場合は 401 を返す（ミドルウェア未設定）
#[derive(Debug, Clone)]
pub struct AuthCtx(pub Identity);

impl<S> FromRequestParts<S> for AuthCtx
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthCtx)
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))
    }
}
