//! Bearer 検証 → Identity を extensions に入れる
//!
//! - `Authorization: Bearer <token>` を取り出し、起動時に選ばれた TokenVerifier で検証する
//! - 失敗時は 401 + `WWW-Authenticate: Bearer` (AppError 側で付与)
//! - handler は `AuthCtx` extractor で Identity を受け取る

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::services::auth::{self, AuthError};
use crate::state::AppState;

/// `/v1/*` に認証を掛けるための middleware を適用する。
///
/// 例：
/// ```ignore
/// let v1 = api::v1::routes(state.clone());
/// app = app.nest("/v1", v1);
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.route_layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let header_value = match req.headers().get(header::AUTHORIZATION) {
        None => None,
        Some(v) => Some(v.to_str().map_err(|_| AuthError::MalformedHeader)?),
    };

    let identity = match auth::authenticate(header_value, state.verifier.as_ref()) {
        Ok(identity) => identity,
        Err(err) => {
            tracing::warn!(
                error = %err,
                mode = state.verifier.mode(),
                "bearer authentication failed"
            );
            return Err(err.into());
        }
    };

    tracing::debug!(subject_id = %identity.subject_id, role = %identity.role, "authenticated");

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
