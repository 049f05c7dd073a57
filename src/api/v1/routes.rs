/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /onboarding は全て Bearer 必須 (middleware::auth::access を route_layer で適用)
 */
use axum::{Router, routing::get};

use crate::api::v1::handlers::onboarding::{get_profile, update_profile};
use crate::middleware;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let protected =
        Router::new().route("/onboarding", get(get_profile).put(update_profile));

    middleware::auth::access::apply(protected, state)
}
