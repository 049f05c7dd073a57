/*
 * Responsibility
 * - tracing / panic hook の初期化
 * - Config読み込み → 依存生成 (TokenVerifier, ProfileStore) → Router 組み立て
 * - Middleware の適用 (auth / security headers / CORS / request-id, trace, limit, timeout)
 * - axum::serve() で起動
 */
use std::{panic, process};

use anyhow::Result;
use axum::{Router, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::{self, v1::handlers::health};
use crate::config::Config;
use crate::middleware;
use crate::repos::build_profile_store;
use crate::services::{auth::build_token_verifier, profile::ProfileService};
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,onboarding_profile=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // In development, fail fast so we notice immediately.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting onboarding API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState> {
    // Process-level services are built once here and injected through the state.
    let verifier = build_token_verifier(config);
    tracing::info!(mode = verifier.mode(), "bearer verification configured");

    let store = build_profile_store(config).await?;

    Ok(AppState::new(verifier, ProfileService::new(store)))
}

fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .nest("/v1", api::v1::routes(state.clone()))
        .with_state(state);

    let router = middleware::security_headers::apply(router, config);
    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router, &config.http)
}
