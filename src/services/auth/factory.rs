/// Factory: build the request token verifier from application `Config`.
use std::sync::Arc;

use crate::config::{AuthMode, Config};
use crate::services::auth::{TokenVerifier, dev::DevTokenVerifier, jwt::JwtVerifier};

pub fn build_token_verifier(config: &Config) -> Arc<dyn TokenVerifier> {
    match &config.auth {
        AuthMode::Dev => {
            tracing::warn!("AUTH_DEV_MODE is on: bearer tokens are NOT verified");
            Arc::new(DevTokenVerifier)
        }
        AuthMode::Jwt {
            secret,
            algorithm,
            audience,
            leeway_seconds,
        } => Arc::new(JwtVerifier::new(
            secret,
            *algorithm,
            audience.as_deref(),
            *leeway_seconds,
        )),
    }
}
