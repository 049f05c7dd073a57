//! Local-testing verifier: `Authorization: Bearer <subject_id>`.
//!
//! No cryptographic check at all. Config refuses to build this when `APP_ENV=production`.
use crate::services::auth::{AuthError, Identity, TokenVerifier};

#[derive(Debug, Clone, Default)]
pub struct DevTokenVerifier;

impl TokenVerifier for DevTokenVerifier {
    fn mode(&self) -> &'static str {
        "dev"
    }

    fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        Ok(Identity::new(token))
    }
}
