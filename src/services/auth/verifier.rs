use std::fmt;

use thiserror::Error;

use crate::services::auth::Identity;

/// Reasons a request is rejected before reaching any handler.
///
/// Display strings are returned to the caller as the error message.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingHeader,

    #[error("Invalid authorization header format. Expected: Bearer <token>")]
    MalformedHeader,

    #[error("Could not validate credentials: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token payload")]
    InvalidPayload,
}

/// Turns the credential part of `Authorization: Bearer <token>` into an [`Identity`].
///
/// One implementation is chosen at startup from config and shared by all requests.
pub trait TokenVerifier: Send + Sync + fmt::Debug {
    fn mode(&self) -> &'static str;

    fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}
