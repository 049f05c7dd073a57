//! `Authorization` header → [`Identity`].
use crate::services::auth::{AuthError, Identity, TokenVerifier};

/// Parse `Bearer <token>` and hand the token to the configured verifier.
///
/// The header must be exactly two whitespace-separated parts, the first one
/// case-insensitively equal to `Bearer`.
pub fn authenticate(
    header_value: Option<&str>,
    verifier: &dyn TokenVerifier,
) -> Result<Identity, AuthError> {
    let header_value = header_value
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingHeader)?;

    let mut parts = header_value.split_whitespace();
    let token = match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => token,
        _ => return Err(AuthError::MalformedHeader),
    };

    verifier.verify(token)
}
