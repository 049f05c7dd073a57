use std::collections::HashSet;

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::services::auth::{AuthError, Identity, TokenVerifier};

/// Claims this service reads from a bearer JWT.
///
/// NOTE:
/// - `sub` is optional at the serde level so a missing subject surfaces as
///   `InvalidPayload` rather than a generic decode error.
/// - `exp`/`nbf`/`aud` are checked by `jsonwebtoken::Validation`, not read here.
#[derive(Debug, Clone, Deserialize)]
pub struct BearerClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Shared-secret (HMAC) JWT verifier.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("JwtVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtVerifier {
    pub fn new(
        secret: &str,
        algorithm: Algorithm,
        audience: Option<&str>,
        leeway_seconds: u64,
    ) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        let mut validation = Validation::new(algorithm);
        // `exp` is checked when present but not demanded
        validation.required_spec_claims = HashSet::new();
        validation.validate_nbf = true;
        validation.leeway = leeway_seconds;
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Self {
            decoding_key,
            validation,
        }
    }

    // Verify signature/exp/nbf and decode the claims.
    pub fn decode(&self, token: &str) -> Result<BearerClaims, jsonwebtoken::errors::Error> {
        let data = jsonwebtoken::decode::<BearerClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

impl TokenVerifier for JwtVerifier {
    fn mode(&self) -> &'static str {
        "jwt"
    }

    fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.decode(token)?;

        let sub = claims
            .sub
            .filter(|s| !s.trim().is_empty())
            .ok_or(AuthError::InvalidPayload)?;

        Ok(Identity::new(sub)
            .with_role(claims.role)
            .with_email(claims.email))
    }
}
