pub mod bearer;
pub mod dev;
pub mod factory;
pub mod identity;
pub mod jwt;
pub mod verifier;

pub use bearer::authenticate;
pub use factory::build_token_verifier;
pub use identity::Identity;
pub use verifier::{AuthError, TokenVerifier};
