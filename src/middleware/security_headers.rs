//! Security-related response headers.
//!
//! The API only serves per-user JSON, so framing, sniffing and caching are
//! denied outright. HSTS is only sent in production, where TLS terminates in
//! front of the service; a local plain-HTTP run must not pin the browser.

use axum::Router;
use axum::http::header::{self, HeaderValue};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::Config;

const HSTS: &str = "max-age=31536000; includeSubDomains";

/// Apply common security headers to all responses.
pub fn apply(router: Router, config: &Config) -> Router {
    let router = router
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    if config.app_env.is_production() {
        router.layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(HSTS),
        ))
    } else {
        router
    }
}
