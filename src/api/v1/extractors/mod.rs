/*
 * Responsibility
 * - v1 handler 用の extractor (認証済み Identity など)
 */
pub mod auth_ctx;

pub use auth_ctx::AuthCtx;
