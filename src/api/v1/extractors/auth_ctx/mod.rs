/*!
 * Authentication context extractor
 *
 * Responsibility:
 * - middleware が検証済みの Identity を handler に提供する
 * - 検証ロジック自体は services::auth / middleware::auth の責務
 */

mod core;

pub use core::AuthCtx;
