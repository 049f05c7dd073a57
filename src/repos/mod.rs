/*
 * Responsibility
 * - profiles テーブル (Datastore) へのアクセス
 * - backend は ProfileStore trait の裏に隠す (rest / postgres / memory)
 */
pub mod error;
pub mod memory;
pub mod pg;
pub mod postgrest;
pub mod profile_store;

pub use error::{RepoError, RepoResult};
pub use profile_store::{ProfileChanges, ProfileRow, ProfileStore, build_profile_store};
