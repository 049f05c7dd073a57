/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - verifier: 起動時に選んだ TokenVerifier, profiles: Datastore を包んだ ProfileService
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::{auth::TokenVerifier, profile::ProfileService};

#[derive(Clone, Debug)]
pub struct AppState {
    pub verifier: Arc<dyn TokenVerifier>,
    pub profiles: ProfileService,
}

impl AppState {
    pub fn new(verifier: Arc<dyn TokenVerifier>, profiles: ProfileService) -> Self {
        Self { verifier, profiles }
    }
}
