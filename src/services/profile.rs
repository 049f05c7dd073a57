//! Onboarding profile read / upsert, always scoped to the caller's subject id.
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::repos::profile_store::SERVER_MANAGED_COLUMNS;
use crate::repos::{ProfileChanges, ProfileRow, ProfileStore, RepoError};
use crate::services::auth::Identity;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Profile not found")]
    NotFound,

    #[error("Error fetching profile: {0}")]
    Fetch(RepoError),

    #[error("Error updating profile: {0}")]
    Update(RepoError),

    // The datastore accepted the write but handed back no row.
    #[error("Failed to update profile")]
    EmptyWrite,
}

/// Single best-effort read or conditional write per call.
/// No retries, no optimistic locking: concurrent writers race in the datastore.
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
}

impl std::fmt::Debug for ProfileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileService")
            .field("backend", &self.store.backend_name())
            .finish()
    }
}

impl ProfileService {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, identity: &Identity) -> Result<ProfileRow, ProfileError> {
        self.store
            .find(&identity.subject_id)
            .await
            .map_err(ProfileError::Fetch)?
            .ok_or(ProfileError::NotFound)
    }

    /// Update the caller's row if it exists, insert it otherwise.
    pub async fn upsert(
        &self,
        identity: &Identity,
        changes: ProfileChanges,
    ) -> Result<ProfileRow, ProfileError> {
        self.upsert_at(identity, changes, Utc::now()).await
    }

    pub(crate) async fn upsert_at(
        &self,
        identity: &Identity,
        mut changes: ProfileChanges,
        now: DateTime<Utc>,
    ) -> Result<ProfileRow, ProfileError> {
        let subject_id = identity.subject_id.as_str();

        for &column in SERVER_MANAGED_COLUMNS {
            if changes.remove(column).is_some() {
                tracing::warn!(subject_id, column, "dropping server-managed column from update");
            }
        }

        let timestamp = now.to_rfc3339_opts(SecondsFormat::Micros, true);
        changes.set("updated_at", timestamp.clone());

        let exists = self
            .store
            .exists(subject_id)
            .await
            .map_err(ProfileError::Update)?;

        let written = if exists {
            tracing::debug!(subject_id, "updating profile");
            self.store.update(subject_id, &changes).await
        } else {
            tracing::info!(subject_id, "creating profile");
            changes.set("id", subject_id.to_string());
            changes.set("created_at", timestamp);
            self.store.insert(&changes).await
        };

        written
            .map_err(ProfileError::Update)?
            .ok_or(ProfileError::EmptyWrite)
    }
}
