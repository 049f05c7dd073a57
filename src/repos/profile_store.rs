//! Datastore interface for profile rows.
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::{Config, DatastoreConfig};
use crate::repos::{
    RepoResult, memory::MemoryProfileStore, pg::PgProfileStore, postgrest::PostgrestProfileStore,
};

/// A profile row exactly as the datastore returned it.
///
/// Shape validation happens one layer up (`ProfileResponse`).
pub type ProfileRow = Map<String, Value>;

/// Every column of the profiles table.
pub const PROFILE_COLUMNS: &[&str] = &[
    "id",
    "full_name",
    "date_of_birth",
    "secondary_email",
    "address",
    "linkedin_url",
    "github_username",
    "skills",
    "career_preferences",
    "education",
    "onboarding_completed",
    "profile_photo_url",
    "govt_id_url",
    "api_keys",
    "created_at",
    "updated_at",
];

/// Columns only the server writes: identity-derived or server-managed.
pub const SERVER_MANAGED_COLUMNS: &[&str] = &["id", "api_keys", "created_at", "updated_at"];

/// Write payload: only the columns that are actually being written.
///
/// Absent columns are left untouched by `update`, and take the table default on `insert`.
/// Column names are `&'static str` so they always come from code, never from a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges(Map<String, Value>);

impl ProfileChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: &'static str, value: impl Into<Value>) {
        debug_assert!(PROFILE_COLUMNS.contains(&column), "unknown column {column}");
        self.0.insert(column.to_string(), value.into());
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.0.remove(column)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    #[cfg(test)]
    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Profile persistence, keyed by subject id.
///
/// Implementations must be cheap to share (`Arc<dyn ProfileStore>` in `AppState`).
#[async_trait]
pub trait ProfileStore: Send + Sync + 'static {
    // Backend name (for logging).
    fn backend_name(&self) -> &'static str;

    async fn find(&self, id: &str) -> RepoResult<Option<ProfileRow>>;

    async fn exists(&self, id: &str) -> RepoResult<bool>;

    // Partial update. `Ok(None)` means the write went through but no row came back.
    async fn update(&self, id: &str, changes: &ProfileChanges) -> RepoResult<Option<ProfileRow>>;

    // `row` already carries `id` and `created_at`.
    async fn insert(&self, row: &ProfileChanges) -> RepoResult<Option<ProfileRow>>;
}

/// Build the configured backend once at startup.
pub async fn build_profile_store(config: &Config) -> RepoResult<Arc<dyn ProfileStore>> {
    let table = config.profiles_table.as_str();

    let store: Arc<dyn ProfileStore> = match &config.datastore {
        DatastoreConfig::Rest { url, key, timeout } => {
            Arc::new(PostgrestProfileStore::new(url, key, table, *timeout)?)
        }
        DatastoreConfig::Postgres { database_url } => {
            Arc::new(PgProfileStore::connect(database_url, table).await?)
        }
        DatastoreConfig::Memory => Arc::new(MemoryProfileStore::new()),
    };

    tracing::info!(backend = store.backend_name(), table, "profile store ready");
    Ok(store)
}
