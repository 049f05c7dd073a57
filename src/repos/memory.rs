//! In-process profiles table (`DATASTORE_BACKEND=memory`).
//!
//! Behaves like the real table for the operations the service uses:
//! unknown columns default to `null`, `onboarding_completed` defaults to `false`,
//! updates merge column by column and a duplicate insert is a conflict.
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::repos::profile_store::PROFILE_COLUMNS;
use crate::repos::{ProfileChanges, ProfileRow, ProfileStore, RepoError, RepoResult};

#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    rows: RwLock<HashMap<String, ProfileRow>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }
}

fn default_row() -> ProfileRow {
    PROFILE_COLUMNS
        .iter()
        .map(|c| {
            let v = match *c {
                "onboarding_completed" => Value::Bool(false),
                _ => Value::Null,
            };
            (c.to_string(), v)
        })
        .collect()
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn find(&self, id: &str) -> RepoResult<Option<ProfileRow>> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn exists(&self, id: &str) -> RepoResult<bool> {
        Ok(self.rows.read().await.contains_key(id))
    }

    async fn update(&self, id: &str, changes: &ProfileChanges) -> RepoResult<Option<ProfileRow>> {
        let mut rows = self.rows.write().await;

        let Some(row) = rows.get_mut(id) else {
            return Ok(None);
        };
        for (column, value) in changes.as_map() {
            row.insert(column.clone(), value.clone());
        }
        Ok(Some(row.clone()))
    }

    async fn insert(&self, row: &ProfileChanges) -> RepoResult<Option<ProfileRow>> {
        let id = row
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| RepoError::Decode("insert without id".to_string()))?
            .to_string();

        let mut rows = self.rows.write().await;
        if rows.contains_key(&id) {
            return Err(RepoError::Conflict);
        }

        let mut stored = default_row();
        for (column, value) in row.as_map() {
            stored.insert(column.clone(), value.clone());
        }
        rows.insert(id, stored.clone());
        Ok(Some(stored))
    }
}
