//! Direct Postgres backend (`DATASTORE_BACKEND=postgres`).
//!
//! Values travel as one jsonb parameter and are typed by `jsonb_populate_record`,
//! so the same `ProfileChanges` map works for text, date, array and jsonb columns.
//! Rows come back as `to_jsonb(row)`.
use async_trait::async_trait;
use sqlx::{PgPool, postgres::PgPoolOptions, types::Json};

use crate::repos::profile_store::PROFILE_COLUMNS;
use crate::repos::{ProfileChanges, ProfileRow, ProfileStore, RepoError, RepoResult};

#[derive(Clone, Debug)]
pub struct PgProfileStore {
    pool: PgPool,
    table: String,
}

impl PgProfileStore {
    pub async fn connect(database_url: &str, table: &str) -> RepoResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool, table))
    }

    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }
}

/// Quoted column list, restricted to known profile columns.
fn quoted_columns(changes: &ProfileChanges) -> RepoResult<Vec<String>> {
    changes
        .columns()
        .map(|c| {
            if PROFILE_COLUMNS.contains(&c) {
                Ok(format!("\"{c}\""))
            } else {
                Err(RepoError::Decode(format!("unknown column: {c}")))
            }
        })
        .collect()
}

fn select_sql(table: &str) -> String {
    format!(r#"SELECT to_jsonb(t) FROM "{table}" AS t WHERE t.id::text = $1"#)
}

fn exists_sql(table: &str) -> String {
    format!(r#"SELECT EXISTS (SELECT 1 FROM "{table}" AS t WHERE t.id::text = $1)"#)
}

// $1 = id, $2 = changes (jsonb)
fn update_sql(table: &str, columns: &[String]) -> String {
    let assignments = columns
        .iter()
        .map(|c| format!("{c} = src.{c}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"UPDATE "{table}" AS t SET {assignments} FROM jsonb_populate_record(NULL::"{table}", $2) AS src WHERE t.id::text = $1 RETURNING to_jsonb(t)"#
    )
}

// $1 = row (jsonb)
fn insert_sql(table: &str, columns: &[String]) -> String {
    let targets = columns.join(", ");
    let sources = columns
        .iter()
        .map(|c| format!("src.{c}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"INSERT INTO "{table}" AS t ({targets}) SELECT {sources} FROM jsonb_populate_record(NULL::"{table}", $1) AS src RETURNING to_jsonb(t)"#
    )
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn find(&self, id: &str) -> RepoResult<Option<ProfileRow>> {
        let row = sqlx::query_scalar::<_, Json<ProfileRow>>(&select_sql(&self.table))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|Json(row)| row))
    }

    async fn exists(&self, id: &str) -> RepoResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(&exists_sql(&self.table))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn update(&self, id: &str, changes: &ProfileChanges) -> RepoResult<Option<ProfileRow>> {
        let columns = quoted_columns(changes)?;
        if columns.is_empty() {
            return self.find(id).await;
        }

        let row = sqlx::query_scalar::<_, Json<ProfileRow>>(&update_sql(&self.table, &columns))
            .bind(id)
            .bind(Json(changes.as_map()))
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|Json(row)| row))
    }

    async fn insert(&self, row: &ProfileChanges) -> RepoResult<Option<ProfileRow>> {
        let columns = quoted_columns(row)?;

        let row = sqlx::query_scalar::<_, Json<ProfileRow>>(&insert_sql(&self.table, &columns))
            .bind(Json(row.as_map()))
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|Json(row)| row))
    }
}
