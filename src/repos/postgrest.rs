//! Hosted-table REST backend (PostgREST dialect, as served by Supabase).
//!
//! - `GET    /rest/v1/<table>?select=*&id=eq.<id>`
//! - `PATCH  /rest/v1/<table>?id=eq.<id>`   (partial update)
//! - `POST   /rest/v1/<table>`              (insert)
//!
//! Writes send `Prefer: return=representation` so the affected rows come back in the body.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use url::Url;

use crate::repos::{ProfileChanges, ProfileRow, ProfileStore, RepoError, RepoResult};

const RETURN_REPRESENTATION: &str = "return=representation";

/// PostgREST error body (`{"message": ..., "code": ..., "details": ..., "hint": ...}`).
#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    message: Option<String>,
    details: Option<String>,
}

#[derive(Clone, Debug)]
pub struct PostgrestProfileStore {
    http: reqwest::Client,
    table_url: Url,
}

impl PostgrestProfileStore {
    /// `base_url` is the project URL, e.g. `https://<project>.supabase.co`.
    pub fn new(base_url: &Url, key: &str, table: &str, timeout: Duration) -> RepoResult<Self> {
        let table_url = table_url(base_url, table)?;

        let mut key_header =
            HeaderValue::from_str(key).map_err(|_| RepoError::Endpoint("invalid access key".into()))?;
        key_header.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|_| RepoError::Endpoint("invalid access key".into()))?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("apikey", key_header);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .user_agent(concat!("onboarding-profile/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, table_url })
    }

    /// `<table_url>?id=eq.<id>`
    fn by_id(&self, id: &str) -> Url {
        let mut url = self.table_url.clone();
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));
        url
    }

    async fn rows(&self, req: reqwest::RequestBuilder) -> RepoResult<Vec<ProfileRow>> {
        let res = req.send().await?;
        let status = res.status();

        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            let err = error_from_response(status.as_u16(), &text);
            tracing::warn!(status = status.as_u16(), error = %err, "datastore request rejected");
            return Err(err);
        }

        res.json::<Vec<ProfileRow>>()
            .await
            .map_err(|e| RepoError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ProfileStore for PostgrestProfileStore {
    fn backend_name(&self) -> &'static str {
        "postgrest"
    }

    async fn find(&self, id: &str) -> RepoResult<Option<ProfileRow>> {
        let mut url = self.by_id(id);
        url.query_pairs_mut().append_pair("select", "*");

        let rows = self.rows(self.http.get(url)).await?;
        Ok(rows.into_iter().next())
    }

    async fn exists(&self, id: &str) -> RepoResult<bool> {
        let mut url = self.by_id(id);
        url.query_pairs_mut().append_pair("select", "id");

        let rows = self.rows(self.http.get(url)).await?;
        Ok(!rows.is_empty())
    }

    async fn update(&self, id: &str, changes: &ProfileChanges) -> RepoResult<Option<ProfileRow>> {
        let req = self
            .http
            .patch(self.by_id(id))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(changes.as_map());

        let rows = self.rows(req).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, row: &ProfileChanges) -> RepoResult<Option<ProfileRow>> {
        let req = self
            .http
            .post(self.table_url.clone())
            .header("Prefer", RETURN_REPRESENTATION)
            .json(row.as_map());

        let rows = self.rows(req).await?;
        Ok(rows.into_iter().next())
    }
}

fn table_url(base_url: &Url, table: &str) -> RepoResult<Url> {
    let mut url = base_url.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| RepoError::Endpoint(base_url.to_string()))?
        .pop_if_empty()
        .extend(["rest", "v1", table]);
    Ok(url)
}

fn error_from_response(status: u16, body: &str) -> RepoError {
    if status == 409 {
        return RepoError::Conflict;
    }

    let message = match serde_json::from_str::<PostgrestErrorBody>(body) {
        Ok(PostgrestErrorBody {
            message: Some(message),
            details,
        }) => match details {
            Some(details) if !details.is_empty() => format!("{message} ({details})"),
            _ => message,
        },
        _ if body.trim().is_empty() => "no response body".to_string(),
        _ => body.trim().to_string(),
    };

    RepoError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::{
        Router,
        extract::Request,
        http::{Method, StatusCode, header::CONTENT_TYPE},
    };
    use serde_json::json;

    use crate::services::auth::Identity;
    use crate::services::profile::{ProfileError, ProfileService};

    fn store(base: &str) -> PostgrestProfileStore {
        PostgrestProfileStore::new(
            &Url::parse(base).unwrap(),
            "service-key",
            "profiles",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn table_url_is_under_rest_v1() {
        assert_eq!(
            store("https://abc.supabase.co").table_url.as_str(),
            "https://abc.supabase.co/rest/v1/profiles"
        );
        assert_eq!(
            store("https://gateway.local/db/").table_url.as_str(),
            "https://gateway.local/db/rest/v1/profiles"
        );
        assert_eq!(
            store("https://gateway.local/db?x=1").table_url.as_str(),
            "https://gateway.local/db/rest/v1/profiles"
        );
    }

    #[test]
    fn id_filter_is_query_encoded() {
        let url = store("https://abc.supabase.co").by_id("user 1&x");
        assert_eq!(
            url.as_str(),
            "https://abc.supabase.co/rest/v1/profiles?id=eq.user+1%26x"
        );
    }

    #[test]
    fn api_errors_keep_datastore_message() {
        let err = error_from_response(
            400,
            r#"{"code":"22P02","message":"invalid input syntax for type uuid","details":null,"hint":null}"#,
        );
        assert_eq!(
            err.to_string(),
            "datastore returned 400: invalid input syntax for type uuid"
        );

        let err = error_from_response(
            400,
            r#"{"message":"null value in column","details":"Failing row contains (...)"}"#,
        );
        assert_eq!(
            err.to_string(),
            "datastore returned 400: null value in column (Failing row contains (...))"
        );

        let err = error_from_response(503, "upstream unavailable");
        assert_eq!(err.to_string(), "datastore returned 503: upstream unavailable");

        let err = error_from_response(500, "");
        assert_eq!(err.to_string(), "datastore returned 500: no response body");
    }

    #[test]
    fn conflict_status_maps_to_conflict() {
        assert!(matches!(
            error_from_response(409, r#"{"message":"duplicate key"}"#),
            RepoError::Conflict
        ));
    }

    /// One request as the upstream saw it.
    #[derive(Debug)]
    struct Seen {
        method: Method,
        uri: String,
        headers: HeaderMap,
        body: String,
    }

    type Log = Arc<Mutex<Vec<Seen>>>;

    /// Loopback upstream that records every request and answers each with `reply`.
    async fn upstream(status: StatusCode, reply: &'static str) -> (PostgrestProfileStore, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let recorder = log.clone();

        let app = Router::new().fallback(move |req: Request| {
            let recorder = recorder.clone();
            async move {
                let (parts, body) = req.into_parts();
                let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
                recorder.lock().unwrap().push(Seen {
                    method: parts.method,
                    uri: parts.uri.to_string(),
                    headers: parts.headers,
                    body: String::from_utf8(body.to_vec()).unwrap(),
                });
                (status, [(CONTENT_TYPE, "application/json")], reply)
            }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        (store(&format!("http://{addr}")), log)
    }

    fn only(log: &Log) -> Seen {
        let mut seen = log.lock().unwrap();
        assert_eq!(seen.len(), 1, "{seen:?}");
        seen.remove(0)
    }

    fn assert_authenticated(seen: &Seen) {
        assert_eq!(seen.headers["apikey"], "service-key");
        assert_eq!(seen.headers[AUTHORIZATION], "Bearer service-key");
    }

    fn body_json(seen: &Seen) -> serde_json::Value {
        serde_json::from_str(&seen.body).unwrap()
    }

    #[tokio::test]
    async fn find_selects_row_by_id() {
        let (store, log) =
            upstream(StatusCode::OK, r#"[{"id":"u1","full_name":"Alice"}]"#).await;

        let row = store.find("u1").await.unwrap().unwrap();

        assert_eq!(row["full_name"], "Alice");
        let seen = only(&log);
        assert_eq!(seen.method, Method::GET);
        assert_eq!(seen.uri, "/rest/v1/profiles?id=eq.u1&select=*");
        assert_authenticated(&seen);
        assert!(seen.headers.get("prefer").is_none());
    }

    #[tokio::test]
    async fn find_without_rows_is_none() {
        let (store, _) = upstream(StatusCode::OK, "[]").await;

        assert_eq!(store.find("u1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn exists_only_selects_id() {
        let (store, log) = upstream(StatusCode::OK, r#"[{"id":"u1"}]"#).await;

        assert!(store.exists("u1").await.unwrap());

        let seen = only(&log);
        assert_eq!(seen.method, Method::GET);
        assert_eq!(seen.uri, "/rest/v1/profiles?id=eq.u1&select=id");
        assert_authenticated(&seen);
    }

    #[tokio::test]
    async fn update_patches_only_given_columns() {
        let (store, log) = upstream(
            StatusCode::OK,
            r#"[{"id":"u1","full_name":"Bob","skills":["rust"]}]"#,
        )
        .await;
        let mut changes = ProfileChanges::new();
        changes.set("full_name", "Bob");
        changes.set("updated_at", "2026-03-01T09:00:00.000000Z");

        let row = store.update("u1", &changes).await.unwrap().unwrap();

        assert_eq!(row["skills"], json!(["rust"]));
        let seen = only(&log);
        assert_eq!(seen.method, Method::PATCH);
        assert_eq!(seen.uri, "/rest/v1/profiles?id=eq.u1");
        assert_authenticated(&seen);
        assert_eq!(seen.headers["prefer"], RETURN_REPRESENTATION);
        assert_eq!(seen.headers[CONTENT_TYPE], "application/json");
        assert_eq!(
            body_json(&seen),
            json!({ "full_name": "Bob", "updated_at": "2026-03-01T09:00:00.000000Z" })
        );
    }

    #[tokio::test]
    async fn update_matching_no_row_is_none() {
        let (store, _) = upstream(StatusCode::OK, "[]").await;
        let mut changes = ProfileChanges::new();
        changes.set("full_name", "Bob");

        assert_eq!(store.update("u1", &changes).await.unwrap(), None);
    }

    #[tokio::test]
    async fn insert_posts_to_table() {
        let (store, log) = upstream(StatusCode::CREATED, r#"[{"id":"u1"}]"#).await;
        let mut row = ProfileChanges::new();
        row.set("id", "u1");
        row.set("github_username", "alice");

        let written = store.insert(&row).await.unwrap().unwrap();

        assert_eq!(written["id"], "u1");
        let seen = only(&log);
        assert_eq!(seen.method, Method::POST);
        assert_eq!(seen.uri, "/rest/v1/profiles");
        assert_authenticated(&seen);
        assert_eq!(seen.headers["prefer"], RETURN_REPRESENTATION);
        assert_eq!(body_json(&seen), json!({ "id": "u1", "github_username": "alice" }));
    }

    #[tokio::test]
    async fn rejected_requests_map_to_repo_errors() {
        let (store, _) = upstream(StatusCode::CONFLICT, r#"{"message":"duplicate key"}"#).await;
        assert!(matches!(
            store.insert(&ProfileChanges::new()).await,
            Err(RepoError::Conflict)
        ));

        let (store, _) = upstream(
            StatusCode::UNAUTHORIZED,
            r#"{"message":"Invalid API key"}"#,
        )
        .await;
        assert_eq!(
            store.find("u1").await.unwrap_err().to_string(),
            "datastore returned 401: Invalid API key"
        );

        let (store, _) = upstream(StatusCode::OK, r#"{"not":"a list"}"#).await;
        assert!(matches!(store.find("u1").await, Err(RepoError::Decode(_))));
    }

    #[tokio::test]
    async fn empty_representation_is_an_empty_write() {
        let (store, log) = upstream(StatusCode::OK, "[]").await;
        let profiles = ProfileService::new(Arc::new(store));

        let err = profiles
            .upsert(&Identity::new("u1"), ProfileChanges::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ProfileError::EmptyWrite));
        let methods: Vec<Method> = log.lock().unwrap().iter().map(|s| s.method.clone()).collect();
        assert_eq!(methods, [Method::GET, Method::POST]);
    }

    #[test]
    fn invalid_key_is_rejected() {
        let err = PostgrestProfileStore::new(
            &Url::parse("https://abc.supabase.co").unwrap(),
            "bad\nkey",
            "profiles",
            Duration::from_secs(5),
        )
        .unwrap_err();
        assert!(matches!(err, RepoError::Endpoint(_)));
    }
}
