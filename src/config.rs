/*
 * Responsibility
 * - 環境変数や設定の読み込み (Datastore 接続先、Auth 設定、CORS 許可など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.unwrap_or("development").to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// How incoming bearer tokens are verified.
#[derive(Clone)]
pub enum AuthMode {
    /// Token is taken verbatim as the subject id. Local testing only.
    Dev,
    Jwt {
        secret: String,
        algorithm: Algorithm,
        audience: Option<String>,
        leeway_seconds: u64,
    },
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the shared secret
        match self {
            AuthMode::Dev => f.write_str("Dev"),
            AuthMode::Jwt {
                algorithm,
                audience,
                leeway_seconds,
                ..
            } => f
                .debug_struct("Jwt")
                .field("algorithm", algorithm)
                .field("audience", audience)
                .field("leeway_seconds", leeway_seconds)
                .finish(),
        }
    }
}

#[derive(Clone)]
pub enum DatastoreConfig {
    /// Hosted table REST API (PostgREST dialect).
    Rest {
        url: Url,
        key: String,
        timeout: Duration,
    },
    Postgres {
        database_url: String,
    },
    Memory,
}

impl fmt::Debug for DatastoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Access keys and connection strings stay out of logs
        match self {
            DatastoreConfig::Rest { url, timeout, .. } => f
                .debug_struct("Rest")
                .field("url", &url.as_str())
                .field("timeout", timeout)
                .finish(),
            DatastoreConfig::Postgres { .. } => f.write_str("Postgres"),
            DatastoreConfig::Memory => f.write_str("Memory"),
        }
    }
}

/// Limits enforced by the HTTP layer on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpLimits {
    pub body_limit_bytes: usize,
    pub request_timeout: Duration,
}

impl Default for HttpLimits {
    fn default() -> Self {
        Self {
            // profiles are small JSON documents
            body_limit_bytes: 1024 * 1024,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,

    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,
    pub http: HttpLimits,

    pub auth: AuthMode,

    pub datastore: DatastoreConfig,
    pub profiles_table: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (the process env in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV").as_deref());

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let defaults = HttpLimits::default();
        let body_limit_bytes: usize =
            parse_or(&lookup, "HTTP_BODY_LIMIT_BYTES", defaults.body_limit_bytes)?;
        let timeout_secs: u64 = parse_or(
            &lookup,
            "HTTP_REQUEST_TIMEOUT_SECONDS",
            defaults.request_timeout.as_secs(),
        )?;
        if body_limit_bytes == 0 {
            return Err(ConfigError::Invalid("HTTP_BODY_LIMIT_BYTES"));
        }
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid("HTTP_REQUEST_TIMEOUT_SECONDS"));
        }
        let http = HttpLimits {
            body_limit_bytes,
            request_timeout: Duration::from_secs(timeout_secs),
        };

        let auth = auth_mode(&lookup, app_env)?;
        let datastore = datastore_config(&lookup)?;

        let profiles_table = lookup("PROFILES_TABLE").unwrap_or_else(|| "profiles".to_string());
        if !is_sql_identifier(&profiles_table) {
            return Err(ConfigError::Invalid("PROFILES_TABLE"));
        }

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            http,
            auth,
            datastore,
            profiles_table,
        })
    }
}

fn auth_mode<F>(lookup: &F, app_env: AppEnv) -> Result<AuthMode, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let dev_mode = match lookup("AUTH_DEV_MODE") {
        Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid("AUTH_DEV_MODE"))?,
        None => false,
    };

    if dev_mode {
        // Unverified tokens must never be accepted by a production deployment.
        if app_env.is_production() {
            return Err(ConfigError::Invalid("AUTH_DEV_MODE"));
        }
        return Ok(AuthMode::Dev);
    }

    let secret = lookup("JWT_SECRET")
        .filter(|s| !s.is_empty())
        .ok_or(ConfigError::Missing("JWT_SECRET"))?;

    let algorithm = match lookup("JWT_ALGORITHM") {
        Some(name) => Algorithm::from_str(name.trim())
            .ok()
            .filter(|alg| matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512))
            .ok_or(ConfigError::Invalid("JWT_ALGORITHM"))?,
        None => Algorithm::HS256,
    };

    let audience = lookup("JWT_AUDIENCE").filter(|s| !s.trim().is_empty());

    let leeway_seconds: u64 = parse_or(lookup, "ACCESS_TOKEN_LEEWAY_SECONDS", 60)?;

    Ok(AuthMode::Jwt {
        secret,
        algorithm,
        audience,
        leeway_seconds,
    })
}

fn datastore_config<F>(lookup: &F) -> Result<DatastoreConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let backend = lookup("DATASTORE_BACKEND")
        .unwrap_or_else(|| "rest".to_string())
        .to_ascii_lowercase();

    match backend.as_str() {
        "rest" => {
            let url = lookup("DATASTORE_URL").ok_or(ConfigError::Missing("DATASTORE_URL"))?;
            let url = Url::parse(&url)
                .ok()
                .filter(|u| matches!(u.scheme(), "http" | "https"))
                .ok_or(ConfigError::Invalid("DATASTORE_URL"))?;

            let key = lookup("DATASTORE_KEY")
                .filter(|s| !s.is_empty())
                .ok_or(ConfigError::Missing("DATASTORE_KEY"))?;

            let timeout_secs: u64 = parse_or(lookup, "DATASTORE_TIMEOUT_SECONDS", 10)?;
            if timeout_secs == 0 {
                return Err(ConfigError::Invalid("DATASTORE_TIMEOUT_SECONDS"));
            }

            Ok(DatastoreConfig::Rest {
                url,
                key,
                timeout: Duration::from_secs(timeout_secs),
            })
        }
        "postgres" | "postgresql" => {
            let database_url =
                lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
            Ok(DatastoreConfig::Postgres { database_url })
        }
        "memory" => Ok(DatastoreConfig::Memory),
        _ => Err(ConfigError::Invalid("DATASTORE_BACKEND")),
    }
}

/// Unset falls back to `default`; a value that does not parse is an error.
fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Table names end up inside SQL text, so only plain identifiers are accepted.
fn is_sql_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    const REST: [(&str, &str); 3] = [
        ("JWT_SECRET", "top-secret"),
        ("DATASTORE_URL", "https://project.supabase.co"),
        ("DATASTORE_KEY", "service-key"),
    ];

    #[test]
    fn defaults_to_jwt_hs256_and_rest_backend() {
        let config = load(&REST).unwrap();

        assert_eq!(config.addr.port(), 3000);
        assert_eq!(config.app_env, AppEnv::Development);
        assert_eq!(config.profiles_table, "profiles");
        match config.auth {
            AuthMode::Jwt {
                algorithm,
                audience,
                leeway_seconds,
                ..
            } => {
                assert_eq!(algorithm, Algorithm::HS256);
                assert_eq!(audience, None);
                assert_eq!(leeway_seconds, 60);
            }
            AuthMode::Dev => panic!("dev mode must be opt-in"),
        }
        match config.datastore {
            DatastoreConfig::Rest { url, timeout, .. } => {
                assert_eq!(url.host_str(), Some("project.supabase.co"));
                assert_eq!(timeout, Duration::from_secs(10));
            }
            other => panic!("unexpected backend: {other:?}"),
        }
    }

    #[test]
    fn jwt_secret_is_required_outside_dev_mode() {
        let err = load(&[
            ("DATASTORE_BACKEND", "memory"),
            ("AUTH_DEV_MODE", "false"),
        ])
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn dev_mode_needs_no_secret() {
        let config = load(&[("DATASTORE_BACKEND", "memory"), ("AUTH_DEV_MODE", "true")]).unwrap();
        assert!(matches!(config.auth, AuthMode::Dev));
        assert!(matches!(config.datastore, DatastoreConfig::Memory));
    }

    #[test]
    fn dev_mode_is_rejected_in_production() {
        let err = load(&[
            ("APP_ENV", "production"),
            ("AUTH_DEV_MODE", "1"),
            ("DATASTORE_BACKEND", "memory"),
        ])
        .unwrap_err();
        assert_eq!(err, ConfigError::Invalid("AUTH_DEV_MODE"));
    }

    #[test]
    fn only_shared_secret_algorithms_are_accepted() {
        let mut pairs = REST.to_vec();
        pairs.push(("JWT_ALGORITHM", "HS512"));
        let config = load(&pairs).unwrap();
        assert!(matches!(
            config.auth,
            AuthMode::Jwt {
                algorithm: Algorithm::HS512,
                ..
            }
        ));

        let mut pairs = REST.to_vec();
        pairs.push(("JWT_ALGORITHM", "RS256"));
        assert_eq!(load(&pairs).unwrap_err(), ConfigError::Invalid("JWT_ALGORITHM"));
    }

    #[test]
    fn rest_backend_requires_url_and_key() {
        let err = load(&[("JWT_SECRET", "s")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATASTORE_URL"));

        let err = load(&[("JWT_SECRET", "s"), ("DATASTORE_URL", "ftp://x")]).unwrap_err();
        assert_eq!(err, ConfigError::Invalid("DATASTORE_URL"));

        let err = load(&[("JWT_SECRET", "s"), ("DATASTORE_URL", "https://x.io")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATASTORE_KEY"));
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        let err = load(&[("JWT_SECRET", "s"), ("DATASTORE_BACKEND", "postgres")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn table_name_must_be_identifier() {
        let mut pairs = REST.to_vec();
        pairs.push(("PROFILES_TABLE", "profiles; drop table x"));
        assert_eq!(load(&pairs).unwrap_err(), ConfigError::Invalid("PROFILES_TABLE"));
    }

    #[test]
    fn unparsable_numbers_fail_startup() {
        for key in [
            "PORT",
            "ACCESS_TOKEN_LEEWAY_SECONDS",
            "DATASTORE_TIMEOUT_SECONDS",
            "HTTP_BODY_LIMIT_BYTES",
            "HTTP_REQUEST_TIMEOUT_SECONDS",
        ] {
            let mut pairs = REST.to_vec();
            pairs.push((key, "ten"));
            let err = load(&pairs).unwrap_err();
            assert_eq!(err.to_string(), format!("invalid configuration: {key}"));
        }

        let mut pairs = REST.to_vec();
        pairs.push(("PORT", "70000"));
        assert_eq!(load(&pairs).unwrap_err(), ConfigError::Invalid("PORT"));
    }

    #[test]
    fn http_limits_are_configurable() {
        assert_eq!(load(&REST).unwrap().http, HttpLimits::default());

        let mut pairs = REST.to_vec();
        pairs.push(("HTTP_BODY_LIMIT_BYTES", "4096"));
        pairs.push(("HTTP_REQUEST_TIMEOUT_SECONDS", " 5 "));
        let config = load(&pairs).unwrap();
        assert_eq!(config.http.body_limit_bytes, 4096);
        assert_eq!(config.http.request_timeout, Duration::from_secs(5));

        let mut pairs = REST.to_vec();
        pairs.push(("HTTP_REQUEST_TIMEOUT_SECONDS", "0"));
        assert_eq!(
            load(&pairs).unwrap_err(),
            ConfigError::Invalid("HTTP_REQUEST_TIMEOUT_SECONDS")
        );
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = load(&REST).unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("top-secret"));
        assert!(!printed.contains("service-key"));
    }
}
