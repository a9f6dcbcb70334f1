/*
 * Responsibility
 * - Read gateway settings from the environment (.env via dotenvy)
 * - Validate what must be valid at startup (listen port, upstream base url, timeouts)
 * - Session key material is carried as-is: a missing/broken key is reported per request
 *   as a configuration error instead of preventing the process from starting
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
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

/// Where the upstream API lives and how we talk to it.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    /// `http://host:port[/prefix]`, without a trailing slash.
    pub base_url: Url,
    /// Sent as `Authorization: Bearer <token>` on every forwarded call.
    pub api_token: Option<HeaderValue>,
    pub timeout: Duration,
}

/// Session verification inputs. Nothing here is validated at startup.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub cookie_name: String,
    pub signing_secret: Option<String>,
    pub public_key_pem: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub leeway_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditSinkKind {
    Log,
    Memory,
    Valkey { url: String, key: String },
}

pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub upstream: UpstreamSettings,
    pub allowed_origins: Vec<String>,
    pub session: SessionSettings,
    pub audit_sink: AuditSinkKind,

    pub max_body_bytes: usize,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (the process env in production,
    /// a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values are treated as unset.
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port: u16 = match get("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(get("APP_ENV"));

        let base_url = get("UPSTREAM_BASE_URL").ok_or(ConfigError::Missing("UPSTREAM_BASE_URL"))?;
        let base_url = parse_upstream_base(&base_url)?;

        let api_token = get("UPSTREAM_API_TOKEN")
            .map(|t| HeaderValue::from_str(&format!("Bearer {}", t.trim())))
            .transpose()
            .map_err(|_| ConfigError::Invalid("UPSTREAM_API_TOKEN"))?
            .map(|mut v| {
                v.set_sensitive(true);
                v
            });

        let upstream_timeout_ms = parse_or("UPSTREAM_TIMEOUT_MS", get("UPSTREAM_TIMEOUT_MS"), 10_000)?;
        if upstream_timeout_ms == 0 {
            return Err(ConfigError::Invalid("UPSTREAM_TIMEOUT_MS"));
        }

        let allowed_origins = get("DASHBOARD_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let session = SessionSettings {
            cookie_name: get("SESSION_COOKIE_NAME").unwrap_or_else(|| "dashboard_session".to_string()),
            signing_secret: get("SESSION_SIGNING_SECRET"),
            public_key_pem: get("SESSION_PUBLIC_KEY_PEM").map(|pem| pem.replace("\\n", "\n")),
            issuer: get("SESSION_ISSUER"),
            audience: get("SESSION_AUDIENCE"),
            leeway_seconds: parse_or("SESSION_LEEWAY_SECONDS", get("SESSION_LEEWAY_SECONDS"), 0)?,
        };

        let audit_sink = match get("AUDIT_SINK")
            .unwrap_or_else(|| "log".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "log" => AuditSinkKind::Log,
            "memory" => AuditSinkKind::Memory,
            "valkey" => AuditSinkKind::Valkey {
                url: get("VALKEY_URL").ok_or(ConfigError::Missing("VALKEY_URL"))?,
                key: get("AUDIT_VALKEY_KEY").unwrap_or_else(|| "dashboard:audit".to_string()),
            },
            _ => return Err(ConfigError::Invalid("AUDIT_SINK")),
        };

        let max_body_bytes = parse_or("MAX_BODY_BYTES", get("MAX_BODY_BYTES"), 1024 * 1024)?;
        let request_timeout_secs: u64 = parse_or("REQUEST_TIMEOUT_SECS", get("REQUEST_TIMEOUT_SECS"), 30)?;
        // The upstream wait must end before the whole request is cut off.
        if upstream_timeout_ms >= request_timeout_secs.saturating_mul(1000) {
            return Err(ConfigError::Invalid("UPSTREAM_TIMEOUT_MS"));
        }

        Ok(Self {
            addr,
            app_env,
            upstream: UpstreamSettings {
                base_url,
                api_token,
                timeout: Duration::from_millis(upstream_timeout_ms),
            },
            allowed_origins,
            session,
            audit_sink,
            max_body_bytes,
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

// Only plain http: the forwarder uses an HttpConnector.
fn parse_upstream_base(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim()).map_err(|_| ConfigError::Invalid("UPSTREAM_BASE_URL"))?;

    if url.scheme() != "http" || url.host_str().is_none() {
        return Err(ConfigError::Invalid("UPSTREAM_BASE_URL"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::Invalid("UPSTREAM_BASE_URL"));
    }

    let trimmed = url.path().trim_end_matches('/').to_string();
    url.set_path(&trimmed);
    Ok(url)
}
