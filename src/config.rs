use std::{collections::HashSet, env, path::PathBuf};

/// Origin of the production frontend. Always part of the exact allow-list.
pub const PRODUCTION_FRONTEND_ORIGIN: &str =
    "https://catalogo-planes-funerarios-frontend.netlify.app";

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// immutable afterwards; handlers and extractors pull it out of `AppState` via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls Postgres TLS and the log format.
    pub env: Env,
    // TCP port the HTTP server binds to.
    pub port: u16,
    // Which persistence adapter to open.
    pub store: StoreConfig,
    // Directory receiving uploads and served under `/uploads`.
    pub uploads_dir: PathBuf,
    // Cross-origin allow-list.
    pub cors: CorsConfig,
    // Admin username, trimmed.
    pub admin_user: String,
    // Admin password, trimmed. `None` means "not configured" and makes login answer 500.
    pub admin_pass: Option<String>,
    // Secret used to sign and verify admin tokens. `None` makes the admin gate answer 500.
    pub jwt_secret: Option<String>,
}

/// Env
///
/// Runtime context. Production requires TLS towards Postgres and emits JSON logs.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Env {
    fn from_vars(app_env: Option<String>, node_env: Option<String>) -> Self {
        let is_production = [app_env, node_env]
            .into_iter()
            .flatten()
            .any(|value| value.trim().eq_ignore_ascii_case("production"));

        if is_production { Env::Production } else { Env::Local }
    }
}

/// StoreConfig
///
/// Persistence adapter selection. `DATABASE_URL` wins when present; otherwise the
/// catalog lives in a single JSON file.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreConfig {
    Postgres { url: String },
    File { path: PathBuf },
}

/// OriginPattern
///
/// A single-`*` origin pattern such as `https://*.netlify.app`. The wildcard matches any
/// (possibly empty) run of characters between the prefix and the suffix.
#[derive(Clone, Debug, PartialEq)]
pub struct OriginPattern {
    prefix: String,
    suffix: String,
}

impl OriginPattern {
    /// Parses a pattern. Values without a `*` are not patterns and yield `None`.
    pub fn parse(pattern: &str) -> Option<Self> {
        let (prefix, suffix) = pattern.trim().split_once('*')?;
        if suffix.contains('*') {
            return None;
        }
        Some(Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    pub fn matches(&self, origin: &str) -> bool {
        origin.len() >= self.prefix.len() + self.suffix.len()
            && origin.starts_with(&self.prefix)
            && origin.ends_with(&self.suffix)
    }
}

/// CorsConfig
///
/// The cross-origin allow-list, built once from the environment.
#[derive(Clone, Debug, Default)]
pub struct CorsConfig {
    pub exact_origins: HashSet<String>,
    pub wildcard_patterns: Vec<OriginPattern>,
    pub dev_origin: Option<String>,
}

impl CorsConfig {
    /// Returns true when the browser origin may receive CORS headers.
    pub fn allows(&self, origin: &str) -> bool {
        self.exact_origins.contains(origin)
            || self.dev_origin.as_deref() == Some(origin)
            || self.wildcard_patterns.iter().any(|p| p.matches(origin))
    }

    fn from_vars(
        frontend_origin: Option<String>,
        frontend_origins: Option<String>,
        wildcard_origins: Option<String>,
        dev_origin: Option<String>,
    ) -> Self {
        let mut exact_origins = HashSet::from([PRODUCTION_FRONTEND_ORIGIN.to_string()]);
        exact_origins.extend(
            frontend_origin
                .iter()
                .chain(frontend_origins.iter())
                .flat_map(|list| split_list(list)),
        );

        let wildcard_patterns = wildcard_origins
            .as_deref()
            .map(split_list)
            .unwrap_or_else(|| vec!["https://*.netlify.app".to_string()])
            .iter()
            .filter_map(|p| OriginPattern::parse(p))
            .collect();

        let dev_origin = match dev_origin {
            Some(value) => non_empty(value),
            None => Some("http://localhost:3000".to_string()),
        };

        Self {
            exact_origins,
            wildcard_patterns,
            dev_origin,
        }
    }
}

impl Default for AppConfig {
    /// Non-panicking configuration for tests. Credentials are configured so the admin
    /// gate can be exercised without touching the process environment.
    fn default() -> Self {
        Self {
            env: Env::Local,
            port: 4000,
            store: StoreConfig::File {
                path: PathBuf::from("data/planes.json"),
            },
            uploads_dir: PathBuf::from("public/uploads"),
            cors: CorsConfig::from_vars(None, None, None, None),
            admin_user: "admin".to_string(),
            admin_pass: Some("test-admin-pass".to_string()),
            jwt_secret: Some("super-secure-test-secret-value-local".to_string()),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from the process environment. Missing secrets are not
    /// fatal here: the admin endpoints report them as server misconfiguration per request.
    pub fn load() -> Self {
        let env = Env::from_vars(var("APP_ENV"), var("NODE_ENV"));

        let port = match var("PORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "PORT is not a valid port number, using 4000");
                4000
            }),
            None => 4000,
        };

        let store = match var("DATABASE_URL").and_then(non_empty) {
            Some(url) => StoreConfig::Postgres { url },
            None => StoreConfig::File {
                path: var("PLANES_DATA_FILE")
                    .and_then(non_empty)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("data/planes.json")),
            },
        };

        let uploads_dir = var("UPLOADS_DIR")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("public/uploads"));

        let cors = CorsConfig::from_vars(
            var("FRONTEND_ORIGIN"),
            var("FRONTEND_ORIGINS"),
            var("CORS_WILDCARD_ORIGINS"),
            var("DEV_ORIGIN"),
        );

        Self {
            env,
            port,
            store,
            uploads_dir,
            cors,
            admin_user: var("ADMIN_USER")
                .and_then(non_empty)
                .unwrap_or_else(|| "admin".to_string()),
            admin_pass: var("ADMIN_PASS").and_then(non_empty),
            jwt_secret: var("JWT_SECRET").and_then(non_empty),
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
