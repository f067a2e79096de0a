use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::options::RecommendOptions;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub engine: EngineConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Connection settings for the external property-graph backend. Credentials
/// are opaque to the engine: held as secrets, never logged, never persisted.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub uri: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub max_sessions: usize,
    pub acquire_timeout_ms: u64,
    pub query_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_ms: u64,
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub max_hops: u32,
    pub max_candidates: usize,
    pub top_k: usize,
    pub exclude_owned: bool,
    pub deadline_ms: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub store_uri: Option<String>,
    pub store_database: Option<String>,
    pub store_username: Option<String>,
    pub store_password: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                uri: "http://127.0.0.1:7474".to_string(),
                database: "neo4j".to_string(),
                username: None,
                password: None,
                max_sessions: 8,
                acquire_timeout_ms: 5_000,
                query_timeout_ms: 3_000,
                max_retries: 3,
                retry_base_ms: 200,
            },
            engine: EngineConfig {
                max_hops: 2,
                max_candidates: 200,
                top_k: 10,
                exclude_owned: true,
                deadline_ms: 10_000,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl EngineConfig {
    /// Default per-request options derived from configuration.
    pub fn options(&self) -> RecommendOptions {
        RecommendOptions::new()
            .with_max_hops(self.max_hops)
            .with_max_candidates(self.max_candidates)
            .with_top_k(self.top_k)
            .with_exclude_owned(self.exclude_owned)
            .with_deadline(Duration::from_millis(self.deadline_ms))
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("recograph.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(store) = patch.store {
            if let Some(uri) = store.uri {
                self.store.uri = uri;
            }
            if let Some(database) = store.database {
                self.store.database = database;
            }
            if let Some(username) = store.username {
                self.store.username = Some(username);
            }
            if let Some(password) = store.password {
                self.store.password = Some(password.into());
            }
            if let Some(max_sessions) = store.max_sessions {
                self.store.max_sessions = max_sessions;
            }
            if let Some(acquire_timeout_ms) = store.acquire_timeout_ms {
                self.store.acquire_timeout_ms = acquire_timeout_ms;
            }
            if let Some(query_timeout_ms) = store.query_timeout_ms {
                self.store.query_timeout_ms = query_timeout_ms;
            }
            if let Some(max_retries) = store.max_retries {
                self.store.max_retries = max_retries;
            }
            if let Some(retry_base_ms) = store.retry_base_ms {
                self.store.retry_base_ms = retry_base_ms;
            }
        }

        if let Some(engine) = patch.engine {
            if let Some(max_hops) = engine.max_hops {
                self.engine.max_hops = max_hops;
            }
            if let Some(max_candidates) = engine.max_candidates {
                self.engine.max_candidates = max_candidates;
            }
            if let Some(top_k) = engine.top_k {
                self.engine.top_k = top_k;
            }
            if let Some(exclude_owned) = engine.exclude_owned {
                self.engine.exclude_owned = exclude_owned;
            }
            if let Some(deadline_ms) = engine.deadline_ms {
                self.engine.deadline_ms = deadline_ms;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("RECOGRAPH_STORE_URI") {
            self.store.uri = value;
        }
        if let Some(value) = read_env("RECOGRAPH_STORE_DATABASE") {
            self.store.database = value;
        }
        if let Some(value) = read_env("RECOGRAPH_STORE_USERNAME") {
            self.store.username = Some(value);
        }
        if let Some(value) = read_env("RECOGRAPH_STORE_PASSWORD") {
            self.store.password = Some(value.into());
        }
        if let Some(value) = read_env("RECOGRAPH_STORE_MAX_SESSIONS") {
            self.store.max_sessions = parse_usize("RECOGRAPH_STORE_MAX_SESSIONS", &value)?;
        }
        if let Some(value) = read_env("RECOGRAPH_STORE_ACQUIRE_TIMEOUT_MS") {
            self.store.acquire_timeout_ms =
                parse_u64("RECOGRAPH_STORE_ACQUIRE_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = read_env("RECOGRAPH_STORE_QUERY_TIMEOUT_MS") {
            self.store.query_timeout_ms = parse_u64("RECOGRAPH_STORE_QUERY_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = read_env("RECOGRAPH_STORE_MAX_RETRIES") {
            self.store.max_retries = parse_u32("RECOGRAPH_STORE_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read_env("RECOGRAPH_STORE_RETRY_BASE_MS") {
            self.store.retry_base_ms = parse_u64("RECOGRAPH_STORE_RETRY_BASE_MS", &value)?;
        }

        if let Some(value) = read_env("RECOGRAPH_ENGINE_MAX_HOPS") {
            self.engine.max_hops = parse_u32("RECOGRAPH_ENGINE_MAX_HOPS", &value)?;
        }
        if let Some(value) = read_env("RECOGRAPH_ENGINE_MAX_CANDIDATES") {
            self.engine.max_candidates = parse_usize("RECOGRAPH_ENGINE_MAX_CANDIDATES", &value)?;
        }
        if let Some(value) = read_env("RECOGRAPH_ENGINE_TOP_K") {
            self.engine.top_k = parse_usize("RECOGRAPH_ENGINE_TOP_K", &value)?;
        }
        if let Some(value) = read_env("RECOGRAPH_ENGINE_EXCLUDE_OWNED") {
            self.engine.exclude_owned = parse_bool("RECOGRAPH_ENGINE_EXCLUDE_OWNED", &value)?;
        }
        if let Some(value) = read_env("RECOGRAPH_ENGINE_DEADLINE_MS") {
            self.engine.deadline_ms = parse_u64("RECOGRAPH_ENGINE_DEADLINE_MS", &value)?;
        }

        if let Some(value) = read_env("RECOGRAPH_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("RECOGRAPH_SERVER_PORT") {
            self.server.port = parse_u16("RECOGRAPH_SERVER_PORT", &value)?;
        }

        let log_level =
            read_env("RECOGRAPH_LOGGING_LEVEL").or_else(|| read_env("RECOGRAPH_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("RECOGRAPH_LOGGING_FORMAT").or_else(|| read_env("RECOGRAPH_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(store_uri) = overrides.store_uri {
            self.store.uri = store_uri;
        }
        if let Some(store_database) = overrides.store_database {
            self.store.database = store_database;
        }
        if let Some(store_username) = overrides.store_username {
            self.store.username = Some(store_username);
        }
        if let Some(store_password) = overrides.store_password {
            self.store.password = Some(store_password.into());
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_store(&self.store)?;
        validate_engine(&self.engine)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("recograph.toml"), PathBuf::from("config/recograph.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_store(store: &StoreConfig) -> Result<(), ConfigError> {
    let uri = store.uri.trim();
    if !uri.starts_with("http://") && !uri.starts_with("https://") {
        return Err(ConfigError::Validation(
            "store.uri must start with http:// or https://".to_string(),
        ));
    }

    if store.database.trim().is_empty() {
        return Err(ConfigError::Validation("store.database must not be empty".to_string()));
    }

    if store.username.is_some() != store.password.is_some() {
        return Err(ConfigError::Validation(
            "store.username and store.password must be provided together".to_string(),
        ));
    }

    if store.max_sessions == 0 || store.max_sessions > 256 {
        return Err(ConfigError::Validation(
            "store.max_sessions must be in range 1..=256".to_string(),
        ));
    }

    if store.acquire_timeout_ms == 0 || store.acquire_timeout_ms > 60_000 {
        return Err(ConfigError::Validation(
            "store.acquire_timeout_ms must be in range 1..=60000".to_string(),
        ));
    }

    if store.query_timeout_ms == 0 || store.query_timeout_ms > 60_000 {
        return Err(ConfigError::Validation(
            "store.query_timeout_ms must be in range 1..=60000".to_string(),
        ));
    }

    if store.max_retries > 10 {
        return Err(ConfigError::Validation("store.max_retries must be at most 10".to_string()));
    }

    if store.retry_base_ms == 0 || store.retry_base_ms > 10_000 {
        return Err(ConfigError::Validation(
            "store.retry_base_ms must be in range 1..=10000".to_string(),
        ));
    }

    Ok(())
}

fn validate_engine(engine: &EngineConfig) -> Result<(), ConfigError> {
    engine
        .options()
        .validate()
        .map_err(|error| ConfigError::Validation(format!("engine.{}: {}", error.option, error)))
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation(
            "server.port must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    store: Option<StorePatch>,
    engine: Option<EnginePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct StorePatch {
    uri: Option<String>,
    database: Option<String>,
    username: Option<String>,
    password: Option<String>,
    max_sessions: Option<usize>,
    acquire_timeout_ms: Option<u64>,
    query_timeout_ms: Option<u64>,
    max_retries: Option<u32>,
    retry_base_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EnginePatch {
    max_hops: Option<u32>,
    max_candidates: Option<usize>,
    top_k: Option<usize>,
    exclude_owned: Option<bool>,
    deadline_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

/// Redact a credential for display: first two characters, then ellipsis.
pub fn redact(value: &str) -> String {
    if value.is_empty() {
        "<unset>".to_string()
    } else if value.chars().count() <= 2 {
        "**".to_string()
    } else {
        let prefix: String = value.chars().take(2).collect();
        format!("{prefix}…")
    }
}

impl StoreConfig {
    /// Expose the password for transport authentication only. Call sites
    /// must not persist or log the returned value.
    pub fn password_value(&self) -> Option<&str> {
        self.password.as_ref().map(|secret| secret.expose_secret())
    }
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{redact, AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.options().max_hops, 2);
        assert_eq!(config.engine.options().top_k, 10);
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_STORE_PASSWORD", "from-env-secret");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("recograph.toml");
            fs::write(
                &path,
                r#"
[store]
username = "reader"
password = "${TEST_STORE_PASSWORD}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.store.password_value() == Some("from-env-secret"),
                "password should be loaded from environment interpolation",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_STORE_PASSWORD"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RECOGRAPH_STORE_URI", "http://from-env:7474");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("recograph.toml");
            fs::write(
                &path,
                r#"
[store]
uri = "http://from-file:7474"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    store_uri: Some("http://from-override:7474".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.store.uri == "http://from-override:7474",
                "programmatic override should win over env and file",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            Ok(())
        })();

        clear_vars(&["RECOGRAPH_STORE_URI"]);
        result
    }

    #[test]
    fn validation_rejects_credentials_without_username() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RECOGRAPH_STORE_PASSWORD", "lonely-password");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let mentions_pair = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("store.username")
            );
            ensure(mentions_pair, "validation failure should mention the credential pair")
        })();

        clear_vars(&["RECOGRAPH_STORE_PASSWORD"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RECOGRAPH_STORE_USERNAME", "reader");
        env::set_var("RECOGRAPH_STORE_PASSWORD", "super-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("super-secret-value"),
                "debug output should not contain the store password",
            )?;
            Ok(())
        })();

        clear_vars(&["RECOGRAPH_STORE_USERNAME", "RECOGRAPH_STORE_PASSWORD"]);
        result
    }

    #[test]
    fn invalid_log_level_fails_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RECOGRAPH_LOG_LEVEL", "verbose");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected log level validation failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(error, ConfigError::Validation(ref message) if message.contains("logging.level")),
                "validation failure should mention logging.level",
            )
        })();

        clear_vars(&["RECOGRAPH_LOG_LEVEL"]);
        result
    }

    #[test]
    fn log_format_parses_from_env_alias() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RECOGRAPH_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env alias",
            )
        })();

        clear_vars(&["RECOGRAPH_LOG_FORMAT"]);
        result
    }

    #[test]
    fn redaction_keeps_only_a_prefix() {
        assert_eq!(redact(""), "<unset>");
        assert_eq!(redact("ab"), "**");
        assert_eq!(redact("hunter2"), "hu…");
    }
}
