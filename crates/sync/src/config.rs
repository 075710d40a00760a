//! Process settings
//!
//! Sources, later ones overriding earlier ones:
//! - `config/default.{toml,yaml,json}` in the working directory, if present
//! - the file named by `REPO_SYNC_CONFIG`, if set
//! - `APP__*` environment variables, e.g. `APP__SYNC__GITHUB__ORG`

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "config/default";
const CONFIG_PATH_ENV: &str = "REPO_SYNC_CONFIG";
const ENV_PREFIX: &str = "APP";

/// Process configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Raw `sync` settings, validated by the synchronizer
    #[serde(default)]
    pub sync: Value,

    /// Log level used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Per-request timeout for upstream and destination calls
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).ok();
        Self::load_with_env(path.as_deref().map(Path::new), None)
    }

    /// Load configuration, reading `path` as an extra required settings file
    ///
    /// `env` replaces the process environment as the `APP__*` source when set.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false));

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .source(env),
            )
            .build()
            .context("Failed to load settings")?
            .try_deserialize()
            .context("Failed to parse settings")?;

        if config.http_timeout_secs == 0 {
            anyhow::bail!("http_timeout_secs must be positive");
        }

        Ok(config)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_settings(ext: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(ext).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_toml_settings() {
        let file = write_settings(
            ".toml",
            r#"
log_level = "debug"

[sync.github]
base_url = "https://api.github.com"
org = "my_organization"
client_id = "xxxx_id"
client_secret = "xxxx_secret"
batch_size = 100

[sync.api]
base_url = "http://localhost:1337"
key = "xxx_key"
"#,
        );

        let config =
            AppConfig::load_with_env(Some(file.path()), Some(config::Map::new())).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert_eq!(config.sync["github"]["org"], "my_organization");
        assert_eq!(config.sync["api"]["key"], "xxx_key");

        let sync = sync_lib::SyncConfig::from_settings(&config.sync).unwrap();
        assert_eq!(sync.upstream.batch_size, 100);
    }

    #[test]
    fn test_load_json_settings_with_timeout() {
        let file = write_settings(
            ".json",
            r#"{"http_timeout_secs": 5, "sync": {"github": {"org": "o"}}}"#,
        );

        let config =
            AppConfig::load_with_env(Some(file.path()), Some(config::Map::new())).unwrap();
        assert_eq!(config.http_timeout(), Duration::from_secs(5));
        assert_eq!(config.log_level, "info");
        assert!(sync_lib::SyncConfig::from_settings(&config.sync).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let file = write_settings(".json", r#"{"http_timeout_secs": 0}"#);
        let result = AppConfig::load_with_env(Some(file.path()), Some(config::Map::new()));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let result = AppConfig::load_with_env(
            Some(Path::new("/nonexistent/repo-sync.toml")),
            Some(config::Map::new()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_settings(
            ".toml",
            r#"
log_level = "debug"

[sync.github]
base_url = "https://api.github.com"
org = "file_org"
client_id = "xxxx_id"
client_secret = "xxxx_secret"
batch_size = 100

[sync.api]
base_url = "http://localhost:1337"
"#,
        );
        let env: config::Map<String, String> = [
            ("APP__LOG_LEVEL", "warn"),
            ("APP__SYNC__GITHUB__ORG", "env_org"),
            ("APP__SYNC__GITHUB__BATCH_SIZE", "25"),
            ("OTHER__LOG_LEVEL", "trace"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = AppConfig::load_with_env(Some(file.path()), Some(env)).unwrap();
        assert_eq!(config.log_level, "warn");

        let sync = sync_lib::SyncConfig::from_settings(&config.sync).unwrap();
        assert_eq!(sync.upstream.organization, "env_org");
        assert_eq!(sync.upstream.batch_size, 25);
        assert_eq!(sync.upstream.client_id, "xxxx_id");
    }
}
