//! Synchronizer settings and their validation
//!
//! Settings arrive as an untyped `sync` object from the process settings
//! provider. [`SyncConfig::from_settings`] checks it against the expected
//! shape once, so the synchronizer only ever sees typed values.

use crate::error::ConfigurationError;
use serde_json::{Map, Value};
use url::Url;

/// Path appended to the destination base URL for writes
pub const REPOS_PATH: &str = "repos";

/// Upstream (Git-hosting API) settings, from the `github` group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    pub base_url: Url,
    pub organization: String,
    pub client_id: String,
    pub client_secret: String,
    pub batch_size: u32,
}

/// Destination (storage API) settings, from the `api` group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationConfig {
    pub base_url: Url,
    pub api_key: Option<String>,
}

/// Validated synchronizer settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub upstream: UpstreamConfig,
    pub destination: DestinationConfig,
}

impl SyncConfig {
    /// Validate a raw `sync` settings object
    pub fn from_settings(settings: &Value) -> Result<Self, ConfigurationError> {
        let github = section(settings, "github")?;
        let api = section(settings, "api")?;

        let destination = DestinationConfig {
            base_url: url_field(api, "api", "base_url")?,
            api_key: optional_string(api, "api", "key")?,
        };

        let upstream = UpstreamConfig {
            base_url: url_field(github, "github", "base_url")?,
            organization: required_string(github, "github", "org")?,
            batch_size: batch_size(github)?,
            client_id: required_string(github, "github", "client_id")?,
            client_secret: required_string(github, "github", "client_secret")?,
        };

        Ok(Self {
            upstream,
            destination,
        })
    }

    /// Settings as JSON with credentials masked, for startup logging
    pub fn redacted(&self) -> Value {
        serde_json::json!({
            "github": {
                "base_url": self.upstream.base_url.as_str(),
                "org": self.upstream.organization,
                "client_id": self.upstream.client_id,
                "client_secret": "***",
                "batch_size": self.upstream.batch_size,
            },
            "api": {
                "base_url": self.destination.base_url.as_str(),
                "key": self.destination.api_key.as_ref().map(|_| "***"),
            }
        })
    }
}

/// Append path segments to `base`, ignoring a trailing slash on it
pub(crate) fn join_segments<'a>(base: &Url, segments: impl IntoIterator<Item = &'a str>) -> Url {
    let mut url = base.clone();
    // Bases are checked by `url_field`, so segments are always available
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

fn section<'a>(
    settings: &'a Value,
    name: &'static str,
) -> Result<&'a Map<String, Value>, ConfigurationError> {
    match settings.get(name) {
        None | Some(Value::Null) => Err(ConfigurationError::MissingSection(name)),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(ConfigurationError::NotAnObject(name)),
    }
}

fn required_string(
    section: &Map<String, Value>,
    prefix: &str,
    key: &str,
) -> Result<String, ConfigurationError> {
    let field = format!("{prefix}.{key}");
    match section.get(key) {
        None | Some(Value::Null) => Err(ConfigurationError::MissingField(field)),
        Some(Value::String(s)) if s.is_empty() => {
            Err(ConfigurationError::invalid(&field, "must not be empty"))
        }
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ConfigurationError::invalid(&field, "must be a string")),
    }
}

fn optional_string(
    section: &Map<String, Value>,
    prefix: &str,
    key: &str,
) -> Result<Option<String>, ConfigurationError> {
    match section.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => required_string(section, prefix, key).map(Some),
    }
}

fn url_field(
    section: &Map<String, Value>,
    prefix: &str,
    key: &str,
) -> Result<Url, ConfigurationError> {
    let raw = required_string(section, prefix, key)?;
    let field = format!("{prefix}.{key}");
    let url =
        Url::parse(&raw).map_err(|e| ConfigurationError::invalid(&field, format!("{e}")))?;
    if url.cannot_be_a_base() {
        return Err(ConfigurationError::invalid(&field, "must be a base url"));
    }
    Ok(url)
}

fn batch_size(github: &Map<String, Value>) -> Result<u32, ConfigurationError> {
    const FIELD: &str = "github.batch_size";
    let parsed = match github.get("batch_size") {
        None | Some(Value::Null) => {
            return Err(ConfigurationError::MissingField(FIELD.to_string()))
        }
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        Some(_) => None,
    };

    match parsed {
        Some(0) => Err(ConfigurationError::invalid(FIELD, "must be positive")),
        Some(size) => Ok(size),
        None => Err(ConfigurationError::invalid(FIELD, "must be an integer")),
    }
}
