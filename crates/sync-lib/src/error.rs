//! Error types for the repository synchronizer

use crate::transport::HttpError;
use thiserror::Error;

/// Invalid or missing settings, raised while building the synchronizer
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("must provide {0} configuration")]
    MissingSection(&'static str),

    #[error("{0} configuration must be an object")]
    NotAnObject(&'static str),

    #[error("missing required setting {0}")]
    MissingField(String),

    #[error("invalid value for {field} setting: {reason}")]
    InvalidField { field: String, reason: String },
}

impl ConfigurationError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failures during a synchronization run
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Transport(#[from] HttpError),

    #[error("{method} {url} returned status {status}: {body}")]
    UnexpectedStatus {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    #[error("could not parse upstream page {page}: {source}")]
    Parse {
        page: u32,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not transform record {index} of page {page}: {reason}")]
    Transform {
        page: u32,
        index: usize,
        reason: String,
    },

    #[error("could not serialize batch: {0}")]
    Serialize(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_messages() {
        assert_eq!(
            ConfigurationError::MissingSection("github").to_string(),
            "must provide github configuration"
        );
        assert_eq!(
            ConfigurationError::invalid("github.batch_size", "must be an integer").to_string(),
            "invalid value for github.batch_size setting: must be an integer"
        );
    }

    #[test]
    fn test_status_error_message() {
        let err = SyncError::UnexpectedStatus {
            method: "POST",
            url: "http://localhost/repos".to_string(),
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "POST http://localhost/repos returned status 503: unavailable"
        );
    }
}
