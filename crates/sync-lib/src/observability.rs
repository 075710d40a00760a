//! Logging for the synchronizer
//!
//! Provides:
//! - `SyncLogger`, the structured event logger handed to the synchronizer
//! - `init_tracing`, the JSON subscriber installed by the binary

use serde_json::Value;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global JSON tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise `default_level` is used.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json())
        .init();
}

/// Structured logger for synchronization events
///
/// Every event carries the job name. A disabled logger emits nothing.
#[derive(Debug, Clone)]
pub struct SyncLogger {
    job: String,
    enabled: bool,
}

impl SyncLogger {
    pub fn new(job: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            enabled: true,
        }
    }

    /// Logger that drops every event
    pub fn noop() -> Self {
        Self {
            job: String::new(),
            enabled: false,
        }
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Log the resolved settings at startup
    pub fn log_settings(&self, settings: &Value) {
        if !self.enabled {
            return;
        }
        info!(
            event = "sync_settings",
            job = %self.job,
            settings = %settings,
            "Loaded sync settings"
        );
    }

    /// Trace an outgoing request; callers pass URLs without credentials
    pub fn log_request(&self, method: &str, url: &str, page: Option<u32>) {
        if !self.enabled {
            return;
        }
        debug!(
            event = "http_request",
            job = %self.job,
            method = %method,
            url = %url,
            page = ?page,
            "Sending request"
        );
    }

    pub fn log_batch_forwarded(&self, page: u32, records: usize) {
        if !self.enabled {
            return;
        }
        info!(
            event = "batch_forwarded",
            job = %self.job,
            page = page,
            records = records,
            "Forwarded repository batch"
        );
    }

    pub fn log_parse_error(&self, page: u32, body: &str, err: &dyn std::error::Error) {
        if !self.enabled {
            return;
        }
        error!(
            event = "parse_failed",
            job = %self.job,
            page = page,
            body = %body,
            error = %err,
            "Could not parse upstream page"
        );
    }

    pub fn log_transform_error(&self, page: u32, index: usize, record: &Value) {
        if !self.enabled {
            return;
        }
        error!(
            event = "transform_failed",
            job = %self.job,
            page = page,
            index = index,
            record = %record,
            "Could not transform upstream record"
        );
    }

    pub fn log_complete(&self, final_cursor: u32, pages: u32, records: usize) {
        if !self.enabled {
            return;
        }
        info!(
            event = "sync_complete",
            job = %self.job,
            final_cursor = final_cursor,
            pages = pages,
            records = records,
            "Synchronization finished"
        );
    }

    pub fn log_shutdown(&self, reason: &str, cursor: u32) {
        if !self.enabled {
            return;
        }
        info!(
            event = "sync_shutdown",
            job = %self.job,
            reason = %reason,
            cursor = cursor,
            "Synchronization stopped before completion"
        );
    }
}

impl Default for SyncLogger {
    fn default() -> Self {
        Self::noop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_logger_creation() {
        let logger = SyncLogger::new("sync-github");
        assert_eq!(logger.job(), "sync-github");
        assert!(logger.is_enabled());
    }

    #[test]
    fn test_default_logger_is_noop() {
        let logger = SyncLogger::default();
        assert!(!logger.is_enabled());
        // No subscriber and disabled: these must simply return
        logger.log_request("GET", "http://localhost", Some(1));
        logger.log_complete(2, 1, 1);
    }
}
