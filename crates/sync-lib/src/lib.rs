//! Repository synchronization library
//!
//! This crate provides the core functionality for:
//! - Validating synchronizer settings
//! - Paging through an organization's repositories upstream
//! - Projecting repositories onto the forwarded field set
//! - Forwarding batches to the destination storage API
//! - Structured logging

pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod sync;
pub mod transport;

pub use config::{DestinationConfig, SyncConfig, UpstreamConfig};
pub use error::{ConfigurationError, SyncError};
pub use models::{PageCursor, RawRecord, RepoRecord, SyncOutcome, REPO_FIELDS};
pub use observability::{init_tracing, SyncLogger};
pub use sync::Synchronizer;
pub use transport::{HttpError, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
