//! Repository synchronization
//!
//! This module provides:
//! - Paged reads of an organization's repositories from the upstream API
//! - Projection of each repository onto the forwarded field set
//! - Batch writes to the destination storage API

mod synchronizer;


pub use synchronizer::{Synchronizer, API_KEY_HEADER, USER_AGENT};
