#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Shared models and pure logic for the CI job watcher: status mapping,
//! snapshot diffing, notification policy and backoff math. No I/O lives here.

/// Jenkins JSON API wire types.
pub mod api;
/// Failure backoff math.
pub mod backoff;
/// Snapshot comparison.
pub mod diff;
/// Error taxonomy.
pub mod error;
/// Jobs, snapshots, transitions and history records.
pub mod model;
/// Worthiness rules and flicker suppression.
pub mod policy;
/// Color token mapping.
pub mod status;

mod util;

pub use util::{new_record_id, now_ms};
