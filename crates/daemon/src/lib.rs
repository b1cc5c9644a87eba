#![forbid(unsafe_code)]

//! Jenkins job watcher: polls the job list, diffs snapshots and dispatches
//! notifications with a persisted history.

pub mod config;
pub mod dispatcher;
pub mod history;
pub mod jenkins;
pub mod scheduler;
pub mod sink;
pub mod store;
pub mod teardown;
