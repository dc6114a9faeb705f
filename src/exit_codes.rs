//! Exit code constants for runs driven through [`crate::Runner::run`].
//!
//! - 0: Success (queues drained, or the polling loop was stopped cleanly)
//! - 1: Configuration error (bad options, unknown stages, duplicate registration)
//! - 2: Platform failure during startup (project or workflow could not be fetched)
//! - 3: I/O failure (config file, events log)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// Configuration error: invalid options, stage mismatch, or missing project.
pub const CONFIG_ERROR: i32 = 1;

/// The labeling platform rejected or failed a startup request.
pub const PLATFORM_FAILURE: i32 = 2;

/// Local I/O failure: config file unreadable, events log unwritable.
pub const IO_FAILURE: i32 = 3;
