//! Run options for stagehand.
//!
//! [`RunOptions`] is what a user writes: in a YAML file, on the command line
//! or in code. It supports forward-compatible YAML parsing (unknown fields are
//! ignored) and defaults for omitted fields. [`RunOptions::validate`] checks
//! the values and produces the typed [`RunSettings`] the runner executes with.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::RunOptions;
pub use operations::parse_project_id;
pub use types::RunSettings;
