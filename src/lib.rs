//! Stagehand: run stage agents against a labeling workflow.
//!
//! A stage agent is a plain Rust callable bound to one agent stage of a
//! project workflow. For every task pending at that stage the runner resolves
//! the agent's declared parameters (project, task, label row, plain values,
//! other providers, scoped resources), calls it, and submits the pathway it
//! returns. Tasks are fetched and submitted in batches; failed attempts are
//! retried up to a limit.
//!
//! ```no_run
//! use stagehand::{Args, LabelRow, MemoryPlatform, Param, Routing, Runner};
//! use std::process::ExitCode;
//! use std::rc::Rc;
//!
//! fn main() -> ExitCode {
//!     let platform = Rc::new(MemoryPlatform::new());
//!     let mut runner = Runner::new(platform);
//!     let registered = runner.stage(
//!         "pre-label",
//!         vec![Param::of::<LabelRow>("label_row")],
//!         |args: &Args| {
//!             let row = args.get::<LabelRow>("label_row")?;
//!             Ok(Routing::from(row.data_title.ends_with(".jpg").then_some("annotate")))
//!         },
//!     );
//!     if let Err(err) = registered {
//!         eprintln!("Error: {}", err);
//!         return ExitCode::FAILURE;
//!     }
//!     runner.run()
//! }
//! ```

pub mod cli;
pub mod config;
pub mod deps;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod logging;
pub mod platform;
pub mod routing;
pub mod runner;

#[cfg(test)]
pub(crate) mod test_support;

pub use deps::{Args, Context, Param, Provider, Scoped, ScopedProvider};
pub use error::{Result, RunnerError};
pub use platform::{AgentTask, Identifier, LabelRow, MemoryPlatform, Platform, Project};
pub use routing::Routing;
pub use runner::{RunReport, Runner, StageSpec};
