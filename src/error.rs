//! Error types for stagehand runs.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! Only configuration-time failures surface as [`RunnerError`]; failures while
//! processing a single work item are logged and reported, never propagated.

use crate::deps::ResolveError;
use crate::exit_codes;
use crate::platform::{Identifier, PlatformError};
use thiserror::Error;

/// Main error type for runner construction, registration and startup.
///
/// Each variant maps to an exit code in [`crate::exit_codes`].
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Invalid run options or configuration file contents.
    #[error("{0}")]
    Config(String),

    /// Two callables competing for the same stage.
    #[error(
        "stage `{0}` has already been assigned a function. You can only assign one callable \
         to each agent stage (register with overwrite to replace it)"
    )]
    DuplicateStage(Identifier),

    /// A registered stage identifier has no counterpart in the remote workflow.
    #[error(
        "function `{function}` was registered for agent stage `{stage}`, but that stage is not \
         present as an agent stage in the project workflow. The workflow has the following \
         agent stages: [{available}]"
    )]
    UnknownStage {
        stage: Identifier,
        function: String,
        available: String,
    },

    /// A registered stage identifier points at a stage that is not an agent stage.
    #[error(
        "stage `{stage}` is of type `{stage_type}` and cannot be used as an agent stage. \
         It has to be one of the agent stages: [{available}]"
    )]
    WrongStageType {
        stage: Identifier,
        stage_type: String,
        available: String,
    },

    /// The project identifier is not a UUID.
    #[error("could not read project id `{0}` as a UUID")]
    InvalidProjectId(String),

    /// No project was bound at construction and none was given at run time.
    #[error(
        "no project specified. Bind one when constructing the runner \
         (`Runner::for_project`) or pass it when running (`--project <uuid>`)"
    )]
    MissingProject,

    /// A callable's declared parameters could not be mapped to providers.
    #[error("invalid agent dependencies: {0}")]
    Dependency(#[from] ResolveError),

    /// The labeling platform failed a startup request.
    #[error("platform request failed: {0}")]
    Platform(#[from] PlatformError),

    /// Local I/O failure.
    #[error("{0}")]
    Io(String),

    /// The tracing subscriber could not be installed.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl RunnerError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunnerError::Config(_)
            | RunnerError::DuplicateStage(_)
            | RunnerError::UnknownStage { .. }
            | RunnerError::WrongStageType { .. }
            | RunnerError::InvalidProjectId(_)
            | RunnerError::MissingProject
            | RunnerError::Dependency(_)
            | RunnerError::Logging(_) => exit_codes::CONFIG_ERROR,
            RunnerError::Platform(_) => exit_codes::PLATFORM_FAILURE,
            RunnerError::Io(_) => exit_codes::IO_FAILURE,
        }
    }
}

/// Result type alias for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
