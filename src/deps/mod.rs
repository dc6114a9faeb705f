//! Declarative dependency injection for stage agents.
//!
//! A stage agent declares its parameters up front as [`Param`] descriptors:
//!
//! - `Param::of::<T>(name)` - a value taken from the invocation [`Context`]
//!   (`Project`, `AgentTask`, `LabelRow` or the `Context` itself)
//! - `Param::value(name, v)` - a plain value passed through as is
//! - `Param::depends(name, &provider)` - the result of another callable with
//!   its own declared parameters (a sub-dependency)
//! - `Param::scoped(name, &provider)` - a resource that is released when the
//!   invocation ends
//!
//! At registration the descriptors are compiled once into a [`Dependant`]: an
//! ordered, deduplicated plan in which every provider's inputs come before the
//! provider itself. At invocation [`solve_dependencies`] walks the plan against
//! a fresh [`Context`], calling each provider at most once and pushing release
//! actions onto a [`ScopeStack`] that runs them when it is dropped.
//!
//! ```
//! use stagehand::deps::{Args, Param, Provider};
//! use stagehand::platform::LabelRow;
//!
//! let title = Provider::new("title", vec![Param::of::<LabelRow>("row")], |args: &Args| {
//!     Ok(args.get::<LabelRow>("row")?.data_title.to_uppercase())
//! });
//! let params = vec![Param::of::<LabelRow>("row"), Param::depends("title", &title)];
//! let plan = stagehand::deps::Dependant::build(&params).unwrap();
//! assert_eq!(plan.len(), 2);
//! ```

pub mod builtin;
mod context;
mod dependant;
mod provider;
mod resolve;
mod scope;


pub use context::{Context, ContextField};
pub use dependant::{Dependant, Node};
pub use provider::{Args, Dependency, Param, Provider, Release, Scoped, ScopedProvider, Value};
pub use resolve::solve_dependencies;
pub use scope::ScopeStack;

use thiserror::Error;

/// Failure to build or resolve a dependency plan.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// A parameter declared by type that no provider can supply.
    #[error(
        "parameter `{param}` is declared as `{type_name}`, which cannot be taken from the \
         task context. Declare it with Param::value, Param::depends or Param::scoped instead"
    )]
    UnmappedType {
        param: String,
        type_name: &'static str,
    },

    /// The current context lacks a field a parameter needs.
    #[error("parameter `{param}` requires the {field}, but no {field} is bound to the current context")]
    MissingContext { param: String, field: ContextField },

    /// A resolved value was requested as the wrong type.
    #[error("parameter `{param}` was requested as `{requested}`, but it holds a different type")]
    TypeMismatch {
        param: String,
        requested: &'static str,
    },

    /// Two parameters of one callable share a name.
    #[error("parameter `{0}` is declared more than once; parameter names must be unique")]
    DuplicateParameter(String),

    /// A value was requested under a name that was never declared.
    #[error("no parameter named `{0}` was declared")]
    UnknownParameter(String),

    /// A sub-dependency or scoped provider returned an error.
    #[error("provider `{provider}` failed: {source:#}")]
    Provider {
        provider: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ResolveError {
    /// Whether retrying the resolution could succeed.
    ///
    /// Only provider failures are retryable; everything else is structural.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ResolveError::Provider { .. })
    }
}
