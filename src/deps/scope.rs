//! Release stack for scoped resources.

use super::provider::Release;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Release actions of the scoped resources acquired during one invocation.
///
/// Actions run exactly once, most recent first, when the stack is closed or
/// dropped; dropping covers early returns, errors and unwinding alike. A
/// failing or panicking release is logged and the remaining ones still run.
#[derive(Default)]
pub struct ScopeStack {
    releases: Vec<(String, Release)>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the release action of resource `name`.
    pub fn push(&mut self, name: impl Into<String>, release: Release) {
        self.releases.push((name.into(), release));
    }

    /// Number of pending release actions.
    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    /// Release everything now.
    pub fn close(mut self) {
        self.release_all();
    }

    fn release_all(&mut self) {
        while let Some((name, release)) = self.releases.pop() {
            match panic::catch_unwind(AssertUnwindSafe(release)) {
                Ok(Ok(())) => tracing::trace!(resource = %name, "released scoped resource"),
                Ok(Err(e)) => {
                    tracing::warn!(resource = %name, "failed to release scoped resource: {:#}", e)
                }
                Err(_) => tracing::warn!(resource = %name, "release of scoped resource panicked"),
            }
        }
    }
}

impl Drop for ScopeStack {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl fmt::Debug for ScopeStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.releases.iter().map(|(name, _)| name))
            .finish()
    }
}
