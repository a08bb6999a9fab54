//! Removal outcomes: per-item failures and combined step errors.

use std::fmt;

use anyhow::Result;
use tracing::{info, warn};

/// What kind of resource a removal targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Sandbox,
    Container,
    PodLogDirectory,
    LogSymlink,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Sandbox => write!(f, "sandbox"),
            ResourceKind::Container => write!(f, "container"),
            ResourceKind::PodLogDirectory => write!(f, "pod log directory"),
            ResourceKind::LogSymlink => write!(f, "container log symlink"),
        }
    }
}

/// One failed removal.
#[derive(Debug)]
pub struct RemovalFailure {
    pub kind: ResourceKind,
    pub id: String,
    pub error: anyhow::Error,
}

impl fmt::Display for RemovalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {:#}", self.kind, self.id, self.error)
    }
}

/// Every removal that failed during one pass.
#[derive(Debug, thiserror::Error)]
#[error("{} removal(s) failed: {}", .failures.len(), join(.failures, "; "))]
pub struct RemovalErrors {
    pub failures: Vec<RemovalFailure>,
}

/// Errors from the independent steps of a combined pass.
#[derive(Debug, thiserror::Error)]
#[error("garbage collection incomplete: {}", join(.errors, "; "))]
pub struct GcErrors {
    pub errors: Vec<anyhow::Error>,
}

fn join<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        // Alternate form so anyhow errors render with their context chain
        .map(|item| format!("{:#}", item))
        .collect::<Vec<_>>()
        .join(sep)
}

/// Issue a removal for every item, continuing past failures.
///
/// Returns `Ok` when every removal succeeded, otherwise a `RemovalErrors`
/// listing each failure.
pub fn remove_each<T, I, F>(kind: ResourceKind, items: &[T], id_of: I, mut remove: F) -> Result<()>
where
    I: Fn(&T) -> String,
    F: FnMut(&T) -> Result<()>,
{
    let mut failures = Vec::new();
    for item in items {
        let id = id_of(item);
        match remove(item) {
            Ok(()) => info!(kind = %kind, id = %id, "gc:removed"),
            Err(error) => {
                warn!(kind = %kind, id = %id, error = %format!("{:#}", error), "gc:removal failed");
                failures.push(RemovalFailure { kind, id, error });
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(RemovalErrors { failures }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    #[test]
    fn all_successful_removals_return_ok() {
        let mut seen = Vec::new();
        let items = ["a", "b"];
        remove_each(
            ResourceKind::Container,
            &items,
            |s| s.to_string(),
            |s| {
                seen.push(*s);
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[test]
    fn failures_are_collected_without_stopping() {
        let mut attempted = Vec::new();
        let items = ["a", "b", "c"];
        let err = remove_each(
            ResourceKind::Sandbox,
            &items,
            |s| s.to_string(),
            |s| {
                attempted.push(*s);
                if *s == "c" {
                    Ok(())
                } else {
                    bail!("busy")
                }
            },
        )
        .unwrap_err();

        assert_eq!(attempted, vec!["a", "b", "c"]);
        let errors = err.downcast_ref::<RemovalErrors>().unwrap();
        assert_eq!(errors.failures.len(), 2);
        assert_eq!(errors.failures[0].id, "a");
        assert_eq!(errors.failures[1].kind, ResourceKind::Sandbox);
        assert_eq!(
            err.to_string(),
            "2 removal(s) failed: sandbox a: busy; sandbox b: busy"
        );
    }

    #[test]
    fn combined_errors_keep_context() {
        let inner = anyhow::anyhow!("connection refused").context("Failed to list containers");
        let err = GcErrors {
            errors: vec![inner],
        };
        assert_eq!(
            err.to_string(),
            "garbage collection incomplete: Failed to list containers: connection refused"
        );
    }
}
