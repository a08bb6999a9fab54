//! Container runtime abstraction.
//!
//! The collector only needs to list sandboxes and containers and to remove
//! them by id. Everything else about the runtime (creation, the wire
//! protocol) stays behind this trait.

pub mod crictl;
#[cfg(test)]
pub mod fake;
mod types;

use anyhow::Result;

pub use crictl::CrictlRuntime;
pub use types::*;

/// Inventory and removal operations the collector needs from a runtime.
///
/// Implementations must be Send + Sync to allow sharing via Arc<dyn RuntimeService>.
pub trait RuntimeService: Send + Sync {
    /// Returns the name of this backend (e.g., "crictl")
    fn name(&self) -> &'static str;

    /// List every pod sandbox known to the runtime, in any state.
    /// Always a fresh snapshot.
    fn list_sandboxes(&self) -> Result<Vec<Sandbox>>;

    /// List every container known to the runtime, in any state.
    /// Always a fresh snapshot.
    fn list_containers(&self) -> Result<Vec<Container>>;

    /// Remove a pod sandbox by id
    fn remove_sandbox(&self, id: &str) -> Result<()>;

    /// Remove a container by id
    fn remove_container(&self, id: &str) -> Result<()>;
}
