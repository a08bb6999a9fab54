//! In-memory runtime used by tests. Removals mutate the stored snapshot so a
//! second pass observes the first pass's deletions.

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::{Result, anyhow, bail};

use super::{Container, RuntimeService, Sandbox};

#[derive(Default)]
pub struct FakeRuntime {
    sandboxes: Mutex<Vec<Sandbox>>,
    containers: Mutex<Vec<Container>>,
    failing: Mutex<HashSet<String>>,
    fail_listing: Mutex<bool>,
    removed: Mutex<Vec<String>>,
}

impl FakeRuntime {
    pub fn new(sandboxes: Vec<Sandbox>, containers: Vec<Container>) -> Self {
        Self {
            sandboxes: Mutex::new(sandboxes),
            containers: Mutex::new(containers),
            ..Default::default()
        }
    }

    /// Make removal of `id` fail
    pub fn fail_removal_of(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    /// Make every list call fail
    pub fn fail_listing(&self) {
        *self.fail_listing.lock().unwrap() = true;
    }

    pub fn sandbox_ids(&self) -> Vec<String> {
        let sandboxes = self.sandboxes.lock().unwrap();
        sandboxes.iter().map(|s| s.id.clone()).collect()
    }

    pub fn container_ids(&self) -> Vec<String> {
        let containers = self.containers.lock().unwrap();
        containers.iter().map(|c| c.id.clone()).collect()
    }

    /// Ids of everything removed so far, in removal order
    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }

    fn check_removal(&self, id: &str) -> Result<()> {
        if self.failing.lock().unwrap().contains(id) {
            bail!("injected failure removing {}", id);
        }
        Ok(())
    }

    fn check_listing(&self) -> Result<()> {
        if *self.fail_listing.lock().unwrap() {
            bail!("runtime unavailable");
        }
        Ok(())
    }
}

impl RuntimeService for FakeRuntime {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn list_sandboxes(&self) -> Result<Vec<Sandbox>> {
        self.check_listing()?;
        Ok(self.sandboxes.lock().unwrap().clone())
    }

    fn list_containers(&self) -> Result<Vec<Container>> {
        self.check_listing()?;
        Ok(self.containers.lock().unwrap().clone())
    }

    fn remove_sandbox(&self, id: &str) -> Result<()> {
        self.check_removal(id)?;
        let mut sandboxes = self.sandboxes.lock().unwrap();
        let before = sandboxes.len();
        sandboxes.retain(|s| s.id != id);
        if sandboxes.len() == before {
            return Err(anyhow!("sandbox {} not found", id));
        }
        self.removed.lock().unwrap().push(id.to_string());
        Ok(())
    }

    fn remove_container(&self, id: &str) -> Result<()> {
        self.check_removal(id)?;
        let mut containers = self.containers.lock().unwrap();
        let before = containers.len();
        containers.retain(|c| c.id != id);
        if containers.len() == before {
            return Err(anyhow!("container {} not found", id));
        }
        self.removed.lock().unwrap().push(id.to_string());
        Ok(())
    }
}
