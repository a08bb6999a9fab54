//! Pod liveness lookups.
//!
//! The node agent owns the authoritative pod set; the collector only asks
//! whether a UID is still part of it.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pod {
    pub uid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

/// Answers "does the pod with this UID still exist on the node?".
/// Absence is not an error, just `None`.
pub trait PodGetter: Send + Sync {
    fn get_pod_by_uid(&self, uid: &str) -> Option<Pod>;

    fn is_pod_deleted(&self, uid: &str) -> bool {
        self.get_pod_by_uid(uid).is_none()
    }
}

/// A fixed set of pods keyed by UID.
#[derive(Debug, Default, Clone)]
pub struct KnownPods {
    pods: HashMap<String, Pod>,
}

impl KnownPods {
    pub fn new(pods: impl IntoIterator<Item = Pod>) -> Self {
        Self {
            pods: pods.into_iter().map(|p| (p.uid.clone(), p)).collect(),
        }
    }

    /// Load a YAML (or JSON) list of pods.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "pods:reading file");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read pods file {}", path.display()))?;
        let pods: Vec<Pod> = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse pods file {}", path.display()))?;
        debug!(count = pods.len(), "pods:loaded");
        Ok(Self::new(pods))
    }

    pub fn len(&self) -> usize {
        self.pods.len()
    }
}

impl PodGetter for KnownPods {
    fn get_pod_by_uid(&self, uid: &str) -> Option<Pod> {
        self.pods.get(uid).cloned()
    }
}
