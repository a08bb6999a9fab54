//! Runtime backend driving the CRI command line client (`crictl`).

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use tracing::debug;

use super::{
    Container, ContainerState, PodRef, RuntimeService, Sandbox, SandboxState,
    time_from_unix_nanos,
};
use crate::cmd::Cmd;
use crate::config::RuntimeConfig;

/// Label the node agent puts on every sandbox and container it creates.
/// Anything without it is not ours to collect.
const POD_UID_LABEL: &str = "io.kubernetes.pod.uid";

fn is_managed(labels: &HashMap<String, String>) -> bool {
    labels.contains_key(POD_UID_LABEL)
}

pub struct CrictlRuntime {
    binary: String,
    endpoint: Option<String>,
    timeout: Duration,
}

impl CrictlRuntime {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            binary: config.binary().to_string(),
            endpoint: config.endpoint.clone(),
            timeout: config.timeout(),
        }
    }

    /// Global flags shared by every invocation.
    fn global_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(endpoint) = &self.endpoint {
            args.push("--runtime-endpoint".to_string());
            args.push(endpoint.clone());
        }
        args.push("--timeout".to_string());
        args.push(format!("{}s", self.timeout.as_secs().max(1)));
        args
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let global = self.global_args();
        let global: Vec<&str> = global.iter().map(String::as_str).collect();
        Cmd::new(&self.binary)
            .args(&global)
            .args(args)
            .timeout(self.timeout)
            .run()
    }
}

impl RuntimeService for CrictlRuntime {
    fn name(&self) -> &'static str {
        "crictl"
    }

    fn list_sandboxes(&self) -> Result<Vec<Sandbox>> {
        let output = self.run(&["pods", "-o", "json"])?;
        let sandboxes = parse_sandboxes(&output)?;
        debug!(count = sandboxes.len(), "crictl:listed sandboxes");
        Ok(sandboxes)
    }

    fn list_containers(&self) -> Result<Vec<Container>> {
        let output = self.run(&["ps", "-a", "-o", "json"])?;
        let containers = parse_containers(&output)?;
        debug!(count = containers.len(), "crictl:listed containers");
        Ok(containers)
    }

    fn remove_sandbox(&self, id: &str) -> Result<()> {
        self.run(&["rmp", id])
            .with_context(|| format!("Failed to remove pod sandbox {}", id))?;
        Ok(())
    }

    fn remove_container(&self, id: &str) -> Result<()> {
        self.run(&["rm", id])
            .with_context(|| format!("Failed to remove container {}", id))?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct PodSandboxList {
    #[serde(default)]
    items: Vec<PodSandboxEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodSandboxEntry {
    id: String,
    #[serde(default)]
    metadata: PodSandboxMetadata,
    state: String,
    #[serde(deserialize_with = "int64_nanos")]
    created_at: i64,
    #[serde(default)]
    labels: HashMap<String, String>,
}

#[derive(Deserialize, Default)]
struct PodSandboxMetadata {
    #[serde(default)]
    name: String,
    #[serde(default)]
    uid: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    attempt: u32,
}

#[derive(Deserialize)]
struct ContainerList {
    #[serde(default)]
    containers: Vec<ContainerEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContainerEntry {
    id: String,
    #[serde(default)]
    pod_sandbox_id: String,
    #[serde(default)]
    metadata: ContainerMetadata,
    state: String,
    #[serde(deserialize_with = "int64_nanos")]
    created_at: i64,
    #[serde(default)]
    labels: HashMap<String, String>,
}

#[derive(Deserialize, Default)]
struct ContainerMetadata {
    #[serde(default)]
    name: String,
    #[serde(default)]
    attempt: u32,
}

/// Protobuf JSON encodes int64 as a decimal string; older clients emit numbers.
fn int64_nanos<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn parse_sandboxes(json: &str) -> Result<Vec<Sandbox>> {
    let list: PodSandboxList =
        serde_json::from_str(json).context("Failed to parse crictl pods output")?;
    Ok(list
        .items
        .into_iter()
        .filter(|entry| {
            let managed = is_managed(&entry.labels);
            if !managed {
                debug!(id = %entry.id, "crictl:skipping sandbox without pod uid label");
            }
            managed
        })
        .map(|entry| Sandbox {
            id: entry.id,
            pod: PodRef {
                namespace: entry.metadata.namespace,
                name: entry.metadata.name,
                uid: entry.metadata.uid,
            },
            attempt: entry.metadata.attempt,
            state: SandboxState::from_cri(&entry.state),
            created_at: time_from_unix_nanos(entry.created_at),
        })
        .collect())
}

fn parse_containers(json: &str) -> Result<Vec<Container>> {
    let list: ContainerList =
        serde_json::from_str(json).context("Failed to parse crictl ps output")?;
    Ok(list
        .containers
        .into_iter()
        .filter_map(|mut entry| {
            let Some(pod_uid) = entry.labels.remove(POD_UID_LABEL) else {
                debug!(id = %entry.id, "crictl:skipping container without pod uid label");
                return None;
            };
            Some(Container {
                id: entry.id,
                sandbox_id: entry.pod_sandbox_id,
                pod_uid,
                name: entry.metadata.name,
                attempt: entry.metadata.attempt,
                state: ContainerState::from_cri(&entry.state),
                created_at: time_from_unix_nanos(entry.created_at),
            })
        })
        .collect())
}
