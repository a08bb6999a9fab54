use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::gc::{GcPolicy, LogPaths};

/// System-wide config location, checked before the per-user one.
const SYSTEM_CONFIG_PATH: &str = "/etc/podgc/config.yaml";

/// How to reach the container runtime
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// CRI client binary. Default: "crictl"
    #[serde(default)]
    pub binary: Option<String>,

    /// Runtime endpoint passed to the client (e.g. unix:///run/containerd/containerd.sock).
    /// If not set, the client's own default is used.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Deadline for each runtime call. Default: 2m
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl RuntimeConfig {
    pub fn binary(&self) -> &str {
        self.binary.as_deref().unwrap_or("crictl")
    }

    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or(Duration::from_secs(120))
    }
}

/// Container garbage collection limits
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct GcConfig {
    /// Minimum age before a dead container or sandbox may be removed. Default: 0s
    #[serde(default, with = "humantime_serde")]
    pub min_age: Option<Duration>,

    /// Dead instances kept per container, -1 for unlimited. Default: 1
    #[serde(default)]
    pub max_per_pod_container: Option<i32>,

    /// Dead containers kept on the node, -1 for unlimited. Default: -1
    #[serde(default)]
    pub max_containers: Option<i32>,
}

/// Locations of container logs on the node
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct LogsConfig {
    /// Directory holding one sub-directory per pod UID. Default: /var/log/pods
    #[serde(default)]
    pub pod_logs_dir: Option<PathBuf>,

    /// Legacy directory of per-container log symlinks. Default: /var/log/containers
    #[serde(default)]
    pub container_logs_dir: Option<PathBuf>,
}

/// Configuration for podgc, read from YAML
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub gc: GcConfig,

    #[serde(default)]
    pub logs: LogsConfig,

    /// File listing the pods the node currently knows about
    #[serde(default)]
    pub pods_file: Option<PathBuf>,
}

impl Config {
    /// Load the config from `path`, or from the first standard location
    /// that exists. Missing files yield defaults; an explicit path must exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        debug!(path = ?path, "config:loading");
        let config = match path {
            Some(path) => Self::load_from_path(path)?
                .ok_or_else(|| anyhow::anyhow!("Config file not found: {}", path.display()))?,
            None => Self::default_locations()
                .iter()
                .find(|p| p.exists())
                .map(|p| Self::load_from_path(p))
                .transpose()?
                .flatten()
                .unwrap_or_default(),
        };
        debug!(config = ?config, "config:loaded");
        Ok(config)
    }

    /// Standard locations in lookup order
    fn default_locations() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(SYSTEM_CONFIG_PATH)];
        if let Some(home_dir) = home::home_dir() {
            paths.push(home_dir.join(".config/podgc/config.yaml"));
            paths.push(home_dir.join(".config/podgc/config.yml"));
        }
        paths
    }

    /// Load configuration from a specific path.
    fn load_from_path(path: &Path) -> anyhow::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        debug!(path = %path.display(), "config:reading file");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse config at {}: {}", path.display(), e))?;
        Ok(Some(config))
    }

    /// The collection policy with defaults applied.
    pub fn policy(&self) -> GcPolicy {
        let defaults = GcPolicy::default();
        GcPolicy {
            min_age: self.gc.min_age.unwrap_or(defaults.min_age),
            max_per_pod_container: self
                .gc
                .max_per_pod_container
                .unwrap_or(defaults.max_per_pod_container),
            max_containers: self.gc.max_containers.unwrap_or(defaults.max_containers),
        }
    }

    /// Log locations with defaults applied.
    pub fn log_paths(&self) -> LogPaths {
        let defaults = LogPaths::default();
        LogPaths {
            pod_logs_dir: self
                .logs
                .pod_logs_dir
                .clone()
                .unwrap_or(defaults.pod_logs_dir),
            container_logs_dir: self
                .logs
                .container_logs_dir
                .clone()
                .unwrap_or(defaults.container_logs_dir),
        }
    }
}
