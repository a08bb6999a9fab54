pub mod args;
pub mod containers;
pub mod gc;
pub mod logs;
pub mod sandboxes;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Padding, Style, object::Columns},
};
use tracing::{info, warn};

use crate::config::Config;
use crate::gc::{ContainerGc, GcPolicy};
use crate::os::RealOs;
use crate::pods::KnownPods;
use crate::runtime::{Container, CrictlRuntime, Sandbox, age};
use args::{GlobalArgs, PolicyArgs, SourcesArgs};

/// Config file with command-line overrides applied.
pub fn load_config(global: &GlobalArgs) -> Result<Config> {
    let mut config = Config::load(global.config.as_deref())?;
    if let Some(endpoint) = &global.runtime_endpoint {
        config.runtime.endpoint = Some(endpoint.clone());
    }
    if let Some(pods_file) = &global.pods_file {
        config.pods_file = Some(pods_file.clone());
    }
    Ok(config)
}

/// The effective policy: config values overridden by flags.
pub fn resolve_policy(config: &Config, args: &PolicyArgs) -> GcPolicy {
    let mut policy = config.policy();
    if let Some(min_age) = args.min_age {
        policy.min_age = min_age;
    }
    if let Some(max) = args.max_per_pod_container {
        policy.max_per_pod_container = max;
    }
    if let Some(max) = args.max_containers {
        policy.max_containers = max;
    }
    policy
}

/// Without a pods file every pod would look deleted, so readiness cannot
/// be asserted.
pub fn resolve_sources_ready(config: &Config, args: &SourcesArgs) -> bool {
    if args.sources_ready && config.pods_file.is_none() {
        warn!("command:--sources-ready ignored without a pods file");
        eprintln!("warning: --sources-ready ignored because no pods file is configured");
        return false;
    }
    args.sources_ready
}

/// Wire the collector to crictl, the pods file and the real filesystem.
pub fn build_collector(config: &Config) -> Result<ContainerGc> {
    let runtime = CrictlRuntime::new(&config.runtime);
    let pods = match &config.pods_file {
        Some(path) => KnownPods::load(path)?,
        None => KnownPods::default(),
    };
    info!(
        runtime_endpoint = ?config.runtime.endpoint,
        known_pods = pods.len(),
        "command:collector ready"
    );
    Ok(ContainerGc::new(
        Arc::new(runtime),
        Arc::new(pods),
        Arc::new(RealOs),
        config.log_paths(),
    ))
}

fn format_age(now: SystemTime, created: SystemTime) -> String {
    // Whole seconds keep the column short
    let secs = age(now, created).as_secs();
    humantime::format_duration(Duration::from_secs(secs)).to_string()
}

#[derive(Tabled)]
struct SandboxRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "POD")]
    pod: String,
    #[tabled(rename = "NAMESPACE")]
    namespace: String,
    #[tabled(rename = "POD UID")]
    pod_uid: String,
    #[tabled(rename = "ATTEMPT")]
    attempt: u32,
    #[tabled(rename = "STATE")]
    state: String,
    #[tabled(rename = "AGE")]
    age: String,
}

#[derive(Tabled)]
struct ContainerRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "POD UID")]
    pod_uid: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "ATTEMPT")]
    attempt: u32,
    #[tabled(rename = "STATE")]
    state: String,
    #[tabled(rename = "AGE")]
    age: String,
}

#[derive(Tabled)]
struct PathRow {
    #[tabled(rename = "PATH")]
    path: String,
}

fn print_table<T: Tabled>(rows: Vec<T>) {
    let columns = T::LENGTH;
    let mut table = Table::new(rows);
    table
        .with(Style::blank())
        .modify(Columns::new(0..columns), Padding::new(0, 1, 0, 0));
    println!("{table}");
}

pub fn print_sandboxes(sandboxes: &[Sandbox]) {
    if sandboxes.is_empty() {
        println!("No sandboxes to remove");
        return;
    }
    let now = SystemTime::now();
    print_table(
        sandboxes
            .iter()
            .map(|s| SandboxRow {
                id: s.id.clone(),
                pod: s.pod.name.clone(),
                namespace: s.pod.namespace.clone(),
                pod_uid: s.pod.uid.clone(),
                attempt: s.attempt,
                state: s.state.to_string(),
                age: format_age(now, s.created_at),
            })
            .collect(),
    );
}

pub fn print_containers(containers: &[Container]) {
    if containers.is_empty() {
        println!("No containers to remove");
        return;
    }
    let now = SystemTime::now();
    print_table(
        containers
            .iter()
            .map(|c| ContainerRow {
                id: c.id.clone(),
                pod_uid: c.pod_uid.clone(),
                name: c.name.clone(),
                attempt: c.attempt,
                state: c.state.to_string(),
                age: format_age(now, c.created_at),
            })
            .collect(),
    );
}

pub fn print_paths(what: &str, paths: &[PathBuf]) {
    if paths.is_empty() {
        println!("No {what} to remove");
        return;
    }
    print_table(
        paths
            .iter()
            .map(|p| PathRow {
                path: p.display().to_string(),
            })
            .collect(),
    );
}
