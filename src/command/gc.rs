use anyhow::Result;

use crate::config::Config;

use super::args::{PolicyArgs, SourcesArgs};

pub fn run(config: &Config, policy: &PolicyArgs, sources: &SourcesArgs, dry_run: bool) -> Result<()> {
    let policy = super::resolve_policy(config, policy);
    let all_sources_ready = super::resolve_sources_ready(config, sources);
    let gc = super::build_collector(config)?;

    if dry_run {
        println!("Sandboxes:");
        super::print_sandboxes(&gc.plan_sandboxes(policy.min_age)?);
        println!("\nContainers:");
        super::print_containers(&gc.plan_containers(&policy, all_sources_ready)?);
        println!("\nPod log directories:");
        super::print_paths(
            "pod log directories",
            &gc.plan_pod_logs_directories(all_sources_ready)?,
        );
        println!("\nLog symlinks:");
        super::print_paths("log symlinks", &gc.plan_dangling_log_symlinks()?);
        return Ok(());
    }

    gc.garbage_collect(&policy, all_sources_ready)?;
    println!("✓ Garbage collection complete");
    Ok(())
}
