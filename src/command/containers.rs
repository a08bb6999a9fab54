use anyhow::Result;

use crate::config::Config;

use super::args::{PolicyArgs, SourcesArgs};

pub fn run(config: &Config, policy: &PolicyArgs, sources: &SourcesArgs, dry_run: bool) -> Result<()> {
    let policy = super::resolve_policy(config, policy);
    let all_sources_ready = super::resolve_sources_ready(config, sources);
    let gc = super::build_collector(config)?;

    if dry_run {
        super::print_containers(&gc.plan_containers(&policy, all_sources_ready)?);
        return Ok(());
    }

    gc.evict_containers(&policy, all_sources_ready)?;
    println!("✓ Container collection complete");
    Ok(())
}
