use anyhow::Result;

use crate::config::Config;

use super::args::SourcesArgs;

/// Collect pod log directories, then dangling legacy log symlinks.
pub fn run(config: &Config, sources: &SourcesArgs, dry_run: bool) -> Result<()> {
    let all_sources_ready = super::resolve_sources_ready(config, sources);
    let gc = super::build_collector(config)?;

    if dry_run {
        super::print_paths(
            "pod log directories",
            &gc.plan_pod_logs_directories(all_sources_ready)?,
        );
        super::print_paths("log symlinks", &gc.plan_dangling_log_symlinks()?);
        return Ok(());
    }

    gc.evict_logs(all_sources_ready)?;
    println!("✓ Log collection complete");
    Ok(())
}
