use std::time::Duration;

use anyhow::Result;

use crate::config::Config;

pub fn run(config: &Config, min_age: Option<Duration>, dry_run: bool) -> Result<()> {
    let min_age = min_age.unwrap_or_else(|| config.policy().min_age);
    let gc = super::build_collector(config)?;

    if dry_run {
        super::print_sandboxes(&gc.plan_sandboxes(min_age)?);
        return Ok(());
    }

    gc.evict_sandboxes(min_age)?;
    println!("✓ Sandbox collection complete");
    Ok(())
}
