use std::time::Duration;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use tracing::info;

use crate::command::args::{DryRunArgs, GlobalArgs, PolicyArgs, SourcesArgs};
use crate::{command, logger};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "podgc")]
#[command(about = "Garbage collect dead pod sandboxes, exited containers and stale pod logs")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full pass: sandboxes, containers, pod log directories, log symlinks
    Gc {
        #[command(flatten)]
        policy: PolicyArgs,

        #[command(flatten)]
        sources: SourcesArgs,

        #[command(flatten)]
        dry_run: DryRunArgs,
    },

    /// Remove sandboxes that are not ready and hold no containers
    Sandboxes {
        /// Minimum sandbox age before removal (e.g. 30s, 5m, 1h)
        #[arg(long, value_parser = humantime::parse_duration)]
        min_age: Option<Duration>,

        #[command(flatten)]
        dry_run: DryRunArgs,
    },

    /// Remove exited containers beyond the retention limits
    Containers {
        #[command(flatten)]
        policy: PolicyArgs,

        #[command(flatten)]
        sources: SourcesArgs,

        #[command(flatten)]
        dry_run: DryRunArgs,
    },

    /// Remove log directories of deleted pods and dangling log symlinks
    Logs {
        #[command(flatten)]
        sources: SourcesArgs,

        #[command(flatten)]
        dry_run: DryRunArgs,
    },

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        generate_completions(shell);
        return Ok(());
    }

    logger::init(cli.global.verbose)?;
    info!(args = ?std::env::args().collect::<Vec<_>>(), "podgc start");
    let config = command::load_config(&cli.global)?;

    match cli.command {
        Commands::Gc {
            policy,
            sources,
            dry_run,
        } => command::gc::run(&config, &policy, &sources, dry_run.dry_run),
        Commands::Sandboxes { min_age, dry_run } => {
            command::sandboxes::run(&config, min_age, dry_run.dry_run)
        }
        Commands::Containers {
            policy,
            sources,
            dry_run,
        } => command::containers::run(&config, &policy, &sources, dry_run.dry_run),
        Commands::Logs { sources, dry_run } => {
            command::logs::run(&config, &sources, dry_run.dry_run)
        }
        Commands::Completions { .. } => Ok(()),
    }
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn negative_limits_parse() {
        let cli = Cli::try_parse_from([
            "podgc",
            "containers",
            "--max-per-pod-container",
            "-1",
            "--max-containers",
            "-1",
            "--min-age",
            "90s",
        ])
        .unwrap();
        match cli.command {
            Commands::Containers { policy, .. } => {
                assert_eq!(policy.max_per_pod_container, Some(-1));
                assert_eq!(policy.max_containers, Some(-1));
                assert_eq!(policy.min_age, Some(Duration::from_secs(90)));
            }
            _ => panic!("expected containers command"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "podgc",
            "gc",
            "--dry-run",
            "--pods-file",
            "/tmp/pods.yaml",
            "-v",
        ])
        .unwrap();
        assert!(cli.global.verbose);
        assert_eq!(
            cli.global.pods_file,
            Some(std::path::PathBuf::from("/tmp/pods.yaml"))
        );
        assert!(matches!(
            cli.command,
            Commands::Gc {
                dry_run: DryRunArgs { dry_run: true },
                ..
            }
        ));
    }
}
