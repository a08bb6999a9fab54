use std::path::PathBuf;
use std::time::Duration;

#[derive(clap::Args, Debug)]
pub struct GlobalArgs {
    /// Path to the config file (default: /etc/podgc/config.yaml, then ~/.config/podgc/config.yaml)
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Container runtime endpoint, overriding the config file
    #[arg(long, global = true)]
    pub runtime_endpoint: Option<String>,

    /// YAML or JSON list of the pods the node knows about, overriding the config file
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub pods_file: Option<PathBuf>,

    /// Mirror logs to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(clap::Args, Debug)]
pub struct PolicyArgs {
    /// Minimum age of a dead container before it may be removed (e.g. 30s, 5m, 1h)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub min_age: Option<Duration>,

    /// Dead instances kept per container in a pod; -1 for unlimited
    #[arg(long, allow_negative_numbers = true)]
    pub max_per_pod_container: Option<i32>,

    /// Dead containers kept on the node; -1 for unlimited
    #[arg(long, allow_negative_numbers = true)]
    pub max_containers: Option<i32>,
}

#[derive(clap::Args, Debug)]
pub struct SourcesArgs {
    /// Assert that the pods file lists every pod bound to this node
    #[arg(long)]
    pub sources_ready: bool,
}

#[derive(clap::Args, Debug)]
pub struct DryRunArgs {
    /// Print what would be removed without removing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}
