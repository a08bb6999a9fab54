mod cli;
mod cmd;
mod command;
mod config;
mod gc;
mod logger;
mod os;
mod pods;
mod runtime;

use anyhow::Result;
use tracing::{error, info};

fn main() -> Result<()> {
    let result = cli::run();
    match &result {
        Ok(()) => info!("podgc finished successfully"),
        Err(err) => error!(error = ?err, "podgc failed"),
    }
    result
}
