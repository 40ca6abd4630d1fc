// for the quick data allocation on memory
#[global_allocator]
static ALLOC: rpmalloc::RpMalloc = rpmalloc::RpMalloc;

mod app;
mod arbitrage;
mod config;
mod enums;
mod exchange;
mod models;
mod quotes;
mod scheduler;
mod utils;

use std::time::Duration;

use config::Config;
use anyhow::{ Context, Result };

use utils::logging;

const API_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
enum Command {
    Run,
    Paths,
}

fn main() -> Result<()> {
    let command = match std::env::args().nth(1).as_deref() {
        Some("paths") => Command::Paths,
        _ => Command::Run,
    };

    let config = Config::from_env().context("Failed to load configuration from environment")?;

    logging
        ::init_logging(config.log_level, config.debug, &config.log_config)
        .context("Failed to initialize logging system")?;

    match command {
        Command::Run => app::normal_mode::run_normal_mode(config)?,
        Command::Paths => app::paths_mode::run_paths_mode(config)?,
    }

    Ok(())
}
