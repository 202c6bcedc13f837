//! herakles-proc-sampler - version 0.1.0
//!
//! Per-process CPU and memory sampler with tracing logging.
//! This is the main entry point that resolves configuration and dispatches subcommands.

mod cli;
mod commands;

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use cli::{resolve_config, resolve_log_level, show_config, Args, Commands, LogLevel};
use commands::{command_check, command_list, command_once, command_pid, command_run};
use herakles_proc_sampler::{SamplerConfig, Stats};

/// Initializes tracing logging subsystem with the effective log level.
fn setup_logging(level: LogLevel) -> anyhow::Result<()> {
    let Some(max_level) = level.as_tracing_level() else {
        return Ok(());
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Logging initialized with level: {:?}", level);
    Ok(())
}

/// Loads the effective configuration, exiting with status 1 if it is invalid.
fn load_validated_config(args: &Args) -> SamplerConfig {
    let config = match resolve_config(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = config.validate() {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_validated_config(&args);

    if args.check_config {
        println!("✅ Configuration is valid");
        return Ok(());
    }
    if args.show_config {
        return show_config(&config, args.config_format);
    }

    setup_logging(resolve_log_level(&args, &config))?;
    debug!("Effective configuration: {:?}", config);

    let command = args.command.unwrap_or(Commands::Once { pretty: true });
    if let Commands::Check = command {
        return command_check(&config);
    }

    let stats = match Stats::new(&config) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("❌ Configuration invalid: {}", e);
            std::process::exit(1);
        }
    };

    match command {
        Commands::Run { .. } => {
            let period = Duration::from_secs(config.interval_seconds);
            command_run(Arc::new(stats), period).await
        }
        Commands::Once { pretty } => command_once(&stats, pretty).await,
        Commands::Pid { pid } => command_pid(&stats, pid).await,
        Commands::List => command_list(&stats),
        Commands::Check => unreachable!("Check handled above"),
    }
}
