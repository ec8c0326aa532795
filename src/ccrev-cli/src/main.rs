mod cli;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.silent);

    match cli.command {
        Commands::Reverse(args) => {
            let config = Config::load()?;
            commands::reverse::handle(&args, &config, cli.verbose, cli.silent)?;
        }

        Commands::Inspect(args) => {
            let config = Config::load()?;
            commands::inspect::handle(&args, &config)?;
        }

        Commands::Uuid { command } => {
            commands::uuid::handle(command)?;
        }

        Commands::Configure {
            show,
            output_dir,
            indent_size,
        } => {
            commands::configure::handle(show, output_dir, indent_size)?;
        }
    }

    Ok(())
}

/// Log to stderr so stdout stays clean for reports
fn init_logging(verbose: bool, silent: bool) {
    let default = if silent {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
