use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use metrics_viewer::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = cli::Cli::parse();
    let config_path = args.config.as_deref();

    // Dispatch to appropriate command handler
    match args.command {
        cli::Commands::View {
            host,
            scrape,
            refresh_interval,
            entity_label,
            histogram,
        } => {
            // The view installs its own file logger once the config is known
            commands::view::execute(
                config_path,
                host,
                scrape,
                refresh_interval,
                entity_label,
                histogram,
            )
            .await?;
        }
        cli::Commands::Dump { host, scrape, json } => {
            init_tracing("warn");
            commands::dump::execute(config_path, host, scrape, json).await?;
        }
        cli::Commands::Version => {
            println!("Metrics Viewer v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
