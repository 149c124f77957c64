use std::path::PathBuf;

use clap::Parser;
use jmc::{config::Config, Repository, Service};

mod commands;

/// Pick a place for lunch from your own restaurant list.
#[derive(Parser)]
#[command(name = "jmc", version)]
struct Cli {
    /// Path to the restaurant data file, overrides JMC_DATA_PATH
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Print debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Recommends a restaurant when omitted
    #[command(subcommand)]
    command: Option<commands::Command>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    let cli = Cli::parse();
    jmc::logging::init(if cli.verbose { "debug" } else { "warn" });

    let data_path = cli.data.unwrap_or(config.data_path);
    let service = Service::new(Repository::new(data_path));
    let command = cli.command.unwrap_or(commands::Command::Recommend);
    command.run(&service).await
}
