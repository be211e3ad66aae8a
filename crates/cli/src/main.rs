//! QAKit CLI - Main Entry Point
//!
//! Inspect resolved test environments and call the configured services.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use qakit_cli::commands::{booking, env, graphql, objects, ping};
use qakit_cli::{logging, output};
use qakit_common::{EnvironmentConfig, ProcessEnv};

/// QAKit CLI - API test automation toolkit
#[derive(Parser)]
#[command(name = "qakit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Environment name (overrides TEST_ENV)
    #[arg(long, global = true)]
    env: Option<String>,

    /// Directory holding the .env files
    #[arg(long, env = "QAKIT_CONFIG_DIR", default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the resolved environment
    Env,

    /// Health-check every configured service
    Ping,

    /// Booking service calls
    #[command(subcommand)]
    Booking(booking::BookingCommands),

    /// Device-object service calls
    #[command(subcommand)]
    Objects(objects::ObjectsCommands),

    /// GraphQL calls
    #[command(subcommand)]
    Graphql(graphql::GraphqlCommands),

    /// Show version information
    Version,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Env => "env",
            Commands::Ping => "ping",
            Commands::Booking(_) => "booking",
            Commands::Objects(_) => "objects",
            Commands::Graphql(_) => "graphql",
            Commands::Version => "version",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = EnvironmentConfig::resolve_in(cli.env.as_deref(), &cli.config_dir, &ProcessEnv);

    logging::init(cli.verbose, &config);
    debug!("Running '{}' against environment '{}'", cli.command.name(), config.name);

    match cli.command {
        Commands::Env => env::execute(&config, cli.format)?,
        Commands::Ping => ping::execute(&config, cli.format).await?,
        Commands::Booking(cmd) => booking::execute(cmd, &config, cli.format).await?,
        Commands::Objects(cmd) => objects::execute(cmd, &config, cli.format).await?,
        Commands::Graphql(cmd) => graphql::execute(cmd, &config, cli.format).await?,
        Commands::Version => {
            println!("QAKit CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Library v{}", qakit_common::VERSION);
        }
    }

    Ok(())
}
