//! Arbor CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Live project file-set tracking for script analysis engines", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory watched for filesystem changes (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Workspace configuration file
    #[arg(short, long, default_value = "arbor.json")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every project's current file set and exit
    Files {
        /// Restrict output to one project id
        #[arg(short, long)]
        project: Option<String>,
    },
    /// Resolve which project claims a file
    Resolve {
        file: PathBuf,
    },
    /// Keep the projects live and log updates until interrupted
    Watch,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "arbor={}",
            log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Files { project } => commands::files(cli.root, cli.config, project).await,
        Commands::Resolve { file } => commands::resolve(cli.root, cli.config, file).await,
        Commands::Watch => commands::watch(cli.root, cli.config).await,
        Commands::Version => {
            println!("Arbor v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
