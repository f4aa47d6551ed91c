//! Braid CLI - Command line interface for Braid
//!
//! Inspect repos, issues and pull requests, or host the workflow engine
//! behind a JSON-lines bridge with `braid serve`.

mod bridge;
mod commands;

use std::path::PathBuf;

use braid_core::{Config, SendMode};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{IssueArgs, PrArgs, RepoArgs};

/// Braid: issue and pull-request workflows across chat platforms
#[derive(Parser, Debug)]
#[command(name = "braid")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Data directory holding repos and the database (overrides config and env)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Prompt send mode, `manual` or `auto` (overrides config and env)
    #[arg(long, global = true)]
    send_mode: Option<SendMode>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Show current configuration
    Config,

    /// Manage repositories
    Repo(RepoArgs),

    /// Inspect issues
    Issue(IssueArgs),

    /// Inspect pull requests
    Pr(PrArgs),

    /// Run the engine behind a JSON-lines bridge on stdin/stdout
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries the bridge protocol, so logs go to stderr
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = Config::load_with_overrides(cli.data_dir.clone(), cli.send_mode)?;

    if cli.verbose {
        tracing::info!(
            data_dir = %config.storage.data_dir.display(),
            send_mode = ?config.workflow.send_mode,
            target_branch = %config.git.target_branch,
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("braid {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Config) => print_config(&config),
        Some(Commands::Repo(args)) => args.execute(&config).await?,
        Some(Commands::Issue(args)) => args.execute(&config).await?,
        Some(Commands::Pr(args)) => args.execute(&config).await?,
        Some(Commands::Serve) => bridge::serve(&config).await?,
        None => {
            println!("Braid - issue and pull-request workflows across chat platforms");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn print_config(config: &Config) {
    println!("Braid Configuration");
    println!("===================");
    println!();
    println!("Storage:");
    println!("  data_dir: {}", config.storage.data_dir.display());
    println!("  repos: {}", config.repos_dir().display());
    println!("  database: {}", config.database_path().display());
    println!();
    println!("Git:");
    println!("  author: {} <{}>", config.git.author_name, config.git.author_email);
    println!("  target_branch: {}", config.git.target_branch);
    println!();
    println!("Workflow:");
    println!("  send_mode: {:?}", config.workflow.send_mode);
    println!("  poll_interval: {:?}", config.reader.poll_interval);
    println!("  stable_polls: {}", config.reader.stable_polls);
    println!("  delivery_timeout: {:?}", config.bridge.delivery_timeout);
    println!();
    if let Some(path) = Config::default_config_path() {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
}
