//! Revassign CLI - command line interface for the reviewer assignment engine
//!
//! Every command prints JSON on stdout. Logs go to stderr.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use humantime_serde::re::humantime::format_duration;
use revassign_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{output, PrArgs, Services, StatsArgs, TeamArgs, UserArgs};

/// Revassign: automatic reviewer assignment for team pull requests
#[derive(Parser, Debug)]
#[command(name = "revassign")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the database file (overrides config and env)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "REVASSIGN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Manage teams
    #[command(visible_alias = "t")]
    Team(TeamArgs),

    /// Manage users
    #[command(visible_alias = "u")]
    User(UserArgs),

    /// Manage pull requests
    Pr(PrArgs),

    /// Show reviewer assignment counts
    Stats(StatsArgs),

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(cli).await {
        Ok(()) => Ok(()),
        Err(err) => match err.downcast_ref::<revassign_core::Error>() {
            Some(domain) if domain.is_domain() => {
                println!("{}", output::error_json(domain));
                std::process::exit(1);
            }
            _ => Err(err),
        },
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load configuration with overrides
    let config = Config::load_with_overrides(cli.config.as_deref(), cli.db.clone())?;

    if cli.verbose {
        tracing::info!(
            db = %config.database.path.display(),
            timeout = ?config.assignment.operation_timeout,
            seed = ?config.assignment.seed,
            "Configuration loaded"
        );
    }

    let command = match cli.command {
        Some(Commands::Version) => {
            println!("revassign {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(Commands::Config) => {
            return show_config(&config, cli.config.as_deref());
        }
        None => {
            println!("revassign - reviewer assignment for team pull requests");
            println!();
            println!("Use --help for usage information");
            return Ok(());
        }
        Some(command) => command,
    };

    let services = Services::open(&config).await?;
    let result = match &command {
        Commands::Team(args) => args.execute(&services).await,
        Commands::User(args) => args.execute(&services).await,
        Commands::Pr(args) => args.execute(&services).await,
        Commands::Stats(args) => args.execute(&services).await,
        Commands::Version | Commands::Config => Ok(()),
    };
    services.close().await;
    result
}

fn show_config(config: &Config, explicit: Option<&std::path::Path>) -> anyhow::Result<()> {
    println!("Revassign Configuration");
    println!("=======================");
    println!();
    println!("Database Settings:");
    println!("  path: {}", config.database.path.display());
    println!("  max_connections: {}", config.database.max_connections);
    println!();
    println!("Assignment Settings:");
    println!(
        "  operation_timeout: {}",
        format_duration(config.assignment.operation_timeout)
    );
    match config.assignment.seed {
        Some(seed) => println!("  seed: {}", seed),
        None => println!("  seed: (random)"),
    }
    println!();

    let path = explicit
        .map(|p| p.to_path_buf())
        .or_else(Config::default_config_path);
    if let Some(path) = path {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_team_add() {
        let cli = Cli::try_parse_from([
            "revassign",
            "--db",
            "/tmp/r.db",
            "team",
            "add",
            "backend",
            "--member",
            "u1:alice",
            "-m",
            "u2:bob:inactive",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/r.db")));
        assert!(matches!(cli.command, Some(Commands::Team(_))));
    }

    #[test]
    fn test_set_active_needs_boolean() {
        assert!(Cli::try_parse_from(["revassign", "user", "set-active", "u1", "false"]).is_ok());
        assert!(Cli::try_parse_from(["revassign", "user", "set-active", "u1", "maybe"]).is_err());
    }
}
