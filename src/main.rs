//! Fedwatch orchestrator - Main Entry Point
//!
//! Command-line front end for the query orchestration pipeline: load the
//! agent configuration, route a query, coordinate the selected agents, and
//! print the synthesized response.

use clap::{Parser, Subcommand};
use fedwatch::config::OrchestratorConfig;
use fedwatch::coordinator::LocalOperationTable;
use fedwatch::observability::init_default_logging;
use fedwatch::orchestrator::{Orchestrator, ProcessStatus};
use fedwatch::registry::AgentRegistry;
use fedwatch::transport::HttpTransport;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

/// Deterministic query routing and multi-agent coordination
#[derive(Parser)]
#[command(name = "fedwatch")]
#[command(about = "Routes economic data queries to specialized agents")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one query and print the synthesized response
    Query {
        /// The natural-language query text
        text: String,

        /// Session id to record the turn under (created when absent)
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Query { text, session } => run_query(config, &text, session.as_deref()).await,
        Commands::Config { show } => handle_config_command(config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<OrchestratorConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(OrchestratorConfig::load_from_file(path)?)
        }
        None => {
            // Try default locations
            let default_paths = ["fedwatch.toml", "config/fedwatch.toml"];

            for path_str in default_paths {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(OrchestratorConfig::load_from_file(&path)?);
                }
            }

            Err(
                "No configuration file found. Provide one with -c/--config or create fedwatch.toml"
                    .into(),
            )
        }
    }
}

async fn run_query(
    config: OrchestratorConfig,
    text: &str,
    session: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(config);
    let registry = Arc::new(AgentRegistry::from_config(&config)?);
    let transport = Arc::new(HttpTransport::new());

    // The binary dispatches to remote agents only; embedders register local
    // operations through the library API
    let orchestrator = Orchestrator::new(config, registry, transport, LocalOperationTable::new());

    let outcome = orchestrator.process(text, session).await;

    println!("{}", outcome.response_text);
    println!();
    println!("session: {}", outcome.session_id);
    if !outcome.agents_used.is_empty() {
        println!("agents: {}", outcome.agents_used.join(", "));
    }

    match outcome.status {
        ProcessStatus::Success => Ok(()),
        ProcessStatus::Error => Err("query processing failed".into()),
    }
}

fn handle_config_command(
    config: OrchestratorConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(&config)?);
    }

    info!("Configuration validation complete");
    Ok(())
}
