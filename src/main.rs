//! Syllabus CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "syllabus")]
#[command(about = "Multi-tenant knowledge graph service for courses and topics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file (defaults to ./syllabus.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Keep everything in memory, ignoring the configured database
        #[arg(long)]
        memory: bool,
    },
    /// Create the database and import the default graph, then exit
    Init,
    /// Print a graph's full data as JSON
    Export {
        /// Graph id, or `default`
        #[arg(default_value = "default")]
        graph: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print counts for a graph
    Stats {
        /// Graph id, or `default`
        #[arg(default_value = "default")]
        graph: String,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Pick up DB_TYPE, DATA_DIR and friends from a local .env
    dotenvy::dotenv().ok();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "syllabus={log_level},syllabus_core={log_level},syllabus_sqlite={log_level},syllabus_server={log_level},tower_http={log_level}"
        ))
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = syllabus_core::Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { port, host, memory } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(host) = host {
                config.host = host;
            }
            if memory {
                config.db_type = syllabus_core::DbType::Memory;
            }
            tracing::info!("Syllabus v{}", env!("CARGO_PKG_VERSION"));
            commands::serve(config).await
        }
        Commands::Init => commands::init(&config),
        Commands::Export { graph, out } => commands::export(&config, &graph, out.as_deref()),
        Commands::Stats { graph } => commands::stats(&config, &graph),
        Commands::Version => {
            println!("Syllabus v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
