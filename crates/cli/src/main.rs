//! IKMS CLI: the main entry point.
//!
//! Commands:
//! - `init`    Write a default config file
//! - `serve`   Start the HTTP gateway
//! - `chat`    Index PDFs and ask questions in the terminal
//! - `ingest`  Index one PDF and report the chunk count

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "ikms",
    about = "IKMS: conversational question answering over your PDFs",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "IKMS_LOG_JSON")]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file to ~/.ikms/config.toml
    Init,

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Index PDFs, then ask questions interactively
    Chat {
        /// PDF files to index before the first question
        #[arg(long = "pdf", value_name = "FILE")]
        pdfs: Vec<PathBuf>,

        /// Continue under this session id instead of starting a new one
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Index a single PDF and report how many chunks it produced
    Ingest {
        /// Path to the PDF
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat { pdfs, session } => commands::chat::run(pdfs, session).await?,
        Commands::Ingest { file } => commands::ingest::run(file).await?,
    }

    Ok(())
}
