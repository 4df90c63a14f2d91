use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod errors;
mod output;

use config::{load_config, resolve_paths};
use output::OutputFormat;

/// Command-line front end for the Brain Synapse memory engine.
#[derive(Parser)]
#[command(name = "brain-synapse")]
#[command(about = "Agent-local associative memory engine")]
#[command(version, long_about = None)]
struct Cli {
    /// Engine directory (default: $BRAIN_SYNAPSE_DIR or ./.brain-synapse)
    #[arg(long, value_name = "DIR")]
    engine_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Enable verbose (debug-level) logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the distillation pipeline over un-archived daily logs
    Distill {
        /// Include today's (still in-progress) log
        #[arg(short, long)]
        force: bool,
    },
    /// Run the recall pipeline for a query
    Recall {
        query: String,
        /// Also run deep (cold-store) recall
        #[arg(short, long)]
        deep: bool,
    },
    /// Run deep recall standalone, reviving matching latent concepts
    DeepRecall { query: String },
    /// Summary statistics over the latent (cold) store
    LatentStats,
    /// Apply LTD decay and demotion, then persist
    Forget,
    /// Upsert a pinned rule: `<keyword>:<rule>`
    PinExp { arg: String },
    /// Insert an explicit pinned memory: `<concept>:<content>` or `<concept> <content>`
    Memorize { args: Vec<String> },
    /// List all pinned rules
    GetPinned,
    /// List the top-N hot concepts by weight
    GetTopConcepts {
        #[arg(default_value_t = 5)]
        n: usize,
    },
    /// Ingest an externally supplied session trace and run Observer batch promotion
    Observe {
        /// Trace file (JSON lines); reads stdin when omitted
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let paths = resolve_paths(cli.engine_dir.as_deref());
    let config = load_config(&paths)?;

    match cli.command {
        Commands::Distill { force } => commands::run_distill(&paths, &config, force, cli.format).await,
        Commands::Recall { query, deep } => {
            commands::run_recall(&paths, &config, &query, deep, cli.format).await
        }
        Commands::DeepRecall { query } => {
            commands::run_deep_recall(&paths, &config, &query, cli.format).await
        }
        Commands::LatentStats => commands::run_latent_stats(&paths, cli.format).await,
        Commands::Forget => commands::run_forget(&paths, &config, cli.format).await,
        Commands::PinExp { arg } => commands::run_pin_exp(&paths, &arg, cli.format).await,
        Commands::Memorize { args } => commands::run_memorize(&paths, &config, &args, cli.format).await,
        Commands::GetPinned => commands::run_get_pinned(&paths, cli.format).await,
        Commands::GetTopConcepts { n } => commands::run_get_top_concepts(&paths, n, cli.format).await,
        Commands::Observe { file } => {
            commands::run_observe(&paths, &config, file.as_deref(), cli.format).await
        }
    }
}
