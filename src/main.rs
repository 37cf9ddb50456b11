//! CLI entry point for tickrag.
//!
//! Builds or loads the company knowledge-base index and runs queries against
//! it. Log output goes to stderr so command output on stdout stays clean.

use anyhow::{Context, Result, bail};
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tickrag::config::Settings;
use tickrag::display::{
    THEME, create_index_table, create_results_table, create_spinner, create_status_table,
};
use tickrag::semantic::{CorpusStore, IndexMetadata, RetrievalService, ServiceState};
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Semantic retrieval over a knowledge base of listed companies
#[derive(Parser)]
#[command(
    name = "tickrag",
    version = env!("CARGO_PKG_VERSION"),
    about = "Semantic retrieval over a knowledge base of listed companies",
    long_about = "Build an embedding index from company records and retrieve grounding context for questions.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Examples:\n  tickrag init\n  tickrag index\n  tickrag search \"semiconductor companies in California\" --limit 10\n  tickrag context \"which banks are in the index?\"\n  tickrag status --json\n  tickrag status --live"
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (overrides logging.level)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Initialize project
    #[command(about = "Set up .tickrag directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Build or load the index
    #[command(about = "Build the index from company records, or load the saved one")]
    Index {
        /// Discard the saved index and rebuild from scratch
        #[arg(short, long)]
        force: bool,
    },

    /// Rank documents against a query
    #[command(about = "Show ranked documents with similarity scores")]
    Search {
        /// Natural-language query
        query: String,

        /// Maximum number of results (defaults to semantic.top_k)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the context block a language model would receive
    #[command(about = "Print the deduplicated context block for a query")]
    Context {
        /// Natural-language query
        query: String,

        /// Number of search results considered (defaults to semantic.top_k)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show index status
    #[command(about = "Report the saved index without loading the model")]
    Status {
        /// Output status as JSON
        #[arg(long)]
        json: bool,

        /// Initialize the service (load or build) and report its health
        #[arg(long)]
        live: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings from .tickrag/settings.toml")]
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{}", THEME.error_with_icon(&format!("{e:#}")));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path).map_err(|e| {
            anyhow::anyhow!("Configuration error loading from {}: {e}", path.display())
        })?,
        None => Settings::load().map_err(|e| anyhow::anyhow!("Configuration error: {e}"))?,
    };

    init_logging(&settings.logging.level, cli.debug || settings.debug)?;

    match cli.command {
        Commands::Init { force } => {
            let path = Settings::init_config_file(force)
                .map_err(|e| anyhow::anyhow!("{e}"))
                .context("Could not create configuration file")?;
            println!(
                "{}",
                THEME.success_with_icon(&format!("Created configuration file at: {}", path.display()))
            );
            println!("Edit this file to customize your settings.");
        }

        Commands::Config => {
            println!("Current Configuration:");
            println!("{}", "=".repeat(50));
            println!("{}", toml::to_string_pretty(&settings)?);
        }

        Commands::Index { force } => {
            let store = CorpusStore::new(settings.index_dir());
            if force {
                store.clear().context("Could not clear the saved index")?;
                tracing::info!(path = %store.dir().display(), "cleared saved index");
            }

            let started = Instant::now();
            let service = start(&settings).await?;
            let status = service.get_status();
            println!(
                "{}",
                THEME.success_with_icon(&format!(
                    "Index ready: {} documents in {:.1}s",
                    status.total_documents,
                    started.elapsed().as_secs_f32()
                ))
            );
            if let Ok(metadata) = IndexMetadata::load(store.dir()) {
                println!(
                    "  model {} ({} dimensions) at {}",
                    metadata.model_name,
                    metadata.dimension,
                    THEME.apply(&THEME.path, store.dir().display())
                );
            }
        }

        Commands::Search { query, limit, json } => {
            let service = start(&settings).await?;
            let results = service.search(&query, limit.unwrap_or(settings.semantic.top_k));

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("{}", THEME.warning_with_icon("No results"));
            } else {
                println!("{}", create_results_table(&results));
                let best = &results[0];
                println!(
                    "Best match: {} {}",
                    THEME.apply(&THEME.ticker, &best.document.symbol),
                    THEME.apply(THEME.score_style(best.score), format!("{:.4}", best.score))
                );
            }
        }

        Commands::Context { query, limit } => {
            let service = start(&settings).await?;
            let context = match limit {
                Some(limit) => service.get_context_with_limit(&query, limit),
                None => service.get_context_async(&query).await,
            };

            if context.is_empty() {
                eprintln!("{}", THEME.warning_with_icon("No context found"));
            } else {
                println!("{context}");
            }
        }

        Commands::Status { json, live: false } => {
            let summary = CorpusStore::new(settings.index_dir()).summary();
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                let verdict = if summary.complete {
                    THEME.success_with_icon("Saved index found")
                } else {
                    THEME.warning_with_icon("No complete index saved; run `tickrag index`")
                };
                println!("{verdict}");
                println!("{}", create_index_table(&summary));
            }
        }

        Commands::Status { json, live: true } => {
            let service = Arc::new(RetrievalService::from_settings(&settings));
            service.initialize();
            let spinner = create_spinner("Loading index...");
            service.wait_ready().await;
            spinner.finish_and_clear();

            let status = service.get_status();
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!(
                    "Service {}",
                    THEME.apply(THEME.state_style(status.state), status.state)
                );
                println!("{}", create_status_table(&status));
                if let Some(error) = service.init_error() {
                    for suggestion in error.recovery_suggestions() {
                        println!("  {}", THEME.apply(&THEME.dim, suggestion));
                    }
                }
            }
        }
    }

    Ok(())
}

/// Initializes the service behind a spinner and fails if it ends up `Failed`.
async fn start(settings: &Settings) -> Result<Arc<RetrievalService>> {
    let service = Arc::new(RetrievalService::from_settings(settings));
    service.initialize();

    let spinner = create_spinner("Loading embedding model and index...");
    let state = service.wait_ready().await;
    spinner.finish_and_clear();

    if state != ServiceState::Ready {
        let suggestions = service
            .init_error()
            .map(|e| e.recovery_suggestions().join("\n  "))
            .unwrap_or_default();
        let error = service.get_status().error.unwrap_or_default();
        bail!("Retrieval service {state}: {error}\n  {suggestions}");
    }

    Ok(service)
}

fn init_logging(level: &str, debug: bool) -> Result<()> {
    let default_level = if debug {
        Level::DEBUG
    } else {
        level
            .parse::<Level>()
            .with_context(|| format!("Invalid logging.level '{level}'"))?
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    Ok(())
}
