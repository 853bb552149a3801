use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use umbrella::llm::{EmbeddingProviderFactory, LlmProviderFactory};
use umbrella::memory::{open_index, DecisionMemory};
use umbrella::{EmbeddingGenerator, RecommendationEngine, UmbrellaAgent, UmbrellaConfig, UmbrellaError, WeatherService};

#[derive(Parser)]
#[command(name = "umbrella")]
#[command(about = "Umbrella recommendations from live weather and your past decisions")]
#[command(after_help = "Requirements:\n  - Set GOOGLE_API_KEY in .env file\n  - Set OPENWEATHER_API_KEY in .env file")]
struct Cli {
    /// Show debug output for every agent step
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// TOML config file (defaults to ./umbrella.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the weather and recommend whether to bring an umbrella
    Recommend {
        /// Location to get weather for (e.g. "Jakarta", "New York")
        #[arg(long, short = 'l')]
        location: String,

        #[arg(long, short = 'u')]
        user_id: String,
    },

    /// Show a user's stored decisions
    History {
        #[arg(long, short = 'u')]
        user_id: String,

        #[arg(long)]
        limit: Option<usize>,

        /// Newest first instead of relevance-ranked
        #[arg(long)]
        chronological: bool,
    },

    /// Show a user's aggregate statistics as JSON
    Stats {
        #[arg(long, short = 'u')]
        user_id: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
    }

    if let Err(e) = run(cli).await {
        eprintln!("\n❌ Error: {e}");
        eprintln!("\nTroubleshooting:");
        eprintln!("1. Make sure you have created a .env file with your API keys");
        eprintln!("2. Check that your API keys are valid");
        eprintln!("3. Ensure you have internet connection");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "umbrella=debug" } else { "umbrella=info" };
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)?,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()?;
    Ok(())
}

async fn run(cli: Cli) -> umbrella::Result<()> {
    let config = UmbrellaConfig::load(cli.config.as_deref())?;

    let index = open_index(&config)?;
    let embedder = Arc::new(EmbeddingProviderFactory::from_config(&config));
    let memory = Arc::new(DecisionMemory::new(index, embedder.clone()));

    match cli.command {
        Command::Recommend { location, user_id } => {
            config.validate()?;
            let weather = Arc::new(WeatherService::from_config(&config)?);
            let engine = RecommendationEngine::new(LlmProviderFactory::from_config(&config)?);
            let agent = UmbrellaAgent::new(weather, memory, engine, config.history_limit);

            println!("🤖 Umbrella Reminder AI Agent");
            println!("{}", "=".repeat(50));

            tokio::select! {
                result = agent.run(&location, &user_id) => {
                    println!("\n{}", "=".repeat(50));
                    println!("{result}");
                }
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    return Err(UmbrellaError::Cancelled);
                }
            }
        }
        Command::History {
            user_id,
            limit,
            chronological,
        } => {
            let limit = limit.unwrap_or(config.history_limit);
            let history = if chronological {
                memory.try_recent_history(&user_id, limit).await?
            } else {
                memory.try_history(&user_id, limit).await?
            };
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        Command::Stats { user_id } => {
            let stats = memory.try_stats(&user_id).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    log_embedding_usage(&embedder);
    Ok(())
}

fn log_embedding_usage(embedder: &EmbeddingGenerator) {
    let stats = embedder.cache_stats();
    debug!(
        "Embeddings via {}/{} (fallback={}): {} hits, {} misses, {} cached, hit rate {:.2}",
        embedder.provider(),
        embedder.model(),
        embedder.is_using_fallback(),
        stats.hits,
        stats.misses,
        stats.size,
        stats.hit_rate()
    );
}
