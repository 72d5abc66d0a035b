//! fanroute - Cost-ordered concurrent fan-out routing for LLM providers
//!
//! A CLI that fires a prompt at every configured provider at once and
//! prints the cheapest usable response with its token count and cost.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fanroute::{Error, ProviderCatalog, Router};

#[derive(Parser)]
#[command(name = "fanroute")]
#[command(about = "Cost-ordered concurrent fan-out routing for LLM providers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Route a prompt across all configured providers
    Route {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,

        /// The prompt to send
        prompt: String,
    },

    /// Validate configuration file
    Check {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,
    },

    /// Show configured providers and their rates
    Providers {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fanroute=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Route { config, prompt } => {
            tracing::info!(config = %config, "Loading provider catalog");
            let catalog = ProviderCatalog::load(&config)?;
            let router = Router::new(catalog);

            let winner = router.route(&prompt).await.map_err(Error::from)?;
            println!(
                "{}",
                serde_json::json!({
                    "modelUsed": winner.model_used,
                    "cost": winner.cost,
                    "tokens": winner.token_count,
                    "response": winner.response_text,
                })
            );
            Ok(())
        }

        Commands::Check { config } => {
            let catalog = ProviderCatalog::load(&config)?;
            println!(
                "Configuration OK: {} provider(s), {} attempt(s) per provider, {}s timeout",
                catalog.len(),
                catalog.routing().retries_per_provider,
                catalog.routing().attempt_timeout_secs
            );
            Ok(())
        }

        Commands::Providers { config } => {
            let catalog = ProviderCatalog::load(&config)?;
            for provider in catalog.providers() {
                println!(
                    "{:<24} {:>10.6}/1k tokens  {}",
                    provider.name, provider.cost_per_1k_tokens, provider.endpoint
                );
            }
            Ok(())
        }
    }
}
