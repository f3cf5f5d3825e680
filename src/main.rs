use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::{Path, PathBuf};
use tracing::info;

use deal_aggregator::{
    web::{self, AppState, DealsView},
    Aggregator, AppConfig, ConnectorRegistry, DealKind, Platform, RankingConfig, SearchOptions,
    SortBy,
};

#[derive(Parser, Debug)]
#[command(version, about = "Multi-marketplace product search and deal ranking", long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the config/ directory
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Run one aggregated search and print the result as JSON
    Search {
        query: String,
        /// Comma separated platform tags, e.g. "ebay,walmart"
        #[arg(long)]
        platforms: Option<String>,
        #[arg(long)]
        max_results: Option<usize>,
        #[arg(long, default_value = "relevance")]
        sort_by: SortBy,
        /// Print a ranked deal view instead of the raw result
        #[arg(long)]
        deals: Option<DealKind>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize tracing
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("deal_aggregator=debug".parse()?),
        )
        .init();

    let config = load_config(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("failed to load config from {}", path.display()),
        None => "failed to load configuration".to_string(),
    })?;

    let registry = ConnectorRegistry::new();
    registry
        .initialize_default_connectors(&config.connectors, config.aggregator.connector_timeout())
        .await?;
    let aggregator = Aggregator::new(registry.clone(), config.aggregator.clone());

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!("Starting deal aggregator...");
            let metrics = install_metrics(&config)?;
            let state = AppState::new(aggregator, &config, metrics);
            web::serve(state, &config.server).await?;
        }
        Command::Search {
            query,
            platforms,
            max_results,
            sort_by,
            deals,
            limit,
        } => {
            let mut options = SearchOptions::default()
                .with_max_results(max_results.unwrap_or(0))
                .with_sort_by(sort_by);
            if let Some(raw) = platforms {
                options = options.with_platforms(Platform::parse_list(&raw));
            }

            let result = aggregator.search(&query, &options).await;
            let output = match deals {
                Some(kind) => {
                    let ranking = RankingConfig {
                        review_count_offset: config.ranking.review_count_offset,
                    };
                    let limit = limit.unwrap_or(config.ranking.default_deal_limit);
                    let products = kind.rank(&result.products, limit, &ranking);
                    serde_json::to_string_pretty(&DealsView::new(kind, query, products, &result))?
                }
                None => serde_json::to_string_pretty(&result)?,
            };
            println!("{}", output);

            if !result.success {
                registry.shutdown().await?;
                anyhow::bail!(
                    "search failed: {}",
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    registry.shutdown().await?;
    info!("Shutting down...");
    Ok(())
}

fn load_config(path: Option<&Path>) -> deal_aggregator::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

fn install_metrics(config: &AppConfig) -> Result<Option<PrometheusHandle>> {
    if !config.metrics.enabled {
        return Ok(None);
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    info!("Metrics exposed at {}", config.metrics.endpoint);
    Ok(Some(handle))
}
