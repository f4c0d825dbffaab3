use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use market_feed::data::ingestion::{
    DEFAULT_CHART_BASE_URL, DEFAULT_NEWS_BASE_URL, DEFAULT_NEWS_COUNT,
};
use market_feed::data::YahooProvider;
use market_feed::pipeline::{ArtifactStore, DataKind, NewsPipeline, PricePipeline};
use market_feed::SymbolTickerMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "market-feed")]
#[command(about = "Fetch stock news and daily prices into static JSON artifacts")]
struct Cli {
    /// JSON object mapping symbol codes to provider tickers
    #[arg(long, env = "TICKERS_PATH", default_value = "scripts/tickers.json", global = true)]
    tickers: PathBuf,

    /// Output root; artifacts go to <OUT_DIR>/news and <OUT_DIR>/prices
    #[arg(long, env = "DATA_OUT_DIR", default_value = "public/data", global = true)]
    out_dir: PathBuf,

    #[arg(long, env = "NEWS_BASE_URL", default_value = DEFAULT_NEWS_BASE_URL, global = true)]
    news_base_url: String,

    #[arg(long, env = "CHART_BASE_URL", default_value = DEFAULT_CHART_BASE_URL, global = true)]
    chart_base_url: String,

    /// Articles requested per ticker (at most 20 are kept)
    #[arg(long, default_value_t = DEFAULT_NEWS_COUNT, global = true)]
    news_count: u32,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Fetch recent news articles
    News,
    /// Fetch one year of daily prices
    Prices,
    /// News, then prices (default)
    All,
}

/// Fetches news for every symbol and writes `<out>/news`.
async fn run_news(
    provider: &YahooProvider,
    symbols: &SymbolTickerMap,
    out_dir: &Path,
) -> Result<()> {
    let store = ArtifactStore::new(out_dir.join(DataKind::News.dir_name()))?;
    let summary = NewsPipeline::new(provider, store).run(symbols).await;
    tracing::info!(
        success = summary.success,
        errors = summary.errors,
        empty = summary.empty,
        "news run finished"
    );
    Ok(())
}

/// Fetches prices for every symbol and writes `<out>/prices`.
async fn run_prices(
    provider: &YahooProvider,
    symbols: &SymbolTickerMap,
    out_dir: &Path,
) -> Result<()> {
    let store = ArtifactStore::new(out_dir.join(DataKind::Prices.dir_name()))?;
    let summary = PricePipeline::new(provider, store).run(symbols).await;
    tracing::info!(
        success = summary.success,
        errors = summary.errors,
        empty = summary.empty,
        reused = summary.reused,
        "price run finished"
    );
    Ok(())
}

/// Entry point for the build-time data fetch.
///
/// # Workflow Steps
/// - Load environment variables from a `.env` file, if any
/// - Load the symbol-to-ticker map; a bad map aborts before any fetch
/// - Run the news pipeline, then the price pipeline (or just the one asked for)
///
/// Individual symbols that fail are reported and counted but never change
/// the exit status.
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("market_feed=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let symbols = SymbolTickerMap::load(&cli.tickers).context("cannot start ingestion run")?;
    tracing::info!(
        symbols = symbols.len(),
        tickers = %cli.tickers.display(),
        "loaded ticker map"
    );

    let provider = YahooProvider::with_base_urls(&cli.news_base_url, &cli.chart_base_url)?
        .with_news_count(cli.news_count);

    let command = cli.command.unwrap_or(Command::All);

    if matches!(command, Command::News | Command::All) {
        run_news(&provider, &symbols, &cli.out_dir).await?;
    }

    if command == Command::All {
        println!();
    }

    if matches!(command, Command::Prices | Command::All) {
        run_prices(&provider, &symbols, &cli.out_dir).await?;
    }

    Ok(())
}
