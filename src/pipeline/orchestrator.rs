//! Drives one pipeline over every configured symbol.
//!
//! Symbols are processed one at a time in code order. A failing symbol is
//! reported and counted, then the loop moves on; nothing short of a missing
//! output directory stops a run. The index written at the end lists only
//! the symbols that produced an artifact.

use super::artifacts::{
    fetched_at_now, Index, NewsArtifact, NewsIndexEntry, PriceArtifact, PriceIndexEntry,
};
use super::dedup::{DedupCache, DedupDecision};
use super::writer::ArtifactStore;
use crate::config::SymbolTickerMap;
use crate::data::{normalize_news, normalize_prices, HistoryRange, Interval, ProviderClient};
use crate::error::{IngestError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    News,
    Prices,
}

impl DataKind {
    /// Subdirectory of the output root holding this kind's artifacts.
    pub fn dir_name(self) -> &'static str {
        match self {
            DataKind::News => "news",
            DataKind::Prices => "prices",
        }
    }

    fn icon(self) -> &'static str {
        match self {
            DataKind::News => "📰",
            DataKind::Prices => "📈",
        }
    }

    fn unit(self) -> &'static str {
        match self {
            DataKind::News => "articles",
            DataKind::Prices => "days",
        }
    }

    fn empty_message(self) -> &'static str {
        match self {
            DataKind::News => "no articles found",
            DataKind::Prices => "no price data",
        }
    }

    fn header(self, symbols: usize) -> String {
        match self {
            DataKind::News => format!("📰 Fetching news for {} stocks...", symbols),
            DataKind::Prices => {
                format!("📈 Fetching 1-year daily prices for {} stocks...", symbols)
            }
        }
    }

    fn title(self) -> &'static str {
        match self {
            DataKind::News => "News",
            DataKind::Prices => "Price",
        }
    }
}

/// How a single symbol ended up.
#[derive(Debug)]
pub enum SymbolOutcome {
    /// Fetched, normalized and written; `count` articles or days.
    Written { count: usize },
    /// Cloned from the artifact of a code sharing the same ticker.
    Reused { source: String, days: usize },
    /// The provider had nothing for this ticker.
    Empty,
    /// The ticker was claimed by `source`, which wrote nothing this run.
    SourceMissing { source: String },
    Failed(IngestError),
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    /// Symbols with an artifact written this run, reused ones included.
    pub success: usize,
    pub errors: usize,
    pub empty: usize,
    pub reused: usize,
    pub skipped: usize,
    pub index_written: bool,
    pub output_dir: PathBuf,
}

impl RunSummary {
    fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            ..Self::default()
        }
    }

    fn record(&mut self, outcome: &SymbolOutcome) {
        self.total += 1;
        match outcome {
            SymbolOutcome::Written { .. } => self.success += 1,
            SymbolOutcome::Reused { .. } => {
                self.success += 1;
                self.reused += 1;
            }
            SymbolOutcome::Empty => self.empty += 1,
            SymbolOutcome::SourceMissing { .. } => self.skipped += 1,
            SymbolOutcome::Failed(_) => self.errors += 1,
        }
    }
}

/// The console line printed for a symbol, if any.
pub fn progress_line(
    kind: DataKind,
    code: &str,
    ticker: &str,
    outcome: &SymbolOutcome,
) -> Option<String> {
    match outcome {
        SymbolOutcome::Written { count } => Some(format!(
            "  ✅ {} ({}): {} {}",
            code,
            ticker,
            count,
            kind.unit()
        )),
        SymbolOutcome::Reused { source, .. } => Some(format!(
            "  ♻️  {} ({}): reused from {}",
            code, ticker, source
        )),
        SymbolOutcome::Empty => Some(format!(
            "  ⚠️  {} ({}): {}",
            code,
            ticker,
            kind.empty_message()
        )),
        SymbolOutcome::SourceMissing { .. } => None,
        SymbolOutcome::Failed(e) => Some(format!("  ❌ {} ({}): {}", code, ticker, e)),
    }
}

fn report(kind: DataKind, code: &str, ticker: &str, outcome: &SymbolOutcome) {
    let pipeline = kind.dir_name();
    match outcome {
        SymbolOutcome::Written { count } => {
            tracing::debug!(pipeline, code, ticker, count, "artifact written")
        }
        SymbolOutcome::Reused { source, days } => {
            tracing::debug!(pipeline, code, ticker, %source, days, "artifact reused")
        }
        SymbolOutcome::Empty => tracing::warn!(pipeline, code, ticker, "provider returned no data"),
        SymbolOutcome::SourceMissing { source } => {
            tracing::debug!(pipeline, code, ticker, %source, "no source artifact to reuse")
        }
        SymbolOutcome::Failed(e) => tracing::error!(pipeline, code, ticker, error = %e, "symbol failed"),
    }

    if let Some(line) = progress_line(kind, code, ticker, outcome) {
        println!("{}", line);
    }
}

fn finish<E: Serialize>(
    kind: DataKind,
    store: &ArtifactStore,
    stocks: BTreeMap<String, E>,
    summary: &mut RunSummary,
) {
    let index = Index::new(stocks, fetched_at_now());
    match store.write_index(&index) {
        Ok(path) => {
            summary.index_written = true;
            tracing::info!(
                pipeline = kind.dir_name(),
                path = %path.display(),
                total_stocks = index.total_stocks,
                "index written"
            );
        }
        Err(e) => {
            tracing::error!(pipeline = kind.dir_name(), error = %e, "failed to write index");
            println!("  ❌ {}: {}", store.index_path().display(), e);
        }
    }

    println!("\n{} {} fetch complete!", kind.icon(), kind.title());
    println!("   🔢 {} symbols", summary.total);
    println!(
        "   ✅ {} stocks with {}",
        summary.success,
        kind.dir_name()
    );
    println!("   ❌ {} errors", summary.errors);
    println!("   📁 Output: {}", summary.output_dir.display());
}

/// Fetches and writes news for every symbol.
///
/// News is always fetched fresh per symbol, even when several codes share a
/// ticker.
pub struct NewsPipeline<'a, P: ProviderClient + ?Sized> {
    provider: &'a P,
    store: ArtifactStore,
}

impl<'a, P: ProviderClient + ?Sized> NewsPipeline<'a, P> {
    pub fn new(provider: &'a P, store: ArtifactStore) -> Self {
        Self { provider, store }
    }

    pub async fn run(&self, symbols: &SymbolTickerMap) -> RunSummary {
        let kind = DataKind::News;
        println!("{}", kind.header(symbols.len()));

        let mut summary = RunSummary::new(self.store.dir().to_path_buf());
        let mut stocks = BTreeMap::new();

        for (code, ticker) in symbols.iter() {
            let outcome = self
                .process(code, ticker)
                .await
                .unwrap_or_else(SymbolOutcome::Failed);

            if let SymbolOutcome::Written { count } = outcome {
                stocks.insert(
                    code.to_string(),
                    NewsIndexEntry {
                        ticker: ticker.to_string(),
                        count,
                    },
                );
            }

            report(kind, code, ticker, &outcome);
            summary.record(&outcome);
        }

        finish(kind, &self.store, stocks, &mut summary);
        summary
    }

    async fn process(&self, code: &str, ticker: &str) -> Result<SymbolOutcome> {
        let raw = self.provider.fetch_news(ticker).await?;
        let articles = normalize_news(&raw);
        if articles.is_empty() {
            return Ok(SymbolOutcome::Empty);
        }

        let count = articles.len();
        let artifact = NewsArtifact {
            ticker: ticker.to_string(),
            code: code.to_string(),
            articles,
            fetched_at: fetched_at_now(),
        };
        self.store.write(code, &artifact)?;

        Ok(SymbolOutcome::Written { count })
    }
}

/// Fetches and writes one year of daily prices for every symbol.
///
/// Codes sharing a ticker are fetched once: the first code in sort order
/// fetches, later ones clone its artifact under their own code.
pub struct PricePipeline<'a, P: ProviderClient + ?Sized> {
    provider: &'a P,
    store: ArtifactStore,
    dedup: DedupCache,
    written: HashSet<String>,
}

impl<'a, P: ProviderClient + ?Sized> PricePipeline<'a, P> {
    pub fn new(provider: &'a P, store: ArtifactStore) -> Self {
        Self {
            provider,
            store,
            dedup: DedupCache::new(),
            written: HashSet::new(),
        }
    }

    pub async fn run(&mut self, symbols: &SymbolTickerMap) -> RunSummary {
        let kind = DataKind::Prices;
        println!("{}", kind.header(symbols.len()));

        let mut summary = RunSummary::new(self.store.dir().to_path_buf());
        let mut stocks = BTreeMap::new();

        for (code, ticker) in symbols.iter() {
            let outcome = self
                .process(code, ticker)
                .await
                .unwrap_or_else(SymbolOutcome::Failed);

            let days = match &outcome {
                SymbolOutcome::Written { count } => Some(*count),
                SymbolOutcome::Reused { days, .. } => Some(*days),
                _ => None,
            };
            if let Some(days) = days {
                stocks.insert(
                    code.to_string(),
                    PriceIndexEntry {
                        ticker: ticker.to_string(),
                        days,
                    },
                );
            }

            report(kind, code, ticker, &outcome);
            summary.record(&outcome);
        }

        finish(kind, &self.store, stocks, &mut summary);
        summary
    }

    async fn process(&mut self, code: &str, ticker: &str) -> Result<SymbolOutcome> {
        if let DedupDecision::Reuse { source_code } = self.dedup.check(ticker, code) {
            return self.reuse(code, source_code);
        }

        let series = self
            .provider
            .fetch_price_history(ticker, HistoryRange::OneYear, Interval::OneDay)
            .await?;
        let prices = normalize_prices(&series);
        if prices.is_empty() {
            return Ok(SymbolOutcome::Empty);
        }

        let artifact = PriceArtifact::new(ticker, code, prices, fetched_at_now());
        self.store.write(code, &artifact)?;
        self.written.insert(code.to_string());

        Ok(SymbolOutcome::Written {
            count: artifact.days,
        })
    }

    /// Clones the source code's artifact. Only artifacts written by this run
    /// qualify; a file left over from an earlier run is never reused.
    fn reuse(&self, code: &str, source: String) -> Result<SymbolOutcome> {
        if !self.written.contains(&source) {
            return Ok(SymbolOutcome::SourceMissing { source });
        }

        let Some(artifact) = self.store.read::<PriceArtifact>(&source)? else {
            return Ok(SymbolOutcome::SourceMissing { source });
        };

        let artifact = artifact.for_code(code);
        self.store.write(code, &artifact)?;

        Ok(SymbolOutcome::Reused {
            source,
            days: artifact.days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RawNewsResponse, RawPriceRow, RawPriceSeries};
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeProvider {
        news: HashMap<String, Value>,
        prices: HashMap<String, RawPriceSeries>,
        failing: HashSet<String>,
        news_calls: Mutex<Vec<String>>,
        price_calls: Mutex<Vec<String>>,
    }

    impl FakeProvider {
        fn with_news(mut self, ticker: &str, raw: Value) -> Self {
            self.news.insert(ticker.to_string(), raw);
            self
        }

        fn with_prices(mut self, ticker: &str, series: RawPriceSeries) -> Self {
            self.prices.insert(ticker.to_string(), series);
            self
        }

        fn failing(mut self, ticker: &str) -> Self {
            self.failing.insert(ticker.to_string());
            self
        }

        fn news_calls(&self, ticker: &str) -> usize {
            self.news_calls
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.as_str() == ticker)
                .count()
        }

        fn price_calls(&self, ticker: &str) -> usize {
            self.price_calls
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.as_str() == ticker)
                .count()
        }
    }

    #[async_trait]
    impl ProviderClient for FakeProvider {
        async fn fetch_news(&self, ticker: &str) -> Result<RawNewsResponse> {
            self.news_calls.lock().unwrap().push(ticker.to_string());
            if self.failing.contains(ticker) {
                return Err(IngestError::Provider(format!("connection reset for {}", ticker)));
            }
            Ok(self.news.get(ticker).cloned().unwrap_or(Value::Null))
        }

        async fn fetch_price_history(
            &self,
            ticker: &str,
            range: HistoryRange,
            interval: Interval,
        ) -> Result<RawPriceSeries> {
            assert_eq!(range, HistoryRange::OneYear);
            assert_eq!(interval, Interval::OneDay);

            self.price_calls.lock().unwrap().push(ticker.to_string());
            if self.failing.contains(ticker) {
                return Err(IngestError::Status {
                    status: 503,
                    url: format!("https://chart.test/{}", ticker),
                });
            }
            Ok(self.prices.get(ticker).cloned().unwrap_or_default())
        }
    }

    fn daily_series(days: i64) -> RawPriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        RawPriceSeries::new(
            (0..days)
                .map(|i| {
                    let price = 38.12345 + i as f64;
                    RawPriceRow {
                        date: start + Duration::days(i),
                        open: Some(price),
                        high: Some(price + 0.5),
                        low: Some(price - 0.5),
                        close: Some(price + 0.25),
                        volume: 1_000_000.0 + i as f64,
                    }
                })
                .collect(),
        )
    }

    fn symbols(pairs: &[(&str, &str)]) -> SymbolTickerMap {
        pairs.iter().copied().collect()
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_shared_ticker_fetched_once() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let provider = FakeProvider::default().with_prices("0001.HK", daily_series(5));
        let map = symbols(&[("0001", "0001.HK"), ("0002", "0001.HK")]);

        let summary = PricePipeline::new(&provider, store).run(&map).await;

        assert_eq!(provider.price_calls("0001.HK"), 1);
        assert_eq!(summary.success, 2);
        assert_eq!(summary.reused, 1);
        assert_eq!(summary.errors, 0);

        let first = read_json(&temp_dir.path().join("0001.json"));
        let second = read_json(&temp_dir.path().join("0002.json"));
        assert_eq!(first["days"], 5);
        assert_eq!(second["days"], 5);
        assert_eq!(first["prices"], second["prices"]);
        assert_eq!(first["ticker"], second["ticker"]);
        assert_eq!(first["fetchedAt"], second["fetchedAt"]);
        assert_eq!(first["code"], "0001");
        assert_eq!(second["code"], "0002");

        let index = read_json(&temp_dir.path().join("index.json"));
        assert_eq!(index["totalStocks"], 2);
        assert_eq!(index["stocks"]["0001"], json!({ "ticker": "0001.HK", "days": 5 }));
        assert_eq!(index["stocks"]["0002"], json!({ "ticker": "0001.HK", "days": 5 }));
    }

    #[tokio::test]
    async fn test_shared_ticker_reuse_keeps_missing_prices() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let mut series = daily_series(2);
        series.rows[0].open = None;
        series.rows[1].close = Some(f64::NAN);
        let provider = FakeProvider::default().with_prices("0001.HK", series);
        let map = symbols(&[("0001", "0001.HK"), ("0002", "0001.HK")]);

        let summary = PricePipeline::new(&provider, store).run(&map).await;

        assert_eq!(summary.success, 2);
        assert_eq!(summary.reused, 1);
        assert_eq!(summary.errors, 0);

        let first = read_json(&temp_dir.path().join("0001.json"));
        let second = read_json(&temp_dir.path().join("0002.json"));
        assert_eq!(first["prices"][0]["open"], Value::Null);
        assert_eq!(first["prices"][0]["close"], 38.373);
        assert_eq!(first["prices"][1]["close"], Value::Null);
        assert_eq!(first["prices"], second["prices"]);
        assert_eq!(second["days"], 2);
    }

    #[tokio::test]
    async fn test_price_failure_is_isolated() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let provider = FakeProvider::default()
            .with_prices("0001.HK", daily_series(3))
            .with_prices("0700.HK", daily_series(4))
            .failing("0005.HK");
        let map = symbols(&[("0001", "0001.HK"), ("0005", "0005.HK"), ("0700", "0700.HK")]);

        let summary = PricePipeline::new(&provider, store).run(&map).await;

        assert_eq!(summary.total, 3);
        assert_eq!(summary.success, 2);
        assert_eq!(summary.errors, 1);
        assert!(summary.index_written);
        assert!(!temp_dir.path().join("0005.json").exists());
        assert_eq!(read_json(&temp_dir.path().join("0700.json"))["days"], 4);

        let index = read_json(&temp_dir.path().join("index.json"));
        assert_eq!(index["totalStocks"], 2);
        assert!(index["stocks"].get("0005").is_none());
    }

    #[tokio::test]
    async fn test_prices_are_rounded_in_artifact() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let provider = FakeProvider::default().with_prices("0001.HK", daily_series(1));
        let map = symbols(&[("0001", "0001.HK")]);

        PricePipeline::new(&provider, store).run(&map).await;

        let artifact = read_json(&temp_dir.path().join("0001.json"));
        let bar = &artifact["prices"][0];
        assert_eq!(bar["date"], "2024-01-02");
        assert_eq!(bar["open"], 38.123);
        assert_eq!(bar["close"], 38.373);
        assert_eq!(bar["volume"], 1_000_000);
    }

    #[tokio::test]
    async fn test_empty_series_is_not_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let provider = FakeProvider::default().with_prices("0001.HK", daily_series(2));
        let map = symbols(&[("0001", "0001.HK"), ("0099", "0099.HK")]);

        let summary = PricePipeline::new(&provider, store).run(&map).await;

        assert_eq!(summary.success, 1);
        assert_eq!(summary.empty, 1);
        assert_eq!(summary.errors, 0);
        assert!(!temp_dir.path().join("0099.json").exists());

        let index = read_json(&temp_dir.path().join("index.json"));
        assert!(index["stocks"].get("0099").is_none());
    }

    #[tokio::test]
    async fn test_reuse_skipped_when_source_failed() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let provider = FakeProvider::default().failing("0001.HK");
        let map = symbols(&[("0001", "0001.HK"), ("0002", "0001.HK")]);

        let summary = PricePipeline::new(&provider, store).run(&map).await;

        assert_eq!(provider.price_calls("0001.HK"), 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.success, 0);
        assert!(!temp_dir.path().join("0002.json").exists());
        assert_eq!(read_json(&temp_dir.path().join("index.json"))["totalStocks"], 0);
    }

    #[tokio::test]
    async fn test_stale_source_from_earlier_run_is_not_reused() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let stale = PriceArtifact::new("0001.HK", "0001", Vec::new(), "old".to_string());
        store.write("0001", &stale).unwrap();

        let provider = FakeProvider::default();
        let map = symbols(&[("0001", "0001.HK"), ("0002", "0001.HK")]);

        let summary = PricePipeline::new(&provider, store).run(&map).await;

        assert_eq!(summary.empty, 1);
        assert_eq!(summary.skipped, 1);
        assert!(!temp_dir.path().join("0002.json").exists());
    }

    #[tokio::test]
    async fn test_news_fetches_every_code() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let raw = json!({ "news": [{ "content": { "title": "X" } }, { "title": "Y" }] });
        let provider = FakeProvider::default().with_news("0001.HK", raw);
        let map = symbols(&[("0001", "0001.HK"), ("0002", "0001.HK")]);

        let summary = NewsPipeline::new(&provider, store).run(&map).await;

        assert_eq!(provider.news_calls("0001.HK"), 2);
        assert_eq!(summary.success, 2);
        assert_eq!(summary.reused, 0);

        let artifact = read_json(&temp_dir.path().join("0002.json"));
        assert_eq!(artifact["code"], "0002");
        assert_eq!(artifact["ticker"], "0001.HK");
        assert_eq!(artifact["articles"][0]["title"], "X");
        assert_eq!(artifact["articles"][1]["title"], "Y");
        assert!(artifact["fetchedAt"].is_string());

        let index = read_json(&temp_dir.path().join("index.json"));
        assert_eq!(index["stocks"]["0001"], json!({ "ticker": "0001.HK", "count": 2 }));
        assert_eq!(index["totalStocks"], 2);
    }

    #[tokio::test]
    async fn test_news_empty_and_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let provider = FakeProvider::default()
            .with_news("0001.HK", json!([{ "title": "ok" }]))
            .with_news("0002.HK", json!({ "news": [] }))
            .failing("0003.HK");
        let map = symbols(&[("0001", "0001.HK"), ("0002", "0002.HK"), ("0003", "0003.HK")]);

        let summary = NewsPipeline::new(&provider, store).run(&map).await;

        assert_eq!(summary.success, 1);
        assert_eq!(summary.empty, 1);
        assert_eq!(summary.errors, 1);
        assert!(!temp_dir.path().join("0002.json").exists());
        assert!(!temp_dir.path().join("0003.json").exists());

        let index = read_json(&temp_dir.path().join("index.json"));
        assert_eq!(index["totalStocks"], 1);
        assert!(index["stocks"].get("0003").is_none());
    }

    #[test]
    fn test_progress_lines() {
        assert_eq!(
            progress_line(DataKind::News, "0001", "0001.HK", &SymbolOutcome::Written { count: 7 }),
            Some("  ✅ 0001 (0001.HK): 7 articles".to_string())
        );
        assert_eq!(
            progress_line(
                DataKind::Prices,
                "0002",
                "0001.HK",
                &SymbolOutcome::Reused {
                    source: "0001".to_string(),
                    days: 5
                }
            ),
            Some("  ♻️  0002 (0001.HK): reused from 0001".to_string())
        );
        assert_eq!(
            progress_line(DataKind::Prices, "0099", "0099.HK", &SymbolOutcome::Empty),
            Some("  ⚠️  0099 (0099.HK): no price data".to_string())
        );
        assert!(progress_line(
            DataKind::Prices,
            "0002",
            "0001.HK",
            &SymbolOutcome::SourceMissing {
                source: "0001".to_string()
            }
        )
        .is_none());

        let failed = SymbolOutcome::Failed(IngestError::Provider("boom".to_string()));
        let line = progress_line(DataKind::News, "0005", "0005.HK", &failed).unwrap();
        assert!(line.starts_with("  ❌ 0005 (0005.HK): "));
        assert!(line.contains("boom"));
    }
}
