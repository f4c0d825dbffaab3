use super::wire::ChartEnvelope;
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Untyped news payload exactly as the provider returned it.
///
/// Depending on the provider version this is a bare array of articles, an
/// object with a `news` array, or something else entirely. Interpreting it is
/// the job of [`crate::data::news::normalize_news`].
pub type RawNewsResponse = serde_json::Value;

/// One daily row of a provider price series, before rounding.
///
/// A price the provider left out is `None`; at least one of the four is
/// present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPriceRow {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: f64,
}

/// Date-keyed daily rows in chronological order. May be empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPriceSeries {
    pub rows: Vec<RawPriceRow>,
}

impl RawPriceSeries {
    pub fn new(rows: Vec<RawPriceRow>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// How far back a price history request reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRange {
    OneYear,
}

impl HistoryRange {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryRange::OneYear => "1y",
        }
    }
}

/// Bar size of a price history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    OneDay,
}

impl Interval {
    pub fn as_str(self) -> &'static str {
        match self {
            Interval::OneDay => "1d",
        }
    }
}

/// The external financial-data provider.
///
/// Retry, backoff and rate limiting are the implementation's own business;
/// callers only see one `Result` per request.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn fetch_news(&self, ticker: &str) -> Result<RawNewsResponse>;

    async fn fetch_price_history(
        &self,
        ticker: &str,
        range: HistoryRange,
        interval: Interval,
    ) -> Result<RawPriceSeries>;
}

pub const DEFAULT_NEWS_BASE_URL: &str = "https://query2.finance.yahoo.com";
pub const DEFAULT_CHART_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_NEWS_COUNT: u32 = 20;

// The endpoints reject requests without a browser-like agent.
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Provider client backed by the Yahoo Finance search and chart endpoints.
pub struct YahooProvider {
    client: reqwest::Client,
    news_base: Url,
    chart_base: Url,
    news_count: u32,
}

fn parse_base(base: &str) -> Result<Url> {
    let url = Url::parse(base)
        .map_err(|e| IngestError::Provider(format!("invalid base URL {}: {}", base, e)))?;
    if url.cannot_be_a_base() {
        return Err(IngestError::Provider(format!(
            "invalid base URL {}: cannot hold a path",
            base
        )));
    }
    Ok(url)
}

/// Appends `segments` to the path of `base`, percent-encoding each one so a
/// ticker such as `^HSI` or `A/B` stays a single segment.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| IngestError::Provider(format!("cannot extend base URL {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

impl YahooProvider {
    /// Creates a client against the given hosts: the public Yahoo Finance
    /// ones ([`DEFAULT_NEWS_BASE_URL`], [`DEFAULT_CHART_BASE_URL`]) or a
    /// local mock server.
    ///
    /// # Errors
    /// Returns an error if a base URL does not parse or the underlying HTTP
    /// client cannot be built.
    pub fn with_base_urls(news_base: &str, chart_base: &str) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            news_base: parse_base(news_base)?,
            chart_base: parse_base(chart_base)?,
            news_count: DEFAULT_NEWS_COUNT,
        })
    }

    /// Number of articles requested per ticker.
    pub fn with_news_count(mut self, news_count: u32) -> Self {
        self.news_count = news_count;
        self
    }

    async fn get(&self, url: Url, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        tracing::debug!(%url, ?query, "provider request");
        let response = self.client.get(url).query(query).send().await?;

        if !response.status().is_success() {
            return Err(IngestError::Status {
                status: response.status().as_u16(),
                url: response.url().to_string(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ProviderClient for YahooProvider {
    async fn fetch_news(&self, ticker: &str) -> Result<RawNewsResponse> {
        let url = endpoint(&self.news_base, &["v1", "finance", "search"])?;
        let news_count = self.news_count.to_string();
        let response = self
            .get(
                url,
                &[("q", ticker), ("newsCount", news_count.as_str()), ("quotesCount", "0")],
            )
            .await?;

        Ok(response.json::<serde_json::Value>().await?)
    }

    async fn fetch_price_history(
        &self,
        ticker: &str,
        range: HistoryRange,
        interval: Interval,
    ) -> Result<RawPriceSeries> {
        let url = endpoint(&self.chart_base, &["v8", "finance", "chart", ticker])?;
        let response = self
            .get(
                url,
                &[("range", range.as_str()), ("interval", interval.as_str())],
            )
            .await?;

        let body = response.text().await?;
        decode_chart(&body)
    }
}

/// Turns a chart payload into daily rows.
///
/// Timestamps are shifted by the exchange's `gmtoffset` so each row lands on
/// its local trading date. Rows with no open, high, low and close are
/// placeholders for days without trading and are dropped; a row missing only
/// some of them keeps the rest. When two rows share a date the later one
/// wins.
pub(crate) fn decode_chart(body: &str) -> Result<RawPriceSeries> {
    let envelope: ChartEnvelope = serde_json::from_str(body)?;
    let chart = envelope
        .chart
        .ok_or_else(|| IngestError::Provider("missing chart node".to_string()))?;

    if let Some(err) = chart.error {
        return Err(IngestError::Provider(format!(
            "{} - {}",
            err.code, err.description
        )));
    }

    let Some(result) = chart.result.and_then(|results| results.into_iter().next()) else {
        return Ok(RawPriceSeries::default());
    };

    let offset = result.meta.and_then(|meta| meta.gmtoffset).unwrap_or(0);
    let timestamps = result.timestamp.unwrap_or_default();
    let Some(quote) = result
        .indicators
        .and_then(|indicators| indicators.quote.into_iter().next())
    else {
        return Ok(RawPriceSeries::default());
    };

    let mut rows = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let at = |values: &[Option<f64>]| values.get(i).copied().flatten();

        let (open, high, low, close) = (
            at(&quote.open),
            at(&quote.high),
            at(&quote.low),
            at(&quote.close),
        );
        if open.is_none() && high.is_none() && low.is_none() && close.is_none() {
            continue;
        }

        let date = ts
            .checked_add(offset)
            .and_then(|local| DateTime::from_timestamp(local, 0))
            .ok_or_else(|| IngestError::Provider(format!("timestamp out of range: {}", ts)))?
            .date_naive();

        rows.push(RawPriceRow {
            date,
            open,
            high,
            low,
            close,
            volume: at(&quote.volume).unwrap_or(0.0),
        });
    }

    rows.sort_by_key(|row| row.date);

    let mut daily: Vec<RawPriceRow> = Vec::with_capacity(rows.len());
    for row in rows {
        match daily.last_mut() {
            Some(last) if last.date == row.date => *last = row,
            _ => daily.push(row),
        }
    }

    Ok(RawPriceSeries::new(daily))
}
