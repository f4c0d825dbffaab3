//! Output documents consumed by the site build.
//!
//! Field names are camelCase on the wire to match what the front end reads.

use crate::data::{Article, PriceBar};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Formats a run timestamp the way every artifact carries it.
pub fn format_fetched_at(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

pub fn fetched_at_now() -> String {
    format_fetched_at(Utc::now())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArtifact {
    pub ticker: String,
    pub code: String,
    pub articles: Vec<Article>,
    pub fetched_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceArtifact {
    pub ticker: String,
    pub code: String,
    /// Always equal to `prices.len()`.
    pub days: usize,
    pub prices: Vec<PriceBar>,
    pub fetched_at: String,
}

impl PriceArtifact {
    pub fn new(ticker: &str, code: &str, prices: Vec<PriceBar>, fetched_at: String) -> Self {
        Self {
            ticker: ticker.to_string(),
            code: code.to_string(),
            days: prices.len(),
            prices,
            fetched_at,
        }
    }

    /// The same artifact filed under another symbol code. Everything else,
    /// `fetchedAt` included, is carried over untouched.
    pub fn for_code(self, code: &str) -> Self {
        Self {
            code: code.to_string(),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsIndexEntry {
    pub ticker: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceIndexEntry {
    pub ticker: String,
    pub days: usize,
}

/// Run-level summary listing only the symbols that produced an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index<E> {
    pub stocks: BTreeMap<String, E>,
    pub fetched_at: String,
    pub total_stocks: usize,
}

impl<E> Index<E> {
    pub fn new(stocks: BTreeMap<String, E>, fetched_at: String) -> Self {
        Self {
            total_stocks: stocks.len(),
            stocks,
            fetched_at,
        }
    }
}

pub type NewsIndex = Index<NewsIndexEntry>;
pub type PriceIndex = Index<PriceIndexEntry>;
