//! Build-time ingestion of stock news and daily prices.
//!
//! For every configured symbol code the pipelines fetch from the market data
//! provider, normalize the payload into a fixed JSON schema and write one
//! artifact per code plus an `index.json`, ready for the static site build.

pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;

pub use config::SymbolTickerMap;
pub use error::IngestError;
