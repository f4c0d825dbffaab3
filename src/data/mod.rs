pub mod ingestion;
pub mod news;
pub mod processing;
mod wire;

pub use ingestion::{
    HistoryRange, Interval, ProviderClient, RawNewsResponse, RawPriceRow, RawPriceSeries,
    YahooProvider,
};
pub use news::{normalize_news, Article, PublishedAt};
pub use processing::{normalize_prices, PriceBar};
