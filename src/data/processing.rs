use super::ingestion::{RawPriceRow, RawPriceSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Decimal places kept on open/high/low/close.
pub const PRICE_DECIMALS: i32 = 3;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
/// One trading day in the canonical price artifact.
///
/// # Fields
/// * `date`: Trading date, serialized as `YYYY-MM-DD`
/// * `open`, `high`, `low`, `close`: Prices rounded to three decimal places,
///   `null` when the provider had no value for that field
/// * `volume`: Shares traded, as a whole number
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: i64,
}

impl From<&RawPriceRow> for PriceBar {
    fn from(row: &RawPriceRow) -> Self {
        Self {
            date: row.date,
            open: row.open.and_then(round_price),
            high: row.high.and_then(round_price),
            low: row.low.and_then(round_price),
            close: row.close.and_then(round_price),
            volume: volume_to_shares(row.volume),
        }
    }
}

/// Rounds a price to [`PRICE_DECIMALS`] places.
///
/// Ties round half away from zero (`f64::round` on the scaled value).
///
/// # Arguments
/// * `price`: Raw provider price
///
/// # Returns
/// The price with at most three decimal places, or `None` for `NaN` and
/// infinities, which have no JSON number form
pub fn round_price(price: f64) -> Option<f64> {
    if !price.is_finite() {
        return None;
    }
    let scale = 10f64.powi(PRICE_DECIMALS);
    Some((price * scale).round() / scale)
}

/// Truncates a provider volume toward zero. `NaN` becomes 0 and values out
/// of range saturate.
fn volume_to_shares(volume: f64) -> i64 {
    volume as i64
}

/// Converts a provider price series into canonical daily bars.
///
/// Rows keep the series' chronological order, one bar per row. No row is
/// filtered: zero volume or odd prices pass through for the consumer to
/// judge. An empty series gives an empty vector, which callers treat as
/// "no data" rather than as a failure.
///
/// # Arguments
/// * `series`: Raw daily rows from the provider
///
/// # Returns
/// A vector of `PriceBar` in ascending date order
pub fn normalize_prices(series: &RawPriceSeries) -> Vec<PriceBar> {
    series.rows.iter().map(PriceBar::from).collect()
}
