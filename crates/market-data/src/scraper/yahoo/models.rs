//! Yahoo Finance v8 chart API response shapes.
//!
//! Shared between the [`YahooScraper`](super::YahooScraper) and the
//! [`FxChartClient`](crate::fx::FxChartClient), which hit the same endpoint
//! family with and without crumb authentication.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct ChartResponse {
    pub(crate) chart: ChartBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChartBody {
    #[serde(default)]
    pub(crate) result: Vec<ChartResult>,
    pub(crate) error: Option<ChartApiError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChartResult {
    #[serde(default)]
    pub(crate) timestamp: Vec<i64>,
    #[serde(default)]
    pub(crate) indicators: ChartIndicators,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct ChartIndicators {
    #[serde(default)]
    pub(crate) quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChartQuote {
    /// Yahoo uses `null` for days without a close.
    #[serde(default)]
    pub(crate) close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChartApiError {
    pub(crate) code: String,
    pub(crate) description: String,
}
