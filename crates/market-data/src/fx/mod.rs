//! Crumb-less Yahoo chart client used by the exchange-rate service.
//!
//! FX pair symbols (`USDTRY=X` and friends) are served by the same v8 chart
//! endpoint the [`YahooScraper`](crate::scraper::yahoo::YahooScraper) uses,
//! but without crumb authentication, so this client keeps no session state.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::header;
use tokio_util::sync::CancellationToken;
use tracing::info;
use urlencoding::encode;

use crate::errors::ScrapeError;
use crate::scraper::yahoo::models::ChartResponse;

const DEFAULT_CHART_ENDPOINT: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const PROVIDER: &str = "yahoo-chart";

/// Fetches daily closes for a chart symbol as a date-keyed map.
pub struct FxChartClient {
    client: reqwest::Client,
    chart_endpoint: String,
}

impl Default for FxChartClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FxChartClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            chart_endpoint: DEFAULT_CHART_ENDPOINT.to_string(),
        }
    }

    pub fn with_chart_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.chart_endpoint = endpoint.into();
        self
    }

    /// Fetches daily close values for `[from, to]`.
    ///
    /// Unlike the price scrapers, an empty chart result is an error here:
    /// the rate service needs to distinguish "provider said nothing" from
    /// "range has no trading days" and falls back to the store either way.
    pub async fn daily_closes(
        &self,
        cancel: &CancellationToken,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>, ScrapeError> {
        let url = format!(
            "{}/{}?interval=1d&period1={}&period2={}",
            self.chart_endpoint,
            encode(symbol),
            from.and_time(NaiveTime::MIN).and_utc().timestamp(),
            to.and_time(NaiveTime::MIN).and_utc().timestamp(),
        );

        let fetch = async {
            let response = self
                .client
                .get(&url)
                .header(header::USER_AGENT, "Mozilla/5.0")
                .send()
                .await
                .map_err(|e| ScrapeError::Transport {
                    provider: PROVIDER,
                    source: e,
                })?;

            if !response.status().is_success() {
                return Err(ScrapeError::Status {
                    provider: PROVIDER,
                    status: response.status().as_u16(),
                    symbol: symbol.to_string(),
                });
            }

            response
                .json::<ChartResponse>()
                .await
                .map_err(|e| ScrapeError::Parse {
                    provider: PROVIDER,
                    message: e.to_string(),
                })
        };

        let chart = tokio::select! {
            _ = cancel.cancelled() => return Err(ScrapeError::Cancelled),
            result = fetch => result?,
        };

        let closes = parse_daily_closes(chart, symbol)?;

        info!(symbol, count = closes.len(), "fetched exchange rates from chart API");
        Ok(closes)
    }
}

fn parse_daily_closes(
    response: ChartResponse,
    symbol: &str,
) -> Result<BTreeMap<NaiveDate, f64>, ScrapeError> {
    if let Some(err) = response.chart.error {
        return Err(ScrapeError::Chart {
            provider: PROVIDER,
            code: err.code,
            description: err.description,
        });
    }

    let Some(result) = response.chart.result.into_iter().next() else {
        return Err(ScrapeError::Parse {
            provider: PROVIDER,
            message: format!("chart returned no results for {symbol}"),
        });
    };
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Err(ScrapeError::Parse {
            provider: PROVIDER,
            message: format!("chart returned no quote data for {symbol}"),
        });
    };

    let mut closes = BTreeMap::new();
    for (ts, close) in result.timestamp.iter().zip(quote.close.iter()) {
        let Some(close) = close else { continue };
        if *close == 0.0 {
            continue;
        }
        if let Some(dt) = DateTime::<Utc>::from_timestamp(*ts, 0) {
            closes.insert(dt.date_naive(), *close);
        }
    }
    Ok(closes)
}
