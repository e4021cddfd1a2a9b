//! Is Yatirim index-history scraper.
//!
//! Fetches daily index closes from the `IndexHistoricalAll` chart endpoint.
//! The endpoint returns the whole range in one response, so no chunking is
//! needed.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::header;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::errors::ScrapeError;
use crate::models::ScrapedPrice;
use crate::scraper::{validate_range, Scraper};

const DEFAULT_ENDPOINT: &str =
    "https://www.isyatirim.com.tr/_Layouts/15/IsYatirim.Website/Common/ChartData.aspx/IndexHistoricalAll";
const DATE_FORMAT: &str = "%Y%m%d%H%M%S";
const PROVIDER: &str = "isyatirim";

#[derive(Debug, Deserialize)]
struct IndexHistoryResponse {
    /// Rows of `[millis, close]`; numbers may serialize as integer or float.
    #[serde(default)]
    data: Vec<Vec<Value>>,
}

/// Scraper for Borsa Istanbul indexes. Prices are always in TRY.
pub struct IsyatirimScraper {
    client: reqwest::Client,
    endpoint: String,
}

impl Default for IsyatirimScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl IsyatirimScraper {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Scraper for IsyatirimScraper {
    fn source(&self) -> &'static str {
        PROVIDER
    }

    fn native_currency(&self, _symbol: &str) -> &'static str {
        "TRY"
    }

    async fn scrape(
        &self,
        cancel: &CancellationToken,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ScrapedPrice>, ScrapeError> {
        validate_range(symbol, from, to)?;

        let url = format!(
            "{}?period=1440&from={}&to={}&endeks={}",
            self.endpoint,
            from.and_time(NaiveTime::MIN).format(DATE_FORMAT),
            to.and_time(NaiveTime::MIN).format(DATE_FORMAT),
            urlencoding::encode(symbol),
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
                .json::<IndexHistoryResponse>()
                .await
                .map_err(|e| ScrapeError::Parse {
                    provider: PROVIDER,
                    message: e.to_string(),
                })
        };

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(ScrapeError::Cancelled),
            result = fetch => result?,
        };

        let prices: Vec<ScrapedPrice> = response.data.iter().filter_map(|row| parse_row(row)).collect();

        info!(
            symbol,
            from = %from,
            to = %to,
            count = prices.len(),
            "retrieved isyatirim data"
        );

        Ok(prices)
    }
}

/// Rows shorter than two elements or with non-numeric cells are dropped.
fn parse_row(row: &[Value]) -> Option<ScrapedPrice> {
    let millis = row.first()?.as_i64().or_else(|| row.first()?.as_f64().map(|f| f as i64))?;
    let close_price = row.get(1)?.as_f64()?;
    let date = DateTime::<Utc>::from_timestamp_millis(millis)?.date_naive();
    Some(ScrapedPrice { date, close_price })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_row_handles_integer_and_float_numbers() {
        let int_row = vec![json!(1704067200000i64), json!(9500)];
        let float_row = vec![json!(1704153600000.0), json!(9512.34)];

        assert_eq!(
            parse_row(&int_row),
            Some(ScrapedPrice {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                close_price: 9500.0,
            })
        );
        assert_eq!(
            parse_row(&float_row),
            Some(ScrapedPrice {
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                close_price: 9512.34,
            })
        );
    }

    #[test]
    fn parse_row_drops_malformed_rows() {
        assert_eq!(parse_row(&[json!(1704067200000i64)]), None);
        assert_eq!(parse_row(&[json!("ts"), json!(9500)]), None);
        assert_eq!(parse_row(&[json!(1704067200000i64), json!("close")]), None);
        assert_eq!(parse_row(&[]), None);
    }

    #[test]
    fn response_shape_parses() {
        let body = r#"{"data": [[1704067200000, 9500], [1704153600000, 9512.34], ["bad", "row"]]}"#;
        let parsed: IndexHistoryResponse = serde_json::from_str(body).unwrap();
        let prices: Vec<ScrapedPrice> = parsed.data.iter().filter_map(|r| parse_row(r)).collect();
        assert_eq!(prices.len(), 2);
    }

    #[tokio::test]
    async fn scrape_rejects_invalid_input() {
        let scraper = IsyatirimScraper::new();
        let cancel = CancellationToken::new();
        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();

        assert!(matches!(
            scraper.scrape(&cancel, "", from, to).await,
            Err(ScrapeError::Validation(_))
        ));
        assert!(matches!(
            scraper.scrape(&cancel, "XU100", to, from).await,
            Err(ScrapeError::Validation(_))
        ));
    }
}
