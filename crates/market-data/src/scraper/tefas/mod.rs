//! TEFAS fund-history scraper.
//!
//! Fetches daily fund prices from the TEFAS `BindHistoryInfo` endpoint via
//! form-encoded POST requests. The endpoint caps each request at roughly
//! three months, so ranges are split into 60-day chunks fetched in parallel.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use reqwest::header;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::chunk::split_date_range;
use crate::errors::ScrapeError;
use crate::models::ScrapedPrice;
use crate::scraper::{validate_range, Scraper};

const DEFAULT_BASE_URL: &str = "https://www.tefas.gov.tr";
const DEFAULT_HISTORY_ENDPOINT: &str = "https://www.tefas.gov.tr/api/DB/BindHistoryInfo";
const DEFAULT_REFERER: &str = "http://www.tefas.gov.tr/TarihselVeriler.aspx";
const DATE_FORMAT: &str = "%Y-%m-%d";
const CHUNK_DAYS: u32 = 60;
const PROVIDER: &str = "tefas";

#[derive(Debug, Deserialize)]
struct FundHistoryRow {
    /// Milliseconds since epoch, as a string.
    #[serde(rename = "TARIH")]
    timestamp: String,
    #[serde(rename = "FIYAT")]
    price: f64,
}

#[derive(Debug, Deserialize)]
struct FundHistoryResponse {
    #[serde(default)]
    data: Vec<FundHistoryRow>,
}

/// Scraper for TEFAS investment funds. Prices are always in TRY.
pub struct TefasScraper {
    workers: usize,
    client: reqwest::Client,
    history_endpoint: String,
    base_url: String,
    referer: String,
}

impl Default for TefasScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl TefasScraper {
    pub fn new() -> Self {
        Self {
            workers: 5,
            client: reqwest::Client::new(),
            history_endpoint: DEFAULT_HISTORY_ENDPOINT.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            referer: DEFAULT_REFERER.to_string(),
        }
    }

    /// Concurrency limit for parallel chunk fetches.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_history_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.history_endpoint = endpoint.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }

    async fn fetch_fund_data(
        &self,
        cancel: &CancellationToken,
        fund_code: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<FundHistoryResponse, ScrapeError> {
        let bastarih = from.format(DATE_FORMAT).to_string();
        let bittarih = to.format(DATE_FORMAT).to_string();
        let form = [
            ("fontip", "YAT"),
            ("fonkod", fund_code),
            ("bastarih", bastarih.as_str()),
            ("bittarih", bittarih.as_str()),
        ];

        let request = self
            .client
            .post(&self.history_endpoint)
            .header("X-Requested-With", "XMLHttpRequest")
            .header(header::ORIGIN, &self.base_url)
            .header(header::REFERER, &self.referer)
            .header(header::ACCEPT, "application/json")
            .form(&form);

        let fetch = async {
            let response = request.send().await.map_err(|e| ScrapeError::Transport {
                provider: PROVIDER,
                source: e,
            })?;
            response
                .json::<FundHistoryResponse>()
                .await
                .map_err(|e| ScrapeError::Parse {
                    provider: PROVIDER,
                    message: e.to_string(),
                })
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(ScrapeError::Cancelled),
            result = fetch => result,
        }
    }
}

#[async_trait]
impl Scraper for TefasScraper {
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

        let chunks = split_date_range(from, to, CHUNK_DAYS);
        let results: Vec<Vec<ScrapedPrice>> = stream::iter(chunks)
            .map(|chunk| async move {
                match self.fetch_fund_data(cancel, symbol, chunk.from, chunk.to).await {
                    Ok(response) => {
                        info!(
                            fund = symbol,
                            start_date = %chunk.from,
                            end_date = %chunk.to,
                            rows = response.data.len(),
                            "retrieved tefas data"
                        );
                        response.data.iter().filter_map(parse_row).collect()
                    }
                    Err(err) => {
                        error!(
                            fund = symbol,
                            start_date = %chunk.from,
                            end_date = %chunk.to,
                            error = %err,
                            "error retrieving tefas data"
                        );
                        Vec::new()
                    }
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        Ok(results.into_iter().flatten().collect())
    }
}

/// Rows with an unparseable timestamp or a negative price are dropped.
fn parse_row(row: &FundHistoryRow) -> Option<ScrapedPrice> {
    if row.price < 0.0 {
        return None;
    }
    let date = parse_timestamp(&row.timestamp)?;
    Some(ScrapedPrice {
        date,
        close_price: row.price,
    })
}

fn parse_timestamp(millis: &str) -> Option<NaiveDate> {
    let millis: i64 = millis.parse().ok()?;
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.date_naive())
}
