//! Yahoo Finance chart scraper.
//!
//! Uses the v8 chart API with cookie + crumb authentication, matching the
//! approach of the yfinance Python library. The crumb is fetched lazily on
//! the first scrape and cached; a 401/403 on any chunk invalidates it so the
//! next scrape performs a fresh handshake.

pub(crate) mod models;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use futures::stream::{self, StreamExt};
use reqwest::header;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use urlencoding::encode;

use crate::chunk::split_date_range;
use crate::errors::ScrapeError;
use crate::models::ScrapedPrice;
use crate::scraper::{validate_range, Scraper};

use models::ChartResponse;

const DEFAULT_CHART_ENDPOINT: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com";
const DEFAULT_CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";
const CHUNK_DAYS: u32 = 1250;
const PROVIDER: &str = "yahoo";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Scraper for equities, funds and FX symbols served by the Yahoo chart API.
///
/// The HTTP client carries a cookie jar shared by the handshake and the
/// chart requests; the crumb lives behind a mutex so concurrent scrapes
/// never race the handshake.
pub struct YahooScraper {
    workers: usize,
    client: reqwest::Client,
    chart_endpoint: String,
    cookie_url: String,
    crumb_url: String,
    crumb: Mutex<Option<String>>,
}

impl Default for YahooScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl YahooScraper {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("reqwest client");
        Self {
            workers: 5,
            client,
            chart_endpoint: DEFAULT_CHART_ENDPOINT.to_string(),
            cookie_url: DEFAULT_COOKIE_URL.to_string(),
            crumb_url: DEFAULT_CRUMB_URL.to_string(),
            crumb: Mutex::new(None),
        }
    }

    /// Concurrency limit for parallel chunk fetches.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_chart_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.chart_endpoint = endpoint.into();
        self
    }

    pub fn with_cookie_url(mut self, url: impl Into<String>) -> Self {
        self.cookie_url = url.into();
        self
    }

    pub fn with_crumb_url(mut self, url: impl Into<String>) -> Self {
        self.crumb_url = url.into();
        self
    }

    /// Returns the cached crumb, performing the two-step handshake if none
    /// is cached. The mutex is held across the handshake so concurrent
    /// scrapes wait instead of racing it.
    async fn ensure_crumb(&self, cancel: &CancellationToken) -> Result<String, ScrapeError> {
        let mut guard = self.crumb.lock().await;
        if let Some(crumb) = guard.as_ref() {
            return Ok(crumb.clone());
        }

        let crumb = self.fetch_crumb(cancel).await?;
        *guard = Some(crumb.clone());
        Ok(crumb)
    }

    async fn fetch_crumb(&self, cancel: &CancellationToken) -> Result<String, ScrapeError> {
        let handshake = async {
            // Step 1: seed the session cookie into the shared jar.
            self.client
                .get(&self.cookie_url)
                .header(header::USER_AGENT, USER_AGENT)
                .send()
                .await
                .map_err(|e| ScrapeError::Auth {
                    provider: PROVIDER,
                    message: format!("fetch cookie: {e}"),
                })?;

            // Step 2: the crumb endpoint returns the token as plain text.
            let response = self
                .client
                .get(&self.crumb_url)
                .header(header::USER_AGENT, USER_AGENT)
                .send()
                .await
                .map_err(|e| ScrapeError::Auth {
                    provider: PROVIDER,
                    message: format!("fetch crumb: {e}"),
                })?;

            if !response.status().is_success() {
                return Err(ScrapeError::Auth {
                    provider: PROVIDER,
                    message: format!("crumb endpoint returned HTTP {}", response.status().as_u16()),
                });
            }

            let crumb = response
                .text()
                .await
                .map_err(|e| ScrapeError::Auth {
                    provider: PROVIDER,
                    message: format!("read crumb: {e}"),
                })?
                .trim()
                .to_string();

            if crumb.is_empty() {
                return Err(ScrapeError::Auth {
                    provider: PROVIDER,
                    message: "empty crumb received".to_string(),
                });
            }

            info!(crumb_len = crumb.len(), "yahoo: obtained crumb");
            Ok(crumb)
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(ScrapeError::Cancelled),
            result = handshake => result,
        }
    }

    /// Drops the cached crumb so the next scrape re-handshakes.
    async fn invalidate_crumb(&self) {
        *self.crumb.lock().await = None;
    }

    async fn fetch_chart(
        &self,
        cancel: &CancellationToken,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ScrapedPrice>, ScrapeError> {
        let crumb = self.crumb.lock().await.clone().unwrap_or_default();

        let url = format!(
            "{}/{}?period1={}&period2={}&interval=1d&events=div%2Csplits&crumb={}",
            self.chart_endpoint,
            encode(symbol),
            from.and_time(NaiveTime::MIN).and_utc().timestamp(),
            to.and_time(NaiveTime::MIN).and_utc().timestamp(),
            encode(&crumb),
        );

        let fetch = async {
            let response = self
                .client
                .get(&url)
                .header(header::USER_AGENT, USER_AGENT)
                .send()
                .await
                .map_err(|e| ScrapeError::Transport {
                    provider: PROVIDER,
                    source: e,
                })?;

            let status = response.status();
            if !status.is_success() {
                if status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN
                {
                    self.invalidate_crumb().await;
                }
                return Err(ScrapeError::Status {
                    provider: PROVIDER,
                    status: status.as_u16(),
                    symbol: symbol.to_string(),
                });
            }

            let chart: ChartResponse =
                response.json().await.map_err(|e| ScrapeError::Parse {
                    provider: PROVIDER,
                    message: e.to_string(),
                })?;

            parse_chart(chart)
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(ScrapeError::Cancelled),
            result = fetch => result,
        }
    }
}

#[async_trait]
impl Scraper for YahooScraper {
    fn source(&self) -> &'static str {
        PROVIDER
    }

    /// Istanbul-listed symbols (`.IS` suffix) trade in TRY, everything else
    /// is treated as USD.
    fn native_currency(&self, symbol: &str) -> &'static str {
        if symbol.ends_with(".IS") {
            "TRY"
        } else {
            "USD"
        }
    }

    async fn scrape(
        &self,
        cancel: &CancellationToken,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ScrapedPrice>, ScrapeError> {
        validate_range(symbol, from, to)?;

        // The handshake must succeed before the parallel fetches start.
        self.ensure_crumb(cancel).await?;

        let chunks = split_date_range(from, to, CHUNK_DAYS);
        let results: Vec<Vec<ScrapedPrice>> = stream::iter(chunks)
            .map(|chunk| async move {
                match self.fetch_chart(cancel, symbol, chunk.from, chunk.to).await {
                    Ok(prices) => {
                        info!(
                            symbol,
                            from = %chunk.from,
                            to = %chunk.to,
                            count = prices.len(),
                            "retrieved yahoo data"
                        );
                        prices
                    }
                    Err(err) => {
                        error!(
                            symbol,
                            start_date = %chunk.from,
                            end_date = %chunk.to,
                            error = %err,
                            "error retrieving yahoo data"
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

/// Flattens a chart response into day/close records, skipping `null` closes.
fn parse_chart(response: ChartResponse) -> Result<Vec<ScrapedPrice>, ScrapeError> {
    if let Some(err) = response.chart.error {
        return Err(ScrapeError::Chart {
            provider: PROVIDER,
            code: err.code,
            description: err.description,
        });
    }

    let Some(result) = response.chart.result.into_iter().next() else {
        return Ok(Vec::new());
    };
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Ok(Vec::new());
    };

    let prices = result
        .timestamp
        .iter()
        .zip(quote.close.iter())
        .filter_map(|(ts, close)| {
            let close_price = (*close)?;
            let date = DateTime::<Utc>::from_timestamp(*ts, 0)?.date_naive();
            Some(ScrapedPrice { date, close_price })
        })
        .collect();

    Ok(prices)
}
