use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use fincache_market_data::ScraperRegistry;

use crate::constants::{COVERAGE_THRESHOLD, PAIR_USDTRY};
use crate::errors::{Error, Result};
use crate::jobs::{Job, JobProcessor, JobRepositoryTrait, JobStatus, NewJob};
use crate::rates::{forward_fill, RateService};
use crate::utils::count_weekdays;

use super::prices_model::{
    Currency, GetPricesRequest, GetPricesResponse, NewPrice, Price, PricePoint, CURRENCY_TRY,
    CURRENCY_USD,
};
use super::prices_traits::PriceRepositoryTrait;

/// The ingestion service: evaluates coverage, queues scrape jobs, and
/// assembles currency-converted price points from whatever the store holds.
pub struct PriceService {
    price_repo: Arc<dyn PriceRepositoryTrait>,
    job_repo: Arc<dyn JobRepositoryTrait>,
    registry: Arc<ScraperRegistry>,
    rate_service: Arc<RateService>,
    notify: Arc<Notify>,
}

impl PriceService {
    /// `notify` is shared with the worker pool; creating a pending job pokes
    /// it so an idle worker claims the job without waiting for the poll tick.
    pub fn new(
        price_repo: Arc<dyn PriceRepositoryTrait>,
        job_repo: Arc<dyn JobRepositoryTrait>,
        registry: Arc<ScraperRegistry>,
        rate_service: Arc<RateService>,
        notify: Arc<Notify>,
    ) -> Self {
        Self {
            price_repo,
            job_repo,
            registry,
            rate_service,
            notify,
        }
    }

    pub fn list_sources(&self) -> Vec<String> {
        self.registry.sources()
    }

    /// Returns whatever the store holds for the range, converted to the
    /// requested currency, alongside the pending/active job handle when
    /// coverage was insufficient.
    pub async fn get_prices(
        &self,
        cancel: &CancellationToken,
        request: GetPricesRequest,
    ) -> Result<GetPricesResponse> {
        request.validate()?;

        let end_date = request.end_date.unwrap_or_else(|| Utc::now().date_naive());

        let scraper = self
            .registry
            .get(&request.source)
            .ok_or_else(|| Error::UnknownSource(request.source.clone()))?;
        let native_currency = scraper.native_currency(&request.symbol);

        // Prices are stored in native currency, so coverage ignores the
        // requested currency entirely.
        let existing =
            self.price_repo
                .existing_dates(&request.source, &request.symbol, request.start_date, end_date)?;
        let total_days = count_weekdays(request.start_date, end_date);
        let coverage = existing.len() as f64 / total_days.max(1) as f64;

        let mut job = None;
        if coverage <= COVERAGE_THRESHOLD || existing.is_empty() {
            job = match self.job_repo.find_active(
                &request.source,
                &request.symbol,
                request.start_date,
                end_date,
            )? {
                Some(active) => Some(active),
                None => {
                    let created = self
                        .job_repo
                        .create(NewJob {
                            source: request.source.clone(),
                            symbol: request.symbol.clone(),
                            start_date: request.start_date,
                            end_date,
                        })
                        .await?;
                    self.notify.notify_one();
                    Some(created)
                }
            };
        }

        let prices = self.price_repo.list_prices(
            &request.source,
            &request.symbol,
            request.start_date,
            end_date,
        )?;

        let points = self
            .convert_prices(
                cancel,
                prices,
                native_currency,
                request.currency,
                request.start_date,
                end_date,
            )
            .await?;

        Ok(GetPricesResponse { prices: points, job })
    }

    async fn convert_prices(
        &self,
        cancel: &CancellationToken,
        prices: Vec<Price>,
        native_currency: &str,
        requested_currency: Currency,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>> {
        let needs_conversion = native_currency != requested_currency.as_str();

        let rates = if needs_conversion {
            let rates = self
                .rate_service
                .get_rates(cancel, PAIR_USDTRY, from, to)
                .await?;
            if rates.is_empty() {
                return Err(Error::MissingExchangeRate(format!(
                    "no exchange rates available for {PAIR_USDTRY} in the requested date range"
                )));
            }
            let price_dates: Vec<NaiveDate> = prices.iter().map(|p| p.date).collect();
            Some(forward_fill(&rates, &price_dates))
        } else {
            None
        };

        prices
            .into_iter()
            .map(|price| {
                let mut point = PricePoint {
                    symbol: price.symbol,
                    date: price.date,
                    close_price: price.close_price,
                    currency: requested_currency,
                    native_price: price.close_price,
                    native_currency: native_currency.to_string(),
                    rate: 1.0,
                    source: price.source,
                };

                if let Some(rates) = &rates {
                    let rate = rates.get(&point.date).copied().unwrap_or_default();
                    if rate <= 0.0 {
                        return Err(Error::MissingExchangeRate(format!(
                            "missing exchange rate for {PAIR_USDTRY} on {}",
                            point.date
                        )));
                    }
                    point.rate = rate;
                    point.close_price =
                        convert(point.native_price, native_currency, requested_currency.as_str(), rate);
                }

                Ok(point)
            })
            .collect()
    }

    async fn fail_job(&self, mut job: Job, err: Error) -> Result<()> {
        job.status = JobStatus::Failed;
        job.error = Some(err.to_string());
        if let Err(update_err) = self.job_repo.update(&job).await {
            error!(job = job.id, error = %update_err, "failed to persist job failure");
        }
        Err(err)
    }
}

#[async_trait]
impl JobProcessor for PriceService {
    /// Executes a claimed job: scrape, filter already-stored dates, persist,
    /// and advance the job to its terminal status. Scrape and store errors
    /// land in the job row; the caller learns outcomes by polling it.
    async fn process(&self, cancel: &CancellationToken, job: Job) -> Result<()> {
        let scraper = match self.registry.get(&job.source) {
            Some(scraper) => scraper,
            None => {
                let source = job.source.clone();
                return self.fail_job(job, Error::UnknownSource(source)).await;
            }
        };
        let native_currency = scraper.native_currency(&job.symbol);

        let existing = match self.price_repo.existing_dates(
            &job.source,
            &job.symbol,
            job.start_date,
            job.end_date,
        ) {
            Ok(existing) => existing,
            Err(err) => return self.fail_job(job, err).await,
        };

        let scraped = match scraper
            .scrape(cancel, &job.symbol, job.start_date, job.end_date)
            .await
        {
            Ok(scraped) => scraped,
            Err(err) => return self.fail_job(job, err.into()).await,
        };

        let total_scraped = scraped.len();
        let new_prices: Vec<NewPrice> = scraped
            .into_iter()
            .filter(|scraped_price| !existing.contains(&scraped_price.date))
            .map(|scraped_price| NewPrice {
                source: job.source.clone(),
                symbol: job.symbol.clone(),
                date: scraped_price.date,
                close_price: scraped_price.close_price,
                currency: native_currency.to_string(),
            })
            .collect();

        let inserted = match self.price_repo.save_prices(&new_prices).await {
            Ok(inserted) => inserted,
            Err(err) => return self.fail_job(job, err).await,
        };

        info!(
            source = %job.source,
            symbol = %job.symbol,
            new = inserted,
            total_scraped,
            "saved prices"
        );

        let mut job = job;
        job.status = JobStatus::Completed;
        job.records_count = inserted as i64;
        if let Err(err) = self.job_repo.update(&job).await {
            error!(job = job.id, error = %err, "failed to persist job completion");
        }
        Ok(())
    }
}

/// Applies the USDTRY rate: TRY→USD divides, USD→TRY multiplies, any other
/// combination passes the price through unchanged.
pub fn convert(price: f64, from: &str, to: &str, usdtry_rate: f64) -> f64 {
    match (from, to) {
        (CURRENCY_TRY, CURRENCY_USD) => price / usdtry_rate,
        (CURRENCY_USD, CURRENCY_TRY) => price * usdtry_rate,
        _ => price,
    }
}
