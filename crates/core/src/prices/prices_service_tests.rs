use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use futures::FutureExt;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use fincache_market_data::{ScrapeError, ScrapedPrice, Scraper, ScraperRegistry};

use crate::errors::{Error, Result};
use crate::jobs::{Job, JobProcessor, JobRepositoryTrait, JobStatus, NewJob};
use crate::prices::{
    convert, Currency, GetPricesRequest, NewPrice, Price, PriceRepositoryTrait, PriceService,
};
use crate::rates::{ExchangeRate, NewRate, RateFetcher, RateRepositoryTrait, RateService};

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

// =========================================================================
// Mock price repository
// =========================================================================

#[derive(Default)]
struct MockPriceRepo {
    prices: Mutex<Vec<Price>>,
    saved: Mutex<Vec<NewPrice>>,
}

impl MockPriceRepo {
    fn seed(&self, source: &str, symbol: &str, currency: &str, entries: &[(NaiveDate, f64)]) {
        let mut prices = self.prices.lock().unwrap();
        for (day, close) in entries {
            let id = prices.len() as i64 + 1;
            prices.push(Price {
                id,
                source: source.to_string(),
                symbol: symbol.to_string(),
                date: *day,
                close_price: *close,
                currency: currency.to_string(),
                created_at: Utc::now(),
            });
        }
    }
}

#[async_trait]
impl PriceRepositoryTrait for MockPriceRepo {
    async fn save_prices(&self, new_prices: &[NewPrice]) -> Result<usize> {
        self.saved.lock().unwrap().extend_from_slice(new_prices);
        let mut prices = self.prices.lock().unwrap();
        for new_price in new_prices {
            let id = prices.len() as i64 + 1;
            prices.push(Price {
                id,
                source: new_price.source.clone(),
                symbol: new_price.symbol.clone(),
                date: new_price.date,
                close_price: new_price.close_price,
                currency: new_price.currency.clone(),
                created_at: Utc::now(),
            });
        }
        Ok(new_prices.len())
    }

    fn list_prices(
        &self,
        source: &str,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Price>> {
        let mut matching: Vec<Price> = self
            .prices
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.source == source && p.symbol == symbol && p.date >= from && p.date <= to)
            .cloned()
            .collect();
        matching.sort_by_key(|p| p.date);
        Ok(matching)
    }

    fn existing_dates(
        &self,
        source: &str,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<HashSet<NaiveDate>> {
        Ok(self
            .prices
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.source == source && p.symbol == symbol && p.date >= from && p.date <= to)
            .map(|p| p.date)
            .collect())
    }
}

// =========================================================================
// Mock job repository
// =========================================================================

#[derive(Default)]
struct MockJobRepo {
    jobs: Mutex<Vec<Job>>,
    next_id: AtomicI64,
}

#[async_trait]
impl JobRepositoryTrait for MockJobRepo {
    async fn create(&self, new_job: NewJob) -> Result<Job> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        let job = Job {
            id,
            source: new_job.source,
            symbol: new_job.symbol,
            start_date: new_job.start_date,
            end_date: new_job.end_date,
            status: JobStatus::Pending,
            error: None,
            records_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.jobs.lock().unwrap().push(job.clone());
        Ok(job)
    }

    async fn update(&self, job: &Job) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(slot) = jobs.iter_mut().find(|j| j.id == job.id) {
            *slot = job.clone();
        }
        Ok(())
    }

    fn get(&self, id: i64) -> Result<Job> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound("job not found".to_string()))
    }

    fn list(&self, _source: Option<&str>, _symbol: Option<&str>) -> Result<Vec<Job>> {
        Ok(self.jobs.lock().unwrap().clone())
    }

    fn find_active(
        &self,
        source: &str,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Option<Job>> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| {
                j.source == source
                    && j.symbol == symbol
                    && j.start_date == start_date
                    && j.end_date == end_date
                    && !j.status.is_terminal()
            })
            .cloned())
    }

    async fn claim_pending(&self) -> Result<Option<Job>> {
        let mut jobs = self.jobs.lock().unwrap();
        let claimed = jobs
            .iter_mut()
            .filter(|j| j.status == JobStatus::Pending)
            .min_by_key(|j| j.id);
        if let Some(job) = claimed {
            job.status = JobStatus::Running;
            return Ok(Some(job.clone()));
        }
        Ok(None)
    }

    async fn recover_stale(&self) -> Result<usize> {
        Ok(0)
    }
}

// =========================================================================
// Mock scraper and rate source
// =========================================================================

struct MockScraper {
    native: &'static str,
    prices: Vec<ScrapedPrice>,
    fail: bool,
    calls: AtomicUsize,
}

impl MockScraper {
    fn returning(native: &'static str, prices: Vec<ScrapedPrice>) -> Self {
        Self {
            native,
            prices,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            native: "TRY",
            prices: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Scraper for MockScraper {
    fn source(&self) -> &'static str {
        "tefas"
    }

    fn native_currency(&self, _symbol: &str) -> &'static str {
        self.native
    }

    async fn scrape(
        &self,
        _cancel: &CancellationToken,
        _symbol: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> std::result::Result<Vec<ScrapedPrice>, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ScrapeError::Auth {
                provider: "tefas",
                message: "upstream rejected the session".to_string(),
            });
        }
        Ok(self.prices.clone())
    }
}

#[derive(Default)]
struct MockRateRepo {
    rates: Mutex<Vec<ExchangeRate>>,
}

impl MockRateRepo {
    fn seed(&self, entries: &[(NaiveDate, f64)]) {
        let mut rates = self.rates.lock().unwrap();
        for (day, rate) in entries {
            let id = rates.len() as i64 + 1;
            rates.push(ExchangeRate {
                id,
                pair: "USDTRY".to_string(),
                date: *day,
                rate: *rate,
                created_at: Utc::now(),
            });
        }
    }
}

#[async_trait]
impl RateRepositoryTrait for MockRateRepo {
    async fn save_rates(&self, new_rates: &[NewRate]) -> Result<usize> {
        let mut rates = self.rates.lock().unwrap();
        for rate in new_rates {
            let id = rates.len() as i64 + 1;
            rates.push(ExchangeRate {
                id,
                pair: rate.pair.clone(),
                date: rate.date,
                rate: rate.rate,
                created_at: Utc::now(),
            });
        }
        Ok(new_rates.len())
    }

    fn list_rates(&self, pair: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<ExchangeRate>> {
        Ok(self
            .rates
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.pair == pair && r.date >= from && r.date <= to)
            .cloned()
            .collect())
    }

    fn existing_dates(&self, pair: &str, from: NaiveDate, to: NaiveDate) -> Result<HashSet<NaiveDate>> {
        Ok(self
            .rates
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.pair == pair && r.date >= from && r.date <= to)
            .map(|r| r.date)
            .collect())
    }
}

struct FailingFetcher;

#[async_trait]
impl RateFetcher for FailingFetcher {
    async fn fetch_daily_closes(
        &self,
        _cancel: &CancellationToken,
        _symbol: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>> {
        Err(Error::Unexpected("chart unavailable".to_string()))
    }
}

// =========================================================================
// Fixture
// =========================================================================

struct Fixture {
    price_repo: Arc<MockPriceRepo>,
    job_repo: Arc<MockJobRepo>,
    rate_repo: Arc<MockRateRepo>,
    scraper: Arc<MockScraper>,
    notify: Arc<Notify>,
    service: PriceService,
}

fn fixture(scraper: MockScraper) -> Fixture {
    let price_repo = Arc::new(MockPriceRepo::default());
    let job_repo = Arc::new(MockJobRepo::default());
    let rate_repo = Arc::new(MockRateRepo::default());
    let scraper = Arc::new(scraper);
    let notify = Arc::new(Notify::new());

    let registry = Arc::new(ScraperRegistry::new());
    registry.register(scraper.clone());

    let rate_service = Arc::new(RateService::new(rate_repo.clone(), Arc::new(FailingFetcher)));
    let service = PriceService::new(
        price_repo.clone(),
        job_repo.clone(),
        registry,
        rate_service,
        notify.clone(),
    );

    Fixture {
        price_repo,
        job_repo,
        rate_repo,
        scraper,
        notify,
        service,
    }
}

fn request(currency: Currency, start: NaiveDate, end: NaiveDate) -> GetPricesRequest {
    GetPricesRequest {
        source: "tefas".to_string(),
        symbol: "YAC".to_string(),
        currency,
        start_date: start,
        end_date: Some(end),
        format: String::new(),
    }
}

// =========================================================================
// get_prices
// =========================================================================

#[tokio::test]
async fn queues_a_job_and_notifies_when_coverage_is_insufficient() {
    let fx = fixture(MockScraper::returning("TRY", Vec::new()));
    let cancel = CancellationToken::new();

    let response = fx
        .service
        .get_prices(&cancel, request(Currency::Try, date(1, 1), date(1, 5)))
        .await
        .unwrap();

    let job = response.job.expect("expected a job to be created");
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.start_date, date(1, 1));
    assert_eq!(job.end_date, date(1, 5));
    // The worker wake-up was sent: a stored permit completes immediately.
    assert!(fx.notify.notified().now_or_never().is_some());
}

#[tokio::test]
async fn reuses_the_active_job_for_the_same_fingerprint() {
    let fx = fixture(MockScraper::returning("TRY", Vec::new()));
    let cancel = CancellationToken::new();
    let req = request(Currency::Try, date(1, 1), date(1, 5));

    let first = fx.service.get_prices(&cancel, req.clone()).await.unwrap();
    let second = fx.service.get_prices(&cancel, req).await.unwrap();

    assert_eq!(
        first.job.as_ref().unwrap().id,
        second.job.as_ref().unwrap().id
    );
    assert_eq!(fx.job_repo.jobs.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn full_coverage_short_circuits_job_creation() {
    let fx = fixture(MockScraper::returning("TRY", Vec::new()));
    // Jan 1-5 2024 is Mon..Fri: five weekdays, all covered.
    fx.price_repo.seed(
        "tefas",
        "YAC",
        "TRY",
        &[
            (date(1, 1), 1.0),
            (date(1, 2), 1.1),
            (date(1, 3), 1.2),
            (date(1, 4), 1.3),
            (date(1, 5), 1.4),
        ],
    );
    let cancel = CancellationToken::new();

    let response = fx
        .service
        .get_prices(&cancel, request(Currency::Try, date(1, 1), date(1, 5)))
        .await
        .unwrap();

    assert!(response.job.is_none());
    assert_eq!(response.prices.len(), 5);
    assert!(response.prices.iter().all(|p| p.rate == 1.0));
    assert!(fx.job_repo.jobs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn converts_try_prices_to_usd() {
    let fx = fixture(MockScraper::returning("TRY", Vec::new()));
    fx.price_repo
        .seed("tefas", "YAC", "TRY", &[(date(1, 2), 30.0), (date(1, 3), 60.0)]);
    fx.rate_repo.seed(&[(date(1, 2), 30.0), (date(1, 3), 30.0)]);
    let cancel = CancellationToken::new();

    let response = fx
        .service
        .get_prices(&cancel, request(Currency::Usd, date(1, 2), date(1, 3)))
        .await
        .unwrap();

    assert_eq!(response.prices.len(), 2);
    assert_eq!(response.prices[0].close_price, 1.0);
    assert_eq!(response.prices[1].close_price, 2.0);
    for point in &response.prices {
        assert_eq!(point.rate, 30.0);
        assert_eq!(point.currency, Currency::Usd);
        assert_eq!(point.native_currency, "TRY");
    }
    assert_eq!(response.prices[0].native_price, 30.0);
}

#[tokio::test]
async fn converts_usd_prices_to_try() {
    let fx = fixture(MockScraper::returning("USD", Vec::new()));
    fx.price_repo.seed("tefas", "YAC", "USD", &[(date(1, 2), 100.0)]);
    fx.rate_repo.seed(&[(date(1, 2), 30.0)]);
    let cancel = CancellationToken::new();

    let response = fx
        .service
        .get_prices(&cancel, request(Currency::Try, date(1, 2), date(1, 2)))
        .await
        .unwrap();

    assert_eq!(response.prices.len(), 1);
    assert_eq!(response.prices[0].close_price, 3000.0);
    assert_eq!(response.prices[0].rate, 30.0);
}

#[tokio::test]
async fn forward_fills_rates_for_gap_days() {
    let fx = fixture(MockScraper::returning("TRY", Vec::new()));
    fx.price_repo.seed("tefas", "YAC", "TRY", &[(date(1, 3), 60.0)]);
    fx.rate_repo.seed(&[(date(1, 2), 30.0), (date(1, 4), 31.0)]);
    let cancel = CancellationToken::new();

    let response = fx
        .service
        .get_prices(&cancel, request(Currency::Usd, date(1, 2), date(1, 4)))
        .await
        .unwrap();

    assert_eq!(response.prices.len(), 1);
    assert_eq!(response.prices[0].rate, 30.0);
    assert_eq!(response.prices[0].close_price, 2.0);
}

#[tokio::test]
async fn fails_when_no_rates_are_available_for_conversion() {
    let fx = fixture(MockScraper::returning("TRY", Vec::new()));
    fx.price_repo.seed("tefas", "YAC", "TRY", &[(date(1, 2), 30.0)]);
    let cancel = CancellationToken::new();

    let result = fx
        .service
        .get_prices(&cancel, request(Currency::Usd, date(1, 2), date(1, 3)))
        .await;

    assert!(matches!(result, Err(Error::MissingExchangeRate(_))));
}

#[tokio::test]
async fn fails_when_a_price_date_precedes_the_first_known_rate() {
    let fx = fixture(MockScraper::returning("TRY", Vec::new()));
    fx.price_repo.seed("tefas", "YAC", "TRY", &[(date(1, 1), 30.0)]);
    fx.rate_repo.seed(&[(date(1, 2), 30.0)]);
    let cancel = CancellationToken::new();

    let result = fx
        .service
        .get_prices(&cancel, request(Currency::Usd, date(1, 1), date(1, 2)))
        .await;

    assert!(matches!(result, Err(Error::MissingExchangeRate(_))));
}

#[tokio::test]
async fn rejects_unknown_source() {
    let fx = fixture(MockScraper::returning("TRY", Vec::new()));
    let cancel = CancellationToken::new();
    let mut req = request(Currency::Try, date(1, 1), date(1, 5));
    req.source = "unknown".to_string();

    assert!(matches!(
        fx.service.get_prices(&cancel, req).await,
        Err(Error::UnknownSource(_))
    ));
}

#[tokio::test]
async fn rejects_invalid_request() {
    let fx = fixture(MockScraper::returning("TRY", Vec::new()));
    let cancel = CancellationToken::new();
    let mut req = request(Currency::Try, date(1, 1), date(1, 5));
    req.symbol = "Y".to_string();

    assert!(matches!(
        fx.service.get_prices(&cancel, req).await,
        Err(Error::Validation(_))
    ));
}

// =========================================================================
// process
// =========================================================================

async fn claimed_job(fx: &Fixture, start: NaiveDate, end: NaiveDate) -> Job {
    fx.job_repo
        .create(NewJob {
            source: "tefas".to_string(),
            symbol: "YAC".to_string(),
            start_date: start,
            end_date: end,
        })
        .await
        .unwrap();
    fx.job_repo.claim_pending().await.unwrap().unwrap()
}

#[tokio::test]
async fn process_saves_new_prices_and_completes_the_job() {
    let fx = fixture(MockScraper::returning(
        "TRY",
        vec![
            ScrapedPrice {
                date: date(1, 2),
                close_price: 1.23,
            },
            ScrapedPrice {
                date: date(1, 3),
                close_price: 1.24,
            },
        ],
    ));
    // Jan 2 is already stored; only Jan 3 should be written.
    fx.price_repo.seed("tefas", "YAC", "TRY", &[(date(1, 2), 1.23)]);
    let job = claimed_job(&fx, date(1, 1), date(1, 5)).await;
    let cancel = CancellationToken::new();

    fx.service.process(&cancel, job.clone()).await.unwrap();

    let saved = fx.price_repo.saved.lock().unwrap().clone();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].date, date(1, 3));
    assert_eq!(saved[0].currency, "TRY");
    assert_eq!(saved[0].source, "tefas");

    let updated = fx.job_repo.get(job.id).unwrap();
    assert_eq!(updated.status, JobStatus::Completed);
    assert_eq!(updated.records_count, 1);
    assert_eq!(fx.scraper.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn process_marks_the_job_failed_on_scrape_error() {
    let fx = fixture(MockScraper::failing());
    let job = claimed_job(&fx, date(1, 1), date(1, 5)).await;
    let cancel = CancellationToken::new();

    let result = fx.service.process(&cancel, job.clone()).await;

    assert!(result.is_err());
    let updated = fx.job_repo.get(job.id).unwrap();
    assert_eq!(updated.status, JobStatus::Failed);
    assert!(updated
        .error
        .as_deref()
        .unwrap()
        .contains("upstream rejected the session"));
}

#[tokio::test]
async fn process_completes_as_a_noop_when_everything_is_stored() {
    let fx = fixture(MockScraper::returning(
        "TRY",
        vec![ScrapedPrice {
            date: date(1, 2),
            close_price: 1.23,
        }],
    ));
    fx.price_repo.seed("tefas", "YAC", "TRY", &[(date(1, 2), 1.23)]);
    let job = claimed_job(&fx, date(1, 1), date(1, 5)).await;
    let cancel = CancellationToken::new();

    fx.service.process(&cancel, job.clone()).await.unwrap();

    let updated = fx.job_repo.get(job.id).unwrap();
    assert_eq!(updated.status, JobStatus::Completed);
    assert_eq!(updated.records_count, 0);
}

// =========================================================================
// convert
// =========================================================================

#[test]
fn convert_is_identity_for_same_currency() {
    assert_eq!(convert(42.0, "TRY", "TRY", 30.0), 42.0);
    assert_eq!(convert(42.0, "USD", "USD", 30.0), 42.0);
}

#[test]
fn convert_round_trips_within_float_tolerance() {
    let rate = 32.175;
    let original = 123.456;
    let round_tripped = convert(convert(original, "USD", "TRY", rate), "TRY", "USD", rate);
    assert!((round_tripped - original).abs() < 1e-9);
}

#[test]
fn convert_divides_try_to_usd_and_multiplies_usd_to_try() {
    assert_eq!(convert(60.0, "TRY", "USD", 30.0), 2.0);
    assert_eq!(convert(2.0, "USD", "TRY", 30.0), 60.0);
}
