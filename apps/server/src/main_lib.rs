use std::sync::Arc;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use fincache_core::jobs::{JobService, WorkerPool};
use fincache_core::prices::PriceService;
use fincache_core::rates::RateService;
use fincache_market_data::fx::FxChartClient;
use fincache_market_data::scraper::isyatirim::IsyatirimScraper;
use fincache_market_data::scraper::tefas::TefasScraper;
use fincache_market_data::scraper::yahoo::YahooScraper;
use fincache_market_data::ScraperRegistry;
use fincache_storage_sqlite::{
    create_pool, run_migrations, JobRepository, PriceRepository, RateRepository,
};

use crate::config::Config;

/// Shared handles the HTTP layer works with.
pub struct AppState {
    pub price_service: Arc<PriceService>,
    pub job_service: Arc<JobService>,
    /// Wakes the worker pool; also available to startup code after recovery.
    pub notify: Arc<Notify>,
    /// Root cancellation token; request-path scrapes race against it.
    pub cancel: CancellationToken,
}

pub fn init_tracing() {
    let fmt_layer = fmt::layer().json().with_current_span(false);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Production wiring: opens the store and registers the real scrapers.
pub fn build_state(
    config: &Config,
    cancel: CancellationToken,
) -> anyhow::Result<(Arc<AppState>, WorkerPool)> {
    let registry = Arc::new(ScraperRegistry::new());
    registry.register(Arc::new(TefasScraper::new().with_workers(config.workers)));
    registry.register(Arc::new(YahooScraper::new().with_workers(config.workers)));
    registry.register(Arc::new(IsyatirimScraper::new()));

    build_state_with_registry(config, cancel, registry)
}

/// Wiring with a caller-supplied registry; integration tests register mock
/// scrapers here.
pub fn build_state_with_registry(
    config: &Config,
    cancel: CancellationToken,
    registry: Arc<ScraperRegistry>,
) -> anyhow::Result<(Arc<AppState>, WorkerPool)> {
    let pool = create_pool(&config.db_path)?;
    run_migrations(&pool)?;

    let price_repo = Arc::new(PriceRepository::new(pool.clone()));
    let job_repo = Arc::new(JobRepository::new(pool.clone()));
    let rate_repo = Arc::new(RateRepository::new(pool));

    let notify = Arc::new(Notify::new());
    let rate_service = Arc::new(RateService::new(rate_repo, Arc::new(FxChartClient::new())));
    let price_service = Arc::new(PriceService::new(
        price_repo,
        job_repo.clone(),
        registry,
        rate_service,
        notify.clone(),
    ));
    let job_service = Arc::new(JobService::new(job_repo.clone()));

    let worker_pool = WorkerPool::new(
        job_repo,
        price_service.clone(),
        config.workers,
        notify.clone(),
    );

    let state = Arc::new(AppState {
        price_service,
        job_service,
        notify,
        cancel,
    });

    Ok((state, worker_pool))
}
