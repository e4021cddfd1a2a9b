//! The scraper contract and the source registry.
//!
//! A [`Scraper`] adapts one upstream provider: it authenticates if needed,
//! fetches a date range (chunked and in parallel where the provider
//! rate-limits per request) and normalizes the response to
//! [`ScrapedPrice`](crate::models::ScrapedPrice) records.

pub mod isyatirim;
pub mod tefas;
pub mod yahoo;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use crate::errors::ScrapeError;
use crate::models::ScrapedPrice;

/// A provider adapter for daily closing prices.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Stable identifier used in URLs, job rows and price rows.
    fn source(&self) -> &'static str;

    /// Currency the provider's closing prices are denominated in for the
    /// given symbol.
    fn native_currency(&self, symbol: &str) -> &'static str;

    /// Fetch daily close prices for `[from, to]`.
    ///
    /// Individual chunk failures are logged and swallowed; the returned set
    /// is the union of the successful chunks, in no particular order.
    /// Validation and authentication failures abort the whole scrape.
    async fn scrape(
        &self,
        cancel: &CancellationToken,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ScrapedPrice>, ScrapeError>;
}

/// Input checks shared by every adapter.
pub(crate) fn validate_range(symbol: &str, from: NaiveDate, to: NaiveDate) -> Result<(), ScrapeError> {
    if symbol.is_empty() {
        return Err(ScrapeError::Validation("symbol cannot be empty".to_string()));
    }
    if from > to {
        return Err(ScrapeError::Validation(
            "start date cannot be after end date".to_string(),
        ));
    }
    Ok(())
}

/// Source-id keyed set of registered scrapers.
#[derive(Default)]
pub struct ScraperRegistry {
    scrapers: RwLock<HashMap<String, Arc<dyn Scraper>>>,
}

impl ScraperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, scraper: Arc<dyn Scraper>) {
        self.scrapers
            .write()
            .unwrap()
            .insert(scraper.source().to_string(), scraper);
    }

    pub fn get(&self, source: &str) -> Option<Arc<dyn Scraper>> {
        self.scrapers.read().unwrap().get(source).cloned()
    }

    pub fn sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = self.scrapers.read().unwrap().keys().cloned().collect();
        sources.sort();
        sources
    }
}
