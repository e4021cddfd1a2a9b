use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::constants::COVERAGE_THRESHOLD;
use crate::errors::Result;
use crate::utils::count_weekdays;

use super::rates_model::{pair_to_symbol, NewRate};
use super::rates_traits::{RateFetcher, RateRepositoryTrait};

/// Cache-through access to daily exchange rates.
pub struct RateService {
    repo: Arc<dyn RateRepositoryTrait>,
    fetcher: Arc<dyn RateFetcher>,
}

impl RateService {
    pub fn new(repo: Arc<dyn RateRepositoryTrait>, fetcher: Arc<dyn RateFetcher>) -> Self {
        Self { repo, fetcher }
    }

    /// Returns all stored rates for `[from, to]` as a date-keyed map,
    /// fetching the range from the chart API first when stored coverage is
    /// at or below the threshold. Fetch failures are non-fatal: the caller
    /// gets whatever the store already holds.
    pub async fn get_rates(
        &self,
        cancel: &CancellationToken,
        pair: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>> {
        let existing = self.repo.existing_dates(pair, from, to)?;
        let total_days = count_weekdays(from, to);
        let coverage = existing.len() as f64 / total_days.max(1) as f64;

        if coverage <= COVERAGE_THRESHOLD || existing.is_empty() {
            match self
                .fetcher
                .fetch_daily_closes(cancel, &pair_to_symbol(pair), from, to)
                .await
            {
                Ok(scraped) => {
                    let missing: Vec<NewRate> = scraped
                        .iter()
                        .filter(|(date, _)| !existing.contains(*date))
                        .map(|(date, rate)| NewRate {
                            pair: pair.to_string(),
                            date: *date,
                            rate: *rate,
                        })
                        .collect();
                    if !missing.is_empty() {
                        let saved = self.repo.save_rates(&missing).await?;
                        info!(pair, new = saved, "saved exchange rates");
                    }
                }
                Err(err) => {
                    // Fall through: serve whatever the store already has.
                    error!(pair, error = %err, "failed to fetch exchange rates");
                }
            }
        }

        let stored = self.repo.list_rates(pair, from, to)?;
        Ok(stored.into_iter().map(|r| (r.date, r.rate)).collect())
    }
}

/// Returns a rate for each date in `dates`: the exact rate when known,
/// otherwise the rate of the greatest stored date strictly before it.
/// Dates before the first known rate are omitted from the output.
pub fn forward_fill(
    rates: &BTreeMap<NaiveDate, f64>,
    dates: &[NaiveDate],
) -> BTreeMap<NaiveDate, f64> {
    let mut filled = BTreeMap::new();
    for date in dates {
        if let Some(rate) = rates.get(date) {
            filled.insert(*date, *rate);
        } else if let Some((_, rate)) = rates.range(..*date).next_back() {
            filled.insert(*date, *rate);
        }
    }
    filled
}
