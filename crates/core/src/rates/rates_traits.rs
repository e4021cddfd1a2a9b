use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use fincache_market_data::fx::FxChartClient;

use crate::errors::Result;

use super::rates_model::{ExchangeRate, NewRate};

/// Repository contract for the exchange-rate store.
#[async_trait]
pub trait RateRepositoryTrait: Send + Sync {
    /// Insert-or-ignore; returns the number of rows actually inserted.
    async fn save_rates(&self, rates: &[NewRate]) -> Result<usize>;

    fn list_rates(&self, pair: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<ExchangeRate>>;

    fn existing_dates(&self, pair: &str, from: NaiveDate, to: NaiveDate) -> Result<HashSet<NaiveDate>>;
}

/// Upstream source for daily rate closes.
#[async_trait]
pub trait RateFetcher: Send + Sync {
    async fn fetch_daily_closes(
        &self,
        cancel: &CancellationToken,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>>;
}

#[async_trait]
impl RateFetcher for FxChartClient {
    async fn fetch_daily_closes(
        &self,
        cancel: &CancellationToken,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>> {
        self.daily_closes(cancel, symbol, from, to)
            .await
            .map_err(Into::into)
    }
}
