use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::Result;

use super::prices_model::{NewPrice, Price};

/// Repository contract for the price store.
#[async_trait]
pub trait PriceRepositoryTrait: Send + Sync {
    /// Insert-or-ignore; duplicates contribute zero to the returned count.
    /// Empty input returns 0 without a database round-trip.
    async fn save_prices(&self, prices: &[NewPrice]) -> Result<usize>;

    /// Prices for the range, ordered by date ascending.
    fn list_prices(
        &self,
        source: &str,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Price>>;

    /// The set of dates already present for (source, symbol) in the range.
    fn existing_dates(
        &self,
        source: &str,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<HashSet<NaiveDate>>;
}
