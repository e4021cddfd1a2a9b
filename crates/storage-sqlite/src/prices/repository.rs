use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;

use fincache_core::errors::Result;
use fincache_core::prices::{NewPrice, Price, PriceRepositoryTrait};

use super::model::{NewPriceDB, PriceDB};
use crate::db::{get_connection, DbPool};
use crate::errors::StorageError;
use crate::schema::prices;
use crate::utils::{format_day, parse_day};

/// Insert batch size for price writes.
const BATCH_SIZE: usize = 500;

pub struct PriceRepository {
    pool: Arc<DbPool>,
}

impl PriceRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriceRepositoryTrait for PriceRepository {
    async fn save_prices(&self, new_prices: &[NewPrice]) -> Result<usize> {
        if new_prices.is_empty() {
            return Ok(0);
        }

        let rows: Vec<NewPriceDB> = new_prices.iter().map(NewPriceDB::from).collect();
        let mut conn = get_connection(&self.pool)?;

        let mut total = 0;
        for chunk in rows.chunks(BATCH_SIZE) {
            // The unique index on (source, symbol, date) absorbs duplicates;
            // the affected-row count only reflects rows actually inserted.
            let inserted = conn.immediate_transaction::<_, StorageError, _>(|conn| {
                diesel::insert_or_ignore_into(prices::table)
                    .values(chunk)
                    .execute(conn)
                    .map_err(StorageError::from)
            })?;
            total += inserted;
        }

        Ok(total)
    }

    fn list_prices(
        &self,
        source: &str,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Price>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = prices::table
            .filter(prices::source.eq(source))
            .filter(prices::symbol.eq(symbol))
            .filter(prices::date.ge(format_day(from)))
            .filter(prices::date.le(format_day(to)))
            .order(prices::date.asc())
            .load::<PriceDB>(&mut conn)
            .map_err(StorageError::from)?;

        rows.into_iter().map(Price::try_from).collect()
    }

    fn existing_dates(
        &self,
        source: &str,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<HashSet<NaiveDate>> {
        let mut conn = get_connection(&self.pool)?;

        let days = prices::table
            .filter(prices::source.eq(source))
            .filter(prices::symbol.eq(symbol))
            .filter(prices::date.ge(format_day(from)))
            .filter(prices::date.le(format_day(to)))
            .select(prices::date)
            .load::<String>(&mut conn)
            .map_err(StorageError::from)?;

        days.iter().map(|day| parse_day(day)).collect()
    }
}
