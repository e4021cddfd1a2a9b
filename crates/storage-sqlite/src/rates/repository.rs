use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;

use fincache_core::errors::Result;
use fincache_core::rates::{ExchangeRate, NewRate, RateRepositoryTrait};

use super::model::{NewRateDB, RateDB};
use crate::db::{get_connection, DbPool};
use crate::errors::StorageError;
use crate::schema::exchange_rates;
use crate::utils::{format_day, parse_day};

const BATCH_SIZE: usize = 500;

pub struct RateRepository {
    pool: Arc<DbPool>,
}

impl RateRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateRepositoryTrait for RateRepository {
    async fn save_rates(&self, new_rates: &[NewRate]) -> Result<usize> {
        if new_rates.is_empty() {
            return Ok(0);
        }

        let rows: Vec<NewRateDB> = new_rates.iter().map(NewRateDB::from).collect();
        let mut conn = get_connection(&self.pool)?;

        let mut total = 0;
        for chunk in rows.chunks(BATCH_SIZE) {
            let inserted = conn.immediate_transaction::<_, StorageError, _>(|conn| {
                diesel::insert_or_ignore_into(exchange_rates::table)
                    .values(chunk)
                    .execute(conn)
                    .map_err(StorageError::from)
            })?;
            total += inserted;
        }

        Ok(total)
    }

    fn list_rates(&self, pair: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<ExchangeRate>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = exchange_rates::table
            .filter(exchange_rates::pair.eq(pair))
            .filter(exchange_rates::date.ge(format_day(from)))
            .filter(exchange_rates::date.le(format_day(to)))
            .order(exchange_rates::date.asc())
            .load::<RateDB>(&mut conn)
            .map_err(StorageError::from)?;

        rows.into_iter().map(ExchangeRate::try_from).collect()
    }

    fn existing_dates(&self, pair: &str, from: NaiveDate, to: NaiveDate) -> Result<HashSet<NaiveDate>> {
        let mut conn = get_connection(&self.pool)?;

        let days = exchange_rates::table
            .filter(exchange_rates::pair.eq(pair))
            .filter(exchange_rates::date.ge(format_day(from)))
            .filter(exchange_rates::date.le(format_day(to)))
            .select(exchange_rates::date)
            .load::<String>(&mut conn)
            .map_err(StorageError::from)?;

        days.iter().map(|day| parse_day(day)).collect()
    }
}
