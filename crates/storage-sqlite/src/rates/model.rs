use diesel::prelude::*;

use fincache_core::errors::Error;
use fincache_core::rates::{ExchangeRate, NewRate};

use crate::utils::{format_day, parse_day, parse_timestamp};

/// Database row for an exchange rate.
#[derive(Queryable, Identifiable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::exchange_rates)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RateDB {
    pub id: i64,
    pub pair: String,
    pub date: String,
    pub rate: f64,
    pub created_at: String,
}

/// Insertable row; `created_at` is filled by the column default.
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::exchange_rates)]
pub struct NewRateDB {
    pub pair: String,
    pub date: String,
    pub rate: f64,
}

impl From<&NewRate> for NewRateDB {
    fn from(rate: &NewRate) -> Self {
        Self {
            pair: rate.pair.clone(),
            date: format_day(rate.date),
            rate: rate.rate,
        }
    }
}

impl TryFrom<RateDB> for ExchangeRate {
    type Error = Error;

    fn try_from(row: RateDB) -> Result<Self, Self::Error> {
        Ok(ExchangeRate {
            id: row.id,
            pair: row.pair,
            date: parse_day(&row.date)?,
            rate: row.rate,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}
