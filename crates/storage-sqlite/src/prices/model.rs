use diesel::prelude::*;

use fincache_core::errors::Error;
use fincache_core::prices::{NewPrice, Price};

use crate::utils::{format_day, parse_day, parse_timestamp};

/// Database row for a stored price.
#[derive(Queryable, Identifiable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::prices)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PriceDB {
    pub id: i64,
    pub source: String,
    pub symbol: String,
    pub date: String,
    pub close_price: f64,
    pub currency: String,
    pub created_at: String,
}

/// Insertable row; `created_at` is filled by the column default.
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::prices)]
pub struct NewPriceDB {
    pub source: String,
    pub symbol: String,
    pub date: String,
    pub close_price: f64,
    pub currency: String,
}

impl From<&NewPrice> for NewPriceDB {
    fn from(price: &NewPrice) -> Self {
        Self {
            source: price.source.clone(),
            symbol: price.symbol.clone(),
            date: format_day(price.date),
            close_price: price.close_price,
            currency: price.currency.clone(),
        }
    }
}

impl TryFrom<PriceDB> for Price {
    type Error = Error;

    fn try_from(row: PriceDB) -> Result<Self, Self::Error> {
        Ok(Price {
            id: row.id,
            source: row.source,
            symbol: row.symbol,
            date: parse_day(&row.date)?,
            close_price: row.close_price,
            currency: row.currency,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}
