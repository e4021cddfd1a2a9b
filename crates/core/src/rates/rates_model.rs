use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::constants::PAIR_USDTRY;

/// A stored exchange rate: how many units of the quote currency buy one
/// unit of the base currency on the given day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    pub id: i64,
    pub pair: String,
    pub date: NaiveDate,
    pub rate: f64,
    pub created_at: DateTime<Utc>,
}

/// Input for persisting a rate.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRate {
    pub pair: String,
    pub date: NaiveDate,
    pub rate: f64,
}

/// Maps a rate pair to the chart-API symbol that serves it.
pub fn pair_to_symbol(pair: &str) -> String {
    if pair == PAIR_USDTRY {
        return "USDTRY=X".to_string();
    }
    format!("{pair}=X")
}
