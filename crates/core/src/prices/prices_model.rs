use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ValidationError};
use crate::jobs::Job;

pub const CURRENCY_TRY: &str = "TRY";
pub const CURRENCY_USD: &str = "USD";

/// Currencies a caller may request prices in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "TRY")]
    Try,
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Try => CURRENCY_TRY,
            Currency::Usd => CURRENCY_USD,
        }
    }

    pub fn from_code(code: &str) -> Option<Currency> {
        match code {
            CURRENCY_TRY => Some(Currency::Try),
            CURRENCY_USD => Some(Currency::Usd),
            _ => None,
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored daily closing price, denominated in the source's native
/// currency. Immutable once written; (source, symbol, date) is unique.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub id: i64,
    pub source: String,
    pub symbol: String,
    pub date: NaiveDate,
    pub close_price: f64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Input for persisting a price.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPrice {
    pub source: String,
    pub symbol: String,
    pub date: NaiveDate,
    pub close_price: f64,
    pub currency: String,
}

/// A price projected into the caller's requested currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub symbol: String,
    pub date: NaiveDate,
    pub close_price: f64,
    pub currency: Currency,
    pub native_price: f64,
    pub native_currency: String,
    pub rate: f64,
    pub source: String,
}

/// Validated inputs for a price read.
#[derive(Debug, Clone)]
pub struct GetPricesRequest {
    pub source: String,
    pub symbol: String,
    pub currency: Currency,
    pub start_date: NaiveDate,
    /// Defaults to today (UTC) when absent.
    pub end_date: Option<NaiveDate>,
    pub format: String,
}

impl GetPricesRequest {
    pub fn validate(&self) -> Result<()> {
        if self.symbol.len() < 2 {
            return Err(
                ValidationError::InvalidInput("symbol must be at least 2 characters".to_string())
                    .into(),
            );
        }
        if let Some(end_date) = self.end_date {
            if end_date < self.start_date {
                return Err(ValidationError::InvalidInput(
                    "endDate must be after startDate".to_string(),
                )
                .into());
            }
        }
        if !matches!(self.format.as_str(), "" | "json" | "csv") {
            return Err(
                ValidationError::InvalidInput("format must be json or csv".to_string()).into(),
            );
        }
        Ok(())
    }
}

/// Prices plus the pending/active job handle, when one exists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPricesResponse {
    pub prices: Vec<PricePoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<Job>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GetPricesRequest {
        GetPricesRequest {
            source: "tefas".to_string(),
            symbol: "YAC".to_string(),
            currency: Currency::Try,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: Some(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()),
            format: String::new(),
        }
    }

    #[test]
    fn accepts_valid_request() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn rejects_short_symbol() {
        let mut req = request();
        req.symbol = "Y".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_end_before_start() {
        let mut req = request();
        req.end_date = Some(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_unknown_format() {
        let mut req = request();
        req.format = "xml".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn currency_codes_round_trip() {
        assert_eq!(Currency::from_code("TRY"), Some(Currency::Try));
        assert_eq!(Currency::from_code("USD"), Some(Currency::Usd));
        assert_eq!(Currency::from_code("EUR"), None);
        assert_eq!(Currency::Try.to_string(), "TRY");
    }
}
