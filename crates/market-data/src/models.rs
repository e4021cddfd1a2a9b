use chrono::NaiveDate;

/// A single day's closing price as returned by a provider, before the
/// ingestion service stamps it with source, symbol and native currency.
///
/// Adapters normalize provider timestamps to calendar days (midnight UTC)
/// before building these, so downstream date-set comparisons are exact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrapedPrice {
    pub date: NaiveDate,
    pub close_price: f64,
}
