//! Design constants shared across the ingestion pipeline.

/// Coverage at or below this fraction of expected trading days triggers a
/// new scrape. Weekday counts approximate trading days, so the threshold is
/// deliberately loose to tolerate public holidays.
pub const COVERAGE_THRESHOLD: f64 = 0.8;

/// The canonical exchange-rate pair: how many TRY per one USD.
pub const PAIR_USDTRY: &str = "USDTRY";
