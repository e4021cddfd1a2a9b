//! Provider scrapers for the fincache ingestion pipeline.
//!
//! This crate contains everything that talks to upstream financial data
//! providers:
//! - The [`Scraper`] contract and the [`ScraperRegistry`] that the ingestion
//!   service resolves sources against
//! - Per-provider adapters (TEFAS fund history, Is Yatirim index history,
//!   Yahoo Finance chart API)
//! - Date-range chunking used to stay under per-request limits
//! - A crumb-less chart client used by the exchange-rate service
//!
//! Adapters normalize provider responses to [`ScrapedPrice`] records keyed
//! by calendar day. Individual chunk failures during a scrape are logged and
//! swallowed; only validation and authentication failures abort a scrape.

pub mod chunk;
pub mod errors;
pub mod fx;
pub mod models;
pub mod scraper;

pub use chunk::{split_date_range, DateRange};
pub use errors::ScrapeError;
pub use models::ScrapedPrice;
pub use scraper::{Scraper, ScraperRegistry};
