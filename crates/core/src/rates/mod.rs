//! Exchange rates: on-demand fetching, persistence, and forward-fill.

mod rates_model;
mod rates_service;
mod rates_traits;

pub use rates_model::{pair_to_symbol, ExchangeRate, NewRate};
pub use rates_service::{forward_fill, RateService};
pub use rates_traits::{RateFetcher, RateRepositoryTrait};
