//! The ingestion entry point: coverage evaluation, job creation, and
//! currency-aware price assembly.

mod prices_model;
mod prices_service;
mod prices_traits;

#[cfg(test)]
mod prices_service_tests;

pub use prices_model::{
    Currency, GetPricesRequest, GetPricesResponse, NewPrice, Price, PricePoint, CURRENCY_TRY,
    CURRENCY_USD,
};
pub use prices_service::{convert, PriceService};
pub use prices_traits::PriceRepositoryTrait;
