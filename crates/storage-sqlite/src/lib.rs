//! SQLite storage implementation for fincache.
//!
//! This crate provides all database-related functionality using Diesel with
//! SQLite. It implements the repository traits defined in `fincache-core`
//! and is the only place in the workspace where Diesel dependencies exist.
//!
//! Writes run inside `BEGIN IMMEDIATE` transactions, which serializes them
//! at the SQLite level; that single-writer discipline is what makes the job
//! claim atomic. In-memory databases (`:memory:`) restrict the pool to one
//! connection, since each SQLite connection would otherwise get its own
//! empty database.

pub mod db;
pub mod errors;
pub mod jobs;
pub mod prices;
pub mod rates;
pub mod schema;
mod utils;

pub use db::{create_pool, get_connection, run_migrations, DbConnection, DbPool};
pub use errors::StorageError;
pub use jobs::JobRepository;
pub use prices::PriceRepository;
pub use rates::RateRepository;
