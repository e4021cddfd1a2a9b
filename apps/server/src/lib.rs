//! fincache server library.
//!
//! Exposes the router, configuration and state wiring so integration tests
//! can drive the full HTTP surface in-process. The binary in `main.rs` adds
//! signal handling and the shutdown sequence on top.

pub mod api;
pub mod config;
pub mod error;
pub mod main_lib;
pub mod models;

pub use main_lib::{build_state, build_state_with_registry, init_tracing, AppState};
