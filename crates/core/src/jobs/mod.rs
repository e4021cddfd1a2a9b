//! Durable scrape jobs: the state machine, the repository contract, and the
//! worker pool that claims and processes pending jobs.

mod jobs_model;
mod jobs_service;
mod jobs_traits;
pub mod worker;


pub use jobs_model::{Job, JobStatus, NewJob};
pub use jobs_service::JobService;
pub use jobs_traits::JobRepositoryTrait;
pub use worker::{JobProcessor, WorkerPool};
