use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::Result;

use super::jobs_model::{Job, NewJob};

/// Repository contract for the durable job store.
#[async_trait]
pub trait JobRepositoryTrait: Send + Sync {
    /// Inserts a new pending job and returns it with its assigned id.
    async fn create(&self, new_job: NewJob) -> Result<Job>;

    /// Persists `status`, `error` and `records_count`, bumping `updated_at`.
    async fn update(&self, job: &Job) -> Result<()>;

    /// Returns the job or `Error::NotFound`.
    fn get(&self, id: i64) -> Result<Job>;

    /// Most-recent-first, bounded to 100 rows.
    fn list(&self, source: Option<&str>, symbol: Option<&str>) -> Result<Vec<Job>>;

    /// Returns the single non-terminal job matching the exact fingerprint,
    /// if any. Overlapping-but-different ranges are not considered.
    fn find_active(
        &self,
        source: &str,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Option<Job>>;

    /// Atomically claims the lowest-id pending job, transitioning it to
    /// `running`. Two concurrent claimers never receive the same job.
    async fn claim_pending(&self) -> Result<Option<Job>>;

    /// Flips every `running` job back to `pending`, clearing its error.
    /// Invoked once at startup, before the worker pool begins claiming.
    async fn recover_stale(&self) -> Result<usize>;
}
