use std::sync::Arc;

use tracing::info;

use crate::errors::{Result, ValidationError};

use super::jobs_model::Job;
use super::jobs_traits::JobRepositoryTrait;

/// Read-side job operations plus the startup recovery routine.
pub struct JobService {
    repo: Arc<dyn JobRepositoryTrait>,
}

impl JobService {
    pub fn new(repo: Arc<dyn JobRepositoryTrait>) -> Self {
        Self { repo }
    }

    /// Re-queues jobs left in `running` by a previous process.
    pub async fn recover_stale_jobs(&self) -> Result<usize> {
        let count = self.repo.recover_stale().await?;
        if count > 0 {
            info!(count, "re-queued interrupted jobs");
        }
        Ok(count)
    }

    pub fn get(&self, id: i64) -> Result<Job> {
        if id <= 0 {
            return Err(ValidationError::InvalidInput("invalid job id".to_string()).into());
        }
        self.repo.get(id)
    }

    pub fn list(&self, source: Option<&str>, symbol: Option<&str>) -> Result<Vec<Job>> {
        self.repo.list(source, symbol)
    }
}
