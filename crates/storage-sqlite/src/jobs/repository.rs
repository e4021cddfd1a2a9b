use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;

use fincache_core::errors::{Error, Result};
use fincache_core::jobs::{Job, JobRepositoryTrait, JobStatus, NewJob};

use super::model::{JobDB, NewJobDB};
use crate::db::{get_connection, DbPool};
use crate::errors::StorageError;
use crate::schema::jobs;
use crate::utils::{format_day, now_timestamp};

pub struct JobRepository {
    pool: Arc<DbPool>,
}

impl JobRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepositoryTrait for JobRepository {
    async fn create(&self, new_job: NewJob) -> Result<Job> {
        let mut conn = get_connection(&self.pool)?;
        let row = NewJobDB::from(&new_job);

        let inserted: JobDB = conn.immediate_transaction::<_, StorageError, _>(|conn| {
            diesel::insert_into(jobs::table)
                .values(&row)
                .returning(JobDB::as_returning())
                .get_result(conn)
                .map_err(StorageError::from)
        })?;

        inserted.try_into()
    }

    async fn update(&self, job: &Job) -> Result<()> {
        let mut conn = get_connection(&self.pool)?;

        conn.immediate_transaction::<_, StorageError, _>(|conn| {
            diesel::update(jobs::table.find(job.id))
                .set((
                    jobs::status.eq(job.status.as_str()),
                    jobs::error.eq(job.error.as_deref()),
                    jobs::records_count.eq(job.records_count),
                    jobs::updated_at.eq(now_timestamp()),
                ))
                .execute(conn)
                .map_err(StorageError::from)
        })?;

        Ok(())
    }

    fn get(&self, id: i64) -> Result<Job> {
        let mut conn = get_connection(&self.pool)?;

        let row = jobs::table
            .find(id)
            .first::<JobDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;

        match row {
            Some(row) => row.try_into(),
            None => Err(Error::NotFound("job not found".to_string())),
        }
    }

    fn list(&self, source: Option<&str>, symbol: Option<&str>) -> Result<Vec<Job>> {
        let mut conn = get_connection(&self.pool)?;

        let mut query = jobs::table.into_boxed();
        if let Some(source) = source {
            query = query.filter(jobs::source.eq(source.to_string()));
        }
        if let Some(symbol) = symbol {
            query = query.filter(jobs::symbol.eq(symbol.to_string()));
        }

        let rows = query
            .order(jobs::id.desc())
            .limit(100)
            .load::<JobDB>(&mut conn)
            .map_err(StorageError::from)?;

        rows.into_iter().map(Job::try_from).collect()
    }

    fn find_active(
        &self,
        source: &str,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Option<Job>> {
        let mut conn = get_connection(&self.pool)?;

        let row = jobs::table
            .filter(jobs::source.eq(source))
            .filter(jobs::symbol.eq(symbol))
            .filter(jobs::start_date.eq(format_day(start_date)))
            .filter(jobs::end_date.eq(format_day(end_date)))
            .filter(jobs::status.eq_any([
                JobStatus::Pending.as_str(),
                JobStatus::Running.as_str(),
            ]))
            .first::<JobDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;

        row.map(Job::try_from).transpose()
    }

    async fn claim_pending(&self) -> Result<Option<Job>> {
        let mut conn = get_connection(&self.pool)?;

        // SELECT + UPDATE inside one BEGIN IMMEDIATE transaction: SQLite
        // serializes writers, so two concurrent claimers never see the same
        // pending row.
        let claimed_id: Option<i64> = conn.immediate_transaction::<_, StorageError, _>(|conn| {
            let id = jobs::table
                .filter(jobs::status.eq(JobStatus::Pending.as_str()))
                .order(jobs::id.asc())
                .select(jobs::id)
                .first::<i64>(conn)
                .optional()?;

            if let Some(id) = id {
                diesel::update(jobs::table.find(id))
                    .set((
                        jobs::status.eq(JobStatus::Running.as_str()),
                        jobs::updated_at.eq(now_timestamp()),
                    ))
                    .execute(conn)?;
            }

            Ok(id)
        })?;

        // Re-read on the same connection: with an in-memory store the pool
        // holds a single connection, so a second checkout here would block.
        match claimed_id {
            Some(id) => {
                let row = jobs::table
                    .find(id)
                    .first::<JobDB>(&mut conn)
                    .map_err(StorageError::from)?;
                Ok(Some(row.try_into()?))
            }
            None => Ok(None),
        }
    }

    async fn recover_stale(&self) -> Result<usize> {
        let mut conn = get_connection(&self.pool)?;

        let count = conn.immediate_transaction::<_, StorageError, _>(|conn| {
            diesel::update(jobs::table.filter(jobs::status.eq(JobStatus::Running.as_str())))
                .set((
                    jobs::status.eq(JobStatus::Pending.as_str()),
                    jobs::error.eq(None::<String>),
                    jobs::updated_at.eq(now_timestamp()),
                ))
                .execute(conn)
                .map_err(StorageError::from)
        })?;

        Ok(count)
    }
}
