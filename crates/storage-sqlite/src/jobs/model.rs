use diesel::prelude::*;

use fincache_core::errors::Error;
use fincache_core::jobs::{Job, JobStatus, NewJob};

use crate::utils::{format_day, parse_day, parse_timestamp};

/// Database row for a job.
#[derive(Queryable, Identifiable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::jobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct JobDB {
    pub id: i64,
    pub source: String,
    pub symbol: String,
    pub start_date: String,
    pub end_date: String,
    pub status: String,
    pub error: Option<String>,
    pub records_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Insertable row; timestamps come from the column defaults.
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::jobs)]
pub struct NewJobDB {
    pub source: String,
    pub symbol: String,
    pub start_date: String,
    pub end_date: String,
    pub status: String,
}

impl From<&NewJob> for NewJobDB {
    fn from(job: &NewJob) -> Self {
        Self {
            source: job.source.clone(),
            symbol: job.symbol.clone(),
            start_date: format_day(job.start_date),
            end_date: format_day(job.end_date),
            status: JobStatus::Pending.as_str().to_string(),
        }
    }
}

impl TryFrom<JobDB> for Job {
    type Error = Error;

    fn try_from(row: JobDB) -> Result<Self, Self::Error> {
        Ok(Job {
            id: row.id,
            source: row.source,
            symbol: row.symbol,
            start_date: parse_day(&row.start_date)?,
            end_date: parse_day(&row.end_date)?,
            status: row.status.parse()?,
            error: row.error,
            records_count: row.records_count,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}
