use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use fincache_core::jobs::Job;

use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;
use crate::models::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct JobsQuery {
    source: Option<String>,
    symbol: Option<String>,
}

pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobsQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Job>>>> {
    let jobs = state.job_service.list(
        query.source.as_deref().filter(|s| !s.is_empty()),
        query.symbol.as_deref().filter(|s| !s.is_empty()),
    )?;
    Ok(ApiResponse::ok(jobs))
}

pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Job>>> {
    let id: i64 = id
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid job id".to_string()))?;
    let job = state.job_service.get(id)?;
    Ok(ApiResponse::ok(job))
}
