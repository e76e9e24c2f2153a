use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use crate::api::{json_body, path_param, query_params, validate};
use crate::database::models::{Job, JobFilter};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /jobs - admin only
///
/// Body: `{ title, salary?, equity?, companyHandle }`, equity as a decimal string
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let data = validate::new_job(&json_body(body)?)?;
    let job = Job::create(state.pool(), &data).await?;

    tracing::info!("Created job {} for {}", job.id, job.company_handle);
    Ok(ApiResponse::created(json!({ "job": job })))
}

/// GET /jobs?title=&minSalary=&hasEquity=
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<JobFilter>, QueryRejection>,
) -> ApiResult<Value> {
    let filter = query_params(query)?;
    let jobs = Job::find_all(state.pool(), &filter).await?;
    Ok(ApiResponse::success(json!({ "jobs": jobs })))
}

/// GET /jobs/:id
pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Value> {
    let id = path_param(id)?;
    let job = Job::get(state.pool(), id).await?;
    Ok(ApiResponse::success(json!({ "job": job })))
}

/// PATCH /jobs/:id - admin only
///
/// Any of `{ title, salary, equity }`; the company cannot change.
pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let id = path_param(id)?;
    let payload = validate::job_update(json_body(body)?)?;
    let job = Job::update(state.pool(), id, &payload).await?;
    Ok(ApiResponse::success(json!({ "job": job })))
}

/// DELETE /jobs/:id - admin only
pub async fn remove(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Value> {
    let id = path_param(id)?;
    Job::remove(state.pool(), id).await?;

    tracing::info!("Deleted job {}", id);
    Ok(ApiResponse::success(json!({ "deleted": id })))
}
