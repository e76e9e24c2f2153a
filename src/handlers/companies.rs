use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use crate::api::{json_body, query_params, validate};
use crate::database::models::{Company, CompanyFilter};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /companies - admin only
///
/// Body: `{ handle, name, description, numEmployees?, logoUrl? }`
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let data = validate::new_company(&json_body(body)?)?;
    let company = Company::create(state.pool(), &data).await?;

    tracing::info!("Created company {}", company.handle);
    Ok(ApiResponse::created(json!({ "company": company })))
}

/// GET /companies?nameLike=&minEmployees=&maxEmployees=
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<CompanyFilter>, QueryRejection>,
) -> ApiResult<Value> {
    let filter = query_params(query)?;
    validate::company_filter(&filter)?;

    let companies = Company::find_all(state.pool(), &filter).await?;
    Ok(ApiResponse::success(json!({ "companies": companies })))
}

/// GET /companies/:handle - company with its jobs
pub async fn get(State(state): State<AppState>, Path(handle): Path<String>) -> ApiResult<Value> {
    let company = Company::get(state.pool(), &handle).await?;
    Ok(ApiResponse::success(json!({ "company": company })))
}

/// PATCH /companies/:handle - admin only
///
/// Any of `{ name, description, numEmployees, logoUrl }`; at least one.
pub async fn update(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let payload = validate::company_update(json_body(body)?)?;
    let company = Company::update(state.pool(), &handle, &payload).await?;
    Ok(ApiResponse::success(json!({ "company": company })))
}

/// DELETE /companies/:handle - admin only
pub async fn remove(State(state): State<AppState>, Path(handle): Path<String>) -> ApiResult<Value> {
    Company::remove(state.pool(), &handle).await?;

    tracing::info!("Deleted company {}", handle);
    Ok(ApiResponse::success(json!({ "deleted": handle })))
}
