use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::api::{json_body, path_param, validate};
use crate::auth::password::hash_password;
use crate::database::models::{NewUser, User};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /users - admin only
///
/// Unlike /auth/register this may create admins. Returns the user and a
/// token for them.
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let request = validate::new_user(&json_body(body)?)?;

    let password_hash = hash_password(&request.password, state.bcrypt_cost()).await?;
    let user = User::register(
        state.pool(),
        &NewUser {
            username: request.username,
            password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            is_admin: request.is_admin,
        },
    )
    .await?;

    tracing::info!("Created user {} (admin: {})", user.username, user.is_admin);
    let token = state.keys.create_token(&user.username, user.is_admin)?;
    Ok(ApiResponse::created(json!({ "user": user, "token": token })))
}

/// GET /users - admin only
pub async fn list(State(state): State<AppState>) -> ApiResult<Value> {
    let users = User::find_all(state.pool()).await?;
    Ok(ApiResponse::success(json!({ "users": users })))
}

/// GET /users/:username - the user or an admin
pub async fn get(State(state): State<AppState>, Path(username): Path<String>) -> ApiResult<Value> {
    let user = User::get(state.pool(), &username).await?;
    Ok(ApiResponse::success(json!({ "user": user })))
}

/// PATCH /users/:username - the user or an admin
///
/// Any of `{ firstName, lastName, password, email }`. The password is
/// hashed before the update is built.
pub async fn update(
    State(state): State<AppState>,
    Path(username): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let mut payload = validate::user_update(json_body(body)?)?;

    if let Some(Value::String(password)) = payload.get("password").cloned() {
        let hashed = hash_password(&password, state.bcrypt_cost()).await?;
        payload.insert("password", Value::String(hashed));
    }

    let user = User::update(state.pool(), &username, &payload).await?;
    Ok(ApiResponse::success(json!({ "user": user })))
}

/// DELETE /users/:username - the user or an admin
pub async fn remove(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Value> {
    User::remove(state.pool(), &username).await?;

    tracing::info!("Deleted user {}", username);
    Ok(ApiResponse::success(json!({ "deleted": username })))
}

/// POST /users/:username/jobs/:id - apply to a job, the user or an admin
pub async fn apply(
    State(state): State<AppState>,
    params: Result<Path<(String, i32)>, PathRejection>,
) -> ApiResult<Value> {
    let (username, job_id) = path_param(params)?;
    User::apply_to_job(state.pool(), &username, job_id).await?;

    tracing::info!("{} applied to job {}", username, job_id);
    Ok(ApiResponse::success(json!({ "applied": job_id })))
}
