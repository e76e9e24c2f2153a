use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use serde_json::{json, Value};

use crate::api::{json_body, validate};
use crate::auth::password::{hash_password, verify_password};
use crate::database::models::{NewUser, User};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;

/// POST /auth/token - Exchange username/password for a JWT
///
/// Expected Input:
/// ```json
/// { "username": "u1", "password": "password1" }
/// ```
///
/// Expected Output:
/// ```json
/// { "success": true, "data": { "token": "eyJhbGciOiJIUzI1NiI..." } }
/// ```
pub async fn token(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let login = validate::login(&json_body(body)?)?;

    // Same answer for unknown user and wrong password
    let invalid = || ApiError::unauthorized("Invalid username/password");

    let (user, hashed) = User::find_with_password(state.pool(), &login.username)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&login.password, &hashed).await? {
        tracing::debug!("Failed login for {}", login.username);
        return Err(invalid());
    }

    let token = state.keys.create_token(&user.username, user.is_admin)?;
    Ok(ApiResponse::success(json!({ "token": token })))
}

/// POST /auth/register - Create a regular (non-admin) user and return a JWT
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let request = validate::registration(&json_body(body)?)?;

    let password_hash = hash_password(&request.password, state.bcrypt_cost()).await?;
    let user = User::register(
        state.pool(),
        &NewUser {
            username: request.username,
            password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            is_admin: false,
        },
    )
    .await?;

    tracing::info!("Registered user {}", user.username);
    let token = state.keys.create_token(&user.username, user.is_admin)?;
    Ok(ApiResponse::created(json!({ "token": token })))
}

/// GET /auth/whoami - The principal resolved from the bearer token
pub async fn whoami(Extension(current): Extension<CurrentUser>) -> ApiResult<Value> {
    let principal = current
        .principal()
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    Ok(ApiResponse::success(json!({
        "username": principal.identity,
        "isAdmin": principal.is_privileged,
    })))
}
