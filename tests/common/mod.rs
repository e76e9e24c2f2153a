#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use jobly_api::auth::Claims;
use jobly_api::config::AppConfig;
use jobly_api::database::DatabaseManager;
use jobly_api::state::AppState;

/// Application state over a lazily connected pool.
///
/// Nothing touches the database until a handler runs a query, so requests
/// that are settled by auth or validation work without a server.
pub fn test_state() -> Result<AppState> {
    let config = AppConfig::test();
    let db = DatabaseManager::connect_lazy(&config.database).context("lazy pool")?;
    AppState::new(config, db).context("test state")
}

pub fn test_app() -> Result<(Router, AppState)> {
    let state = test_state()?;
    Ok((jobly_api::app(state.clone()), state))
}

/// Application over a real, migrated database.
///
/// `None` when `DATABASE_URL` is unset, so the suite still runs without a
/// server. Tests share the database and name their rows with [`unique`].
pub async fn db_app() -> Result<Option<(Router, AppState)>> {
    let _ = dotenvy::dotenv();
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return Ok(None);
    };

    let mut config = AppConfig::test();
    config.database.url = url;
    let db = DatabaseManager::connect(&config.database).await.context("connect")?;
    db.migrate().await.context("migrate")?;

    let state = AppState::new(config, db).context("test state")?;
    Ok(Some((jobly_api::app(state.clone()), state)))
}

/// A lowercase key no other test run will pick, e.g. `c18f3a9b2c41a0`
pub fn unique(prefix: &str) -> String {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!(
        "{}{:x}{:x}{:x}",
        prefix,
        nanos & 0xff_ffff_ffff,
        std::process::id() & 0xffff,
        NEXT.fetch_add(1, Ordering::Relaxed)
    )
}

pub fn token_for(state: &AppState, username: &str, is_admin: bool) -> Result<String> {
    Ok(state.keys.create_token(username, is_admin)?)
}

/// A correctly signed token whose `exp` is an hour in the past
pub fn expired_token_for(state: &AppState, username: &str, is_admin: bool) -> Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        username: username.to_string(),
        is_admin,
        exp: now - 3600,
        iat: now - 7200,
    };
    Ok(state.keys.sign(&claims)?)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<TestResponse> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).context("response body is not JSON")?
    };

    Ok(TestResponse { status, body })
}
