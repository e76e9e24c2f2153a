pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{authenticate_jwt, authorize, Chain};
use crate::state::AppState;

/// Build the full application router.
///
/// Every request passes through `authenticate_jwt`, which only ever attaches
/// a `CurrentUser`. Guarded routes then run their interceptor chain before
/// the handler.
pub fn app(state: AppState) -> Router {
    let verifier = state.verifier();
    let cors = cors_layer(&state.config.security.cors_origins);

    Router::new()
        // Public
        .route("/", get(handlers::system::root))
        .route("/health", get(handlers::system::health))
        .merge(auth_public_routes())
        .merge(company_routes())
        .merge(job_routes())
        // Guarded
        .merge(authenticated_routes())
        .merge(admin_routes())
        .merge(self_or_admin_routes())
        .with_state(state)
        // Global middleware
        .layer(from_fn_with_state(verifier, authenticate_jwt))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn auth_public_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/auth/token", post(auth::token))
        .route("/auth/register", post(auth::register))
}

fn company_routes() -> Router<AppState> {
    use handlers::companies;

    Router::new()
        .route("/companies", get(companies::list))
        .route("/companies/:handle", get(companies::get))
}

fn job_routes() -> Router<AppState> {
    use handlers::jobs;

    Router::new()
        .route("/jobs", get(jobs::list))
        .route("/jobs/:id", get(jobs::get))
}

fn authenticated_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/whoami", get(handlers::auth::whoami))
        .route_layer(from_fn_with_state(Chain::authenticated(), authorize))
}

fn admin_routes() -> Router<AppState> {
    use axum::routing::patch;
    use handlers::{companies, jobs, users};

    Router::new()
        .route("/companies", post(companies::create))
        .route(
            "/companies/:handle",
            patch(companies::update).delete(companies::remove),
        )
        .route("/jobs", post(jobs::create))
        .route("/jobs/:id", patch(jobs::update).delete(jobs::remove))
        .route("/users", post(users::create).get(users::list))
        .route_layer(from_fn_with_state(Chain::admin(), authorize))
}

fn self_or_admin_routes() -> Router<AppState> {
    use handlers::users;

    Router::new()
        .route(
            "/users/:username",
            get(users::get).patch(users::update).delete(users::remove),
        )
        .route("/users/:username/jobs/:id", post(users::apply))
        .route_layer(from_fn_with_state(Chain::self_or_admin(), authorize))
}

/// Permissive when no origins are configured, otherwise an allow-list
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
