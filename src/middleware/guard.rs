//! Route guards.
//!
//! A guard is a [`Chain`] of [`Interceptor`]s run after `authenticate_jwt`
//! and before the handler. Each interceptor is a pure check over the
//! request principal (which may be absent) and the route parameters. The
//! first rejection ends the chain and becomes a 401 response.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use thiserror::Error;

use super::auth::CurrentUser;
use crate::auth::Principal;
use crate::error::ApiError;

/// Path parameters of the matched route, by name
pub type RouteParams = HashMap<String, String>;

/// Why an interceptor refused the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    NoPrincipal,
    NotPrivileged,
    NotSelf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthzError {
    #[error("Unauthorized ({0:?})")]
    Unauthorized(Denial),
}

pub trait Interceptor: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(())` lets the request continue, `Err` stops it.
    fn check(
        &self,
        principal: Option<&Principal>,
        params: &RouteParams,
    ) -> Result<(), AuthzError>;
}

/// Any verified token will do
pub struct RequireAuthenticated;

impl Interceptor for RequireAuthenticated {
    fn name(&self) -> &'static str {
        "require_authenticated"
    }

    fn check(
        &self,
        principal: Option<&Principal>,
        _params: &RouteParams,
    ) -> Result<(), AuthzError> {
        principal
            .map(|_| ())
            .ok_or(AuthzError::Unauthorized(Denial::NoPrincipal))
    }
}

/// Admins only
pub struct RequirePrivileged;

impl Interceptor for RequirePrivileged {
    fn name(&self) -> &'static str {
        "require_privileged"
    }

    fn check(
        &self,
        principal: Option<&Principal>,
        _params: &RouteParams,
    ) -> Result<(), AuthzError> {
        let principal = principal.ok_or(AuthzError::Unauthorized(Denial::NoPrincipal))?;
        if !principal.is_privileged {
            return Err(AuthzError::Unauthorized(Denial::NotPrivileged));
        }
        Ok(())
    }
}

/// Admins, or the user named by the `:username` route parameter
pub struct RequireSelfOrPrivileged;

impl Interceptor for RequireSelfOrPrivileged {
    fn name(&self) -> &'static str {
        "require_self_or_privileged"
    }

    fn check(
        &self,
        principal: Option<&Principal>,
        params: &RouteParams,
    ) -> Result<(), AuthzError> {
        let principal = principal.ok_or(AuthzError::Unauthorized(Denial::NoPrincipal))?;
        if principal.is_privileged {
            return Ok(());
        }
        match params.get("username") {
            Some(username) if *username == principal.identity => Ok(()),
            _ => Err(AuthzError::Unauthorized(Denial::NotSelf)),
        }
    }
}

/// Ordered interceptors. Cheap to clone; shared by every request on the route.
#[derive(Clone, Default)]
pub struct Chain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn authenticated() -> Self {
        Self::new().then(RequireAuthenticated)
    }

    pub fn admin() -> Self {
        Self::new().then(RequirePrivileged)
    }

    pub fn self_or_admin() -> Self {
        Self::new().then(RequireSelfOrPrivileged)
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Run each interceptor in order, stopping at the first rejection.
    pub fn check(
        &self,
        principal: Option<&Principal>,
        params: &RouteParams,
    ) -> Result<(), AuthzError> {
        for interceptor in &self.interceptors {
            if let Err(e) = interceptor.check(principal, params) {
                tracing::debug!(
                    "{} refused {:?}: {}",
                    interceptor.name(),
                    principal.map(|p| p.identity.as_str()),
                    e
                );
                return Err(e);
            }
        }
        Ok(())
    }
}

/// Middleware running a `Chain` against the current request.
///
/// Install with `route_layer(from_fn_with_state(chain, authorize))` so the
/// path parameters of the matched route are available.
pub async fn authorize(
    State(chain): State<Chain>,
    params: Option<Path<RouteParams>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let params = params.map(|Path(p)| p).unwrap_or_default();

    let outcome = {
        let principal = request
            .extensions()
            .get::<CurrentUser>()
            .and_then(CurrentUser::principal);
        chain.check(principal, &params)
    };
    outcome?;

    Ok(next.run(request).await)
}
