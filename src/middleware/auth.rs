use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{Principal, TokenVerifier};

/// Principal resolved for the current request, if any.
///
/// Always present in request extensions once `authenticate_jwt` ran; the
/// inner value is `None` when no valid token was supplied.
#[derive(Clone, Debug, Default)]
pub struct CurrentUser(pub Option<Principal>);

impl CurrentUser {
    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref()
    }
}

/// Token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively and surrounding whitespace is
/// ignored. Any other shape yields `None`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolve the request principal. Never fails: a missing, malformed,
/// expired or forged token all resolve to `None`.
pub fn resolve_principal(headers: &HeaderMap, verifier: &dyn TokenVerifier) -> Option<Principal> {
    let token = bearer_token(headers)?;
    match verifier.verify(token) {
        Ok(principal) => Some(principal),
        Err(e) => {
            tracing::debug!("Ignoring bearer token: {}", e);
            None
        }
    }
}

/// Attach a `CurrentUser` to every request and continue.
///
/// Rejecting is left to the guards in `middleware::guard`.
pub async fn authenticate_jwt(
    State(verifier): State<Arc<dyn TokenVerifier>>,
    mut request: Request,
    next: Next,
) -> Response {
    let principal = resolve_principal(request.headers(), verifier.as_ref());
    request.extensions_mut().insert(CurrentUser(principal));

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Claims, JwtKeys};
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn extracts_bearer_token_case_insensitively() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("BEARER   abc  ")), Some("abc"));
        assert_eq!(bearer_token(&headers("  Bearer abc")), Some("abc"));
    }

    #[test]
    fn ignores_other_header_shapes() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers("Basic dTE6cHc=")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&headers("Bearer    ")), None);
        assert_eq!(bearer_token(&headers("abc")), None);
    }

    #[test]
    fn valid_token_resolves_principal() {
        let keys = JwtKeys::new("test-secret", 1).unwrap();
        let token = keys.create_token("u1", false).unwrap();
        let principal = resolve_principal(&headers(&format!("Bearer {}", token)), &keys);
        assert_eq!(principal, Some(Principal::new("u1", false)));
    }

    #[test]
    fn bad_tokens_resolve_like_no_header() {
        let keys = JwtKeys::new("test-secret", 1).unwrap();
        let forged = JwtKeys::new("other-secret", 1)
            .unwrap()
            .create_token("admin", true)
            .unwrap();

        let now = chrono::Utc::now().timestamp();
        let expired = keys
            .sign(&Claims {
                username: "u1".into(),
                is_admin: false,
                exp: now - 3600,
                iat: now - 7200,
            })
            .unwrap();

        let none = resolve_principal(&HeaderMap::new(), &keys);
        assert_eq!(none, None);
        assert_eq!(resolve_principal(&headers("Bearer garbage"), &keys), none);
        assert_eq!(resolve_principal(&headers(&format!("Bearer {}", forged)), &keys), none);
        assert_eq!(resolve_principal(&headers(&format!("Bearer {}", expired)), &keys), none);
    }
}
