mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn root_banner_is_public() -> Result<()> {
    let (app, _) = common::test_app()?;

    let res = common::send(&app, Method::GET, "/", None, None).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["data"]["name"], "Jobly API");
    Ok(())
}

#[tokio::test]
async fn whoami_reports_the_token_principal() -> Result<()> {
    let (app, state) = common::test_app()?;
    let token = common::token_for(&state, "u1", false)?;

    let res = common::send(&app, Method::GET, "/auth/whoami", Some(&token), None).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"], json!({ "username": "u1", "isAdmin": false }));
    Ok(())
}

#[tokio::test]
async fn whoami_without_token_is_unauthorized() -> Result<()> {
    let (app, _) = common::test_app()?;

    let res = common::send(&app, Method::GET, "/auth/whoami", None, None).await?;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], true);
    assert_eq!(res.body["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_treated_as_anonymous() -> Result<()> {
    let (app, _) = common::test_app()?;

    let res = common::send(&app, Method::GET, "/auth/whoami", Some("not-a-jwt"), None).await?;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn token_from_another_secret_is_rejected() -> Result<()> {
    let (app, _) = common::test_app()?;
    let foreign =
        jobly_api::auth::JwtKeys::new("some-other-secret", 1)?.create_token("admin", true)?;

    let res = common::send(&app, Method::GET, "/auth/whoami", Some(&foreign), None).await?;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn token_request_requires_password() -> Result<()> {
    let (app, _) = common::test_app()?;

    let res = common::send(
        &app,
        Method::POST,
        "/auth/token",
        None,
        Some(json!({ "username": "u1" })),
    )
    .await?;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn register_rejects_admin_flag() -> Result<()> {
    let (app, _) = common::test_app()?;

    let res = common::send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "username": "new",
            "password": "password",
            "firstName": "first",
            "lastName": "last",
            "email": "new@email.com",
            "isAdmin": true,
        })),
    )
    .await?;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn register_rejects_bad_email() -> Result<()> {
    let (app, _) = common::test_app()?;

    let res = common::send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "username": "new",
            "password": "password",
            "firstName": "first",
            "lastName": "last",
            "email": "not-an-email",
        })),
    )
    .await?;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
    Ok(())
}
