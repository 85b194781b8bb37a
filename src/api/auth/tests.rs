use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

#[tokio::test]
async fn register_issues_token_and_student_code() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "full_name": "Asha Rao",
                "email": "asha@example.com",
                "password": "secret-pass"
            })),
        ))
        .await
        .expect("register");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["user"]["role"], "student");
    assert_eq!(body["user"]["student_code"], "STU001");
    assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn student_codes_increment_per_registration() {
    let ctx = test_support::setup_test_context().await;

    for (index, email) in ["a@example.com", "b@example.com", "c@example.com"]
        .iter()
        .enumerate()
    {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "full_name": format!("Student {index}"),
                    "email": email,
                    "password": "secret-pass"
                })),
            ))
            .await
            .expect("register");

        let body = test_support::read_json(response).await;
        let expected = format!("STU{:03}", index + 1);
        assert_eq!(body["user"]["student_code"], expected.as_str());
    }
}

#[tokio::test]
async fn duplicate_email_returns_conflict() {
    let ctx = test_support::setup_test_context().await;

    test_support::insert_student(ctx.state.db(), "Asha Rao", "asha@example.com", "secret-pass")
        .await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "full_name": "Asha Again",
                "email": "asha@example.com",
                "password": "other-pass"
            })),
        ))
        .await
        .expect("register duplicate");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn concurrent_registrations_with_one_email_yield_one_account() {
    let ctx = test_support::setup_test_context().await;

    let request = || {
        test_support::json_request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "full_name": "Asha Rao",
                "email": "asha@example.com",
                "password": "secret-pass"
            })),
        )
    };

    let (first, second) = tokio::join!(
        ctx.app.clone().oneshot(request()),
        ctx.app.clone().oneshot(request()),
    );
    let statuses = [first.expect("first").status(), second.expect("second").status()];

    let created = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
    let rejected = statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count();
    assert_eq!(created, 1, "statuses: {statuses:?}");
    assert_eq!(rejected, 1, "statuses: {statuses:?}");
}

#[tokio::test]
async fn login_accepts_email_or_student_code() {
    let ctx = test_support::setup_test_context().await;

    let user =
        test_support::insert_student(ctx.state.db(), "Asha Rao", "asha@example.com", "secret-pass")
            .await;
    let student_code = user.student_code.expect("student code");

    for identifier in ["asha@example.com", student_code.as_str()] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "identifier": identifier, "password": "secret-pass" })),
            ))
            .await
            .expect("login");

        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "identifier {identifier}: {body}");
        assert_eq!(body["user"]["id"], user.id.as_str());
    }
}

#[tokio::test]
async fn login_with_wrong_password_returns_401() {
    let ctx = test_support::setup_test_context().await;

    test_support::insert_student(ctx.state.db(), "Asha Rao", "asha@example.com", "secret-pass")
        .await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "identifier": "asha@example.com", "password": "wrong" })),
        ))
        .await
        .expect("login");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_requires_token() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/auth/me", None, None))
        .await
        .expect("me without token");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let user =
        test_support::insert_student(ctx.state.db(), "Asha Rao", "asha@example.com", "secret-pass")
            .await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/auth/me", Some(&token), None))
        .await
        .expect("me");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["email"], "asha@example.com");
}
