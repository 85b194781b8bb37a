use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

#[tokio::test]
async fn group_history_lists_tracked_assignments() {
    let ctx = test_support::setup_test_context().await;

    let admin =
        test_support::insert_admin(ctx.state.db(), "Admin", "admin@example.com", "pass-123").await;
    let alice =
        test_support::insert_student(ctx.state.db(), "Alice", "alice@example.com", "pass-123")
            .await;
    let group = test_support::insert_group(ctx.state.db(), "Team A", &alice.id).await;
    let assignment =
        test_support::insert_assignment_for_group(ctx.state.db(), "Lab 1", &admin.id, &group.id)
            .await;

    let token = test_support::bearer_token(&alice.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/assignments/{}/confirm-step1", assignment.id),
            Some(&token),
            Some(json!({ "group_id": group.id })),
        ))
        .await
        .expect("step1");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/submissions/group/{}", group.id),
            Some(&token),
            None,
        ))
        .await
        .expect("group history");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["assignment_title"], "Lab 1");
    assert_eq!(body[0]["confirmation_step"], 1);
    assert_eq!(body[0]["first_click_by_name"], "Alice");
}

#[tokio::test]
async fn pair_view_returns_actor_names() {
    let ctx = test_support::setup_test_context().await;

    let admin =
        test_support::insert_admin(ctx.state.db(), "Admin", "admin@example.com", "pass-123").await;
    let alice =
        test_support::insert_student(ctx.state.db(), "Alice", "alice@example.com", "pass-123")
            .await;
    let group = test_support::insert_group(ctx.state.db(), "Team A", &alice.id).await;
    let assignment =
        test_support::insert_assignment_for_group(ctx.state.db(), "Lab 1", &admin.id, &group.id)
            .await;

    let token = test_support::bearer_token(&alice.id, ctx.state.settings());
    for step in ["confirm-step1", "confirm-step2"] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/assignments/{}/{step}", assignment.id),
                Some(&token),
                Some(json!({ "group_id": group.id })),
            ))
            .await
            .expect(step);
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/submissions/assignment/{}/group/{}", assignment.id, group.id),
            Some(&token),
            None,
        ))
        .await
        .expect("pair view");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["first_click_by_name"], "Alice");
    assert_eq!(body["confirmed_by_name"], "Alice");
    assert!(body["confirmed_at"].as_str().is_some());
}

#[tokio::test]
async fn outsiders_cannot_read_a_groups_submissions() {
    let ctx = test_support::setup_test_context().await;

    let alice =
        test_support::insert_student(ctx.state.db(), "Alice", "alice@example.com", "pass-123")
            .await;
    let outsider = test_support::insert_student(
        ctx.state.db(),
        "Outsider",
        "outsider@example.com",
        "pass-123",
    )
    .await;
    let group = test_support::insert_group(ctx.state.db(), "Team A", &alice.id).await;

    let token = test_support::bearer_token(&outsider.id, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/submissions/group/{}", group.id),
            Some(&token),
            None,
        ))
        .await
        .expect("history as outsider");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_pair_returns_404() {
    let ctx = test_support::setup_test_context().await;

    let admin =
        test_support::insert_admin(ctx.state.db(), "Admin", "admin@example.com", "pass-123").await;
    let alice =
        test_support::insert_student(ctx.state.db(), "Alice", "alice@example.com", "pass-123")
            .await;
    let group = test_support::insert_group(ctx.state.db(), "Team A", &alice.id).await;
    let assignment =
        test_support::insert_assignment_for_group(ctx.state.db(), "Lab 1", &admin.id, &group.id)
            .await;

    let token = test_support::bearer_token(&alice.id, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/submissions/assignment/{}/group/{}", assignment.id, group.id),
            Some(&token),
            None,
        ))
        .await
        .expect("pair view without activity");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
