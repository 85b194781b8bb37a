use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

#[tokio::test]
async fn group_targeted_assignment_is_visible_only_to_members() {
    let ctx = test_support::setup_test_context().await;

    let admin =
        test_support::insert_admin(ctx.state.db(), "Admin", "admin@example.com", "pass-123").await;
    let member =
        test_support::insert_student(ctx.state.db(), "Member", "member@example.com", "pass-123")
            .await;
    let outsider = test_support::insert_student(
        ctx.state.db(),
        "Outsider",
        "outsider@example.com",
        "pass-123",
    )
    .await;

    let group = test_support::insert_group(ctx.state.db(), "Team A", &member.id).await;
    let assignment =
        test_support::insert_assignment_for_group(ctx.state.db(), "Lab 1", &admin.id, &group.id)
            .await;

    let member_token = test_support::bearer_token(&member.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/assignments",
            Some(&member_token),
            None,
        ))
        .await
        .expect("list as member");
    let body = test_support::read_json(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["id"], assignment.id.as_str());
    assert_eq!(body[0]["submission_statuses"][0]["status"], "pending");
    assert_eq!(body[0]["submission_statuses"][0]["confirmation_step"], 0);

    let outsider_token = test_support::bearer_token(&outsider.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/assignments",
            Some(&outsider_token),
            None,
        ))
        .await
        .expect("list as outsider");
    let body = test_support::read_json(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(0));

    // Detail fetch exists but is off limits.
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/assignments/{}", assignment.id),
            Some(&outsider_token),
            None,
        ))
        .await
        .expect("detail as outsider");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn all_targeted_assignment_is_visible_to_every_student() {
    let ctx = test_support::setup_test_context().await;

    let admin =
        test_support::insert_admin(ctx.state.db(), "Admin", "admin@example.com", "pass-123").await;
    let student =
        test_support::insert_student(ctx.state.db(), "Student", "student@example.com", "pass-123")
            .await;
    test_support::insert_assignment_for_all(ctx.state.db(), "Reading", &admin.id).await;

    let token = test_support::bearer_token(&student.id, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/assignments", Some(&token), None))
        .await
        .expect("list");
    let body = test_support::read_json(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["title"], "Reading");
}

#[tokio::test]
async fn two_step_confirmation_happy_path() {
    let ctx = test_support::setup_test_context().await;

    let admin =
        test_support::insert_admin(ctx.state.db(), "Admin", "admin@example.com", "pass-123").await;
    let alice =
        test_support::insert_student(ctx.state.db(), "Alice", "alice@example.com", "pass-123")
            .await;
    let bob =
        test_support::insert_student(ctx.state.db(), "Bob", "bob@example.com", "pass-123").await;
    let group = test_support::insert_group(ctx.state.db(), "Team A", &alice.id).await;
    test_support::add_group_member(ctx.state.db(), &group.id, &bob.id).await;
    let assignment =
        test_support::insert_assignment_for_group(ctx.state.db(), "Lab 1", &admin.id, &group.id)
            .await;

    let alice_token = test_support::bearer_token(&alice.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/assignments/{}/confirm-step1", assignment.id),
            Some(&alice_token),
            Some(json!({ "group_id": group.id })),
        ))
        .await
        .expect("step1");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["confirmation_step"], 1);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["first_click_by"], alice.id.as_str());

    // A different group mate can give the final confirmation.
    let bob_token = test_support::bearer_token(&bob.id, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/assignments/{}/confirm-step2", assignment.id),
            Some(&bob_token),
            Some(json!({ "group_id": group.id })),
        ))
        .await
        .expect("step2");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["confirmation_step"], 2);
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["confirmed_by"], bob.id.as_str());
}

#[tokio::test]
async fn final_step_without_first_returns_400() {
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
            Method::POST,
            &format!("/api/assignments/{}/confirm-step2", assignment.id),
            Some(&token),
            Some(json!({ "group_id": group.id })),
        ))
        .await
        .expect("step2 without step1");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repeating_a_step_returns_400() {
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
    let step1 = || {
        test_support::json_request(
            Method::POST,
            &format!("/api/assignments/{}/confirm-step1", assignment.id),
            Some(&token),
            Some(json!({ "group_id": group.id })),
        )
    };

    let response = ctx.app.clone().oneshot(step1()).await.expect("first step1");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx.app.clone().oneshot(step1()).await.expect("second step1");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let step2 = || {
        test_support::json_request(
            Method::POST,
            &format!("/api/assignments/{}/confirm-step2", assignment.id),
            Some(&token),
            Some(json!({ "group_id": group.id })),
        )
    };

    let response = ctx.app.clone().oneshot(step2()).await.expect("first step2");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx.app.oneshot(step2()).await.expect("second step2");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn concurrent_first_clicks_let_exactly_one_through() {
    let ctx = test_support::setup_test_context().await;

    let admin =
        test_support::insert_admin(ctx.state.db(), "Admin", "admin@example.com", "pass-123").await;
    let alice =
        test_support::insert_student(ctx.state.db(), "Alice", "alice@example.com", "pass-123")
            .await;
    let bob =
        test_support::insert_student(ctx.state.db(), "Bob", "bob@example.com", "pass-123").await;
    let group = test_support::insert_group(ctx.state.db(), "Team A", &alice.id).await;
    test_support::add_group_member(ctx.state.db(), &group.id, &bob.id).await;
    let assignment =
        test_support::insert_assignment_for_group(ctx.state.db(), "Lab 1", &admin.id, &group.id)
            .await;

    let alice_token = test_support::bearer_token(&alice.id, ctx.state.settings());
    let bob_token = test_support::bearer_token(&bob.id, ctx.state.settings());

    let request = |token: &str| {
        test_support::json_request(
            Method::POST,
            &format!("/api/assignments/{}/confirm-step1", assignment.id),
            Some(token),
            Some(json!({ "group_id": group.id })),
        )
    };

    let (first, second) = tokio::join!(
        ctx.app.clone().oneshot(request(&alice_token)),
        ctx.app.clone().oneshot(request(&bob_token)),
    );
    let statuses = [first.expect("first").status(), second.expect("second").status()];

    let winners = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let losers = statuses.iter().filter(|s| **s == StatusCode::BAD_REQUEST).count();
    assert_eq!(winners, 1, "statuses: {statuses:?}");
    assert_eq!(losers, 1, "statuses: {statuses:?}");

    let row = crate::repositories::submissions::find_by_pair(
        ctx.state.db(),
        &assignment.id,
        &group.id,
    )
    .await
    .expect("find submission")
    .expect("submission row");
    assert_eq!(row.confirmation_step, 1);
}

#[tokio::test]
async fn admins_are_pointed_at_the_admin_surface() {
    let ctx = test_support::setup_test_context().await;

    let admin =
        test_support::insert_admin(ctx.state.db(), "Admin", "admin@example.com", "pass-123").await;

    let token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/assignments", Some(&token), None))
        .await
        .expect("list as admin");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn every_member_group_gets_a_status_and_a_confirm_button() {
    let ctx = test_support::setup_test_context().await;

    let admin =
        test_support::insert_admin(ctx.state.db(), "Admin", "admin@example.com", "pass-123").await;
    let alice =
        test_support::insert_student(ctx.state.db(), "Alice", "alice@example.com", "pass-123")
            .await;
    let targeted = test_support::insert_group(ctx.state.db(), "Team A", &alice.id).await;
    let other = test_support::insert_group(ctx.state.db(), "Team B", &alice.id).await;
    let assignment = test_support::insert_assignment_for_group(
        ctx.state.db(),
        "Lab 1",
        &admin.id,
        &targeted.id,
    )
    .await;

    // The listing carries one entry per membership, targeted or not.
    let token = test_support::bearer_token(&alice.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/assignments/{}", assignment.id),
            Some(&token),
            None,
        ))
        .await
        .expect("assignment detail");
    let body = test_support::read_json(response).await;
    let statuses = body["submission_statuses"].as_array().expect("statuses array");
    assert_eq!(statuses.len(), 2);
    assert!(statuses.iter().any(|entry| entry["group_id"] == targeted.id.as_str()));
    assert!(statuses.iter().any(|entry| entry["group_id"] == other.id.as_str()));

    // Confirmation keys on membership alone.
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/assignments/{}/confirm-step1", assignment.id),
            Some(&token),
            Some(json!({ "group_id": other.id })),
        ))
        .await
        .expect("step1 through untargeted group");
    assert_eq!(response.status(), StatusCode::OK);

    let row = crate::repositories::submissions::find_by_pair(
        ctx.state.db(),
        &assignment.id,
        &other.id,
    )
    .await
    .expect("find submission")
    .expect("submission row");
    assert_eq!(row.confirmation_step, 1);
}

#[tokio::test]
async fn confirming_an_unknown_assignment_is_not_found() {
    let ctx = test_support::setup_test_context().await;

    let alice =
        test_support::insert_student(ctx.state.db(), "Alice", "alice@example.com", "pass-123")
            .await;
    let group = test_support::insert_group(ctx.state.db(), "Team A", &alice.id).await;

    let token = test_support::bearer_token(&alice.id, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/assignments/no-such-assignment/confirm-step1",
            Some(&token),
            Some(json!({ "group_id": group.id })),
        ))
        .await
        .expect("step1 on unknown assignment");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_members_cannot_confirm() {
    let ctx = test_support::setup_test_context().await;

    let admin =
        test_support::insert_admin(ctx.state.db(), "Admin", "admin@example.com", "pass-123").await;
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
    let assignment =
        test_support::insert_assignment_for_all(ctx.state.db(), "Reading", &admin.id).await;

    let token = test_support::bearer_token(&outsider.id, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/assignments/{}/confirm-step1", assignment.id),
            Some(&token),
            Some(json!({ "group_id": group.id })),
        ))
        .await
        .expect("step1 as non-member");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
