//! End-to-end session flows against a real database. These tests skip when
//! `EXAMHALL_TEST_DATABASE_URL` is not set.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use tower::ServiceExt;

use crate::core::time::primitive_now_utc;
use crate::db::types::QuestionKind;
use crate::repositories::{questions, sessions};
use crate::services::session::SessionProgress;
use crate::test_support::{self, TestContext};

async fn call(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("response")
}

async fn seed_exam(ctx: &TestContext) {
    test_support::insert_exam(ctx.state.db(), "exam-1", "E100", 3600).await;
    test_support::insert_question(
        ctx.state.db(),
        "exam-1",
        "q1",
        QuestionKind::Radio,
        &["A", "B", "C", "D"],
        &["B"],
        0,
    )
    .await;
    test_support::insert_question(
        ctx.state.db(),
        "exam-1",
        "q2",
        QuestionKind::Checkbox,
        &["A", "B", "C", "D"],
        &["A", "C"],
        1,
    )
    .await;
}

async fn start_session(ctx: &TestContext, token: &str) -> serde_json::Value {
    let response = call(
        &ctx.app,
        test_support::json_request(Method::POST, "/api/v1/exams/exam-1/sessions", Some(token), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    test_support::read_json(response).await
}

async fn submit(ctx: &TestContext, token: &str, session_id: &str) -> serde_json::Value {
    let response = call(
        &ctx.app,
        test_support::json_request(
            Method::POST,
            &format!("/api/v1/sessions/{session_id}/submit"),
            Some(token),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    test_support::read_json(response).await
}

#[tokio::test]
async fn submitting_twice_persists_a_single_result() {
    let Some(ctx) = test_support::setup_test_context().await else {
        eprintln!("skipping: EXAMHALL_TEST_DATABASE_URL is not set");
        return;
    };
    seed_exam(&ctx).await;
    let token = test_support::bearer_token("s1", ctx.state.settings());

    let session = start_session(&ctx, &token).await;
    let session_id = session["id"].as_str().expect("session id").to_string();

    let answer = call(
        &ctx.app,
        test_support::json_request(
            Method::POST,
            &format!("/api/v1/sessions/{session_id}/events"),
            Some(&token),
            Some(serde_json::json!({"action": "answer", "question_id": "q1", "option": "B"})),
        ),
    )
    .await;
    assert_eq!(answer.status(), StatusCode::OK);

    let first = submit(&ctx, &token, &session_id).await;
    assert_eq!(first["already_submitted"], false);
    assert_eq!(first["result"]["attempt"], 1);
    assert_eq!(first["result"]["total_questions"], 2);
    assert_eq!(first["result"]["correct"], 1);
    assert_eq!(first["result"]["submit_trigger"], "manual");

    let second = submit(&ctx, &token, &session_id).await;
    assert_eq!(second["already_submitted"], true);
    assert_eq!(second["result"]["attempt"], 1);
    assert_eq!(second["result"]["id"], first["result"]["id"]);

    assert_eq!(test_support::count_results_for_session(ctx.state.db(), &session_id).await, 1);
}

#[tokio::test]
async fn sequential_submissions_get_increasing_attempt_numbers() {
    let Some(ctx) = test_support::setup_test_context().await else {
        eprintln!("skipping: EXAMHALL_TEST_DATABASE_URL is not set");
        return;
    };
    seed_exam(&ctx).await;
    let token = test_support::bearer_token("s1", ctx.state.settings());

    for expected_attempt in 1..=3 {
        let session = start_session(&ctx, &token).await;
        let session_id = session["id"].as_str().expect("session id").to_string();

        let result = submit(&ctx, &token, &session_id).await;
        assert_eq!(result["result"]["attempt"], expected_attempt);
    }

    let status = call(
        &ctx.app,
        test_support::json_request(
            Method::GET,
            "/api/v1/exams/exam-1/attempt-status",
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status.status(), StatusCode::OK);
    let status = test_support::read_json(status).await;
    assert_eq!(status["already_submitted"], true);
    assert_eq!(status["attempts"], 3);
}

#[tokio::test]
async fn tab_switch_limit_forces_submission_exactly_once() {
    let Some(ctx) = test_support::setup_test_context().await else {
        eprintln!("skipping: EXAMHALL_TEST_DATABASE_URL is not set");
        return;
    };
    seed_exam(&ctx).await;
    let token = test_support::bearer_token("s1", ctx.state.settings());

    let session = start_session(&ctx, &token).await;
    let session_id = session["id"].as_str().expect("session id").to_string();
    let report = serde_json::json!({"kind": "tab_hidden"});
    let uri = format!("/api/v1/sessions/{session_id}/violations");

    for remaining in [4, 3, 2, 1] {
        let response = call(
            &ctx.app,
            test_support::json_request(Method::POST, &uri, Some(&token), Some(report.clone())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = test_support::read_json(response).await;
        assert_eq!(body["action"], "warning");
        assert_eq!(body["warnings_remaining"], remaining);
    }

    // Fifth strike hits the limit and submits on the student's behalf.
    let fifth = call(
        &ctx.app,
        test_support::json_request(Method::POST, &uri, Some(&token), Some(report.clone())),
    )
    .await;
    assert_eq!(fifth.status(), StatusCode::OK);
    let fifth = test_support::read_json(fifth).await;
    assert_eq!(fifth["action"], "force_submit");
    assert_eq!(fifth["result"]["submit_trigger"], "integrity");
    assert_eq!(fifth["result"]["attempt"], 1);

    // A sixth report after submission is refused and grades nothing new.
    let sixth = call(
        &ctx.app,
        test_support::json_request(Method::POST, &uri, Some(&token), Some(report)),
    )
    .await;
    assert_eq!(sixth.status(), StatusCode::CONFLICT);

    assert_eq!(test_support::count_results_for_session(ctx.state.db(), &session_id).await, 1);
}

#[tokio::test]
async fn expired_session_is_submitted_with_the_timer_trigger() {
    let Some(ctx) = test_support::setup_test_context().await else {
        eprintln!("skipping: EXAMHALL_TEST_DATABASE_URL is not set");
        return;
    };
    seed_exam(&ctx).await;
    let token = test_support::bearer_token("s1", ctx.state.settings());

    let question_list =
        questions::list_published_for_exam(ctx.state.db(), "exam-1").await.expect("questions");
    let mut progress = SessionProgress::new(&question_list);
    progress
        .apply(
            &question_list,
            &crate::services::session::SessionEvent::Answer {
                question_id: "q1".into(),
                option: "B".into(),
            },
        )
        .expect("answer");

    let now = primitive_now_utc();
    let created = sessions::create(
        ctx.state.db(),
        sessions::CreateSession {
            id: "session-expired",
            exam_id: "exam-1",
            student_id: "s1",
            progress: &progress,
            started_at: now - time::Duration::seconds(3700),
            expires_at: now - time::Duration::seconds(100),
        },
    )
    .await
    .expect("create session");
    assert!(created);

    // Touching the expired session submits it before the request is served.
    let response = call(
        &ctx.app,
        test_support::json_request(
            Method::GET,
            "/api/v1/sessions/session-expired",
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["status"], "submitted");
    assert_eq!(body["submit_trigger"], "timer");
    assert_eq!(body["remaining_seconds"], 0);

    // Answers recorded before expiry still grade.
    let result = call(
        &ctx.app,
        test_support::json_request(
            Method::GET,
            "/api/v1/sessions/session-expired/result",
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(result.status(), StatusCode::OK);
    let result = test_support::read_json(result).await;
    assert_eq!(result["submit_trigger"], "timer");
    assert_eq!(result["correct"], 1);

    // A second touch does not grade again.
    let again = call(
        &ctx.app,
        test_support::json_request(
            Method::GET,
            "/api/v1/sessions/session-expired",
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(again.status(), StatusCode::OK);
    assert_eq!(
        test_support::count_results_for_session(ctx.state.db(), "session-expired").await,
        1
    );
}
