use std::sync::{Mutex, MutexGuard, OnceLock};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::api;
use crate::core::{config::Settings, redis::RedisHandle, security, state::AppState};
use crate::core::time::primitive_now_utc;
use crate::db::models::{AnswerOption, Question};
use crate::db::types::{PublishStatus, QuestionKind};

/// Serializes tests that mutate process environment variables. Held for the
/// duration of the test; poisoning from a panicked test is ignored.
pub(crate) fn env_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Mutex::new(()));
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    _guard: MutexGuard<'static, ()>,
}

/// Database-backed context for endpoint tests. Returns `None` when no test
/// database is configured so those tests skip instead of failing; the
/// target database name must end in `_test` because the schema is dropped.
pub(crate) async fn setup_test_context() -> Option<TestContext> {
    let guard = env_lock();
    dotenvy::dotenv().ok();

    let database_url = std::env::var("EXAMHALL_TEST_DATABASE_URL").ok()?;
    set_test_env(&database_url);

    let settings = Settings::load().expect("settings");
    let db = prepare_db(&settings).await;

    let redis = RedisHandle::new(settings.redis().redis_url());
    // Rate limiting fails open, so a missing local Redis is fine.
    let _ = redis.connect().await;

    let state = AppState::new(settings, db, redis);
    let app = api::router::router(state.clone());

    Some(TestContext { state, app, _guard: guard })
}

pub(crate) fn set_test_env(database_url: &str) {
    std::env::set_var("EXAMHALL_ENV", "test");
    std::env::set_var("EXAMHALL_STRICT_CONFIG", "0");
    std::env::set_var("SECRET_KEY", "test-secret");
    std::env::set_var("DATABASE_URL", database_url);
    std::env::set_var("PROMETHEUS_ENABLED", "0");
}

async fn prepare_db(settings: &Settings) -> PgPool {
    let db = crate::db::init_pool(settings).await.expect("db pool");
    let current_db: String = sqlx::query_scalar("SELECT current_database()")
        .fetch_one(&db)
        .await
        .expect("current database");
    assert!(
        current_db.ends_with("_test"),
        "refusing to reset non-test database {current_db}"
    );

    sqlx::query("DROP SCHEMA IF EXISTS public CASCADE").execute(&db).await.expect("drop schema");
    sqlx::query("CREATE SCHEMA public").execute(&db).await.expect("create schema");

    let migrations_dir =
        std::env::var("EXAMHALL_MIGRATIONS_DIR").unwrap_or_else(|_| "migrations".to_string());
    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(&migrations_dir))
        .await
        .expect("migrator");
    migrator.run(&db).await.expect("migrations");

    db
}

pub(crate) async fn insert_exam(pool: &PgPool, id: &str, code: &str, duration_seconds: i32) {
    let now = primitive_now_utc();
    sqlx::query(
        "INSERT INTO exams (id, code, title, description, duration_seconds, status, \
             created_at, updated_at) \
         VALUES ($1, $2, $3, NULL, $4, 'publish', $5, $5)",
    )
    .bind(id)
    .bind(code)
    .bind(format!("Exam {code}"))
    .bind(duration_seconds)
    .bind(now)
    .execute(pool)
    .await
    .expect("insert exam");
}

pub(crate) async fn insert_question(
    pool: &PgPool,
    exam_id: &str,
    id: &str,
    kind: QuestionKind,
    option_labels: &[&str],
    correct: &[&str],
    order_index: i32,
) {
    let now = primitive_now_utc();
    let options: Vec<AnswerOption> = option_labels
        .iter()
        .map(|label| AnswerOption { label: label.to_string(), text: format!("Option {label}") })
        .collect();
    let correct: Vec<String> = correct.iter().map(|label| label.to_string()).collect();

    sqlx::query(
        "INSERT INTO questions (id, exam_id, question_text, question_type, options, \
             correct_answers, is_sample, status, order_index, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, FALSE, 'publish', $7, $8, $8)",
    )
    .bind(id)
    .bind(exam_id)
    .bind(format!("Question {id}"))
    .bind(kind)
    .bind(Json(options))
    .bind(Json(correct))
    .bind(order_index)
    .bind(now)
    .execute(pool)
    .await
    .expect("insert question");
}

pub(crate) async fn count_results_for_session(pool: &PgPool, session_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM exam_results WHERE session_id = $1")
        .bind(session_id)
        .fetch_one(pool)
        .await
        .expect("count results")
}

pub(crate) fn bearer_token(student_id: &str, settings: &Settings) -> String {
    security::create_access_token(student_id, settings, None).expect("token")
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}

pub(crate) fn question_fixture(
    id: &str,
    kind: QuestionKind,
    option_labels: &[&str],
    correct: &[&str],
) -> Question {
    let now = primitive_now_utc();
    Question {
        id: id.to_string(),
        exam_id: "exam-1".to_string(),
        question_text: format!("Question {id}"),
        question_type: kind,
        options: Json(
            option_labels
                .iter()
                .map(|label| AnswerOption {
                    label: label.to_string(),
                    text: format!("Option {label}"),
                })
                .collect(),
        ),
        correct_answers: Json(correct.iter().map(|label| label.to_string()).collect()),
        difficulty: None,
        marks: Some(1.0),
        negative_marks: None,
        is_sample: false,
        status: PublishStatus::Publish,
        order_index: 0,
        created_at: now,
        updated_at: now,
    }
}
