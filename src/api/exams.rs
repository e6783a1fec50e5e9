use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use time::Duration;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStudent;
use crate::api::pagination::{PageQuery, PaginatedResponse};
use crate::api::sessions::enforce_deadline;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Exam;
use crate::db::types::SessionStatus;
use crate::repositories::{exams, questions, results, sessions};
use crate::schemas::exam::{AttemptStatusView, ExamView, QuestionView};
use crate::schemas::result::ResultView;
use crate::schemas::session::SessionView;
use crate::services::session::SessionProgress;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:exam_id", get(get_exam))
        .route("/:exam_id/questions", get(list_questions))
        .route("/:exam_id/attempt-status", get(attempt_status))
        .route("/:exam_id/results", get(list_results))
        .route("/:exam_id/sessions", post(start_session))
}

async fn load_published_exam(state: &AppState, exam_id: &str) -> Result<Exam, ApiError> {
    exams::find_published_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))
}

async fn get_exam(
    State(state): State<AppState>,
    _student: CurrentStudent,
    Path(exam_id): Path<String>,
) -> Result<Json<ExamView>, ApiError> {
    let exam = load_published_exam(&state, &exam_id).await?;
    let question_list = questions::list_published_for_exam(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;

    Ok(Json(ExamView::from_exam(exam, question_list.len())))
}

#[derive(Debug, Deserialize)]
struct QuestionsQuery {
    #[serde(default)]
    sample: bool,
}

async fn list_questions(
    State(state): State<AppState>,
    _student: CurrentStudent,
    Path(exam_id): Path<String>,
    Query(query): Query<QuestionsQuery>,
) -> Result<Json<Vec<QuestionView>>, ApiError> {
    load_published_exam(&state, &exam_id).await?;

    let question_list = if query.sample {
        questions::list_samples_for_exam(state.db(), &exam_id).await
    } else {
        questions::list_published_for_exam(state.db(), &exam_id).await
    }
    .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;

    Ok(Json(question_list.into_iter().map(QuestionView::from_question).collect()))
}

async fn attempt_status(
    State(state): State<AppState>,
    student: CurrentStudent,
    Path(exam_id): Path<String>,
) -> Result<Json<AttemptStatusView>, ApiError> {
    load_published_exam(&state, &exam_id).await?;

    let attempts = results::count_for_student_exam(state.db(), &student.id, &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count attempts"))?;

    Ok(Json(AttemptStatusView { exam_id, already_submitted: attempts > 0, attempts }))
}

async fn list_results(
    State(state): State<AppState>,
    student: CurrentStudent,
    Path(exam_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<ResultView>>, ApiError> {
    let query = query.checked()?;
    load_published_exam(&state, &exam_id).await?;

    let total_count = results::count_for_student_exam(state.db(), &student.id, &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count results"))?;
    let items =
        results::list_for_student_exam(state.db(), &student.id, &exam_id, query.limit, query.skip)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load results"))?;

    Ok(Json(PaginatedResponse {
        items: items.into_iter().map(ResultView::from).collect(),
        total_count,
        skip: query.skip,
        limit: query.limit,
    }))
}

/// Start a session for this exam, or resume the one already running. An
/// active session whose deadline has passed is submitted first and a fresh
/// one is started in its place.
async fn start_session(
    State(state): State<AppState>,
    student: CurrentStudent,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let exam = load_published_exam(&state, &exam_id).await?;

    if let Some(existing) = sessions::find_active(state.db(), &exam_id, &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load active session"))?
    {
        let existing = enforce_deadline(&state, existing).await?;
        if existing.status == SessionStatus::Active {
            let now = primitive_now_utc();
            return Ok((StatusCode::OK, Json(SessionView::from_session(existing, now))));
        }
    }

    let question_list = questions::list_published_for_exam(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;
    if question_list.is_empty() {
        return Err(ApiError::Conflict("Exam has no questions to attempt".to_string()));
    }

    let progress = SessionProgress::new(&question_list);
    let now = primitive_now_utc();
    let expires_at = now + Duration::seconds(i64::from(exam.duration_seconds));
    let session_id = uuid::Uuid::new_v4().to_string();

    let created = sessions::create(
        state.db(),
        sessions::CreateSession {
            id: &session_id,
            exam_id: &exam_id,
            student_id: &student.id,
            progress: &progress,
            started_at: now,
            expires_at,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create session"))?;

    if !created {
        // Lost a concurrent start; hand back the session that won.
        let existing = sessions::find_active(state.db(), &exam_id, &student.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load active session"))?
            .ok_or_else(|| ApiError::Conflict("Session start raced; retry".to_string()))?;
        return Ok((StatusCode::OK, Json(SessionView::from_session(existing, now))));
    }

    let session = sessions::find_by_id(state.db(), &session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load session"))?
        .ok_or_else(|| ApiError::Internal("Created session disappeared".to_string()))?;

    tracing::info!(
        session_id = %session.id,
        exam_id = %exam_id,
        student_id = %student.id,
        "exam session started"
    );
    metrics::counter!("exam_sessions_started_total").increment(1);

    Ok((StatusCode::CREATED, Json(SessionView::from_session(session, now))))
}
