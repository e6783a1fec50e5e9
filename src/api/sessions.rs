use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStudent;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::ExamSession;
use crate::db::types::{SessionStatus, SubmitTrigger};
use crate::repositories::{questions, results, sessions};
use crate::schemas::result::{ResultDetailView, ResultView, SubmissionView};
use crate::schemas::session::{SessionView, ViolationAction, ViolationReport, ViolationView};
use crate::services::finalize::finalize_session;
use crate::services::integrity::{self, ViolationKind, ViolationOutcome};
use crate::services::session::SessionEvent;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:session_id", get(get_session))
        .route("/:session_id/result", get(get_result))
        .route("/:session_id/events", post(post_event))
        .route("/:session_id/violations", post(post_violation))
        .route("/:session_id/submit", post(submit))
}

async fn load_owned_session(
    state: &AppState,
    session_id: &str,
    student: &CurrentStudent,
) -> Result<ExamSession, ApiError> {
    let session = sessions::find_by_id(state.db(), session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load session"))?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;

    // Sessions of other students are indistinguishable from missing ones.
    if session.student_id != student.id {
        return Err(ApiError::NotFound("Session not found".to_string()));
    }

    Ok(session)
}

/// The countdown is authoritative on the server: any touch of a session
/// past its deadline submits it with the timer trigger before the request
/// proceeds.
pub(crate) async fn enforce_deadline(
    state: &AppState,
    session: ExamSession,
) -> Result<ExamSession, ApiError> {
    if session.status != SessionStatus::Active
        || primitive_now_utc() < session.expires_at
    {
        return Ok(session);
    }

    finalize_session(state, &session.id, SubmitTrigger::Timer)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to submit expired session"))?;

    sessions::find_by_id(state.db(), &session.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to reload session"))?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))
}

async fn get_session(
    State(state): State<AppState>,
    student: CurrentStudent,
    Path(session_id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let session = load_owned_session(&state, &session_id, &student).await?;
    let session = enforce_deadline(&state, session).await?;

    Ok(Json(SessionView::from_session(session, primitive_now_utc())))
}

/// Full review payload for a submitted session, snapshots included.
async fn get_result(
    State(state): State<AppState>,
    student: CurrentStudent,
    Path(session_id): Path<String>,
) -> Result<Json<ResultDetailView>, ApiError> {
    let session = load_owned_session(&state, &session_id, &student).await?;
    let session = enforce_deadline(&state, session).await?;
    if session.status != SessionStatus::Submitted {
        return Err(ApiError::Conflict("Session is not submitted yet".to_string()));
    }

    let result = results::find_by_session(state.db(), &session.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load result"))?
        .ok_or_else(|| ApiError::NotFound("Result not found".to_string()))?;

    Ok(Json(ResultDetailView::from(result)))
}

/// Apply a navigation or answer event and persist the updated progress.
async fn post_event(
    State(state): State<AppState>,
    student: CurrentStudent,
    Path(session_id): Path<String>,
    Json(event): Json<SessionEvent>,
) -> Result<Json<SessionView>, ApiError> {
    let session = load_owned_session(&state, &session_id, &student).await?;
    let mut session = enforce_deadline(&state, session).await?;
    if session.status != SessionStatus::Active {
        return Err(ApiError::Conflict("Session is already submitted".to_string()));
    }

    let question_list = questions::list_published_for_exam(state.db(), &session.exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;

    session
        .progress
        .0
        .apply(&question_list, &event)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let now = primitive_now_utc();
    let saved = sessions::save_progress(state.db(), &session.id, &session.progress.0, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to save progress"))?;
    if !saved {
        return Err(ApiError::Conflict("Session is already submitted".to_string()));
    }

    Ok(Json(SessionView::from_session(session, now)))
}

async fn post_violation(
    State(state): State<AppState>,
    student: CurrentStudent,
    Path(session_id): Path<String>,
    Json(report): Json<ViolationReport>,
) -> Result<Json<ViolationView>, ApiError> {
    let allowed = state
        .redis()
        .rate_limit(
            &format!("violations:{session_id}"),
            state.settings().exam().violation_rate_limit,
            state.settings().exam().violation_rate_window_seconds,
        )
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many violation reports"));
    }

    let session = load_owned_session(&state, &session_id, &student).await?;
    let session = enforce_deadline(&state, session).await?;
    if session.status != SessionStatus::Active {
        return Err(ApiError::Conflict("Session is already submitted".to_string()));
    }

    metrics::counter!("exam_violations_total", "kind" => report.kind.as_str()).increment(1);
    tracing::warn!(
        session_id = %session.id,
        student_id = %student.id,
        kind = report.kind.as_str(),
        "exam violation reported"
    );

    let limit = state.settings().exam().tab_switch_limit;

    // Only tab switches carry a strike; everything else is just refused.
    let tab_switches = match report.kind {
        ViolationKind::TabHidden => {
            sessions::record_tab_switch(state.db(), &session.id, primitive_now_utc())
                .await
                .map_err(|e| ApiError::internal(e, "Failed to record tab switch"))?
                .ok_or_else(|| {
                    ApiError::Conflict("Session is already submitted".to_string())
                })?
        }
        _ => session.tab_switches,
    };

    let outcome = integrity::assess(report.kind, tab_switches.max(0) as u32, limit);
    let message = integrity::warning_message(&outcome);

    match outcome {
        ViolationOutcome::Blocked => Ok(Json(ViolationView {
            action: ViolationAction::Blocked,
            message,
            tab_switches,
            warnings_remaining: None,
            result: None,
        })),
        ViolationOutcome::Warning { remaining } => Ok(Json(ViolationView {
            action: ViolationAction::Warning,
            message,
            tab_switches,
            warnings_remaining: Some(remaining),
            result: None,
        })),
        ViolationOutcome::ForceSubmit => {
            let finalized = finalize_session(&state, &session.id, SubmitTrigger::Integrity)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to submit session"))?
                .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;

            Ok(Json(ViolationView {
                action: ViolationAction::ForceSubmit,
                message,
                tab_switches,
                warnings_remaining: None,
                result: Some(ResultView::from(finalized.result)),
            }))
        }
    }
}

/// Submit the session and return the graded result. Calling this twice is
/// harmless; the second call gets the stored result back.
async fn submit(
    State(state): State<AppState>,
    student: CurrentStudent,
    Path(session_id): Path<String>,
) -> Result<Json<SubmissionView>, ApiError> {
    let session = load_owned_session(&state, &session_id, &student).await?;

    // A submit that arrives after the deadline is recorded as the timer's.
    let trigger = if session.status == SessionStatus::Active
        && primitive_now_utc() >= session.expires_at
    {
        SubmitTrigger::Timer
    } else {
        SubmitTrigger::Manual
    };

    let finalized = finalize_session(&state, &session_id, trigger)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to submit session"))?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;

    Ok(Json(SubmissionView {
        already_submitted: finalized.already_submitted,
        result: ResultView::from(finalized.result),
    }))
}
