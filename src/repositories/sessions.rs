use sqlx::types::Json;
use time::PrimitiveDateTime;

use crate::db::models::ExamSession;
use crate::db::types::SubmitTrigger;
use crate::services::session::SessionProgress;

const COLUMNS: &str = "id, exam_id, student_id, status, progress, tab_switches, started_at, \
                       expires_at, submitted_at, submit_trigger, created_at, updated_at";

pub(crate) struct CreateSession<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) progress: &'a SessionProgress,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) expires_at: PrimitiveDateTime,
}

/// Insert a new active session. The partial unique index on
/// (exam_id, student_id) makes concurrent starts race safely: the loser gets
/// `false` and should re-read the active session instead.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    session: CreateSession<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO exam_sessions \
             (id, exam_id, student_id, status, progress, tab_switches, \
              started_at, expires_at, created_at, updated_at) \
         VALUES ($1, $2, $3, 'active', $4, 0, $5, $6, $5, $5) \
         ON CONFLICT (exam_id, student_id) WHERE status = 'active' DO NOTHING",
    )
    .bind(session.id)
    .bind(session.exam_id)
    .bind(session.student_id)
    .bind(Json(session.progress))
    .bind(session.started_at)
    .bind(session.expires_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
) -> Result<Option<ExamSession>, sqlx::Error> {
    let query = format!("SELECT {COLUMNS} FROM exam_sessions WHERE id = $1");
    sqlx::query_as::<_, ExamSession>(&query).bind(session_id).fetch_optional(executor).await
}

pub(crate) async fn find_active(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    student_id: &str,
) -> Result<Option<ExamSession>, sqlx::Error> {
    let query = format!(
        "SELECT {COLUMNS} FROM exam_sessions \
         WHERE exam_id = $1 AND student_id = $2 AND status = 'active'"
    );
    sqlx::query_as::<_, ExamSession>(&query)
        .bind(exam_id)
        .bind(student_id)
        .fetch_optional(executor)
        .await
}

/// Persist progress for a session that is still active. Returns `false`
/// when the session was submitted in the meantime.
pub(crate) async fn save_progress(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
    progress: &SessionProgress,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exam_sessions SET progress = $2, updated_at = $3 \
         WHERE id = $1 AND status = 'active'",
    )
    .bind(session_id)
    .bind(Json(progress))
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Atomically bump the tab-switch counter and return the new value, or
/// `None` if the session is no longer active.
pub(crate) async fn record_tab_switch(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
    now: PrimitiveDateTime,
) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "UPDATE exam_sessions SET tab_switches = tab_switches + 1, updated_at = $2 \
         WHERE id = $1 AND status = 'active' \
         RETURNING tab_switches",
    )
    .bind(session_id)
    .bind(now)
    .fetch_optional(executor)
    .await
}

/// Flip an active session to submitted. Exactly one caller wins this
/// transition; everyone else gets `None` and must read the existing result.
pub(crate) async fn mark_submitted(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
    trigger: SubmitTrigger,
    submitted_at: PrimitiveDateTime,
) -> Result<Option<ExamSession>, sqlx::Error> {
    let query = format!(
        "UPDATE exam_sessions \
         SET status = 'submitted', submit_trigger = $2, submitted_at = $3, updated_at = $3 \
         WHERE id = $1 AND status = 'active' \
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, ExamSession>(&query)
        .bind(session_id)
        .bind(trigger)
        .bind(submitted_at)
        .fetch_optional(executor)
        .await
}

/// Active sessions whose deadline has passed, oldest first. Used by the
/// background sweep to submit what the client never did.
pub(crate) async fn list_expired_active(
    executor: impl sqlx::PgExecutor<'_>,
    now: PrimitiveDateTime,
    limit: i64,
) -> Result<Vec<ExamSession>, sqlx::Error> {
    let query = format!(
        "SELECT {COLUMNS} FROM exam_sessions \
         WHERE status = 'active' AND expires_at <= $1 \
         ORDER BY expires_at \
         LIMIT $2"
    );
    sqlx::query_as::<_, ExamSession>(&query).bind(now).bind(limit).fetch_all(executor).await
}
