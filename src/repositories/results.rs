use time::PrimitiveDateTime;

use crate::db::models::ExamResult;
use crate::db::types::SubmitTrigger;

const COLUMNS: &str = "id, session_id, exam_id, exam_code, student_id, attempt, \
                       total_questions, attempted, correct, wrong, percentage, \
                       duration_seconds, completed_at, submit_trigger, questions, \
                       user_answers, created_at";

/// Serialize attempt numbering per (student, exam) pair for the current
/// transaction. Both finalize paths take this lock before counting, so two
/// concurrent submissions cannot produce the same attempt number.
pub(crate) async fn acquire_attempt_lock(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    exam_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1), hashtext($2))")
        .bind(student_id)
        .bind(exam_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn count_for_student_exam(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    exam_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM exam_results WHERE student_id = $1 AND exam_id = $2",
    )
    .bind(student_id)
    .bind(exam_id)
    .fetch_one(executor)
    .await
}

pub(crate) struct CreateResult<'a> {
    pub(crate) id: &'a str,
    pub(crate) session_id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) exam_code: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) attempt: i32,
    pub(crate) total_questions: i32,
    pub(crate) attempted: i32,
    pub(crate) correct: i32,
    pub(crate) wrong: i32,
    pub(crate) percentage: i32,
    pub(crate) duration_seconds: i32,
    pub(crate) completed_at: PrimitiveDateTime,
    pub(crate) submit_trigger: SubmitTrigger,
    pub(crate) questions: &'a serde_json::Value,
    pub(crate) user_answers: &'a serde_json::Value,
}

pub(crate) async fn insert(
    executor: impl sqlx::PgExecutor<'_>,
    result: CreateResult<'_>,
) -> Result<ExamResult, sqlx::Error> {
    let query = format!(
        "INSERT INTO exam_results \
             (id, session_id, exam_id, exam_code, student_id, attempt, total_questions, \
              attempted, correct, wrong, percentage, duration_seconds, completed_at, \
              submit_trigger, questions, user_answers, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $13) \
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, ExamResult>(&query)
        .bind(result.id)
        .bind(result.session_id)
        .bind(result.exam_id)
        .bind(result.exam_code)
        .bind(result.student_id)
        .bind(result.attempt)
        .bind(result.total_questions)
        .bind(result.attempted)
        .bind(result.correct)
        .bind(result.wrong)
        .bind(result.percentage)
        .bind(result.duration_seconds)
        .bind(result.completed_at)
        .bind(result.submit_trigger)
        .bind(result.questions)
        .bind(result.user_answers)
        .fetch_one(executor)
        .await
}

pub(crate) async fn find_by_session(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
) -> Result<Option<ExamResult>, sqlx::Error> {
    let query = format!("SELECT {COLUMNS} FROM exam_results WHERE session_id = $1");
    sqlx::query_as::<_, ExamResult>(&query).bind(session_id).fetch_optional(executor).await
}

pub(crate) async fn list_for_student_exam(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    exam_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<ExamResult>, sqlx::Error> {
    let query = format!(
        "SELECT {COLUMNS} FROM exam_results \
         WHERE student_id = $1 AND exam_id = $2 \
         ORDER BY attempt DESC \
         LIMIT $3 OFFSET $4"
    );
    sqlx::query_as::<_, ExamResult>(&query)
        .bind(student_id)
        .bind(exam_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
}
