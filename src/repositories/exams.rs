use crate::db::models::Exam;

const COLUMNS: &str = "id, code, title, description, duration_seconds, status, \
                       created_at, updated_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    let query = format!("SELECT {COLUMNS} FROM exams WHERE id = $1");
    sqlx::query_as::<_, Exam>(&query).bind(exam_id).fetch_optional(executor).await
}

/// Students only ever see published exams; drafts stay invisible to them.
pub(crate) async fn find_published_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    let query = format!("SELECT {COLUMNS} FROM exams WHERE id = $1 AND status = 'publish'");
    sqlx::query_as::<_, Exam>(&query).bind(exam_id).fetch_optional(executor).await
}
