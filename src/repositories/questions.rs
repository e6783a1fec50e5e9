use crate::db::models::Question;

const COLUMNS: &str = "id, exam_id, question_text, question_type, options, correct_answers, \
                       difficulty, marks, negative_marks, is_sample, status, order_index, \
                       created_at, updated_at";

/// The graded question set of an exam, in presentation order. Draft and
/// sample questions are excluded.
pub(crate) async fn list_published_for_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    let query = format!(
        "SELECT {COLUMNS} FROM questions \
         WHERE exam_id = $1 AND status = 'publish' AND is_sample = FALSE \
         ORDER BY order_index, created_at"
    );
    sqlx::query_as::<_, Question>(&query).bind(exam_id).fetch_all(executor).await
}

/// Published sample questions, shown before a session starts.
pub(crate) async fn list_samples_for_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    let query = format!(
        "SELECT {COLUMNS} FROM questions \
         WHERE exam_id = $1 AND status = 'publish' AND is_sample = TRUE \
         ORDER BY order_index, created_at"
    );
    sqlx::query_as::<_, Question>(&query).bind(exam_id).fetch_all(executor).await
}
