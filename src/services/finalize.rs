//! Submission pipeline. Every way a session can end (student submit, timer
//! expiry, integrity enforcement) funnels through [`finalize_session`], which
//! grades the stored progress and writes the immutable result row exactly
//! once per session.

use anyhow::Context;
use serde::Serialize;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{AnswerOption, ExamResult, ExamSession, Question};
use crate::db::types::{QuestionKind, SubmitTrigger};
use crate::repositories::{exams, questions, results, sessions};
use crate::services::scoring;

pub(crate) struct FinalizedSubmission {
    pub(crate) result: ExamResult,
    /// True when another caller finished this session first and we only
    /// read back its result.
    pub(crate) already_submitted: bool,
}

/// Frozen copy of a question as it was graded, stored on the result row.
#[derive(Serialize)]
struct QuestionSnapshot<'a> {
    id: &'a str,
    question_text: &'a str,
    question_type: QuestionKind,
    options: &'a [AnswerOption],
    correct_answers: &'a [String],
    marks: Option<f64>,
    order_index: i32,
}

fn snapshot_questions(question_list: &[Question]) -> Result<serde_json::Value, serde_json::Error> {
    let snapshots: Vec<QuestionSnapshot<'_>> = question_list
        .iter()
        .map(|q| QuestionSnapshot {
            id: &q.id,
            question_text: &q.question_text,
            question_type: q.question_type,
            options: &q.options.0,
            correct_answers: &q.correct_answers.0,
            marks: q.marks,
            order_index: q.order_index,
        })
        .collect();
    serde_json::to_value(snapshots)
}

/// Submit a session and return its result. Returns `Ok(None)` when no such
/// session exists. Safe to call concurrently for the same session: exactly
/// one caller grades and inserts, the rest get the stored result back.
pub(crate) async fn finalize_session(
    state: &AppState,
    session_id: &str,
    trigger: SubmitTrigger,
) -> anyhow::Result<Option<FinalizedSubmission>> {
    let mut tx = state.db().begin().await.context("begin finalize transaction")?;

    let Some(session) = sessions::find_by_id(&mut *tx, session_id)
        .await
        .context("load session for finalize")?
    else {
        return Ok(None);
    };

    // Attempt numbers are count-based, so both the count and the insert must
    // happen under this lock. Taking it before the status flip also means a
    // losing concurrent submit blocks here until the winner's result row is
    // committed and readable.
    results::acquire_attempt_lock(&mut *tx, &session.student_id, &session.exam_id)
        .await
        .context("acquire attempt lock")?;

    let now = primitive_now_utc();
    // A timer submission is stamped with the deadline itself, not with
    // whenever the sweep or the next request happened to notice it.
    let submitted_at = match trigger {
        SubmitTrigger::Timer => session.expires_at,
        SubmitTrigger::Manual | SubmitTrigger::Integrity => now,
    };

    let Some(submitted) = sessions::mark_submitted(&mut *tx, session_id, trigger, submitted_at)
        .await
        .context("mark session submitted")?
    else {
        let result = results::find_by_session(&mut *tx, session_id)
            .await
            .context("load existing result")?
            .context("submitted session has no result row")?;
        tx.commit().await.context("commit finalize transaction")?;
        return Ok(Some(FinalizedSubmission { result, already_submitted: true }));
    };

    let graded = grade_submission(&mut tx, &submitted).await?;
    tx.commit().await.context("commit finalize transaction")?;

    metrics::counter!("exam_submissions_total", "trigger" => trigger.as_str()).increment(1);
    tracing::info!(
        session_id = %submitted.id,
        exam_id = %submitted.exam_id,
        student_id = %submitted.student_id,
        attempt = graded.attempt,
        percentage = graded.percentage,
        trigger = trigger.as_str(),
        policy = scoring::GRADING_POLICY,
        "exam session submitted"
    );

    Ok(Some(FinalizedSubmission { result: graded, already_submitted: false }))
}

async fn grade_submission(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    session: &ExamSession,
) -> anyhow::Result<ExamResult> {
    let exam = exams::find_by_id(&mut **tx, &session.exam_id)
        .await
        .context("load exam for grading")?
        .context("session references a missing exam")?;

    let question_list = questions::list_published_for_exam(&mut **tx, &session.exam_id)
        .await
        .context("load questions for grading")?;

    let summary = scoring::score(&question_list, &session.progress.0.answers);

    let attempt = results::count_for_student_exam(&mut **tx, &session.student_id, &session.exam_id)
        .await
        .context("count previous attempts")?
        as i32
        + 1;

    let submitted_at = session
        .submitted_at
        .unwrap_or_else(primitive_now_utc);
    let duration_seconds = (submitted_at.assume_utc().unix_timestamp()
        - session.started_at.assume_utc().unix_timestamp())
    .max(0) as i32;

    let question_snapshot = snapshot_questions(&question_list).context("snapshot questions")?;
    let answer_snapshot =
        serde_json::to_value(&session.progress.0.answers).context("snapshot answers")?;

    let trigger = session.submit_trigger.unwrap_or(SubmitTrigger::Manual);
    let result_id = uuid::Uuid::new_v4().to_string();

    results::insert(
        &mut **tx,
        results::CreateResult {
            id: &result_id,
            session_id: &session.id,
            exam_id: &session.exam_id,
            exam_code: &exam.code,
            student_id: &session.student_id,
            attempt,
            total_questions: summary.total_questions,
            attempted: summary.attempted,
            correct: summary.correct,
            wrong: summary.wrong,
            percentage: summary.percentage,
            duration_seconds,
            completed_at: submitted_at,
            submit_trigger: trigger,
            questions: &question_snapshot,
            user_answers: &answer_snapshot,
        },
    )
    .await
    .context("insert exam result")
}
