use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::models::ExamResult;
use crate::db::types::SubmitTrigger;

#[derive(Debug, Serialize)]
pub(crate) struct ResultView {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) exam_id: String,
    pub(crate) exam_code: String,
    pub(crate) attempt: i32,
    pub(crate) total_questions: i32,
    pub(crate) attempted: i32,
    pub(crate) correct: i32,
    pub(crate) wrong: i32,
    pub(crate) percentage: i32,
    pub(crate) duration_seconds: i32,
    pub(crate) completed_at: String,
    pub(crate) submit_trigger: SubmitTrigger,
}

impl From<ExamResult> for ResultView {
    fn from(result: ExamResult) -> Self {
        Self {
            id: result.id,
            session_id: result.session_id,
            exam_id: result.exam_id,
            exam_code: result.exam_code,
            attempt: result.attempt,
            total_questions: result.total_questions,
            attempted: result.attempted,
            correct: result.correct,
            wrong: result.wrong,
            percentage: result.percentage,
            duration_seconds: result.duration_seconds,
            completed_at: format_primitive(result.completed_at),
            submit_trigger: result.submit_trigger,
        }
    }
}

/// Full review payload for one attempt: the score plus the graded question
/// and answer snapshots taken at submission time.
#[derive(Debug, Serialize)]
pub(crate) struct ResultDetailView {
    #[serde(flatten)]
    pub(crate) summary: ResultView,
    pub(crate) questions: serde_json::Value,
    pub(crate) user_answers: serde_json::Value,
}

impl From<ExamResult> for ResultDetailView {
    fn from(result: ExamResult) -> Self {
        let questions = result.questions.0.clone();
        let user_answers = result.user_answers.0.clone();
        Self { summary: ResultView::from(result), questions, user_answers }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionView {
    pub(crate) already_submitted: bool,
    pub(crate) result: ResultView,
}
