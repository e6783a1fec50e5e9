use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use time::PrimitiveDateTime;

use crate::db::types::{PublishStatus, QuestionKind, SessionStatus, SubmitTrigger};
use crate::services::session::SessionProgress;

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) code: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) duration_seconds: i32,
    pub(crate) status: PublishStatus,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// One selectable option of a question. Labels ("A", "B", ...) are the
/// stable identifiers answers refer to; the text is display-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct AnswerOption {
    pub(crate) label: String,
    pub(crate) text: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) question_text: String,
    pub(crate) question_type: QuestionKind,
    pub(crate) options: Json<Vec<AnswerOption>>,
    pub(crate) correct_answers: Json<Vec<String>>,
    pub(crate) difficulty: Option<String>,
    pub(crate) marks: Option<f64>,
    pub(crate) negative_marks: Option<f64>,
    pub(crate) is_sample: bool,
    pub(crate) status: PublishStatus,
    pub(crate) order_index: i32,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ExamSession {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) status: SessionStatus,
    pub(crate) progress: Json<SessionProgress>,
    pub(crate) tab_switches: i32,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) expires_at: PrimitiveDateTime,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) submit_trigger: Option<SubmitTrigger>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// Immutable snapshot of a graded attempt. Question and answer payloads are
/// copied in at submission time so a later exam edit cannot change history.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ExamResult {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) exam_id: String,
    pub(crate) exam_code: String,
    pub(crate) student_id: String,
    pub(crate) attempt: i32,
    pub(crate) total_questions: i32,
    pub(crate) attempted: i32,
    pub(crate) correct: i32,
    pub(crate) wrong: i32,
    pub(crate) percentage: i32,
    pub(crate) duration_seconds: i32,
    pub(crate) completed_at: PrimitiveDateTime,
    pub(crate) submit_trigger: SubmitTrigger,
    pub(crate) questions: Json<serde_json::Value>,
    pub(crate) user_answers: Json<serde_json::Value>,
    pub(crate) created_at: PrimitiveDateTime,
}
