use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::models::{AnswerOption, Exam, Question};
use crate::db::types::QuestionKind;

#[derive(Debug, Serialize)]
pub(crate) struct ExamView {
    pub(crate) id: String,
    pub(crate) code: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) duration_seconds: i32,
    pub(crate) question_count: usize,
    pub(crate) created_at: String,
}

impl ExamView {
    pub(crate) fn from_exam(exam: Exam, question_count: usize) -> Self {
        Self {
            id: exam.id,
            code: exam.code,
            title: exam.title,
            description: exam.description,
            duration_seconds: exam.duration_seconds,
            question_count,
            created_at: format_primitive(exam.created_at),
        }
    }
}

/// A question as the exam client is allowed to see it. Correct answers and
/// moderation fields never leave the server.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionView {
    pub(crate) id: String,
    pub(crate) question_text: String,
    pub(crate) question_text_plain: String,
    pub(crate) question_type: QuestionKind,
    pub(crate) options: Vec<AnswerOption>,
    pub(crate) difficulty: Option<String>,
    pub(crate) marks: Option<f64>,
    pub(crate) order_index: i32,
}

impl QuestionView {
    pub(crate) fn from_question(question: Question) -> Self {
        Self {
            question_text_plain: strip_markup(&question.question_text),
            id: question.id,
            question_text: question.question_text,
            question_type: question.question_type,
            options: question.options.0,
            difficulty: question.difficulty,
            marks: question.marks,
            order_index: question.order_index,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptStatusView {
    pub(crate) exam_id: String,
    pub(crate) already_submitted: bool,
    pub(crate) attempts: i64,
}

/// Question text is authored with inline HTML markup. Drop the tags for
/// plain-text consumers such as the question palette.
pub(crate) fn strip_markup(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => plain.push(ch),
            _ => {}
        }
    }
    plain.split_whitespace().collect::<Vec<_>>().join(" ")
}
