//! In-session navigation and answer state.
//!
//! The whole per-session state lives in [`SessionProgress`], a plain value
//! persisted as one JSON column. Every change goes through
//! [`SessionProgress::apply`] against the exam's question list, so the server
//! is the only party that decides what a session looks like.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::models::Question;
use crate::db::types::QuestionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum QuestionProgress {
    NotVisited,
    Visited,
    Answered,
    Skipped,
    Review,
}

/// A student's recorded answer for one question. Single-choice questions
/// hold one option label, multi-choice hold the selected set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum RecordedAnswer {
    Single(String),
    Multi(BTreeSet<String>),
}

impl RecordedAnswer {
    pub(crate) fn labels(&self) -> Vec<String> {
        match self {
            RecordedAnswer::Single(label) => vec![label.clone()],
            RecordedAnswer::Multi(labels) => labels.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SessionProgress {
    pub(crate) current: usize,
    pub(crate) answers: BTreeMap<String, RecordedAnswer>,
    pub(crate) status: BTreeMap<String, QuestionProgress>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum SessionEvent {
    /// Jump to a question by its position in the ordered list.
    Goto { index: usize },
    /// Select (or for multi-choice, toggle) an option on a question.
    Answer { question_id: String, option: String },
    /// Flag a question for later review.
    MarkReview { question_id: String },
    /// Leave the current question unanswered and move on.
    Skip,
    /// Advance to the next question, wrapping after the last one.
    Next,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum SessionStateError {
    #[error("question index {index} is out of range for {total} questions")]
    QuestionIndexOutOfRange { index: usize, total: usize },
    #[error("question {0} does not belong to this exam")]
    UnknownQuestion(String),
    #[error("option {option} does not exist on question {question_id}")]
    UnknownOption { question_id: String, option: String },
    #[error("exam has no questions")]
    EmptyQuestionSet,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub(crate) struct ProgressCounts {
    pub(crate) not_visited: usize,
    pub(crate) visited: usize,
    pub(crate) answered: usize,
    pub(crate) skipped: usize,
    pub(crate) review: usize,
}

impl SessionProgress {
    /// Fresh state for a newly started session: every question starts out
    /// not visited. The first navigation event marks the question it lands
    /// on.
    pub(crate) fn new(questions: &[Question]) -> Self {
        let status: BTreeMap<String, QuestionProgress> = questions
            .iter()
            .map(|q| (q.id.clone(), QuestionProgress::NotVisited))
            .collect();
        Self { current: 0, answers: BTreeMap::new(), status }
    }

    pub(crate) fn apply(
        &mut self,
        questions: &[Question],
        event: &SessionEvent,
    ) -> Result<(), SessionStateError> {
        if questions.is_empty() {
            return Err(SessionStateError::EmptyQuestionSet);
        }

        match event {
            SessionEvent::Goto { index } => {
                if *index >= questions.len() {
                    return Err(SessionStateError::QuestionIndexOutOfRange {
                        index: *index,
                        total: questions.len(),
                    });
                }
                self.current = *index;
                self.mark_visited(&questions[*index].id);
            }
            SessionEvent::Answer { question_id, option } => {
                let question = questions
                    .iter()
                    .find(|q| &q.id == question_id)
                    .ok_or_else(|| SessionStateError::UnknownQuestion(question_id.clone()))?;
                if !question.options.0.iter().any(|opt| &opt.label == option) {
                    return Err(SessionStateError::UnknownOption {
                        question_id: question_id.clone(),
                        option: option.clone(),
                    });
                }
                self.record_answer(question, option);
            }
            SessionEvent::MarkReview { question_id } => {
                if !questions.iter().any(|q| &q.id == question_id) {
                    return Err(SessionStateError::UnknownQuestion(question_id.clone()));
                }
                self.status.insert(question_id.clone(), QuestionProgress::Review);
            }
            SessionEvent::Skip => {
                let current_id = questions[self.current].id.clone();
                self.status.insert(current_id, QuestionProgress::Skipped);
                self.advance(questions);
            }
            SessionEvent::Next => {
                self.advance(questions);
            }
        }

        Ok(())
    }

    pub(crate) fn counts(&self) -> ProgressCounts {
        let mut counts = ProgressCounts::default();
        for progress in self.status.values() {
            match progress {
                QuestionProgress::NotVisited => counts.not_visited += 1,
                QuestionProgress::Visited => counts.visited += 1,
                QuestionProgress::Answered => counts.answered += 1,
                QuestionProgress::Skipped => counts.skipped += 1,
                QuestionProgress::Review => counts.review += 1,
            }
        }
        counts
    }

    fn advance(&mut self, questions: &[Question]) {
        self.current = (self.current + 1) % questions.len();
        self.mark_visited(&questions[self.current].id);
    }

    fn mark_visited(&mut self, question_id: &str) {
        let entry = self
            .status
            .entry(question_id.to_string())
            .or_insert(QuestionProgress::NotVisited);
        if *entry == QuestionProgress::NotVisited {
            *entry = QuestionProgress::Visited;
        }
    }

    fn record_answer(&mut self, question: &Question, option: &str) {
        match question.question_type {
            QuestionKind::Radio => {
                self.answers
                    .insert(question.id.clone(), RecordedAnswer::Single(option.to_string()));
                self.status.insert(question.id.clone(), QuestionProgress::Answered);
            }
            QuestionKind::Checkbox => {
                let mut selected = match self.answers.remove(&question.id) {
                    Some(RecordedAnswer::Multi(labels)) => labels,
                    Some(RecordedAnswer::Single(label)) => BTreeSet::from([label]),
                    None => BTreeSet::new(),
                };
                if !selected.remove(option) {
                    selected.insert(option.to_string());
                }
                if selected.is_empty() {
                    // All selections toggled off: back to merely visited.
                    self.status.insert(question.id.clone(), QuestionProgress::Visited);
                } else {
                    self.answers.insert(question.id.clone(), RecordedAnswer::Multi(selected));
                    self.status.insert(question.id.clone(), QuestionProgress::Answered);
                }
            }
        }
    }
}
