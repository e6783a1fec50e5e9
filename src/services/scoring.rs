//! Grading. Runs server-side at submission time from the stored progress;
//! nothing the client sends at submit is trusted.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::db::models::Question;
use crate::services::session::RecordedAnswer;

/// All-or-nothing per question: the selected set must equal the correct set
/// exactly, and an unanswered question counts as wrong.
pub(crate) const GRADING_POLICY: &str = "exact-match-unanswered-wrong";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub(crate) struct ScoreSummary {
    pub(crate) total_questions: i32,
    pub(crate) attempted: i32,
    pub(crate) correct: i32,
    pub(crate) wrong: i32,
    pub(crate) percentage: i32,
}

/// Canonical comparison form of an answer: labels sorted, comma-joined.
/// `["C", "A"]` and `["A", "C"]` grade identically.
pub(crate) fn canonical_answer<I, S>(labels: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut labels: Vec<String> =
        labels.into_iter().map(|label| label.as_ref().to_string()).collect();
    labels.sort();
    labels.join(",")
}

pub(crate) fn score(
    questions: &[Question],
    answers: &BTreeMap<String, RecordedAnswer>,
) -> ScoreSummary {
    let total_questions = questions.len() as i32;
    let mut attempted = 0;
    let mut correct = 0;

    for question in questions {
        let expected = canonical_answer(question.correct_answers.0.iter());
        let given = match answers.get(&question.id) {
            Some(answer) => {
                attempted += 1;
                canonical_answer(answer.labels())
            }
            None => String::new(),
        };
        if !expected.is_empty() && given == expected {
            correct += 1;
        }
    }

    let wrong = total_questions - correct;
    let percentage = if total_questions == 0 {
        0
    } else {
        ((f64::from(correct) / f64::from(total_questions)) * 100.0).round() as i32
    };

    ScoreSummary { total_questions, attempted, correct, wrong, percentage }
}
