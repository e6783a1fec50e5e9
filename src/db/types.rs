use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "publishstatus", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub(crate) enum PublishStatus {
    Publish,
    Draft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "questionkind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub(crate) enum QuestionKind {
    /// Single choice, exactly one selected option.
    Radio,
    /// Multiple choice, any number of selected options.
    Checkbox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "sessionstatus", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub(crate) enum SessionStatus {
    Active,
    Submitted,
}

/// Why a session was finalized. Recorded on both the session row and the
/// result row so post-hoc review can tell a voluntary submission apart from
/// an enforced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "submittrigger", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub(crate) enum SubmitTrigger {
    Manual,
    Timer,
    Integrity,
}

impl SubmitTrigger {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            SubmitTrigger::Manual => "manual",
            SubmitTrigger::Timer => "timer",
            SubmitTrigger::Integrity => "integrity",
        }
    }
}
