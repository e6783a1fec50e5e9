use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::core::time::{format_clock, format_primitive, remaining_seconds};
use crate::db::models::ExamSession;
use crate::db::types::{SessionStatus, SubmitTrigger};
use crate::schemas::result::ResultView;
use crate::services::integrity::ViolationKind;
use crate::services::session::{ProgressCounts, SessionProgress};

#[derive(Debug, Serialize)]
pub(crate) struct SessionView {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) status: SessionStatus,
    pub(crate) progress: SessionProgress,
    pub(crate) counts: ProgressCounts,
    pub(crate) tab_switches: i32,
    pub(crate) started_at: String,
    pub(crate) expires_at: String,
    pub(crate) remaining_seconds: i64,
    /// `MM:SS` countdown string, precomputed for display.
    pub(crate) clock: String,
    pub(crate) submit_trigger: Option<SubmitTrigger>,
}

impl SessionView {
    pub(crate) fn from_session(session: ExamSession, now: PrimitiveDateTime) -> Self {
        let remaining = match session.status {
            SessionStatus::Active => remaining_seconds(session.expires_at, now),
            SessionStatus::Submitted => 0,
        };
        let counts = session.progress.0.counts();
        Self {
            id: session.id,
            exam_id: session.exam_id,
            status: session.status,
            progress: session.progress.0,
            counts,
            tab_switches: session.tab_switches,
            started_at: format_primitive(session.started_at),
            expires_at: format_primitive(session.expires_at),
            remaining_seconds: remaining,
            clock: format_clock(remaining),
            submit_trigger: session.submit_trigger,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ViolationReport {
    pub(crate) kind: ViolationKind,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ViolationAction {
    Blocked,
    Warning,
    ForceSubmit,
}

#[derive(Debug, Serialize)]
pub(crate) struct ViolationView {
    pub(crate) action: ViolationAction,
    pub(crate) message: String,
    pub(crate) tab_switches: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) warnings_remaining: Option<u32>,
    /// Present only when the report tipped the session into forced
    /// submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) result: Option<ResultView>,
}
