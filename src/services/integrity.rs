//! Proctoring rules for violation reports coming from the exam client.
//!
//! Clipboard and context-menu actions are blocked outright and never
//! escalate. Leaving the exam tab is counted; once the count reaches the
//! configured limit the session is submitted on the student's behalf.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ViolationKind {
    Copy,
    Paste,
    Cut,
    ContextMenu,
    TabHidden,
}

impl ViolationKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::Copy => "copy",
            ViolationKind::Paste => "paste",
            ViolationKind::Cut => "cut",
            ViolationKind::ContextMenu => "context_menu",
            ViolationKind::TabHidden => "tab_hidden",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ViolationOutcome {
    /// The action was blocked; no strike recorded.
    Blocked,
    /// A strike was recorded and the student still has `remaining` left.
    Warning { remaining: u32 },
    /// The strike limit is reached; the session must be submitted now.
    ForceSubmit,
}

/// Decide what happens after a violation, given the tab-switch count that
/// already includes the current report.
pub(crate) fn assess(kind: ViolationKind, tab_switches: u32, limit: u32) -> ViolationOutcome {
    match kind {
        ViolationKind::Copy
        | ViolationKind::Paste
        | ViolationKind::Cut
        | ViolationKind::ContextMenu => ViolationOutcome::Blocked,
        ViolationKind::TabHidden => {
            if tab_switches >= limit {
                ViolationOutcome::ForceSubmit
            } else {
                ViolationOutcome::Warning { remaining: limit - tab_switches }
            }
        }
    }
}

pub(crate) fn warning_message(outcome: &ViolationOutcome) -> String {
    match outcome {
        ViolationOutcome::Blocked => {
            "This action is not allowed during the exam.".to_string()
        }
        ViolationOutcome::Warning { remaining } if *remaining <= 1 => format!(
            "Final warning: do not leave the exam tab again. {remaining} warning remaining before automatic submission."
        ),
        ViolationOutcome::Warning { remaining } => format!(
            "Please stay on the exam tab. {remaining} warnings remaining before automatic submission."
        ),
        ViolationOutcome::ForceSubmit => {
            "Tab switch limit exceeded. Your exam is being submitted automatically.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clipboard_violations_are_blocked_without_a_strike() {
        for kind in [
            ViolationKind::Copy,
            ViolationKind::Paste,
            ViolationKind::Cut,
            ViolationKind::ContextMenu,
        ] {
            assert_eq!(assess(kind, 0, 5), ViolationOutcome::Blocked);
            // Blocked actions never escalate, whatever the count.
            assert_eq!(assess(kind, 99, 5), ViolationOutcome::Blocked);
        }
    }

    #[test]
    fn tab_switches_warn_until_the_limit() {
        assert_eq!(assess(ViolationKind::TabHidden, 1, 5), ViolationOutcome::Warning { remaining: 4 });
        assert_eq!(assess(ViolationKind::TabHidden, 4, 5), ViolationOutcome::Warning { remaining: 1 });
    }

    #[test]
    fn reaching_the_limit_forces_submission() {
        assert_eq!(assess(ViolationKind::TabHidden, 5, 5), ViolationOutcome::ForceSubmit);
        assert_eq!(assess(ViolationKind::TabHidden, 6, 5), ViolationOutcome::ForceSubmit);
    }

    #[test]
    fn warning_message_escalates_near_the_limit() {
        let early = warning_message(&ViolationOutcome::Warning { remaining: 4 });
        let last = warning_message(&ViolationOutcome::Warning { remaining: 1 });
        assert!(early.contains("4 warnings"));
        assert!(last.starts_with("Final warning"));
    }
}
