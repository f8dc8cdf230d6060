//! Engine error taxonomy.
//!
//! Validation and the dedupe pre-check return structured pass/fail lists;
//! everything else surfaces here so callers can translate failures into a
//! single user-facing rejection without string matching.

use std::fmt;

use thiserror::Error;

use crate::store::StoreError;
use crate::validate::Violation;

/// Errors produced by the form engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A schema or submission broke a structural rule. User-correctable;
    /// the message lists every broken rule, not just the first.
    #[error("validation failed: {}", join_messages(.0))]
    Validation(Vec<Violation>),

    /// The caller is not the form's owner.
    #[error("caller is not the owner of this form")]
    Authorization,

    /// The requested form or response does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Duplicate-identity submission, slug-allocation exhaustion, or an
    /// edit rejected by the form's lifecycle state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The form is unpublished or outside its availability window.
    #[error("form is not accepting submissions: {0}")]
    WindowClosed(ClosedReason),

    /// The storage collaborator failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The AI summarization collaborator failed.
    #[error("insight error: {0}")]
    Insight(anyhow::Error),
}

impl EngineError {
    /// The collected violations, when this is a validation failure.
    pub fn violations(&self) -> Option<&[Violation]> {
        match self {
            EngineError::Validation(v) => Some(v),
            _ => None,
        }
    }

    /// Whether this rejection is a duplicate/state conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Conflict(_))
    }

    /// Whether this rejection came from the availability guard.
    pub fn is_window_closed(&self) -> bool {
        matches!(self, EngineError::WindowClosed(_))
    }
}

fn join_messages(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Why the availability guard rejected a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosedReason {
    /// The form is not in the published state.
    NotPublished,
    /// The window's start time is still in the future.
    NotYetOpen,
    /// The window's end time has passed.
    Closed,
}

impl fmt::Display for ClosedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClosedReason::NotPublished => write!(f, "form is not published"),
            ClosedReason::NotYetOpen => write!(f, "form has not opened yet"),
            ClosedReason::Closed => write!(f, "form is closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::Rule;

    #[test]
    fn validation_message_lists_every_rule() {
        let err = EngineError::Validation(vec![
            Violation {
                field: Some("q1".into()),
                rule: Rule::MissingRequired,
                message: "Missing required: Name".into(),
            },
            Violation {
                field: Some("q2".into()),
                rule: Rule::InvalidEmail,
                message: "Invalid email for: Contact".into(),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("Missing required: Name"));
        assert!(msg.contains("Invalid email for: Contact"));
    }

    #[test]
    fn classification_helpers() {
        assert!(EngineError::Conflict("duplicate submission".into()).is_conflict());
        assert!(EngineError::WindowClosed(ClosedReason::Closed).is_window_closed());
        assert!(!EngineError::Authorization.is_conflict());
    }
}
