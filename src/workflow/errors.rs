use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::types::{ReportId, ReportKind, ReportStatus};

/// Stable error classification shared by every workflow operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidTransition,
    MissingReason,
    LimitExceeded,
    EditNotAllowed,
    EmptyViolationList,
    UnknownViolation,
    StaleRecord,
    NotFound,
    InvariantViolation,
    Storage,
}

/// How the presentation layer should surface an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// Keep the form open and ask for a justification inline
    PromptReason,
    /// Routine user mistake, shown as a warning next to the control
    Warning,
    /// Data on screen is out of date; re-fetch before retrying
    Reload,
    /// Genuine system failure
    Failure,
}

impl ErrorKind {
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::InvalidTransition => {
                "That status change is not available for this report."
            }
            ErrorKind::MissingReason => "Please enter the reason for changing the status.",
            ErrorKind::LimitExceeded => "This report has no remaining status changes.",
            ErrorKind::EditNotAllowed => {
                "This report can no longer be edited in its current status."
            }
            ErrorKind::EmptyViolationList => "Select at least one violation.",
            ErrorKind::UnknownViolation => {
                "Choose violations from the list offered for this report."
            }
            ErrorKind::StaleRecord => {
                "This report was changed by someone else. Reload and try again."
            }
            ErrorKind::NotFound => "Report not found.",
            ErrorKind::InvariantViolation | ErrorKind::Storage => {
                "The report could not be saved. Please try again later."
            }
        }
    }

    pub fn presentation(self) -> Presentation {
        match self {
            ErrorKind::MissingReason => Presentation::PromptReason,
            ErrorKind::InvalidTransition
            | ErrorKind::LimitExceeded
            | ErrorKind::EditNotAllowed
            | ErrorKind::EmptyViolationList
            | ErrorKind::UnknownViolation => Presentation::Warning,
            ErrorKind::StaleRecord | ErrorKind::NotFound => Presentation::Reload,
            ErrorKind::InvariantViolation | ErrorKind::Storage => Presentation::Failure,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a locked-status edit was attempting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    Violations,
    ConfirmationImages,
    Notice,
}

impl fmt::Display for EditTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditTarget::Violations => f.write_str("violations"),
            EditTarget::ConfirmationImages => f.write_str("confirmation images"),
            EditTarget::Notice => f.write_str("notice letters"),
        }
    }
}

/// Domain and boundary errors. Expected conditions are values, never panics.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Invalid transition: {kind} report cannot move from '{from}' to '{to}'")]
    InvalidTransition {
        kind: ReportKind,
        from: ReportStatus,
        to: ReportStatus,
    },

    #[error("Missing reason: leaving '{from}' for '{to}' requires a justification")]
    MissingReason { from: ReportStatus, to: ReportStatus },

    #[error("Limit exceeded: {used} of {max} status changes already used")]
    LimitExceeded { used: u32, max: u32 },

    #[error("Edit not allowed: {target} cannot be changed while status is '{status}'")]
    EditNotAllowed { target: EditTarget, status: ReportStatus },

    #[error("Violation list is empty: a report must carry at least one violation")]
    EmptyViolationList,

    #[error("Unknown violation '{label}' for {kind} reports")]
    UnknownViolation { kind: ReportKind, label: String },

    #[error("Stale record {id}: expected revision {expected}, store has {found}")]
    StaleRecord { id: ReportId, expected: u64, found: u64 },

    #[error("Report {0} not found")]
    NotFound(ReportId),

    #[error("Invariant violation on {id}: {detail}")]
    InvariantViolation { id: ReportId, detail: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            WorkflowError::MissingReason { .. } => ErrorKind::MissingReason,
            WorkflowError::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            WorkflowError::EditNotAllowed { .. } => ErrorKind::EditNotAllowed,
            WorkflowError::EmptyViolationList => ErrorKind::EmptyViolationList,
            WorkflowError::UnknownViolation { .. } => ErrorKind::UnknownViolation,
            WorkflowError::StaleRecord { .. } => ErrorKind::StaleRecord,
            WorkflowError::NotFound(_) => ErrorKind::NotFound,
            WorkflowError::InvariantViolation { .. } => ErrorKind::InvariantViolation,
            WorkflowError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Re-fetching and recomputing may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkflowError::StaleRecord { .. })
    }
}

impl From<std::io::Error> for WorkflowError {
    fn from(err: std::io::Error) -> Self {
        WorkflowError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        WorkflowError::Storage(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusParseError {
    #[error("Unknown report status '{0}'")]
    UnknownStatus(String),
    #[error("Unknown report kind '{0}'")]
    UnknownKind(String),
    #[error("Unknown actor role '{0}'")]
    UnknownRole(String),
}

/// Configuration defects in transition tables. These fail engine construction.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Failed to parse transition table: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("IO error reading transition table: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported transition table version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("No transition table configured for {0} reports")]
    MissingKind(ReportKind),

    #[error("Status '{0}' may not transition to itself")]
    SelfTransition(ReportStatus),

    #[error("Duplicate target '{to}' from status '{from}'")]
    DuplicateTarget { from: ReportStatus, to: ReportStatus },

    #[error("Leaving investigation status '{from}' for '{to}' must require a reason")]
    UnguardedInvestigationExit { from: ReportStatus, to: ReportStatus },

    #[error("Violation catalogue contains a blank label")]
    BlankViolationLabel,

    #[error("Violation catalogue lists '{0}' more than once")]
    DuplicateViolationLabel(String),

    #[error("Unknown plate table variant '{0}'")]
    UnknownVariant(String),

    #[error(transparent)]
    Status(#[from] StatusParseError),
}
