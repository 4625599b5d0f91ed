// Report status lifecycle: types, transition tables and the engine that
// enforces them

pub mod engine;
pub mod errors;
pub mod table;
pub mod types;

pub use engine::{ReportWorkflowEngine, TransitionResult, DEFAULT_MAX_STATUS_CHANGES};
pub use errors::{EditTarget, ErrorKind, Presentation, StatusParseError, TableError, WorkflowError};
pub use table::{PlateVariant, TransitionRule, TransitionTable};
pub use types::{
    ActorRole, ImageRef, NoticeSequence, Notification, ReportId, ReportKind, ReportRecord,
    ReportStatus, SideEffect, StatusHistoryEntry, TransitionOutcome, TransitionRequest,
};
