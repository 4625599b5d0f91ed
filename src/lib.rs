// Report Workflow Library - status lifecycle for citizen violation reports
// This exposes the engine, the persistence contract and the CLI plumbing

pub mod cli;
pub mod config;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use config::ReportWorkflowConfig;
pub use service::{ReportView, ReportWorkflowService};
pub use store::{FileReportStore, InMemoryReportStore, ReportStore};
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry};
pub use workflow::{
    ActorRole, ErrorKind, ImageRef, NoticeSequence, PlateVariant, ReportId, ReportKind,
    ReportRecord, ReportStatus, ReportWorkflowEngine, SideEffect, TransitionOutcome,
    TransitionRequest, TransitionResult, TransitionRule, TransitionTable, WorkflowError,
};
