use anyhow::Result;
use serde::Serialize;

use crate::service::ReportWorkflowService;
use crate::store::FileReportStore;
use crate::workflow::{ReportRecord, WorkflowError};

pub mod create;
pub mod edit;
pub mod notice;
pub mod show;
pub mod table;
pub mod transition;

pub use create::{CreateCommand, ListCommand};
pub use edit::{ConfirmCommand, ViolationsCommand};
pub use notice::NoticeCommand;
pub use show::ShowCommand;
pub use table::TableCommand;
pub use transition::TransitionCommand;

/// Shared state handed to every command
pub struct CommandContext {
    pub service: ReportWorkflowService<FileReportStore>,
    pub json: bool,
}

impl CommandContext {
    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

/// Explain a refused operation in terms an administrator can act on
pub fn report_failure(error: WorkflowError) -> anyhow::Error {
    let kind = error.kind();
    eprintln!("❌ {kind}: {error}");
    eprintln!("   💡 {}", kind.user_message());
    anyhow::Error::new(error)
}

pub fn print_record_summary(record: &ReportRecord) {
    println!("📋 Report {} ({})", record.id, record.kind);
    println!("   Status: {}", record.status);
    println!("   Violations: {}", record.violations.join(", "));
}
