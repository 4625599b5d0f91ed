use anyhow::Result;

use super::{print_record_summary, report_failure, CommandContext};
use crate::store::ReportStore;
use crate::workflow::ReportKind;

pub struct CreateCommand {
    pub kind: ReportKind,
    pub violations: Vec<String>,
}

impl CreateCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let record = ctx
            .service
            .create(self.kind, &self.violations)
            .await
            .map_err(report_failure)?;

        if ctx.json {
            return ctx.print_json(&record);
        }

        println!("✅ Report created");
        print_record_summary(&record);
        Ok(())
    }
}

pub struct ListCommand;

impl ListCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let records = ctx.service.store().list().await.map_err(report_failure)?;

        if ctx.json {
            return ctx.print_json(&records);
        }

        if records.is_empty() {
            println!("📭 No reports stored");
            println!(
                "   💡 Create one with: report-workflow create --kind obstruction \
                 --violation 'Hazard Parking'"
            );
            return Ok(());
        }

        for record in &records {
            println!(
                "{}  {:<15} {:<28} changes used: {}",
                record.id, record.kind, record.status, record.status_change_count
            );
        }
        Ok(())
    }
}
