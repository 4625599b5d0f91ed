use anyhow::Result;

use super::{print_record_summary, report_failure, CommandContext};
use crate::workflow::ReportId;

pub struct ShowCommand {
    pub id: ReportId,
}

impl ShowCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let view = ctx.service.view(&self.id).await.map_err(report_failure)?;

        if ctx.json {
            return ctx.print_json(&view);
        }

        let record = &view.record;
        print_record_summary(record);
        println!(
            "   Status changes: {} used, {} remaining",
            record.status_change_count, view.remaining_changes
        );
        println!(
            "   Violations editable: {}",
            if view.can_edit_violations { "yes" } else { "no" }
        );
        if view.can_edit_violations && !view.violation_catalogue.is_empty() {
            println!("   Allowed violations: {}", view.violation_catalogue.join(", "));
        }
        if record.kind.issues_notices() {
            println!("   Notices issued: {}", record.notice_number);
        }
        if !record.confirmation_images.is_empty() {
            println!("   Confirmation images: {}", record.confirmation_images.len());
        }
        if let Some(reason) = record.last_reason() {
            println!("   Last reason: {reason}");
        }

        println!();
        if view.actions.is_empty() {
            println!("🔒 No status changes available");
        } else {
            println!("🔀 Available status changes:");
            for action in &view.actions {
                let note = if action.requires_reason { " (reason required)" } else { "" };
                println!("   → {}{}", action.target, note);
            }
        }
        Ok(())
    }
}
