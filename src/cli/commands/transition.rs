use anyhow::Result;

use super::{report_failure, CommandContext};
use crate::workflow::{ActorRole, ReportId, ReportStatus, SideEffect};

pub struct TransitionCommand {
    pub id: ReportId,
    pub to: ReportStatus,
    pub reason: Option<String>,
    pub role: ActorRole,
}

impl TransitionCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let outcome = ctx
            .service
            .transition(&self.id, self.to, self.reason.clone(), self.role)
            .await
            .map_err(report_failure)?;

        if ctx.json {
            return ctx.print_json(&outcome.record);
        }

        for effect in &outcome.effects {
            match effect {
                SideEffect::Notify(notification) => {
                    println!(
                        "✅ {}: {} is now {}",
                        notification.as_str(),
                        outcome.record.id,
                        outcome.record.status
                    );
                }
            }
        }
        println!(
            "   {} status change(s) remaining",
            ctx.service.engine().remaining_changes(&outcome.record)
        );
        Ok(())
    }
}
