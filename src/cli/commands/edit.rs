use anyhow::Result;

use super::{report_failure, CommandContext};
use crate::workflow::{ImageRef, ReportId};

pub struct ViolationsCommand {
    pub id: ReportId,
    pub labels: Vec<String>,
}

impl ViolationsCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let record = ctx
            .service
            .update_violations(&self.id, &self.labels)
            .await
            .map_err(report_failure)?;

        if ctx.json {
            return ctx.print_json(&record);
        }

        println!("✅ Violations updated: {}", record.violations.join(", "));
        Ok(())
    }
}

pub struct ConfirmCommand {
    pub id: ReportId,
    pub images: Vec<String>,
}

impl ConfirmCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let images: Vec<ImageRef> = self.images.iter().map(ImageRef::new).collect();
        let record = ctx
            .service
            .attach_confirmation_images(&self.id, &images)
            .await
            .map_err(report_failure)?;

        if ctx.json {
            return ctx.print_json(&record);
        }

        println!(
            "📸 {} confirmation image(s) on report {}",
            record.confirmation_images.len(),
            record.id
        );
        Ok(())
    }
}
