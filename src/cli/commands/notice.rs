use anyhow::Result;
use chrono::{Datelike, Utc};
use serde::Serialize;

use super::{report_failure, CommandContext};
use crate::workflow::ReportId;

pub struct NoticeCommand {
    pub id: ReportId,
    pub year: Option<i32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IssuedNotice {
    report_id: ReportId,
    sequence: u64,
    notice_number: String,
}

impl NoticeCommand {
    /// Every run consumes a notice number, so only run it when the letter is
    /// actually being printed.
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let (record, sequence) = ctx
            .service
            .issue_notice(&self.id)
            .await
            .map_err(report_failure)?;

        let year = self.year.unwrap_or_else(|| Utc::now().year());
        let issued = IssuedNotice {
            report_id: record.id,
            sequence: sequence.value(),
            notice_number: sequence.label(year),
        };

        if ctx.json {
            return ctx.print_json(&issued);
        }

        println!("🧾 Notice No. {} issued for report {}", issued.notice_number, issued.report_id);
        Ok(())
    }
}
