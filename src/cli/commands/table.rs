use anyhow::Result;
use serde::Serialize;

use super::CommandContext;
use crate::workflow::{ReportKind, ReportStatus, TransitionRule};

pub struct TableCommand {
    pub kind: Option<ReportKind>,
}

#[derive(Serialize)]
struct TableRow {
    kind: ReportKind,
    table: String,
    from: ReportStatus,
    to: ReportStatus,
    requires_reason: bool,
}

impl TableCommand {
    pub fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let engine = ctx.service.engine();
        let kinds: Vec<ReportKind> = match self.kind {
            Some(kind) => vec![kind],
            None => ReportKind::ALL.to_vec(),
        };

        let mut rows = Vec::new();
        for &kind in &kinds {
            let Some(table) = engine.table().kind_table(kind) else {
                continue;
            };
            for from in table.statuses() {
                for TransitionRule { target, requires_reason } in table.rules(from) {
                    rows.push(TableRow {
                        kind,
                        table: format!("{} v{}", table.name, table.version),
                        from,
                        to: *target,
                        requires_reason: *requires_reason,
                    });
                }
            }
        }

        if ctx.json {
            return ctx.print_json(&rows);
        }

        println!("Status change limit: {}", engine.max_changes());
        let mut current: Option<ReportKind> = None;
        for row in &rows {
            if current != Some(row.kind) {
                println!();
                println!("📑 {} ({})", row.kind, row.table);
                current = Some(row.kind);
            }
            let note = if row.requires_reason { "  [reason]" } else { "" };
            println!("   {} → {}{}", row.from, row.to, note);
        }

        for kind in kinds {
            let catalogue = engine.violation_catalogue(kind);
            if !catalogue.is_empty() {
                println!();
                println!("🏷️  {} violations: {}", kind, catalogue.join(", "));
            }
        }
        Ok(())
    }
}
