use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ReportWorkflowConfig;
use crate::store::FileReportStore;
use crate::service::ReportWorkflowService;
use crate::workflow::{ActorRole, ReportKind, ReportStatus};

pub mod commands;

use commands::{
    CommandContext, ConfirmCommand, CreateCommand, ListCommand, NoticeCommand, ShowCommand,
    TableCommand, TransitionCommand, ViolationsCommand,
};

#[derive(Parser)]
#[command(name = "report-workflow")]
#[command(about = "Review workflow for citizen parking and obstruction reports")]
#[command(long_about = "Moves citizen violation reports through their review statuses, \
                       enforcing the status change limit, reason capture and edit locks. \
                       Reports are stored as JSON files in the configured store directory.")]
pub struct Cli {
    /// Configuration file (defaults to ./report-workflow.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the report store directory
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a new report in Pending status
    Create {
        /// Report kind: illegal-parking or obstruction
        #[arg(long)]
        kind: ReportKind,
        /// Violation label (repeat for several)
        #[arg(long = "violation", required = true)]
        violations: Vec<String>,
    },
    /// List stored reports
    List,
    /// Show a report with its available status changes
    Show {
        id: String,
    },
    /// Change the status of a report
    Transition {
        id: String,
        /// Target status, e.g. "Ongoing Investigation"
        #[arg(long)]
        to: ReportStatus,
        /// Justification, required when leaving an investigation status
        #[arg(long)]
        reason: Option<String>,
        /// Role of the administrator making the change
        #[arg(long, default_value = "admin")]
        role: ActorRole,
    },
    /// Replace the violation list of a report
    Violations {
        id: String,
        /// New violation labels
        #[arg(required = true)]
        labels: Vec<String>,
    },
    /// Attach confirmation images to a resolved report
    Confirm {
        id: String,
        /// Image URL (repeat for several)
        #[arg(long = "image", required = true)]
        images: Vec<String>,
    },
    /// Allocate the next notice letter number for a plate-number report
    Notice {
        id: String,
        /// Year printed in the notice number (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,
    },
    /// Print the active transition table
    Table {
        /// Only show one report kind
        #[arg(long)]
        kind: Option<ReportKind>,
    },
}

/// Dispatch a parsed command against an already loaded configuration
pub async fn run(cli: Cli, mut config: ReportWorkflowConfig) -> Result<()> {
    if let Some(store) = cli.store {
        config.store.directory = store;
    }

    let engine = config.build_engine()?;
    let store = FileReportStore::new(&config.store.directory, engine.max_changes());
    let ctx = CommandContext {
        service: ReportWorkflowService::new(engine, store),
        json: cli.json,
    };

    match cli.command {
        Commands::Create { kind, violations } => {
            CreateCommand { kind, violations }.execute(&ctx).await
        }
        Commands::List => ListCommand.execute(&ctx).await,
        Commands::Show { id } => ShowCommand { id: id.into() }.execute(&ctx).await,
        Commands::Transition { id, to, reason, role } => {
            TransitionCommand {
                id: id.into(),
                to,
                reason,
                role,
            }
            .execute(&ctx)
            .await
        }
        Commands::Violations { id, labels } => {
            ViolationsCommand {
                id: id.into(),
                labels,
            }
            .execute(&ctx)
            .await
        }
        Commands::Confirm { id, images } => {
            ConfirmCommand {
                id: id.into(),
                images,
            }
            .execute(&ctx)
            .await
        }
        Commands::Notice { id, year } => NoticeCommand { id: id.into(), year }.execute(&ctx).await,
        Commands::Table { kind } => TableCommand { kind }.execute(&ctx),
    }
}
