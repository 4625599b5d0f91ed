use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::workflow::{
    PlateVariant, ReportWorkflowEngine, TransitionTable, DEFAULT_MAX_STATUS_CHANGES,
};

/// Main configuration structure for the report workflow
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportWorkflowConfig {
    /// Status lifecycle settings
    pub workflow: WorkflowSettings,
    /// Record storage settings
    pub store: StoreConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowSettings {
    /// Total status changes a report may go through
    pub max_status_changes: u32,
    /// Plate-number flow used with the built-in tables
    pub plate_variant: PlateVariant,
    /// Replace the built-in tables with this TOML file
    pub tables_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Directory holding one JSON file per report
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level when RUST_LOG is unset
    pub log_level: String,
    /// Emit JSON log lines
    pub json: bool,
}

impl Default for ReportWorkflowConfig {
    fn default() -> Self {
        Self {
            workflow: WorkflowSettings {
                max_status_changes: DEFAULT_MAX_STATUS_CHANGES,
                plate_variant: PlateVariant::Investigation,
                tables_path: None,
            },
            store: StoreConfig {
                directory: PathBuf::from(".report-workflow/reports"),
            },
            observability: ObservabilityConfig {
                log_level: "warn".to_string(),
                json: false,
            },
        }
    }
}

impl ReportWorkflowConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. `report-workflow.toml` in the working directory, or `explicit`
    /// 3. Environment variables (prefixed with REPORT_WORKFLOW__)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&ReportWorkflowConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);

        match explicit {
            Some(path) => {
                builder = builder.add_source(File::from(path));
            }
            None if Path::new("report-workflow.toml").exists() => {
                builder = builder.add_source(File::with_name("report-workflow"));
            }
            None => {}
        }

        builder = builder.add_source(
            Environment::with_prefix("REPORT_WORKFLOW")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: ReportWorkflowConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    /// Build the engine this configuration describes
    pub fn build_engine(&self) -> Result<ReportWorkflowEngine> {
        let table = match &self.workflow.tables_path {
            Some(path) => TransitionTable::from_path(path)?,
            None => TransitionTable::builtin(self.workflow.plate_variant)?,
        };
        Ok(ReportWorkflowEngine::new(table, self.workflow.max_status_changes))
    }
}
