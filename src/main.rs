use anyhow::Result;
use clap::Parser;

use report_workflow::cli::{run, Cli};
use report_workflow::{init_telemetry, ReportWorkflowConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();

    ReportWorkflowConfig::load_env_file()?;
    let config = ReportWorkflowConfig::load(cli.config.as_deref())?;
    init_telemetry(&config.observability)?;

    tokio::runtime::Runtime::new()?.block_on(run(cli, config))
}
