use anyhow::Result;
use clap::Parser;

use doc_circuit::cli::commands::{
    show_usage_guidance, BackfillCommand, Command, PlanCommand, ValidateCommand,
};
use doc_circuit::cli::{Cli, Commands};
use doc_circuit::config::{config, CircuitConfig};
use doc_circuit::ids::StatusId;
use doc_circuit::telemetry::{init_telemetry, shutdown_telemetry};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match config() {
        Ok(settings) => settings.clone(),
        Err(e) => {
            eprintln!("⚠️  {e}; using defaults");
            CircuitConfig::default()
        }
    };
    init_telemetry(
        settings.observability.json_logs,
        &settings.observability.log_level,
    )?;

    let result = match cli.command {
        // No subcommand: explain what the tool can do
        None => {
            show_usage_guidance();
            Ok(())
        }
        Some(Commands::Validate { file }) => tokio::runtime::Runtime::new()?
            .block_on(async { ValidateCommand::new(file).execute().await }),
        Some(Commands::Plan { file, status, json }) => {
            tokio::runtime::Runtime::new()?.block_on(async {
                PlanCommand::new(file, StatusId(status))
                    .with_json(json)
                    .execute()
                    .await
            })
        }
        Some(Commands::Backfill { file, write }) => {
            tokio::runtime::Runtime::new()?.block_on(async {
                BackfillCommand::new(file, settings.definitions.backfill_flexible_keywords.clone())
                    .with_write(write)
                    .execute()
                    .await
            })
        }
    };

    shutdown_telemetry();
    result
}
