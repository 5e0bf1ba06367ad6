use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use crate::cli::commands::{load_definition, Command};
use crate::ids::StatusId;
use crate::workflows::planner;

pub struct PlanCommand {
    pub file: PathBuf,
    pub status: StatusId,
    pub json: bool,
}

impl PlanCommand {
    pub fn new(file: PathBuf, status: StatusId) -> Self {
        Self {
            file,
            status,
            json: false,
        }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

impl Command for PlanCommand {
    async fn execute(&self) -> Result<()> {
        let definition = load_definition(&self.file).await?;
        let installed = definition.install().await;
        for issue in &installed.issues {
            tracing::warn!(context = %issue.context, error = %issue.error, "Skipped invalid definition entry");
        }

        let circuit = installed
            .circuit()
            .context("Circuit could not be created from the definition")?;
        let Some(status) = circuit.status(self.status) else {
            bail!("Status {} is not part of circuit {}", self.status, circuit.id);
        };

        let candidates = planner::plan(&circuit, self.status);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&candidates)?);
            return Ok(());
        }

        let flexible = if status.is_flexible { " (flexible)" } else { "" };
        println!("📍 From {} {}{}", status.id, status.title, flexible);
        if candidates.is_empty() {
            println!("   🏁 No further moves");
            return Ok(());
        }
        for candidate in &candidates {
            let gate = if candidate.requires_approval {
                "🔒 approval required"
            } else {
                "➡️  direct"
            };
            println!(
                "   {} {}  {}",
                candidate.next_status_id, candidate.title, gate
            );
        }
        Ok(())
    }
}
