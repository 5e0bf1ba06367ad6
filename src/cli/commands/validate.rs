use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::cli::commands::{load_definition, Command};

pub struct ValidateCommand {
    pub file: PathBuf,
}

impl ValidateCommand {
    pub fn new(file: PathBuf) -> Self {
        Self { file }
    }
}

impl Command for ValidateCommand {
    async fn execute(&self) -> Result<()> {
        let definition = load_definition(&self.file).await?;
        let installed = definition.install().await;

        println!(
            "🔍 Circuit {} ({}): {} statuses, {} steps",
            definition.circuit.id,
            definition.circuit.name,
            definition.statuses.len(),
            definition.steps.len()
        );

        let has_initial = installed
            .circuit()
            .is_some_and(|c| c.initial_status().is_some());
        if !has_initial {
            println!("   ⚠️  No initial status; documents cannot be assigned to this circuit");
        }

        if installed.is_clean() {
            println!("✅ Definition is valid");
            return Ok(());
        }

        println!("❌ {} issue(s):", installed.issues.len());
        for issue in &installed.issues {
            println!("   • {}: {}", issue.context, issue.error);
        }
        bail!("{} has {} authoring issue(s)", self.file.display(), installed.issues.len())
    }
}
