use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::circuit::backfill_flexible_flags;
use crate::cli::commands::{load_definition, Command};

pub struct BackfillCommand {
    pub file: PathBuf,
    pub keywords: Vec<String>,
    pub write: bool,
}

impl BackfillCommand {
    pub fn new(file: PathBuf, keywords: Vec<String>) -> Self {
        Self {
            file,
            keywords,
            write: false,
        }
    }

    pub fn with_write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }
}

impl Command for BackfillCommand {
    async fn execute(&self) -> Result<()> {
        let mut definition = load_definition(&self.file).await?;
        let changed = backfill_flexible_flags(&mut definition.statuses, &self.keywords)
            .context("Invalid backfill keyword list")?;

        if changed.is_empty() {
            println!("✅ No statuses need the flexible flag");
            return Ok(());
        }

        println!("🔧 {} status(es) marked flexible:", changed.len());
        for status in definition.statuses.iter().filter(|s| changed.contains(&s.id)) {
            println!("   {} {}", status.id, status.title);
        }

        if self.write {
            definition
                .save(&self.file)
                .await
                .with_context(|| format!("Could not rewrite {}", self.file.display()))?;
            println!("💾 Updated {}", self.file.display());
        } else {
            println!("💡 Re-run with --write to update the file");
        }
        Ok(())
    }
}
