use anyhow::{Context, Result};
use std::path::Path;

use crate::circuit::CircuitDefinition;

pub mod backfill;
pub mod plan;
pub mod validate;

pub use backfill::BackfillCommand;
pub use plan::PlanCommand;
pub use validate::ValidateCommand;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

pub(crate) async fn load_definition(path: &Path) -> Result<CircuitDefinition> {
    CircuitDefinition::load(path)
        .await
        .with_context(|| format!("Could not load circuit definition {}", path.display()))
}

/// Printed when `circuit` runs without a subcommand
pub fn show_usage_guidance() {
    println!("🔀 CIRCUIT - Document workflow definitions");
    println!("==========================================");
    println!();
    println!("▶️  circuit validate <file>             check a definition");
    println!("▶️  circuit plan <file> --status <id>   list moves from a status");
    println!("▶️  circuit backfill <file> [--write]   migrate keyword-titled flexible statuses");
    println!();
    println!("💡 Run 'circuit --help' for all options");
}
