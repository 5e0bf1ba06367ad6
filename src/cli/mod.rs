use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "circuit")]
#[command(about = "Document workflow circuits: statuses, steps and approval gates")]
#[command(long_about = "Inspect and migrate document workflow circuit definitions. \
                       Start with 'circuit validate <file>' to check a definition against the authoring rules.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a circuit definition against the authoring rules
    Validate {
        /// Circuit definition file (TOML)
        file: PathBuf,
    },
    /// List the moves available from a status
    Plan {
        /// Circuit definition file (TOML)
        file: PathBuf,
        /// Status the document currently occupies
        #[arg(long, help = "Status id to plan from")]
        status: u64,
        /// Print candidates as JSON
        #[arg(long, help = "Emit machine-readable JSON on stdout")]
        json: bool,
    },
    /// Mark legacy keyword-titled statuses as flexible
    Backfill {
        /// Circuit definition file (TOML)
        file: PathBuf,
        /// Rewrite the file with the updated flags
        #[arg(long, help = "Write the migrated definition back to the file")]
        write: bool,
    },
}
