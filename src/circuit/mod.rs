// Circuits: Status Registry, Step Table, definition files and migration helpers

pub mod backfill;
pub mod definition;
pub mod registry;
pub mod types;

pub use backfill::backfill_flexible_flags;
pub use definition::{CircuitDefinition, DefinitionError, DefinitionIssue, InstalledCircuit, StepSpec};
pub use registry::{CircuitRegistry, NewStep};
pub use types::{ApprovalKind, ApproverRef, Circuit, Status, Step};
