// Document workflow: per-document state, move planning and execution

pub mod document;
pub mod engine;
pub mod errors;
pub mod planner;

pub use document::DocumentWorkflowState;
pub use engine::{Collaborators, DecisionOutcome, MoveOutcome, WorkflowEngine};
pub use errors::WorkflowError;
pub use planner::{plan, CandidateMove};
