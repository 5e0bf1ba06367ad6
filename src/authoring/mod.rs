// Workflow authoring: step validation and the authoritative commit path

pub mod errors;
pub mod validator;

pub use errors::AuthoringError;
pub use validator::{ApprovalConfig, ApprovalSelection, AuthoringValidator, StepDraft};
