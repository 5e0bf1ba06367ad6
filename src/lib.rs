// Document workflow circuits
// Status registry, step table, approval gating and completion monitoring for
// documents moving through authored workflows.

pub mod approvals;
pub mod authoring;
pub mod circuit;
pub mod cli;
pub mod config;
pub mod external;
pub mod ids;
pub mod monitor;
pub mod telemetry;
pub mod workflows;

// Re-export key types for easy access
pub use approvals::{
    ApprovalGroup, ApprovalPolicyResolver, ApprovalRequest, ApprovalTarget, Approver, Decision,
    RequestId, RequestState, RuleType,
};
pub use authoring::{
    ApprovalConfig, ApprovalSelection, AuthoringError, AuthoringValidator, StepDraft,
};
pub use circuit::{
    backfill_flexible_flags, Circuit, CircuitDefinition, CircuitRegistry, NewStep, Status, Step,
};
pub use config::{config, CircuitConfig};
pub use external::{
    ApproverDirectory, ArchivalSystem, CollaboratorError, DocumentStore, RefreshReason,
    RefreshSink,
};
pub use ids::{ApprovatorId, CircuitId, DocumentId, GroupId, StatusId, StepId, UserId};
pub use monitor::{CompletionMonitor, MonitorSettings};
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry, shutdown_telemetry};
pub use workflows::{
    CandidateMove, Collaborators, DecisionOutcome, DocumentWorkflowState, MoveOutcome,
    WorkflowEngine, WorkflowError,
};
