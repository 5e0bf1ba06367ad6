use thiserror::Error;

use crate::external::CollaboratorError;
use crate::ids::{ApprovatorId, CircuitId, GroupId, StatusId, StepId, UserId};

/// Errors surfaced to workflow authors. Never coerced into a "closest valid" configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthoringError {
    #[error("Circuit {circuit_id} already has a step {current} -> {next} (step {existing})")]
    DuplicateTransition {
        circuit_id: CircuitId,
        current: StatusId,
        next: StatusId,
        existing: StepId,
    },
    #[error("Invalid approval configuration: {reason}")]
    InvalidApprovalConfig { reason: String },
    #[error("User {user_id} is not registered as an approver")]
    ApproverNotRegistered { user_id: UserId },
    #[error("Unknown circuit {circuit_id}")]
    UnknownCircuit { circuit_id: CircuitId },
    #[error("Circuit {circuit_id} already exists")]
    DuplicateCircuit { circuit_id: CircuitId },
    #[error("Status {status_id} does not belong to circuit {circuit_id}")]
    UnknownStatus {
        circuit_id: CircuitId,
        status_id: StatusId,
    },
    #[error("Status {status_id} already exists in circuit {circuit_id}")]
    DuplicateStatus {
        circuit_id: CircuitId,
        status_id: StatusId,
    },
    #[error("Circuit {circuit_id} already has initial status {existing}")]
    MultipleInitialStatuses {
        circuit_id: CircuitId,
        existing: StatusId,
    },
    #[error("A step cannot lead from status {status_id} back to itself")]
    SelfTransition { status_id: StatusId },
    #[error("Approver directory error: {0}")]
    Collaborator(#[from] CollaboratorError),
}

impl AuthoringError {
    pub(crate) fn missing_approver(id: ApprovatorId) -> Self {
        AuthoringError::InvalidApprovalConfig {
            reason: format!("approver {id} does not exist in the approver table"),
        }
    }

    pub(crate) fn missing_group(id: GroupId) -> Self {
        AuthoringError::InvalidApprovalConfig {
            reason: format!("approval group {id} does not exist"),
        }
    }
}
