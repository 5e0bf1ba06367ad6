use thiserror::Error;

use crate::approvals::RequestId;
use crate::external::CollaboratorError;
use crate::ids::{ApprovatorId, CircuitId, DocumentId, StatusId, StepId};

/// Errors returned by move and decision operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Document {document_id} cannot move: status {status_id} is not complete")]
    PrecursorIncomplete {
        document_id: DocumentId,
        status_id: StatusId,
    },
    #[error("Status {target} is not reachable from status {current}")]
    InvalidTransition { current: StatusId, target: StatusId },
    #[error("Approver {approver_id} is not part of request {request_id}")]
    UnknownApprover {
        request_id: RequestId,
        approver_id: ApprovatorId,
    },
    #[error("Approver {approver_id} must wait for an earlier approver on request {request_id}")]
    NotYourTurn {
        request_id: RequestId,
        approver_id: ApprovatorId,
        expected: Option<ApprovatorId>,
    },
    #[error("Request {request_id} no longer accepts this decision")]
    AlreadyDecided { request_id: RequestId },
    #[error("Step {step_id} has an invalid approval configuration: {reason}")]
    InvalidApprovalConfig { step_id: StepId, reason: String },
    #[error("Document {document_id} is not assigned to a circuit")]
    UnknownDocument { document_id: DocumentId },
    #[error("Document {document_id} is already assigned to circuit {circuit_id}")]
    DocumentAlreadyAssigned {
        document_id: DocumentId,
        circuit_id: CircuitId,
    },
    #[error("Unknown approval request {request_id}")]
    UnknownRequest { request_id: RequestId },
    #[error("Unknown circuit {circuit_id}")]
    UnknownCircuit { circuit_id: CircuitId },
    #[error("Status {status_id} does not belong to circuit {circuit_id}")]
    UnknownStatus {
        circuit_id: CircuitId,
        status_id: StatusId,
    },
    #[error("Circuit {circuit_id} has no initial status")]
    MissingInitialStatus { circuit_id: CircuitId },
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),
}

impl WorkflowError {
    /// Caller can retry after completing the status or waiting for a decision
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WorkflowError::PrecursorIncomplete { .. } | WorkflowError::Collaborator(_)
        )
    }
}
