// Collaborator interfaces consumed by the workflow core
//
// Document storage, the approver directory, the archival system and the
// refresh sink live outside this crate. They are injected as trait objects so
// the engine can be driven by in-memory fakes or scripted mocks in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::approvals::{ApprovalGroup, Approver, RequestId, RequestState};
use crate::ids::{ApprovatorId, CircuitId, DocumentId, StatusId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("{what} not found")]
    NotFound { what: String },
    #[error("Collaborator unavailable: {message}")]
    Unavailable { message: String },
    #[error("Collaborator rejected the request: {message}")]
    Rejected { message: String },
}

impl CollaboratorError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        CollaboratorError::NotFound {
            what: what.to_string(),
        }
    }

    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        CollaboratorError::Unavailable {
            message: message.to_string(),
        }
    }
}

/// What the document store knows about a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub circuit_id: CircuitId,
    pub external_archival_marker: Option<String>,
}

/// Document store
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_document(&self, id: DocumentId) -> Result<DocumentRecord, CollaboratorError>;

    async fn mark_status_complete(
        &self,
        document_id: DocumentId,
        status_id: StatusId,
        is_complete: bool,
    ) -> Result<(), CollaboratorError>;
}

/// Approver directory
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait ApproverDirectory: Send + Sync {
    /// Map a user to their approver identity. `NotFound` when the user was never registered.
    async fn resolve_approvator_id(&self, user_id: UserId) -> Result<ApprovatorId, CollaboratorError>;

    async fn list_approvers(&self) -> Result<Vec<Approver>, CollaboratorError>;

    async fn list_approval_groups(&self) -> Result<Vec<ApprovalGroup>, CollaboratorError>;
}

/// External archival system, polled by the completion monitor
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait ArchivalSystem: Send + Sync {
    async fn get_archival_marker(
        &self,
        document_id: DocumentId,
    ) -> Result<Option<String>, CollaboratorError>;
}

/// Why a document's visible state changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RefreshReason {
    DocumentAssigned { status_id: StatusId },
    StatusCompletionChanged { status_id: StatusId, is_complete: bool },
    StatusAdvanced { from: StatusId, to: StatusId },
    ApprovalRequested { request_id: RequestId },
    DecisionRecorded { request_id: RequestId },
    ApprovalClosed { request_id: RequestId, state: RequestState },
    ExternalChange { marker: Option<String> },
    MonitorTimedOut { attempts: u32 },
}

/// Notification sink invoked whenever document-visible state changes
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait RefreshSink: Send + Sync {
    fn document_changed(&self, document_id: DocumentId, reason: RefreshReason);
}
