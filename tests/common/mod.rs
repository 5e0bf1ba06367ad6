// Shared fixtures for workflow integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use doc_circuit::approvals::{ApprovalGroup, Approver, RuleType};
use doc_circuit::authoring::{ApprovalConfig, ApprovalSelection, AuthoringValidator, StepDraft};
use doc_circuit::circuit::{CircuitRegistry, Status};
use doc_circuit::external::{
    InMemoryApproverDirectory, InMemoryArchive, InMemoryDocumentStore, RecordingRefreshSink,
};
use doc_circuit::ids::{ApprovatorId, CircuitId, DocumentId, GroupId, StatusId, UserId};
use doc_circuit::monitor::MonitorSettings;
use doc_circuit::workflows::{Collaborators, MoveOutcome, WorkflowEngine};
use doc_circuit::RequestId;

pub const DRAFT: StatusId = StatusId(1);
pub const REVIEW: StatusId = StatusId(2);
pub const APPROVED: StatusId = StatusId(3);

pub struct Harness {
    pub engine: Arc<WorkflowEngine>,
    pub registry: Arc<CircuitRegistry>,
    pub directory: Arc<InMemoryApproverDirectory>,
    pub store: Arc<InMemoryDocumentStore>,
    pub archive: Arc<InMemoryArchive>,
    pub sink: Arc<RecordingRefreshSink>,
}

/// Approvers 1..=5 map to users 101..=105
pub fn directory() -> Arc<InMemoryApproverDirectory> {
    let approvers = (1..=5)
        .map(|n| Approver::new(ApprovatorId(n), UserId(100 + n), &format!("Approver {n}")))
        .collect();
    Arc::new(InMemoryApproverDirectory::new(approvers, Vec::new()))
}

pub fn group(id: u64, rule_type: RuleType, members: &[u64]) -> ApprovalGroup {
    ApprovalGroup {
        id: GroupId(id),
        name: format!("Group {id}"),
        rule_type,
        members: members.iter().copied().map(ApprovatorId).collect(),
    }
}

pub fn harness(registry: Arc<CircuitRegistry>, directory: Arc<InMemoryApproverDirectory>) -> Harness {
    let store = Arc::new(InMemoryDocumentStore::new());
    let archive = Arc::new(InMemoryArchive::new());
    let sink = Arc::new(RecordingRefreshSink::new());
    let engine = Arc::new(WorkflowEngine::new(
        registry.clone(),
        Collaborators {
            documents: store.clone(),
            directory: directory.clone(),
            archive: archive.clone(),
            refresh: sink.clone(),
        },
        MonitorSettings {
            poll_interval: Duration::from_millis(50),
            max_attempts: 4,
        },
    ));
    Harness {
        engine,
        registry,
        directory,
        store,
        archive,
        sink,
    }
}

/// Draft -> Review -> Approved, with Review -> Approved gated by `gate`
pub async fn review_circuit(
    circuit_id: u64,
    directory: Arc<InMemoryApproverDirectory>,
    gate: ApprovalSelection,
) -> Arc<CircuitRegistry> {
    let registry = Arc::new(CircuitRegistry::new());
    let id = CircuitId(circuit_id);
    registry.create_circuit(id, "Review circuit").unwrap();
    registry.add_status(id, Status::new(DRAFT, "Draft").initial()).unwrap();
    registry.add_status(id, Status::new(REVIEW, "Review")).unwrap();
    registry
        .add_status(id, Status::new(APPROVED, "Approved").final_status())
        .unwrap();

    let validator = AuthoringValidator::new(registry.clone(), directory);
    validator
        .commit_step(&StepDraft::new(id, DRAFT, REVIEW, ApprovalConfig::none()))
        .await
        .unwrap();
    validator
        .commit_step(&StepDraft::new(id, REVIEW, APPROVED, ApprovalConfig::gated(gate)))
        .await
        .unwrap();
    registry
}

impl Harness {
    /// Assign a document and walk it to Review with Review marked complete
    pub async fn document_at_review(&self, document: u64, circuit_id: u64) -> DocumentId {
        let id = DocumentId(document);
        self.store.insert(id, CircuitId(circuit_id));
        self.engine.assign_document(id).await.unwrap();
        self.engine.mark_status_complete(id, DRAFT, true).await.unwrap();
        self.engine.attempt_move(id, REVIEW).await.unwrap();
        self.engine.mark_status_complete(id, REVIEW, true).await.unwrap();
        id
    }

    pub async fn request_approval(&self, document: DocumentId) -> RequestId {
        match self.engine.attempt_move(document, APPROVED).await.unwrap() {
            MoveOutcome::ApprovalPending(id) => id,
            other => panic!("expected pending approval, got {other:?}"),
        }
    }
}
