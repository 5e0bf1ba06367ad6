// Move Executor and Approval Gate
//
// Each document owns a slot behind its own async mutex. `attempt_move` and
// `record_decision` both run under that lock, so the "is there an open request"
// check and the mutation that follows are linearizable per document while
// different documents proceed independently. The slot map lock is never held
// while waiting on a document's mutex.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn, Instrument};

use crate::approvals::policy::{self, ApprovalPolicyResolver};
use crate::approvals::{
    ApprovalRequest, ApprovalResponse, Decision, RequestId, RequestLifecycle, RequestState,
};
use crate::circuit::{Circuit, CircuitRegistry};
use crate::external::{
    ApproverDirectory, ArchivalSystem, DocumentStore, RefreshReason, RefreshSink,
};
use crate::ids::{ApprovatorId, CircuitId, DocumentId, StatusId};
use crate::monitor::{CompletionMonitor, MonitorSettings};
use crate::telemetry::{create_workflow_span, generate_correlation_id};
use crate::workflows::document::DocumentWorkflowState;
use crate::workflows::errors::WorkflowError;
use crate::workflows::planner::{self, CandidateMove};

/// Result of a move attempt that did not fail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOutcome {
    /// The document now sits at `to`
    Completed { from: StatusId, to: StatusId },
    /// The move waits on this request. Returned again, unchanged, for repeat attempts.
    ApprovalPending(RequestId),
}

/// Result of a decision that was accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionOutcome {
    /// Recorded; the quorum rule needs more responses
    Recorded,
    /// Request closed approved and the document advanced
    Approved { from: StatusId, to: StatusId },
    /// Request closed rejected; the document stays where it was
    Rejected { status_id: StatusId },
}

/// External collaborators the engine consumes
#[derive(Clone)]
pub struct Collaborators {
    pub documents: Arc<dyn DocumentStore>,
    pub directory: Arc<dyn ApproverDirectory>,
    pub archive: Arc<dyn ArchivalSystem>,
    pub refresh: Arc<dyn RefreshSink>,
}

#[derive(Debug)]
struct DocumentSlot {
    state: DocumentWorkflowState,
    open: Option<RequestLifecycle>,
    closed: Vec<ApprovalRequest>,
}

/// Map entry for an assigned document. The circuit never changes after assignment.
struct AssignedDocument {
    circuit_id: CircuitId,
    slot: Arc<Mutex<DocumentSlot>>,
}

pub struct WorkflowEngine {
    registry: Arc<CircuitRegistry>,
    documents: Arc<dyn DocumentStore>,
    refresh: Arc<dyn RefreshSink>,
    resolver: ApprovalPolicyResolver,
    monitor: CompletionMonitor,
    slots: RwLock<HashMap<DocumentId, AssignedDocument>>,
    request_index: RwLock<HashMap<RequestId, DocumentId>>,
}

impl WorkflowEngine {
    pub fn new(
        registry: Arc<CircuitRegistry>,
        collaborators: Collaborators,
        settings: MonitorSettings,
    ) -> Self {
        let Collaborators {
            documents,
            directory,
            archive,
            refresh,
        } = collaborators;

        Self {
            registry,
            documents,
            monitor: CompletionMonitor::new(archive, Arc::clone(&refresh), settings),
            refresh,
            resolver: ApprovalPolicyResolver::new(directory),
            slots: RwLock::new(HashMap::new()),
            request_index: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<CircuitRegistry> {
        &self.registry
    }

    pub fn monitor(&self) -> &CompletionMonitor {
        &self.monitor
    }

    /// Place a document at its circuit's initial status
    pub async fn assign_document(
        &self,
        document_id: DocumentId,
    ) -> Result<DocumentWorkflowState, WorkflowError> {
        let record = self.documents.get_document(document_id).await?;
        let circuit = self.circuit(record.circuit_id)?;
        let initial = circuit
            .initial_status()
            .ok_or(WorkflowError::MissingInitialStatus {
                circuit_id: circuit.id,
            })?
            .id;

        let state = DocumentWorkflowState::new(document_id, circuit.id, initial);
        {
            let mut slots = self.slots.write().await;
            if let Some(existing) = slots.get(&document_id) {
                return Err(WorkflowError::DocumentAlreadyAssigned {
                    document_id,
                    circuit_id: existing.circuit_id,
                });
            }
            slots.insert(
                document_id,
                AssignedDocument {
                    circuit_id: circuit.id,
                    slot: Arc::new(Mutex::new(DocumentSlot {
                        state: state.clone(),
                        open: None,
                        closed: Vec::new(),
                    })),
                },
            );
        }

        info!(
            document_id = %document_id,
            circuit_id = %circuit.id,
            status_id = %initial,
            "Document assigned to circuit"
        );
        self.refresh
            .document_changed(document_id, RefreshReason::DocumentAssigned { status_id: initial });
        Ok(state)
    }

    /// Mark a status complete or incomplete for a document
    pub async fn mark_status_complete(
        &self,
        document_id: DocumentId,
        status_id: StatusId,
        is_complete: bool,
    ) -> Result<DocumentWorkflowState, WorkflowError> {
        let slot = self.slot(document_id).await?;
        let mut slot = slot.lock().await;
        let circuit = self.circuit(slot.state.circuit_id)?;
        if circuit.status(status_id).is_none() {
            return Err(WorkflowError::UnknownStatus {
                circuit_id: circuit.id,
                status_id,
            });
        }

        self.documents
            .mark_status_complete(document_id, status_id, is_complete)
            .await?;
        slot.state.set_complete(&circuit, status_id, is_complete);

        info!(
            document_id = %document_id,
            status_id = %status_id,
            is_complete = is_complete,
            circuit_completed = slot.state.is_circuit_completed,
            "Status completion updated"
        );
        self.refresh.document_changed(
            document_id,
            RefreshReason::StatusCompletionChanged {
                status_id,
                is_complete,
            },
        );
        Ok(slot.state.clone())
    }

    /// Try to move a document to `target`
    pub async fn attempt_move(
        &self,
        document_id: DocumentId,
        target: StatusId,
    ) -> Result<MoveOutcome, WorkflowError> {
        let span = create_workflow_span("attempt_move", document_id, &generate_correlation_id());
        self.attempt_move_inner(document_id, target)
            .instrument(span)
            .await
    }

    async fn attempt_move_inner(
        &self,
        document_id: DocumentId,
        target: StatusId,
    ) -> Result<MoveOutcome, WorkflowError> {
        let slot = self.slot(document_id).await?;
        let mut slot = slot.lock().await;
        let circuit = self.circuit(slot.state.circuit_id)?;
        let current = slot.state.current_status_id;

        if !slot.state.is_circuit_completed {
            warn!(status_id = %current, target = %target, "Move blocked: current status incomplete");
            return Err(WorkflowError::PrecursorIncomplete {
                document_id,
                status_id: current,
            });
        }

        if let Some(open) = &slot.open {
            info!(request_id = %open.id(), "Move already waiting on approval");
            return Ok(MoveOutcome::ApprovalPending(open.id()));
        }

        let candidate = planner::plan(&circuit, current)
            .into_iter()
            .find(|c| c.next_status_id == target)
            .ok_or(WorkflowError::InvalidTransition { current, target })?;

        if !candidate.requires_approval {
            let snapshot = self.archival_snapshot(document_id).await;
            slot.state.advance_to(&circuit, target);
            info!(from = %current, to = %target, "Move completed");
            self.refresh.document_changed(
                document_id,
                RefreshReason::StatusAdvanced {
                    from: current,
                    to: target,
                },
            );
            self.monitor.schedule(document_id, snapshot);
            return Ok(MoveOutcome::Completed {
                from: current,
                to: target,
            });
        }

        let step = candidate
            .step_id
            .and_then(|id| circuit.step(id))
            .ok_or_else(|| WorkflowError::InvalidTransition { current, target })?;
        let approval_target = self.resolver.resolve(step).await?;
        let request = ApprovalRequest::open(document_id, step.id, current, target, approval_target);
        let request_id = request.id;

        slot.open = Some(RequestLifecycle::new(request));
        self.request_index
            .write()
            .await
            .insert(request_id, document_id);

        info!(
            request_id = %request_id,
            step_id = %step.id,
            from = %current,
            to = %target,
            "Approval requested"
        );
        self.refresh
            .document_changed(document_id, RefreshReason::ApprovalRequested { request_id });
        Ok(MoveOutcome::ApprovalPending(request_id))
    }

    /// Record an approver's decision on an open request
    pub async fn record_decision(
        &self,
        request_id: RequestId,
        approver_id: ApprovatorId,
        decision: Decision,
    ) -> Result<DecisionOutcome, WorkflowError> {
        let document_id = self
            .request_index
            .read()
            .await
            .get(&request_id)
            .copied()
            .ok_or(WorkflowError::UnknownRequest { request_id })?;

        let span = create_workflow_span("record_decision", document_id, &generate_correlation_id());
        self.record_decision_inner(document_id, request_id, approver_id, decision)
            .instrument(span)
            .await
    }

    async fn record_decision_inner(
        &self,
        document_id: DocumentId,
        request_id: RequestId,
        approver_id: ApprovatorId,
        decision: Decision,
    ) -> Result<DecisionOutcome, WorkflowError> {
        let slot = self.slot(document_id).await?;
        let mut slot = slot.lock().await;

        if let Some(closed) = slot.closed.iter().find(|r| r.id == request_id) {
            if !closed.target.contains(approver_id) {
                return Err(WorkflowError::UnknownApprover {
                    request_id,
                    approver_id,
                });
            }
            return Err(WorkflowError::AlreadyDecided { request_id });
        }

        let lifecycle = slot
            .open
            .as_mut()
            .filter(|open| open.id() == request_id)
            .ok_or(WorkflowError::UnknownRequest { request_id })?;

        if let Err(e) = policy::check_decision(lifecycle.request(), approver_id) {
            warn!(request_id = %request_id, approver_id = %approver_id, error = %e, "Decision refused");
            return Err(e);
        }

        let state = lifecycle.decide(ApprovalResponse::now(approver_id, decision));
        info!(
            request_id = %request_id,
            approver_id = %approver_id,
            decision = ?decision,
            state = ?state,
            "Decision recorded"
        );

        match state {
            RequestState::Open => {
                self.refresh
                    .document_changed(document_id, RefreshReason::DecisionRecorded { request_id });
                Ok(DecisionOutcome::Recorded)
            }
            RequestState::Approved | RequestState::Rejected => {
                let request = match slot.open.take() {
                    Some(lifecycle) => lifecycle.into_request(),
                    None => return Err(WorkflowError::UnknownRequest { request_id }),
                };
                let from = request.from_status_id;
                let to = request.to_status_id;
                slot.closed.push(request);

                self.refresh.document_changed(
                    document_id,
                    RefreshReason::ApprovalClosed { request_id, state },
                );

                if state == RequestState::Rejected {
                    return Ok(DecisionOutcome::Rejected { status_id: from });
                }

                let circuit = self.circuit(slot.state.circuit_id)?;
                let snapshot = self.archival_snapshot(document_id).await;
                slot.state.advance_to(&circuit, to);
                info!(from = %from, to = %to, "Approved move committed");
                self.refresh
                    .document_changed(document_id, RefreshReason::StatusAdvanced { from, to });
                self.monitor.schedule(document_id, snapshot);
                Ok(DecisionOutcome::Approved { from, to })
            }
        }
    }

    pub async fn document_state(
        &self,
        document_id: DocumentId,
    ) -> Result<DocumentWorkflowState, WorkflowError> {
        let slot = self.slot(document_id).await?;
        let state = slot.lock().await.state.clone();
        Ok(state)
    }

    /// The open request for a document, if any
    pub async fn open_request(
        &self,
        document_id: DocumentId,
    ) -> Result<Option<ApprovalRequest>, WorkflowError> {
        let slot = self.slot(document_id).await?;
        let slot = slot.lock().await;
        Ok(slot.open.as_ref().map(|lc| lc.request().clone()))
    }

    /// Look up a request, open or closed
    pub async fn request(&self, request_id: RequestId) -> Result<ApprovalRequest, WorkflowError> {
        let document_id = self
            .request_index
            .read()
            .await
            .get(&request_id)
            .copied()
            .ok_or(WorkflowError::UnknownRequest { request_id })?;
        let slot = self.slot(document_id).await?;
        let slot = slot.lock().await;
        slot.open
            .as_ref()
            .map(|lc| lc.request())
            .filter(|r| r.id == request_id)
            .or_else(|| slot.closed.iter().find(|r| r.id == request_id))
            .cloned()
            .ok_or(WorkflowError::UnknownRequest { request_id })
    }

    /// Closed requests for a document, oldest first
    pub async fn request_history(
        &self,
        document_id: DocumentId,
    ) -> Result<Vec<ApprovalRequest>, WorkflowError> {
        let slot = self.slot(document_id).await?;
        let history = slot.lock().await.closed.clone();
        Ok(history)
    }

    pub async fn candidate_moves(
        &self,
        document_id: DocumentId,
    ) -> Result<Vec<CandidateMove>, WorkflowError> {
        let state = self.document_state(document_id).await?;
        let circuit = self.circuit(state.circuit_id)?;
        Ok(planner::plan_for(&state, &circuit))
    }

    async fn slot(&self, document_id: DocumentId) -> Result<Arc<Mutex<DocumentSlot>>, WorkflowError> {
        self.slots
            .read()
            .await
            .get(&document_id)
            .map(|assigned| Arc::clone(&assigned.slot))
            .ok_or(WorkflowError::UnknownDocument { document_id })
    }

    fn circuit(&self, circuit_id: CircuitId) -> Result<Arc<Circuit>, WorkflowError> {
        self.registry
            .snapshot(circuit_id)
            .ok_or(WorkflowError::UnknownCircuit { circuit_id })
    }

    /// Pre-move archival marker for the completion monitor. Failures fall back to `None`.
    async fn archival_snapshot(&self, document_id: DocumentId) -> Option<String> {
        match self.documents.get_document(document_id).await {
            Ok(record) => record.external_archival_marker,
            Err(e) => {
                warn!(document_id = %document_id, error = %e, "Could not snapshot archival marker");
                None
            }
        }
    }
}
