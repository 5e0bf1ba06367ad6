// Approval request lifecycle: open -> approved | rejected
//
// Terminal states swallow further events; callers validate a decision with
// `policy::check_decision` before feeding it to the machine.

use chrono::Utc;
use statig::prelude::*;

use crate::approvals::policy::{self, QuorumVerdict};
use crate::approvals::types::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalEvent {
    Decide(ApprovalResponse),
}

pub struct ApprovalRequestMachine {
    request: ApprovalRequest,
}

impl ApprovalRequestMachine {
    fn close(&mut self, state: RequestState) {
        self.request.state = state;
        self.request.closed_at = Some(Utc::now());
    }
}

#[state_machine(initial = "State::open()")]
impl ApprovalRequestMachine {
    #[state]
    fn open(&mut self, event: &ApprovalEvent) -> Outcome<State> {
        match event {
            ApprovalEvent::Decide(response) => {
                self.request.responses.push(response.clone());
                match policy::evaluate(&self.request.target, &self.request.responses) {
                    QuorumVerdict::Pending => {
                        tracing::debug!(
                            request_id = %self.request.id,
                            approver_id = %response.approver_id,
                            decision = ?response.decision,
                            "Decision recorded, request still open"
                        );
                        Handled
                    }
                    QuorumVerdict::Approved => {
                        self.close(RequestState::Approved);
                        tracing::info!(
                            request_id = %self.request.id,
                            document_id = %self.request.document_id,
                            "Approval request approved"
                        );
                        Transition(State::approved())
                    }
                    QuorumVerdict::Rejected => {
                        self.close(RequestState::Rejected);
                        tracing::info!(
                            request_id = %self.request.id,
                            document_id = %self.request.document_id,
                            rejected_by = %response.approver_id,
                            "Approval request rejected"
                        );
                        Transition(State::rejected())
                    }
                }
            }
        }
    }

    #[state]
    fn approved(&mut self, event: &ApprovalEvent) -> Outcome<State> {
        tracing::warn!(request_id = %self.request.id, event = ?event, "Ignoring event on approved request");
        Handled
    }

    #[state]
    fn rejected(&mut self, event: &ApprovalEvent) -> Outcome<State> {
        tracing::warn!(request_id = %self.request.id, event = ?event, "Ignoring event on rejected request");
        Handled
    }
}

/// An approval request together with the machine driving it
pub struct RequestLifecycle {
    machine: StateMachine<ApprovalRequestMachine>,
}

impl RequestLifecycle {
    pub fn new(request: ApprovalRequest) -> Self {
        Self {
            machine: ApprovalRequestMachine { request }.state_machine(),
        }
    }

    pub fn id(&self) -> RequestId {
        self.request().id
    }

    pub fn request(&self) -> &ApprovalRequest {
        &self.machine.inner().request
    }

    pub fn state(&self) -> RequestState {
        match self.machine.state() {
            State::Open { .. } => RequestState::Open,
            State::Approved { .. } => RequestState::Approved,
            State::Rejected { .. } => RequestState::Rejected,
        }
    }

    /// Apply a decision and return the resulting state
    pub fn decide(&mut self, response: ApprovalResponse) -> RequestState {
        self.machine.handle(&ApprovalEvent::Decide(response));
        self.state()
    }

    pub fn into_request(self) -> ApprovalRequest {
        self.machine.inner().request.clone()
    }
}

impl std::fmt::Debug for RequestLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLifecycle")
            .field("request", self.request())
            .field("state", &self.state())
            .finish()
    }
}
