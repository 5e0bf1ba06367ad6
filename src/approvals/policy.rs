// Approval Policy Resolver and quorum evaluation
//
// Resolution turns a step's approver reference into a concrete target at move
// time. Evaluation is pure: given a target and the responses so far it says
// whether the request is still open or has reached a terminal outcome.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::approvals::types::*;
use crate::circuit::{ApproverRef, Step};
use crate::external::ApproverDirectory;
use crate::ids::ApprovatorId;
use crate::workflows::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuorumVerdict {
    Pending,
    Approved,
    Rejected,
}

/// Combine the responses received so far according to the target's rule
pub fn evaluate(target: &ApprovalTarget, responses: &[ApprovalResponse]) -> QuorumVerdict {
    let decision_of = |member: &ApprovatorId| {
        responses
            .iter()
            .find(|r| r.approver_id == *member)
            .map(|r| r.decision)
    };

    match target {
        ApprovalTarget::Individual { approver_id } => match decision_of(approver_id) {
            Some(Decision::Approve) => QuorumVerdict::Approved,
            Some(Decision::Reject) => QuorumVerdict::Rejected,
            None => QuorumVerdict::Pending,
        },
        ApprovalTarget::Group { group } => {
            let decisions: Vec<Option<Decision>> = group.members.iter().map(decision_of).collect();
            match group.rule_type {
                RuleType::All => {
                    if decisions.contains(&Some(Decision::Reject)) {
                        QuorumVerdict::Rejected
                    } else if decisions.iter().all(|d| *d == Some(Decision::Approve)) {
                        QuorumVerdict::Approved
                    } else {
                        QuorumVerdict::Pending
                    }
                }
                RuleType::Any => {
                    if decisions.contains(&Some(Decision::Approve)) {
                        QuorumVerdict::Approved
                    } else if decisions.iter().all(|d| *d == Some(Decision::Reject)) {
                        QuorumVerdict::Rejected
                    } else {
                        QuorumVerdict::Pending
                    }
                }
                RuleType::Sequential => {
                    for decision in &decisions {
                        match decision {
                            Some(Decision::Approve) => continue,
                            Some(Decision::Reject) => return QuorumVerdict::Rejected,
                            None => return QuorumVerdict::Pending,
                        }
                    }
                    QuorumVerdict::Approved
                }
            }
        }
    }
}

/// Check that `approver_id` may decide on `request` right now
///
/// Does not look at the request state; closed requests are rejected by the gate
/// before this is consulted.
pub fn check_decision(request: &ApprovalRequest, approver_id: ApprovatorId) -> Result<(), WorkflowError> {
    if !request.target.contains(approver_id) {
        return Err(WorkflowError::UnknownApprover {
            request_id: request.id,
            approver_id,
        });
    }
    if request.has_responded(approver_id) {
        return Err(WorkflowError::AlreadyDecided {
            request_id: request.id,
        });
    }
    if let ApprovalTarget::Group { group } = &request.target {
        if group.rule_type == RuleType::Sequential {
            let expected = group
                .members
                .iter()
                .copied()
                .find(|member| !request.has_responded(*member));
            if expected != Some(approver_id) {
                return Err(WorkflowError::NotYourTurn {
                    request_id: request.id,
                    approver_id,
                    expected,
                });
            }
        }
    }
    Ok(())
}

/// Resolves a gated step to the approver or group that must decide
#[derive(Clone)]
pub struct ApprovalPolicyResolver {
    directory: Arc<dyn ApproverDirectory>,
}

impl ApprovalPolicyResolver {
    pub fn new(directory: Arc<dyn ApproverDirectory>) -> Self {
        Self { directory }
    }

    pub async fn resolve(&self, step: &Step) -> Result<ApprovalTarget, WorkflowError> {
        let approver_ref = step.approver_ref.ok_or_else(|| {
            warn!(step_id = %step.id, "Gated step has no approver");
            WorkflowError::InvalidApprovalConfig {
                step_id: step.id,
                reason: "step requires approval but names no approver".to_string(),
            }
        })?;

        let target = match approver_ref {
            ApproverRef::Approver(approver_id) => {
                let approvers = self.directory.list_approvers().await?;
                if !approvers.iter().any(|a| a.id == approver_id) {
                    return Err(WorkflowError::InvalidApprovalConfig {
                        step_id: step.id,
                        reason: format!("approver {approver_id} is no longer registered"),
                    });
                }
                ApprovalTarget::Individual { approver_id }
            }
            ApproverRef::Group(group_id) => {
                let group = self
                    .directory
                    .list_approval_groups()
                    .await?
                    .into_iter()
                    .find(|g| g.id == group_id)
                    .ok_or_else(|| WorkflowError::InvalidApprovalConfig {
                        step_id: step.id,
                        reason: format!("approval group {group_id} no longer exists"),
                    })?;
                if group.members.is_empty() {
                    return Err(WorkflowError::InvalidApprovalConfig {
                        step_id: step.id,
                        reason: format!("approval group {group_id} has no members"),
                    });
                }
                if let Some(member) = group.repeated_member() {
                    return Err(WorkflowError::InvalidApprovalConfig {
                        step_id: step.id,
                        reason: format!("approval group {group_id} lists approver {member} twice"),
                    });
                }
                ApprovalTarget::Group { group }
            }
        };

        debug!(step_id = %step.id, kind = ?target.kind(), "Approval target resolved");
        Ok(target)
    }
}
