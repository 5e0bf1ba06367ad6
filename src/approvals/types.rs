// Approval data model: approvers, groups, quorum rules and requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::circuit::ApprovalKind;
use crate::ids::{ApprovatorId, DocumentId, GroupId, StatusId, StepId, UserId};

/// A user materialized into the approver table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approver {
    pub id: ApprovatorId,
    pub user_id: UserId,
    pub display_name: String,
}

impl Approver {
    pub fn new(id: ApprovatorId, user_id: UserId, display_name: &str) -> Self {
        Self {
            id,
            user_id,
            display_name: display_name.to_string(),
        }
    }
}

/// How the decisions of a group's members combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Every member approves; one rejection rejects
    All,
    /// First approval approves; rejected only once every member rejected
    Any,
    /// Members approve in list order; one rejection ends the chain
    Sequential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalGroup {
    pub id: GroupId,
    pub name: String,
    pub rule_type: RuleType,
    /// Ordered; the order matters for `Sequential`
    pub members: Vec<ApprovatorId>,
}

impl ApprovalGroup {
    /// First approver listed more than once, if any
    pub fn repeated_member(&self) -> Option<ApprovatorId> {
        self.members
            .iter()
            .enumerate()
            .find(|(i, member)| self.members[..*i].contains(member))
            .map(|(_, member)| *member)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Open,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who must decide on a request. Groups are captured as they were when the request opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApprovalTarget {
    Individual { approver_id: ApprovatorId },
    Group { group: ApprovalGroup },
}

impl ApprovalTarget {
    pub fn kind(&self) -> ApprovalKind {
        match self {
            ApprovalTarget::Individual { .. } => ApprovalKind::Individual,
            ApprovalTarget::Group { .. } => ApprovalKind::Group,
        }
    }

    pub fn members(&self) -> Vec<ApprovatorId> {
        match self {
            ApprovalTarget::Individual { approver_id } => vec![*approver_id],
            ApprovalTarget::Group { group } => group.members.clone(),
        }
    }

    pub fn contains(&self, approver_id: ApprovatorId) -> bool {
        match self {
            ApprovalTarget::Individual { approver_id: only } => *only == approver_id,
            ApprovalTarget::Group { group } => group.members.contains(&approver_id),
        }
    }

    pub fn rule_type(&self) -> Option<RuleType> {
        match self {
            ApprovalTarget::Individual { .. } => None,
            ApprovalTarget::Group { group } => Some(group.rule_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalResponse {
    pub approver_id: ApprovatorId,
    pub decision: Decision,
    pub decided_at: DateTime<Utc>,
}

impl ApprovalResponse {
    pub fn now(approver_id: ApprovatorId, decision: Decision) -> Self {
        Self {
            approver_id,
            decision,
            decided_at: Utc::now(),
        }
    }
}

/// An approval request gating one move of one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: RequestId,
    pub document_id: DocumentId,
    pub step_id: StepId,
    pub from_status_id: StatusId,
    pub to_status_id: StatusId,
    pub target: ApprovalTarget,
    pub state: RequestState,
    pub responses: Vec<ApprovalResponse>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl ApprovalRequest {
    pub fn open(
        document_id: DocumentId,
        step_id: StepId,
        from_status_id: StatusId,
        to_status_id: StatusId,
        target: ApprovalTarget,
    ) -> Self {
        Self {
            id: RequestId::new(),
            document_id,
            step_id,
            from_status_id,
            to_status_id,
            target,
            state: RequestState::Open,
            responses: Vec::new(),
            opened_at: Utc::now(),
            closed_at: None,
        }
    }

    pub fn has_responded(&self, approver_id: ApprovatorId) -> bool {
        self.responses.iter().any(|r| r.approver_id == approver_id)
    }
}
