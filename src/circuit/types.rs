// Core types for circuits: statuses, steps and the circuit aggregate

use serde::{Deserialize, Serialize};

use crate::ids::{ApprovatorId, CircuitId, GroupId, StatusId, StepId};

/// A named state a document can occupy within a circuit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: StatusId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Documents assigned to the circuit start here. At most one per circuit.
    #[serde(default)]
    pub is_initial: bool,
    #[serde(default)]
    pub is_final: bool,
    /// Must be marked complete before the document may leave the circuit's path
    #[serde(default)]
    pub is_required: bool,
    /// Any other status in the circuit is a legal next move from here
    #[serde(default)]
    pub is_flexible: bool,
}

impl Status {
    pub fn new(id: impl Into<StatusId>, title: &str) -> Self {
        Self {
            id: id.into(),
            title: title.to_string(),
            description: String::new(),
            is_initial: false,
            is_final: false,
            is_required: false,
            is_flexible: false,
        }
    }

    pub fn initial(mut self) -> Self {
        self.is_initial = true;
        self
    }

    pub fn final_status(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn flexible(mut self) -> Self {
        self.is_flexible = true;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

/// How a step's approval requirement is fulfilled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalKind {
    #[default]
    None,
    Individual,
    Group,
}

/// The approver a gated step points at, already resolved to approver-table identities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ApproverRef {
    Approver(ApprovatorId),
    Group(GroupId),
}

/// A directed transition `current_status_id -> next_status_id` within a circuit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub circuit_id: CircuitId,
    pub current_status_id: StatusId,
    pub next_status_id: StatusId,
    pub requires_approval: bool,
    pub approver_ref: Option<ApproverRef>,
}

impl Step {
    pub fn approval_kind(&self) -> ApprovalKind {
        if !self.requires_approval {
            return ApprovalKind::None;
        }
        match self.approver_ref {
            Some(ApproverRef::Approver(_)) => ApprovalKind::Individual,
            Some(ApproverRef::Group(_)) => ApprovalKind::Group,
            None => ApprovalKind::None,
        }
    }

    pub fn connects(&self, current: StatusId, next: StatusId) -> bool {
        self.current_status_id == current && self.next_status_id == next
    }
}

/// A named workflow definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circuit {
    pub id: CircuitId,
    pub name: String,
    pub statuses: Vec<Status>,
    pub steps: Vec<Step>,
}

impl Circuit {
    pub fn new(id: impl Into<CircuitId>, name: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            statuses: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn status(&self, id: StatusId) -> Option<&Status> {
        self.statuses.iter().find(|s| s.id == id)
    }

    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn initial_status(&self) -> Option<&Status> {
        self.statuses.iter().find(|s| s.is_initial)
    }

    /// Steps leaving `current`, in authoring order
    pub fn steps_from(&self, current: StatusId) -> impl Iterator<Item = &Step> {
        self.steps
            .iter()
            .filter(move |s| s.current_status_id == current)
    }

    /// First step defining the edge `current -> next`, if any
    pub fn find_step(&self, current: StatusId, next: StatusId) -> Option<&Step> {
        self.steps.iter().find(|s| s.connects(current, next))
    }

    pub fn is_required(&self, id: StatusId) -> bool {
        self.status(id).map(|s| s.is_required).unwrap_or(false)
    }
}
