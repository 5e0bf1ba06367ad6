// Status Registry and Step Table storage
//
// Circuits are read-mostly. Readers take an `Arc<Circuit>` snapshot; writers
// swap in a modified copy while holding the write lock, so a duplicate check
// and the matching insert happen atomically.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use crate::authoring::AuthoringError;
use crate::circuit::types::{ApproverRef, Circuit, Status, Step};
use crate::ids::{CircuitId, StatusId, StepId};

/// A step that passed approval validation and is ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStep {
    pub circuit_id: CircuitId,
    pub current_status_id: StatusId,
    pub next_status_id: StatusId,
    pub requires_approval: bool,
    pub approver_ref: Option<ApproverRef>,
}

#[derive(Debug)]
pub struct CircuitRegistry {
    circuits: RwLock<HashMap<CircuitId, Arc<Circuit>>>,
    next_step_id: AtomicU64,
}

impl Default for CircuitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitRegistry {
    pub fn new() -> Self {
        Self {
            circuits: RwLock::new(HashMap::new()),
            next_step_id: AtomicU64::new(1),
        }
    }

    pub fn create_circuit(&self, id: CircuitId, name: &str) -> Result<(), AuthoringError> {
        let mut circuits = self.circuits.write().unwrap_or_else(PoisonError::into_inner);
        if circuits.contains_key(&id) {
            return Err(AuthoringError::DuplicateCircuit { circuit_id: id });
        }
        circuits.insert(id, Arc::new(Circuit::new(id, name)));
        info!(circuit_id = %id, name = %name, "Circuit created");
        Ok(())
    }

    /// Read-only snapshot of a circuit
    pub fn snapshot(&self, id: CircuitId) -> Option<Arc<Circuit>> {
        self.circuits
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn add_status(&self, circuit_id: CircuitId, status: Status) -> Result<(), AuthoringError> {
        let mut circuits = self.circuits.write().unwrap_or_else(PoisonError::into_inner);
        let circuit = circuits
            .get_mut(&circuit_id)
            .ok_or(AuthoringError::UnknownCircuit { circuit_id })?;

        if circuit.status(status.id).is_some() {
            return Err(AuthoringError::DuplicateStatus {
                circuit_id,
                status_id: status.id,
            });
        }
        if status.is_initial {
            if let Some(existing) = circuit.initial_status() {
                return Err(AuthoringError::MultipleInitialStatuses {
                    circuit_id,
                    existing: existing.id,
                });
            }
        }

        debug!(
            circuit_id = %circuit_id,
            status_id = %status.id,
            title = %status.title,
            flexible = status.is_flexible,
            "Status added"
        );
        Arc::make_mut(circuit).statuses.push(status);
        Ok(())
    }

    /// Insert a step, re-checking the `(circuit, current, next)` triple under the write lock
    ///
    /// Only the authoring commit path writes steps.
    pub(crate) fn insert_step(&self, new_step: NewStep) -> Result<Step, AuthoringError> {
        let NewStep {
            circuit_id,
            current_status_id,
            next_status_id,
            requires_approval,
            approver_ref,
        } = new_step;

        let mut circuits = self.circuits.write().unwrap_or_else(PoisonError::into_inner);
        let circuit = circuits
            .get_mut(&circuit_id)
            .ok_or(AuthoringError::UnknownCircuit { circuit_id })?;

        check_endpoints(circuit, current_status_id, next_status_id)?;
        check_approval(requires_approval, approver_ref.as_ref())?;

        if let Some(existing) = circuit.find_step(current_status_id, next_status_id) {
            return Err(AuthoringError::DuplicateTransition {
                circuit_id,
                current: current_status_id,
                next: next_status_id,
                existing: existing.id,
            });
        }

        let step = Step {
            id: StepId(self.next_step_id.fetch_add(1, Ordering::SeqCst)),
            circuit_id,
            current_status_id,
            next_status_id,
            requires_approval,
            approver_ref,
        };
        Arc::make_mut(circuit).steps.push(step.clone());

        info!(
            circuit_id = %circuit_id,
            step_id = %step.id,
            current = %current_status_id,
            next = %next_status_id,
            requires_approval = requires_approval,
            "Step committed"
        );
        Ok(step)
    }
}

/// Both ends of an edge must exist in the circuit and differ
pub(crate) fn check_endpoints(
    circuit: &Circuit,
    current: StatusId,
    next: StatusId,
) -> Result<(), AuthoringError> {
    for status_id in [current, next] {
        if circuit.status(status_id).is_none() {
            return Err(AuthoringError::UnknownStatus {
                circuit_id: circuit.id,
                status_id,
            });
        }
    }
    if current == next {
        return Err(AuthoringError::SelfTransition { status_id: current });
    }
    Ok(())
}

/// A gated step names exactly one approver or group; an ungated step names none
fn check_approval(
    requires_approval: bool,
    approver_ref: Option<&ApproverRef>,
) -> Result<(), AuthoringError> {
    match (requires_approval, approver_ref) {
        (true, None) => Err(AuthoringError::InvalidApprovalConfig {
            reason: "step requires approval but names no approver".to_string(),
        }),
        (false, Some(_)) => Err(AuthoringError::InvalidApprovalConfig {
            reason: "an approver is set on a step that does not require approval".to_string(),
        }),
        _ => Ok(()),
    }
}
