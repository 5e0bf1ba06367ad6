// Transition Planner
//
// Computes the legal next statuses for a document. Flexible statuses may move
// to any other status in the circuit; everything else follows the step table.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::circuit::Circuit;
use crate::ids::{StatusId, StepId};
use crate::workflows::document::DocumentWorkflowState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateMove {
    pub next_status_id: StatusId,
    pub title: String,
    pub requires_approval: bool,
    /// Step backing the move. `None` for flexible moves with no matching step.
    pub step_id: Option<StepId>,
}

/// Candidate moves from `current`, in circuit order
///
/// An empty result is a normal terminal-style state, not an error.
pub fn plan(circuit: &Circuit, current: StatusId) -> Vec<CandidateMove> {
    let Some(status) = circuit.status(current) else {
        tracing::warn!(
            circuit_id = %circuit.id,
            status_id = %current,
            "Planning from a status outside the circuit"
        );
        return Vec::new();
    };

    let title_of = |id: StatusId| {
        circuit
            .status(id)
            .map(|s| s.title.clone())
            .unwrap_or_default()
    };

    if status.is_flexible {
        return circuit
            .statuses
            .iter()
            .filter(|s| s.id != current)
            .map(|s| {
                let step = circuit.find_step(current, s.id);
                CandidateMove {
                    next_status_id: s.id,
                    title: s.title.clone(),
                    requires_approval: step.map(|st| st.requires_approval).unwrap_or(false),
                    step_id: step.map(|st| st.id),
                }
            })
            .collect();
    }

    let mut seen = HashSet::new();
    circuit
        .steps_from(current)
        .filter(|step| seen.insert(step.next_status_id))
        .map(|step| CandidateMove {
            next_status_id: step.next_status_id,
            title: title_of(step.next_status_id),
            requires_approval: step.requires_approval,
            step_id: Some(step.id),
        })
        .collect()
}

pub fn plan_for(state: &DocumentWorkflowState, circuit: &Circuit) -> Vec<CandidateMove> {
    plan(circuit, state.current_status_id)
}
