// Per-document projection of workflow progress

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::circuit::Circuit;
use crate::ids::{CircuitId, DocumentId, StatusId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentWorkflowState {
    pub document_id: DocumentId,
    pub circuit_id: CircuitId,
    pub current_status_id: StatusId,
    pub completed_status_ids: BTreeSet<StatusId>,
    /// Every status the document has occupied, including the current one
    pub visited_status_ids: BTreeSet<StatusId>,
    pub is_circuit_completed: bool,
}

impl DocumentWorkflowState {
    pub fn new(document_id: DocumentId, circuit_id: CircuitId, initial: StatusId) -> Self {
        Self {
            document_id,
            circuit_id,
            current_status_id: initial,
            completed_status_ids: BTreeSet::new(),
            visited_status_ids: BTreeSet::from([initial]),
            is_circuit_completed: false,
        }
    }

    pub fn is_complete(&self, status_id: StatusId) -> bool {
        self.completed_status_ids.contains(&status_id)
    }

    pub fn set_complete(&mut self, circuit: &Circuit, status_id: StatusId, is_complete: bool) {
        if is_complete {
            self.completed_status_ids.insert(status_id);
        } else {
            self.completed_status_ids.remove(&status_id);
        }
        self.recompute(circuit);
    }

    /// Move to `next`. The new status starts incomplete.
    pub fn advance_to(&mut self, circuit: &Circuit, next: StatusId) {
        self.current_status_id = next;
        self.visited_status_ids.insert(next);
        self.completed_status_ids.remove(&next);
        self.recompute(circuit);
    }

    /// Current status complete, and every required status occupied so far complete
    fn recompute(&mut self, circuit: &Circuit) {
        let current_done = self.is_complete(self.current_status_id);
        let required_done = self
            .visited_status_ids
            .iter()
            .filter(|id| circuit.is_required(**id))
            .all(|id| self.completed_status_ids.contains(id));
        self.is_circuit_completed = current_done && required_done;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Status;

    fn circuit() -> Circuit {
        let mut circuit = Circuit::new(1, "Policies");
        circuit.statuses.push(Status::new(10, "Draft").initial().required());
        circuit.statuses.push(Status::new(20, "Review"));
        circuit.statuses.push(Status::new(30, "Published").final_status());
        circuit
    }

    #[test]
    fn test_completion_requires_current_status() {
        let circuit = circuit();
        let mut state = DocumentWorkflowState::new(DocumentId(1), CircuitId(1), StatusId(10));
        assert!(!state.is_circuit_completed);

        state.set_complete(&circuit, StatusId(10), true);
        assert!(state.is_circuit_completed);

        state.set_complete(&circuit, StatusId(10), false);
        assert!(!state.is_circuit_completed);
    }

    #[test]
    fn test_advance_starts_new_status_incomplete() {
        let circuit = circuit();
        let mut state = DocumentWorkflowState::new(DocumentId(1), CircuitId(1), StatusId(10));
        state.set_complete(&circuit, StatusId(10), true);
        state.set_complete(&circuit, StatusId(20), true);

        state.advance_to(&circuit, StatusId(20));
        assert_eq!(state.current_status_id, StatusId(20));
        assert!(!state.is_complete(StatusId(20)));
        assert!(!state.is_circuit_completed);

        state.set_complete(&circuit, StatusId(20), true);
        assert!(state.is_circuit_completed);
    }

    #[test]
    fn test_visited_required_status_must_stay_complete() {
        let circuit = circuit();
        let mut state = DocumentWorkflowState::new(DocumentId(1), CircuitId(1), StatusId(10));
        state.set_complete(&circuit, StatusId(10), true);
        state.advance_to(&circuit, StatusId(20));
        state.set_complete(&circuit, StatusId(20), true);
        assert!(state.is_circuit_completed);

        // Draft is required and was visited; reopening it blocks the next move
        state.set_complete(&circuit, StatusId(10), false);
        assert!(!state.is_circuit_completed);
    }
}
