// Workflow Authoring Validator
//
// `validate_new_step` is the interactive, advisory check. `commit_step` runs the
// same validation and then inserts through the registry, which re-checks the
// duplicate triple under its write lock.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::authoring::errors::AuthoringError;
use crate::circuit::registry::{check_endpoints, NewStep};
use crate::circuit::{ApproverRef, CircuitRegistry, Step};
use crate::external::{ApproverDirectory, CollaboratorError};
use crate::ids::{ApprovatorId, CircuitId, GroupId, StatusId, UserId};

/// Who an author picked to approve a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalSelection {
    /// A raw user, resolved to an approver id before it can be stored
    User(UserId),
    Approver(ApprovatorId),
    Group(GroupId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApprovalConfig {
    pub requires_approval: bool,
    pub target: Option<ApprovalSelection>,
}

impl ApprovalConfig {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn gated(target: ApprovalSelection) -> Self {
        Self {
            requires_approval: true,
            target: Some(target),
        }
    }
}

/// A step as proposed by an author
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDraft {
    pub circuit_id: CircuitId,
    pub current_status_id: StatusId,
    pub next_status_id: StatusId,
    pub approval: ApprovalConfig,
}

impl StepDraft {
    pub fn new(
        circuit_id: impl Into<CircuitId>,
        current: impl Into<StatusId>,
        next: impl Into<StatusId>,
        approval: ApprovalConfig,
    ) -> Self {
        Self {
            circuit_id: circuit_id.into(),
            current_status_id: current.into(),
            next_status_id: next.into(),
            approval,
        }
    }
}

#[derive(Clone)]
pub struct AuthoringValidator {
    registry: Arc<CircuitRegistry>,
    directory: Arc<dyn ApproverDirectory>,
}

impl AuthoringValidator {
    pub fn new(registry: Arc<CircuitRegistry>, directory: Arc<dyn ApproverDirectory>) -> Self {
        Self {
            registry,
            directory,
        }
    }

    /// Check a draft against the current registry without storing it
    pub async fn validate_new_step(&self, draft: &StepDraft) -> Result<NewStep, AuthoringError> {
        let circuit_id = draft.circuit_id;
        let circuit = self
            .registry
            .snapshot(circuit_id)
            .ok_or(AuthoringError::UnknownCircuit { circuit_id })?;

        check_endpoints(&circuit, draft.current_status_id, draft.next_status_id)?;

        if let Some(existing) = circuit.find_step(draft.current_status_id, draft.next_status_id) {
            return Err(AuthoringError::DuplicateTransition {
                circuit_id,
                current: draft.current_status_id,
                next: draft.next_status_id,
                existing: existing.id,
            });
        }

        let approver_ref = self.resolve_approval(&draft.approval).await?;

        Ok(NewStep {
            circuit_id,
            current_status_id: draft.current_status_id,
            next_status_id: draft.next_status_id,
            requires_approval: draft.approval.requires_approval,
            approver_ref,
        })
    }

    /// Validate and store a step. The duplicate check is repeated atomically with the insert.
    pub async fn commit_step(&self, draft: &StepDraft) -> Result<Step, AuthoringError> {
        let new_step = match self.validate_new_step(draft).await {
            Ok(new_step) => new_step,
            Err(e) => {
                warn!(
                    circuit_id = %draft.circuit_id,
                    current = %draft.current_status_id,
                    next = %draft.next_status_id,
                    error = %e,
                    "Step rejected"
                );
                return Err(e);
            }
        };

        let step = self.registry.insert_step(new_step)?;
        info!(step_id = %step.id, kind = ?step.approval_kind(), "Step authored");
        Ok(step)
    }

    async fn resolve_approval(
        &self,
        config: &ApprovalConfig,
    ) -> Result<Option<ApproverRef>, AuthoringError> {
        let target = match (config.requires_approval, config.target) {
            (false, None) => return Ok(None),
            (false, Some(_)) => {
                return Err(AuthoringError::InvalidApprovalConfig {
                    reason: "an approver is set on a step that does not require approval"
                        .to_string(),
                })
            }
            (true, None) => {
                return Err(AuthoringError::InvalidApprovalConfig {
                    reason: "step requires approval but neither an approver nor a group is set"
                        .to_string(),
                })
            }
            (true, Some(target)) => target,
        };

        match target {
            ApprovalSelection::User(user_id) => {
                let approver_id = match self.directory.resolve_approvator_id(user_id).await {
                    Ok(id) => id,
                    Err(CollaboratorError::NotFound { .. }) => {
                        return Err(AuthoringError::ApproverNotRegistered { user_id })
                    }
                    Err(e) => return Err(e.into()),
                };
                Ok(Some(ApproverRef::Approver(approver_id)))
            }
            ApprovalSelection::Approver(approver_id) => {
                let approvers = self.directory.list_approvers().await?;
                if !approvers.iter().any(|a| a.id == approver_id) {
                    return Err(AuthoringError::missing_approver(approver_id));
                }
                Ok(Some(ApproverRef::Approver(approver_id)))
            }
            ApprovalSelection::Group(group_id) => {
                let groups = self.directory.list_approval_groups().await?;
                let group = groups
                    .iter()
                    .find(|g| g.id == group_id)
                    .ok_or_else(|| AuthoringError::missing_group(group_id))?;
                if group.members.is_empty() {
                    return Err(AuthoringError::InvalidApprovalConfig {
                        reason: format!("approval group {group_id} has no members"),
                    });
                }
                if let Some(member) = group.repeated_member() {
                    return Err(AuthoringError::InvalidApprovalConfig {
                        reason: format!("approval group {group_id} lists approver {member} twice"),
                    });
                }
                Ok(Some(ApproverRef::Group(group_id)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approvals::{ApprovalGroup, Approver, RuleType};
    use crate::circuit::Status;
    use crate::external::{InMemoryApproverDirectory, MockApproverDirectory};

    fn registry() -> Arc<CircuitRegistry> {
        let registry = Arc::new(CircuitRegistry::new());
        registry.create_circuit(CircuitId(1), "Purchasing").unwrap();
        for status in [
            Status::new(10, "Request").initial(),
            Status::new(20, "Quote"),
            Status::new(30, "Order").final_status(),
        ] {
            registry.add_status(CircuitId(1), status).unwrap();
        }
        registry
    }

    fn directory() -> Arc<InMemoryApproverDirectory> {
        Arc::new(InMemoryApproverDirectory::new(
            vec![Approver::new(ApprovatorId(7), UserId(70), "Grace")],
            vec![
                ApprovalGroup {
                    id: GroupId(3),
                    name: "Finance".to_string(),
                    rule_type: RuleType::All,
                    members: vec![ApprovatorId(7)],
                },
                ApprovalGroup {
                    id: GroupId(4),
                    name: "Nobody".to_string(),
                    rule_type: RuleType::Any,
                    members: vec![],
                },
                ApprovalGroup {
                    id: GroupId(5),
                    name: "Echo".to_string(),
                    rule_type: RuleType::Sequential,
                    members: vec![ApprovatorId(7), ApprovatorId(7)],
                },
            ],
        ))
    }

    #[tokio::test]
    async fn test_user_is_resolved_to_approver() {
        let validator = AuthoringValidator::new(registry(), directory());
        let step = validator
            .commit_step(&StepDraft::new(
                1,
                10,
                20,
                ApprovalConfig::gated(ApprovalSelection::User(UserId(70))),
            ))
            .await
            .unwrap();
        assert_eq!(step.approver_ref, Some(ApproverRef::Approver(ApprovatorId(7))));
        assert!(step.requires_approval);
    }

    #[tokio::test]
    async fn test_unregistered_user_is_reported() {
        let validator = AuthoringValidator::new(registry(), directory());
        let err = validator
            .validate_new_step(&StepDraft::new(
                1,
                10,
                20,
                ApprovalConfig::gated(ApprovalSelection::User(UserId(99))),
            ))
            .await
            .unwrap_err();
        assert_eq!(err, AuthoringError::ApproverNotRegistered { user_id: UserId(99) });
    }

    #[tokio::test]
    async fn test_inconsistent_approval_configs() {
        let validator = AuthoringValidator::new(registry(), directory());

        let cases = [
            ApprovalConfig {
                requires_approval: true,
                target: None,
            },
            ApprovalConfig {
                requires_approval: false,
                target: Some(ApprovalSelection::Approver(ApprovatorId(7))),
            },
            ApprovalConfig::gated(ApprovalSelection::Approver(ApprovatorId(8))),
            ApprovalConfig::gated(ApprovalSelection::Group(GroupId(99))),
            ApprovalConfig::gated(ApprovalSelection::Group(GroupId(4))),
            ApprovalConfig::gated(ApprovalSelection::Group(GroupId(5))),
        ];
        for config in cases {
            let err = validator
                .validate_new_step(&StepDraft::new(1, 10, 20, config))
                .await
                .unwrap_err();
            assert!(
                matches!(err, AuthoringError::InvalidApprovalConfig { .. }),
                "{config:?} gave {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_duplicate_triple_rejected_other_triple_accepted() {
        let validator = AuthoringValidator::new(registry(), directory());
        let first = validator
            .commit_step(&StepDraft::new(1, 10, 20, ApprovalConfig::none()))
            .await
            .unwrap();

        let err = validator
            .commit_step(&StepDraft::new(
                1,
                10,
                20,
                ApprovalConfig::gated(ApprovalSelection::Group(GroupId(3))),
            ))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AuthoringError::DuplicateTransition {
                circuit_id: CircuitId(1),
                current: StatusId(10),
                next: StatusId(20),
                existing: first.id,
            }
        );

        validator
            .commit_step(&StepDraft::new(1, 10, 30, ApprovalConfig::none()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_commit_rechecks_after_advisory_pass() {
        let registry = registry();
        let validator = AuthoringValidator::new(registry.clone(), directory());
        let draft = StepDraft::new(1, 20, 30, ApprovalConfig::none());

        let advisory = validator.validate_new_step(&draft).await.unwrap();
        // A second authoring session lands the same edge first.
        registry.insert_step(advisory.clone()).unwrap();

        let err = validator.commit_step(&draft).await.unwrap_err();
        assert!(matches!(err, AuthoringError::DuplicateTransition { .. }));
        let err = registry.insert_step(advisory).unwrap_err();
        assert!(matches!(err, AuthoringError::DuplicateTransition { .. }));
    }

    #[tokio::test]
    async fn test_directory_outage_is_not_reported_as_unregistered() {
        let mut directory = MockApproverDirectory::new();
        directory
            .expect_resolve_approvator_id()
            .returning(|_| Err(CollaboratorError::unavailable("directory down")));
        let validator = AuthoringValidator::new(registry(), Arc::new(directory));

        let err = validator
            .validate_new_step(&StepDraft::new(
                1,
                10,
                20,
                ApprovalConfig::gated(ApprovalSelection::User(UserId(70))),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthoringError::Collaborator(_)));
    }

    #[tokio::test]
    async fn test_unknown_endpoints() {
        let validator = AuthoringValidator::new(registry(), directory());
        let err = validator
            .validate_new_step(&StepDraft::new(2, 10, 20, ApprovalConfig::none()))
            .await
            .unwrap_err();
        assert_eq!(err, AuthoringError::UnknownCircuit { circuit_id: CircuitId(2) });

        let err = validator
            .validate_new_step(&StepDraft::new(1, 10, 55, ApprovalConfig::none()))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthoringError::UnknownStatus { .. }));

        let err = validator
            .validate_new_step(&StepDraft::new(1, 10, 10, ApprovalConfig::none()))
            .await
            .unwrap_err();
        assert_eq!(err, AuthoringError::SelfTransition { status_id: StatusId(10) });
    }
}
