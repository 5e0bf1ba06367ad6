// Circuit definition files
//
// A definition describes one circuit together with the approvers and groups
// its steps refer to. Installing a definition replays every status and step
// through the normal authoring path, so a file can never hold a step the
// interactive validator would refuse.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::approvals::{ApprovalGroup, Approver};
use crate::authoring::{
    ApprovalConfig, ApprovalSelection, AuthoringError, AuthoringValidator, StepDraft,
};
use crate::circuit::registry::CircuitRegistry;
use crate::circuit::types::{Circuit, Status};
use crate::external::InMemoryApproverDirectory;
use crate::ids::{CircuitId, StatusId};

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid circuit definition: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize circuit definition: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitHeader {
    pub id: CircuitId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
    pub current: StatusId,
    pub next: StatusId,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver: Option<ApprovalSelection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitDefinition {
    pub circuit: CircuitHeader,
    #[serde(default)]
    pub statuses: Vec<Status>,
    #[serde(default)]
    pub steps: Vec<StepSpec>,
    #[serde(default)]
    pub approvers: Vec<Approver>,
    #[serde(default)]
    pub groups: Vec<ApprovalGroup>,
}

/// A status or step the authoring rules refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionIssue {
    pub context: String,
    pub error: AuthoringError,
}

/// Result of replaying a definition into a fresh registry
pub struct InstalledCircuit {
    pub circuit_id: CircuitId,
    pub registry: Arc<CircuitRegistry>,
    pub directory: Arc<InMemoryApproverDirectory>,
    pub issues: Vec<DefinitionIssue>,
}

impl InstalledCircuit {
    pub fn circuit(&self) -> Option<Arc<Circuit>> {
        self.registry.snapshot(self.circuit_id)
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

impl CircuitDefinition {
    pub fn from_toml_str(content: &str) -> Result<Self, DefinitionError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, DefinitionError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DefinitionError> {
        let path = path.as_ref();
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| DefinitionError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
        Self::from_toml_str(&content)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), DefinitionError> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        tokio::fs::write(path, content)
            .await
            .map_err(|source| DefinitionError::Write {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Replay the definition through the authoring path into a fresh registry
    ///
    /// Refused statuses and steps are collected rather than aborting, so one
    /// pass reports every problem in the file.
    pub async fn install(&self) -> InstalledCircuit {
        let circuit_id = self.circuit.id;
        let registry = Arc::new(CircuitRegistry::new());
        let directory = Arc::new(InMemoryApproverDirectory::new(
            self.approvers.clone(),
            self.groups.clone(),
        ));
        let mut issues = Vec::new();

        if let Err(error) = registry.create_circuit(circuit_id, &self.circuit.name) {
            issues.push(DefinitionIssue {
                context: format!("circuit {circuit_id}"),
                error,
            });
        }

        for status in &self.statuses {
            if let Err(error) = registry.add_status(circuit_id, status.clone()) {
                issues.push(DefinitionIssue {
                    context: format!("status {} ({})", status.id, status.title),
                    error,
                });
            }
        }

        let validator = AuthoringValidator::new(Arc::clone(&registry), directory.clone());
        for entry in &self.steps {
            let draft = StepDraft {
                circuit_id,
                current_status_id: entry.current,
                next_status_id: entry.next,
                approval: ApprovalConfig {
                    requires_approval: entry.requires_approval,
                    target: entry.approver,
                },
            };
            if let Err(error) = validator.commit_step(&draft).await {
                issues.push(DefinitionIssue {
                    context: format!("step {} -> {}", entry.current, entry.next),
                    error,
                });
            }
        }

        if issues.is_empty() {
            info!(
                circuit_id = %circuit_id,
                statuses = self.statuses.len(),
                steps = self.steps.len(),
                "Circuit definition installed"
            );
        } else {
            warn!(circuit_id = %circuit_id, issues = issues.len(), "Circuit definition has issues");
        }

        InstalledCircuit {
            circuit_id,
            registry,
            directory,
            issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approvals::RuleType;
    use crate::circuit::ApproverRef;
    use crate::ids::{ApprovatorId, GroupId, UserId};
    use tempfile::TempDir;

    const CONTRACTS: &str = r#"
[circuit]
id = 1
name = "Contracts"

[[statuses]]
id = 10
title = "Draft"
is_initial = true

[[statuses]]
id = 20
title = "Legal review"
is_required = true

[[statuses]]
id = 30
title = "Signed"
is_final = true

[[steps]]
current = 10
next = 20

[[steps]]
current = 20
next = 30
requires_approval = true
approver = { user = 11 }

[[steps]]
current = 20
next = 10
requires_approval = true
approver = { group = 5 }

[[approvers]]
id = 1
user_id = 11
display_name = "Ada"

[[groups]]
id = 5
name = "Legal"
rule_type = "sequential"
members = [1]
"#;

    #[tokio::test]
    async fn test_install_resolves_users_and_groups() {
        let definition = CircuitDefinition::from_toml_str(CONTRACTS).unwrap();
        assert_eq!(definition.groups[0].rule_type, RuleType::Sequential);

        let installed = definition.install().await;
        assert!(installed.is_clean(), "{:?}", installed.issues);

        let circuit = installed.circuit().unwrap();
        assert_eq!(circuit.initial_status().map(|s| s.id), Some(StatusId(10)));
        let signing = circuit.find_step(StatusId(20), StatusId(30)).unwrap();
        assert_eq!(signing.approver_ref, Some(ApproverRef::Approver(ApprovatorId(1))));
        let back = circuit.find_step(StatusId(20), StatusId(10)).unwrap();
        assert_eq!(back.approver_ref, Some(ApproverRef::Group(GroupId(5))));
    }

    #[tokio::test]
    async fn test_install_collects_every_issue() {
        let mut definition = CircuitDefinition::from_toml_str(CONTRACTS).unwrap();
        definition.steps.push(StepSpec {
            current: StatusId(10),
            next: StatusId(20),
            requires_approval: false,
            approver: None,
        });
        definition.steps.push(StepSpec {
            current: StatusId(10),
            next: StatusId(30),
            requires_approval: true,
            approver: Some(ApprovalSelection::User(UserId(404))),
        });
        definition.statuses.push(Status::new(11, "Second start").initial());

        let installed = definition.install().await;
        let errors: Vec<&AuthoringError> = installed.issues.iter().map(|i| &i.error).collect();
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], AuthoringError::MultipleInitialStatuses { .. }));
        assert!(matches!(errors[1], AuthoringError::DuplicateTransition { .. }));
        assert_eq!(
            *errors[2],
            AuthoringError::ApproverNotRegistered { user_id: UserId(404) }
        );
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("contracts.toml");
        let definition = CircuitDefinition::from_toml_str(CONTRACTS).unwrap();

        definition.save(&path).await.unwrap();
        let loaded = CircuitDefinition::load(&path).await.unwrap();
        assert_eq!(loaded, definition);

        let missing = CircuitDefinition::load(dir.path().join("nope.toml")).await;
        assert!(matches!(missing, Err(DefinitionError::Read { .. })));
    }
}
