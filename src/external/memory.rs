// In-memory collaborators - used by the CLI and by integration tests

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::approvals::{ApprovalGroup, Approver};
use crate::external::traits::*;
use crate::ids::{ApprovatorId, CircuitId, DocumentId, StatusId, UserId};

/// Document store backed by a map
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: Mutex<HashMap<DocumentId, DocumentRecord>>,
    completions: Mutex<Vec<(DocumentId, StatusId, bool)>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: DocumentId, circuit_id: CircuitId) {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                DocumentRecord {
                    id,
                    circuit_id,
                    external_archival_marker: None,
                },
            );
    }

    pub fn set_archival_marker(&self, id: DocumentId, marker: Option<&str>) {
        if let Some(record) = self
            .documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&id)
        {
            record.external_archival_marker = marker.map(str::to_string);
        }
    }

    /// Every `mark_status_complete` call received, in order
    pub fn completions(&self) -> Vec<(DocumentId, StatusId, bool)> {
        self.completions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_document(&self, id: DocumentId) -> Result<DocumentRecord, CollaboratorError> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or_else(|| CollaboratorError::not_found(format!("document {id}")))
    }

    async fn mark_status_complete(
        &self,
        document_id: DocumentId,
        status_id: StatusId,
        is_complete: bool,
    ) -> Result<(), CollaboratorError> {
        if !self
            .documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&document_id)
        {
            return Err(CollaboratorError::not_found(format!("document {document_id}")));
        }
        self.completions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((document_id, status_id, is_complete));
        Ok(())
    }
}

/// Approver directory with a fixed roster
#[derive(Debug, Default)]
pub struct InMemoryApproverDirectory {
    approvers: Mutex<Vec<Approver>>,
    groups: Mutex<Vec<ApprovalGroup>>,
}

impl InMemoryApproverDirectory {
    pub fn new(approvers: Vec<Approver>, groups: Vec<ApprovalGroup>) -> Self {
        Self {
            approvers: Mutex::new(approvers),
            groups: Mutex::new(groups),
        }
    }

    pub fn register(&self, approver: Approver) {
        self.approvers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(approver);
    }

    pub fn add_group(&self, group: ApprovalGroup) {
        self.groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(group);
    }
}

#[async_trait]
impl ApproverDirectory for InMemoryApproverDirectory {
    async fn resolve_approvator_id(&self, user_id: UserId) -> Result<ApprovatorId, CollaboratorError> {
        self.approvers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|a| a.user_id == user_id)
            .map(|a| a.id)
            .ok_or_else(|| CollaboratorError::not_found(format!("approver for user {user_id}")))
    }

    async fn list_approvers(&self) -> Result<Vec<Approver>, CollaboratorError> {
        Ok(self
            .approvers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn list_approval_groups(&self) -> Result<Vec<ApprovalGroup>, CollaboratorError> {
        Ok(self
            .groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// Archival system whose markers are set by the test or caller
#[derive(Debug, Default)]
pub struct InMemoryArchive {
    markers: Mutex<HashMap<DocumentId, String>>,
    polls: Mutex<HashMap<DocumentId, u32>>,
}

impl InMemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn archive(&self, document_id: DocumentId, marker: &str) {
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(document_id, marker.to_string());
    }

    pub fn poll_count(&self, document_id: DocumentId) -> u32 {
        self.polls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&document_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ArchivalSystem for InMemoryArchive {
    async fn get_archival_marker(
        &self,
        document_id: DocumentId,
    ) -> Result<Option<String>, CollaboratorError> {
        *self
            .polls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(document_id)
            .or_insert(0) += 1;
        Ok(self
            .markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&document_id)
            .cloned())
    }
}

/// Refresh sink that records every notification and lets callers wait for one
#[derive(Debug, Default)]
pub struct RecordingRefreshSink {
    events: Mutex<Vec<(DocumentId, RefreshReason)>>,
    notify: Notify,
}

impl RecordingRefreshSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(DocumentId, RefreshReason)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reasons_for(&self, document_id: DocumentId) -> Vec<RefreshReason> {
        self.events()
            .into_iter()
            .filter(|(id, _)| *id == document_id)
            .map(|(_, reason)| reason)
            .collect()
    }

    /// Wait until a recorded event satisfies `matches`, or give up after `limit`
    pub async fn wait_for<F>(&self, limit: Duration, matches: F) -> Option<(DocumentId, RefreshReason)>
    where
        F: Fn(&DocumentId, &RefreshReason) -> bool,
    {
        let search = async {
            loop {
                let found = self
                    .events
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .iter()
                    .find(|(id, reason)| matches(id, reason))
                    .cloned();
                if let Some(event) = found {
                    return event;
                }
                self.notify.notified().await;
            }
        };
        tokio::time::timeout(limit, search).await.ok()
    }
}

impl RefreshSink for RecordingRefreshSink {
    fn document_changed(&self, document_id: DocumentId, reason: RefreshReason) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((document_id, reason));
        self.notify.notify_one();
    }
}
