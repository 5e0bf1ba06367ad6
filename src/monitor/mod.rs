//! Completion Monitor
//!
//! After a move commits, a downstream system may take an unbounded amount of
//! time to react (e.g. archiving the document). The monitor polls the archival
//! system in the background, compares against the marker captured before the
//! move, and fires the refresh sink once the marker changes or the attempt
//! ceiling is reached. It never touches workflow state.
//!
//! One task runs per document; scheduling a new one aborts the previous task
//! so rapid repeated moves never produce duplicate callbacks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

use crate::config::MonitorConfig;
use crate::external::{ArchivalSystem, RefreshReason, RefreshSink};
use crate::ids::DocumentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl From<&MonitorConfig> for MonitorSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            max_attempts: config.max_attempts,
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self::from(&MonitorConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorOutcome {
    Changed { marker: Option<String> },
    TimedOut { attempts: u32 },
}

impl From<MonitorOutcome> for RefreshReason {
    fn from(outcome: MonitorOutcome) -> Self {
        match outcome {
            MonitorOutcome::Changed { marker } => RefreshReason::ExternalChange { marker },
            MonitorOutcome::TimedOut { attempts } => RefreshReason::MonitorTimedOut { attempts },
        }
    }
}

struct MonitorTask {
    generation: u64,
    handle: JoinHandle<()>,
}

type TaskTable = Arc<Mutex<HashMap<DocumentId, MonitorTask>>>;

pub struct CompletionMonitor {
    archive: Arc<dyn ArchivalSystem>,
    refresh: Arc<dyn RefreshSink>,
    settings: MonitorSettings,
    tasks: TaskTable,
    generation: AtomicU64,
}

impl CompletionMonitor {
    pub fn new(
        archive: Arc<dyn ArchivalSystem>,
        refresh: Arc<dyn RefreshSink>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            archive,
            refresh,
            settings,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// Start watching `document_id`, superseding any monitor already running for it
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule(&self, document_id: DocumentId, snapshot: Option<String>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let archive = Arc::clone(&self.archive);
        let refresh = Arc::clone(&self.refresh);
        let tasks = Arc::clone(&self.tasks);
        let settings = self.settings;

        let span = tracing::info_span!(
            "completion_monitor",
            document.id = %document_id,
            monitor.generation = generation,
            otel.kind = "internal"
        );

        // Hold the table lock across spawn so the task cannot finish and
        // deregister before it has been registered.
        let mut table = tasks.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = tokio::spawn(
            {
                let tasks = Arc::clone(&tasks);
                async move {
                    let outcome = watch(archive.as_ref(), document_id, snapshot, settings).await;
                    info!(outcome = ?outcome, "Completion monitor finished");
                    refresh.document_changed(document_id, outcome.into());
                    deregister(&tasks, document_id, generation);
                }
            }
            .instrument(span),
        );

        if let Some(previous) = table.insert(document_id, MonitorTask { generation, handle }) {
            previous.handle.abort();
            debug!(
                document_id = %document_id,
                superseded = previous.generation,
                "Superseded running completion monitor"
            );
        }
    }

    /// Stop the monitor for one document. Returns whether one was running.
    pub fn cancel(&self, document_id: DocumentId) -> bool {
        let removed = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&document_id);
        match removed {
            Some(task) => {
                task.handle.abort();
                info!(document_id = %document_id, "Completion monitor cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, document_id: DocumentId) -> bool {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&document_id)
    }

    pub fn active_count(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Abort every running monitor
    pub fn shutdown(&self) {
        let drained: Vec<(DocumentId, MonitorTask)> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        let count = drained.len();
        for (_, task) in drained {
            task.handle.abort();
        }
        if count > 0 {
            info!(count = count, "Stopped completion monitors");
        }
    }
}

impl Drop for CompletionMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Poll until the marker differs from `snapshot` or attempts run out
async fn watch(
    archive: &dyn ArchivalSystem,
    document_id: DocumentId,
    snapshot: Option<String>,
    settings: MonitorSettings,
) -> MonitorOutcome {
    let mut interval = tokio::time::interval(settings.poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick completes immediately; poll only after a full interval.
    interval.tick().await;

    for attempt in 1..=settings.max_attempts {
        interval.tick().await;
        match archive.get_archival_marker(document_id).await {
            Ok(current) if current != snapshot => {
                debug!(attempt = attempt, marker = ?current, "Archival marker changed");
                return MonitorOutcome::Changed { marker: current };
            }
            Ok(_) => {
                debug!(attempt = attempt, "Archival marker unchanged");
            }
            Err(e) => {
                warn!(attempt = attempt, error = %e, "Archival poll failed, will retry");
            }
        }
    }

    MonitorOutcome::TimedOut {
        attempts: settings.max_attempts,
    }
}

fn deregister(tasks: &TaskTable, document_id: DocumentId, generation: u64) {
    let mut table = tasks.lock().unwrap_or_else(PoisonError::into_inner);
    if table.get(&document_id).map(|t| t.generation) == Some(generation) {
        table.remove(&document_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{
        CollaboratorError, InMemoryArchive, MockArchivalSystem, RecordingRefreshSink,
    };
    use std::sync::atomic::AtomicU32;

    fn settings(max_attempts: u32) -> MonitorSettings {
        MonitorSettings {
            poll_interval: Duration::from_millis(100),
            max_attempts,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_detects_marker_change() {
        let archive = Arc::new(InMemoryArchive::new());
        let sink = Arc::new(RecordingRefreshSink::new());
        let monitor = CompletionMonitor::new(archive.clone(), sink.clone(), settings(10));

        monitor.schedule(DocumentId(1), None);
        assert!(monitor.is_active(DocumentId(1)));

        tokio::time::sleep(Duration::from_millis(250)).await;
        archive.archive(DocumentId(1), "vault-17");

        let (_, reason) = sink
            .wait_for(Duration::from_secs(5), |id, _| *id == DocumentId(1))
            .await
            .expect("monitor should report");
        assert_eq!(
            reason,
            RefreshReason::ExternalChange {
                marker: Some("vault-17".to_string())
            }
        );
        tokio::task::yield_now().await;
        assert!(!monitor.is_active(DocumentId(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_and_still_refreshes() {
        let archive = Arc::new(InMemoryArchive::new());
        let sink = Arc::new(RecordingRefreshSink::new());
        let monitor = CompletionMonitor::new(archive.clone(), sink.clone(), settings(3));

        monitor.schedule(DocumentId(2), None);

        let (_, reason) = sink
            .wait_for(Duration::from_secs(5), |id, _| *id == DocumentId(2))
            .await
            .expect("monitor should give up and refresh");
        assert_eq!(reason, RefreshReason::MonitorTimedOut { attempts: 3 });
        assert_eq!(archive.poll_count(DocumentId(2)), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failures_are_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let mut archive = MockArchivalSystem::new();
        archive.expect_get_archival_marker().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(CollaboratorError::unavailable("archive offline"))
            } else {
                Ok(Some("vault-1".to_string()))
            }
        });
        let sink = Arc::new(RecordingRefreshSink::new());
        let monitor = CompletionMonitor::new(Arc::new(archive), sink.clone(), settings(5));

        monitor.schedule(DocumentId(3), None);

        let (_, reason) = sink
            .wait_for(Duration::from_secs(5), |id, _| *id == DocumentId(3))
            .await
            .unwrap();
        assert!(matches!(reason, RefreshReason::ExternalChange { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_schedule_supersedes_running_monitor() {
        let archive = Arc::new(InMemoryArchive::new());
        let sink = Arc::new(RecordingRefreshSink::new());
        let monitor = CompletionMonitor::new(archive.clone(), sink.clone(), settings(3));

        monitor.schedule(DocumentId(4), None);
        monitor.schedule(DocumentId(4), None);
        assert_eq!(monitor.active_count(), 1);

        sink.wait_for(Duration::from_secs(5), |id, _| *id == DocumentId(4))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(sink.reasons_for(DocumentId(4)).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_shutdown_stop_callbacks() {
        let archive = Arc::new(InMemoryArchive::new());
        let sink = Arc::new(RecordingRefreshSink::new());
        let monitor = CompletionMonitor::new(archive.clone(), sink.clone(), settings(2));

        monitor.schedule(DocumentId(5), None);
        monitor.schedule(DocumentId(6), None);
        assert!(monitor.cancel(DocumentId(5)));
        assert!(!monitor.cancel(DocumentId(5)));
        monitor.shutdown();
        assert_eq!(monitor.active_count(), 0);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(sink.events().is_empty());
    }
}
