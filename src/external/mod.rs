//! External collaborator abstractions
//!
//! The workflow core consumes document storage, the approver directory, the
//! archival system and a refresh sink through these traits. In-memory
//! implementations back the CLI and the integration tests.

pub mod traits;
pub mod memory;

pub use traits::{
    ApproverDirectory, ArchivalSystem, CollaboratorError, DocumentRecord, DocumentStore,
    RefreshReason, RefreshSink,
};
pub use memory::{
    InMemoryApproverDirectory, InMemoryArchive, InMemoryDocumentStore, RecordingRefreshSink,
};

#[cfg(any(test, feature = "testing"))]
pub use traits::{MockApproverDirectory, MockArchivalSystem, MockDocumentStore, MockRefreshSink};
