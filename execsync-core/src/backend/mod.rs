//! Boundary to the hosted services: sign-in and the document database.
//!
//! Everything behind these traits is treated as opaque. The appointment
//! store only ever talks to `AuthService` and `DocumentStore`, so a hosted
//! backend and the local one in this module are interchangeable.

pub mod auth;
pub mod local;

pub use auth::LocalAuth;
pub use local::LocalDocumentStore;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};

use crate::constants::APPOINTMENTS_COLLECTION;
use crate::error::{ExecSyncError, ExecSyncResult};

/// Untyped document body as stored remotely.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// A signed-in user as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub anonymous: bool,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_in_anonymously(&self) -> ExecSyncResult<Identity>;

    async fn sign_in_with_custom_token(&self, token: &str) -> ExecSyncResult<Identity>;

    async fn sign_out(&self) -> ExecSyncResult<()>;

    /// Current identity now, and again on every change.
    fn on_auth_state_changed(&self) -> watch::Receiver<Option<Identity>>;
}

pub type SharedAuth = Arc<dyn AuthService>;

/// A stored document: service-assigned id plus untyped fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// One entry of a live-query notification.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChange {
    pub kind: ChangeKind,
    pub document: Document,
}

impl DocumentChange {
    pub fn added(document: Document) -> Self {
        DocumentChange {
            kind: ChangeKind::Added,
            document,
        }
    }
}

/// Full collection contents plus what changed since the previous snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub documents: Vec<Document>,
    pub changes: Vec<DocumentChange>,
}

/// Live query feed. The query stays open until the receiver is dropped;
/// an `Err` item is the last thing sent before the feed closes.
pub type SnapshotReceiver = mpsc::UnboundedReceiver<ExecSyncResult<Snapshot>>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write a new document. The store assigns and returns its id.
    async fn add_document(&self, path: &CollectionPath, fields: Fields) -> ExecSyncResult<String>;

    async fn delete_document(&self, path: &CollectionPath, id: &str) -> ExecSyncResult<()>;

    /// Open a live query. The first item is the full current collection with
    /// every document reported as added.
    async fn subscribe_to_collection(&self, path: &CollectionPath)
    -> ExecSyncResult<SnapshotReceiver>;
}

pub type SharedDocuments = Arc<dyn DocumentStore>;

/// Slash-separated collection path, e.g. `artifacts/<app>/public/data/appointments`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(Vec<String>);

impl CollectionPath {
    pub fn new(segments: &[&str]) -> ExecSyncResult<Self> {
        if segments.is_empty() {
            return Err(ExecSyncError::Config("collection path is empty".into()));
        }
        for segment in segments {
            validate_segment(segment)?;
        }
        Ok(CollectionPath(
            segments.iter().map(|s| s.to_string()).collect(),
        ))
    }

    /// The shared appointment collection for an application.
    pub fn appointments(app_id: &str) -> ExecSyncResult<Self> {
        Self::new(&["artifacts", app_id, "public", "data", APPOINTMENTS_COLLECTION])
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

fn validate_segment(segment: &str) -> ExecSyncResult<()> {
    let valid = !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\']);
    if !valid {
        return Err(ExecSyncError::Config(format!(
            "invalid collection path segment '{}'",
            segment
        )));
    }
    Ok(())
}
