//! Domain ports defining the edges of the hexagon.
//!
//! Ports describe how the mutation engine expects to interact with driven
//! adapters (the revision store and the project catalog). Each trait exposes
//! strongly typed errors so adapters map their failures into predictable
//! variants instead of returning `anyhow::Result`.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::workspace::{
    CommandEnvelope, DocumentType, MutationResult, RevisionConflict, WorkspaceSnapshot,
};

/// Failures surfaced by revision store adapters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkspaceStoreError {
    /// No workspace row exists for the requested id.
    #[error("workspace not found")]
    WorkspaceNotFound,
    /// The workspace exists but the addressed document does not.
    #[error("workspace document not found")]
    DocumentNotFound,
    /// An expected revision did not match under lock; state is unchanged.
    #[error("workspace revision conflict: {0}")]
    Conflict(RevisionConflict),
    /// A unique index rejected an insert (concurrent bootstrap).
    #[error("duplicate key: {message}")]
    DuplicateKey { message: String },
    /// Pool or connection failures.
    #[error("workspace store connection failed: {message}")]
    Connection { message: String },
    /// Query or mutation failed during execution.
    #[error("workspace store query failed: {message}")]
    Query { message: String },
    /// The per-primitive transaction deadline elapsed.
    #[error("workspace store transaction deadline exceeded")]
    Timeout,
}

impl WorkspaceStoreError {
    /// Helper for connection oriented failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for query failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Helper for unique-index violations.
    pub fn duplicate_key(message: impl Into<String>) -> Self {
        Self::DuplicateKey {
            message: message.into(),
        }
    }
}

/// Parameters for creating the workspace row at bootstrap. Revisions start
/// at 1 and the route manifest row is created in the same transaction.
#[derive(Debug, Clone)]
pub struct NewWorkspace {
    pub workspace_id: String,
    pub project_id: String,
    pub owner_id: String,
    pub name: String,
    pub tree: Value,
    pub route_manifest: Value,
}

/// Parameters for seeding a document. Revisions start at 1.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub workspace_id: String,
    pub document_id: String,
    pub doc_type: DocumentType,
    pub name: String,
    pub path: String,
    pub content: Value,
}

/// Parameters for the document-content primitive. `content` is canonical
/// JSON and `command` is already normalized and validated.
#[derive(Debug, Clone)]
pub struct DocumentSave {
    pub workspace_id: String,
    pub document_id: String,
    pub expected_content_rev: i64,
    pub content: Value,
    pub command: CommandEnvelope,
}

/// Parameters for the route-manifest primitive.
#[derive(Debug, Clone)]
pub struct RouteManifestSave {
    pub workspace_id: String,
    pub expected_workspace_rev: i64,
    pub expected_route_rev: i64,
    pub manifest: Value,
    pub command: CommandEnvelope,
}

/// Parameters for the settings primitive.
#[derive(Debug, Clone)]
pub struct SettingsSave {
    pub workspace_id: String,
    pub expected_workspace_rev: i64,
    pub settings: Value,
    pub command: CommandEnvelope,
}

/// Persistence port for the workspace aggregate.
///
/// Every mutation primitive is one serial transaction: lock the affected
/// rows, check expected revisions, write, bump revisions, append exactly one
/// operation log entry, commit. Row-level locking on the workspace row
/// serializes all mutations of the same workspace, which keeps the committed
/// `op_seq` sequence gap-free.
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    /// Read the full aggregate. Missing route/settings rows fall back to
    /// defaults; only a missing workspace row is an error.
    async fn get_snapshot(
        &self,
        workspace_id: &str,
    ) -> Result<WorkspaceSnapshot, WorkspaceStoreError>;

    /// Create the workspace row and its route manifest atomically.
    async fn create_workspace(&self, params: NewWorkspace) -> Result<(), WorkspaceStoreError>;

    /// Create one document row.
    async fn create_document(&self, params: NewDocument) -> Result<(), WorkspaceStoreError>;

    /// Primitive A: bump the document's `content_rev` and the workspace's
    /// `op_seq`; `workspace_rev` and `route_rev` are untouched.
    async fn save_document_content(
        &self,
        params: DocumentSave,
    ) -> Result<MutationResult, WorkspaceStoreError>;

    /// Primitive B: bump `workspace_rev`, `route_rev`, and `op_seq` together.
    /// The workspace revision is checked before the route revision.
    async fn save_route_manifest(
        &self,
        params: RouteManifestSave,
    ) -> Result<MutationResult, WorkspaceStoreError>;

    /// Primitive C: bump `workspace_rev` and `op_seq`; `route_rev` is
    /// untouched.
    async fn save_workspace_settings(
        &self,
        params: SettingsSave,
    ) -> Result<MutationResult, WorkspaceStoreError>;
}

/// Failures surfaced by project catalog adapters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectCatalogError {
    /// Catalog connection could not be established.
    #[error("project catalog connection failed: {message}")]
    Connection { message: String },
    /// Query or mutation failed during execution.
    #[error("project catalog query failed: {message}")]
    Query { message: String },
}

impl ProjectCatalogError {
    /// Helper for connection oriented failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for query failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// The slice of a project the engine needs for bootstrap and mirroring.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSeed {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub mir: Value,
}

/// Read/write port to the project catalog (an external collaborator).
#[async_trait]
pub trait ProjectCatalog: Send + Sync {
    /// Fetch a project owned by `owner_id`, or `None` when absent.
    async fn find_owned(
        &self,
        owner_id: &str,
        project_id: &str,
    ) -> Result<Option<ProjectSeed>, ProjectCatalogError>;

    /// Write the canonical MIR document back to the catalog (mirror sync).
    async fn save_mir(
        &self,
        owner_id: &str,
        project_id: &str,
        mir: &Value,
    ) -> Result<(), ProjectCatalogError>;
}
