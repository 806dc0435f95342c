//! Revision conflict taxonomy.
//!
//! A conflict carries the server's current revisions so a stale client can
//! reconcile without a second round trip.

use std::fmt;

use serde::Serialize;

use super::records::DocumentRevision;

/// Which expected revision failed to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConflictType {
    #[serde(rename = "DOCUMENT_CONFLICT")]
    Document,
    #[serde(rename = "WORKSPACE_CONFLICT")]
    Workspace,
    #[serde(rename = "ROUTE_CONFLICT")]
    Route,
}

impl ConflictType {
    /// Wire representation of the conflict type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "DOCUMENT_CONFLICT",
            Self::Workspace => "WORKSPACE_CONFLICT",
            Self::Route => "ROUTE_CONFLICT",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected optimistic write, with the server's current revisions.
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionConflict {
    pub conflict_type: ConflictType,
    pub workspace_id: String,
    /// Present only for document conflicts.
    pub document: Option<DocumentRevision>,
    pub server_workspace_rev: i64,
    pub server_route_rev: i64,
    pub server_op_seq: i64,
}

impl RevisionConflict {
    /// Conflict on a document content revision.
    pub fn document(
        workspace_id: impl Into<String>,
        document: DocumentRevision,
        server_workspace_rev: i64,
        server_route_rev: i64,
        server_op_seq: i64,
    ) -> Self {
        Self {
            conflict_type: ConflictType::Document,
            workspace_id: workspace_id.into(),
            document: Some(document),
            server_workspace_rev,
            server_route_rev,
            server_op_seq,
        }
    }

    /// Conflict on the workspace revision.
    pub fn workspace(
        workspace_id: impl Into<String>,
        server_workspace_rev: i64,
        server_route_rev: i64,
        server_op_seq: i64,
    ) -> Self {
        Self {
            conflict_type: ConflictType::Workspace,
            workspace_id: workspace_id.into(),
            document: None,
            server_workspace_rev,
            server_route_rev,
            server_op_seq,
        }
    }

    /// Conflict on the route manifest revision.
    pub fn route(
        workspace_id: impl Into<String>,
        server_workspace_rev: i64,
        server_route_rev: i64,
        server_op_seq: i64,
    ) -> Self {
        Self {
            conflict_type: ConflictType::Route,
            workspace_id: workspace_id.into(),
            document: None,
            server_workspace_rev,
            server_route_rev,
            server_op_seq,
        }
    }
}

impl fmt::Display for RevisionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type={} workspace={} document={}",
            self.conflict_type,
            self.workspace_id,
            self.document.as_ref().map(|d| d.id.as_str()).unwrap_or(""),
        )
    }
}
