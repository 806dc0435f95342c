//! Workspace aggregate records and canonical default blobs.
//!
//! Revisions are 64-bit counters that start at 1 and never decrease.
//! Identifiers are opaque strings; workspace ids are inherited from the
//! enclosing project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Document type tags understood by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    #[serde(rename = "mir-page")]
    MirPage,
    #[serde(rename = "mir-layout")]
    MirLayout,
    #[serde(rename = "mir-component")]
    MirComponent,
    #[serde(rename = "mir-graph")]
    MirGraph,
    #[serde(rename = "mir-animation")]
    MirAnimation,
}

impl DocumentType {
    /// Wire and storage representation of the tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MirPage => "mir-page",
            Self::MirLayout => "mir-layout",
            Self::MirComponent => "mir-component",
            Self::MirGraph => "mir-graph",
            Self::MirAnimation => "mir-animation",
        }
    }

    /// Parse a stored tag. Unknown tags indicate a corrupted row.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "mir-page" => Some(Self::MirPage),
            "mir-layout" => Some(Self::MirLayout),
            "mir-component" => Some(Self::MirComponent),
            "mir-graph" => Some(Self::MirGraph),
            "mir-animation" => Some(Self::MirAnimation),
            _ => None,
        }
    }
}

/// The workspace aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceRecord {
    pub id: String,
    pub project_id: String,
    pub owner_id: String,
    pub name: String,
    pub workspace_rev: i64,
    pub route_rev: i64,
    pub op_seq: i64,
    pub tree_root_id: String,
    pub tree: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One editable JSON document inside a workspace.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub workspace_id: String,
    pub id: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub name: String,
    pub path: String,
    pub content_rev: i64,
    pub meta_rev: i64,
    pub content: Value,
    pub updated_at: DateTime<Utc>,
}

/// Consistent read of a workspace: root, route manifest, settings, and all
/// documents ordered by path.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceSnapshot {
    pub workspace: WorkspaceRecord,
    pub route_manifest: Value,
    pub settings: Value,
    pub documents: Vec<DocumentRecord>,
}

/// Post-mutation revision pair for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRevision {
    pub id: String,
    pub content_rev: i64,
    pub meta_rev: i64,
}

/// Revisions returned by every accepted mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationResult {
    pub workspace_id: String,
    pub workspace_rev: i64,
    pub route_rev: i64,
    pub op_seq: i64,
    pub updated_documents: Vec<DocumentRevision>,
}

/// Default tree for a freshly bootstrapped workspace.
pub fn default_tree() -> Value {
    json!({ "rootId": "root", "nodes": [] })
}

/// Default route manifest, also substituted when the manifest row is absent.
pub fn default_route_manifest() -> Value {
    json!({ "version": "1", "root": { "id": "root" } })
}

/// Settings blob substituted when the settings row is absent.
pub fn default_settings() -> Value {
    json!({})
}

/// Default MIR document used when a caller provides no content.
pub fn default_mir_document() -> Value {
    json!({ "version": "1.0", "ui": { "root": { "id": "root", "type": "container" } } })
}

/// Substitute a fallback for absent or null blobs.
///
/// Blobs arrive as parsed [`Value`]s, so the canonical form is whatever
/// serde_json emits for them; storage never sees unparsed client bytes.
pub fn normalize_blob(payload: Option<Value>, fallback: fn() -> Value) -> Value {
    match payload {
        Some(Value::Null) | None => fallback(),
        Some(value) => value,
    }
}
