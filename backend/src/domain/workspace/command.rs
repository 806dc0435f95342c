//! Command envelopes: the durable, log-serialized description of a mutation.
//!
//! The engine validates patch operations for shape only and never applies
//! them; they are stored so an external replayer can reconstruct history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::EnvelopeError;

/// One JSON-Pointer-shaped patch operation. `value` is opaque to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchOp {
    pub op: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Coordinates the command applies to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandTarget {
    #[serde(default)]
    pub workspace_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub document_id: String,
}

/// The on-the-wire and log-persisted description of one mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEnvelope {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub forward_ops: Vec<PatchOp>,
    #[serde(default)]
    pub reverse_ops: Vec<PatchOp>,
    #[serde(default)]
    pub target: CommandTarget,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub merge_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain_hint: String,
}

impl CommandEnvelope {
    /// Default command for a document save whose caller omitted the envelope.
    pub fn synthesized_document_update(workspace_id: &str, document_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: format!("cmd_{}", now.timestamp_nanos_opt().unwrap_or_default()),
            namespace: "core.mir".into(),
            kind: "document.update".into(),
            version: "1.0".into(),
            issued_at: Some(now),
            forward_ops: Vec::new(),
            reverse_ops: Vec::new(),
            target: CommandTarget {
                workspace_id: workspace_id.into(),
                document_id: document_id.into(),
            },
            merge_key: String::new(),
            label: String::new(),
            domain_hint: String::new(),
        }
    }

    /// Domain string written to the operation log.
    pub fn domain(&self) -> String {
        format!("{}.{}@{}", self.namespace, self.kind, self.version)
    }

    /// Trim string fields, lowercase patch ops, normalize `issuedAt` to UTC,
    /// and replace nil op lists with empty ones.
    pub fn normalized(mut self) -> Result<Self, EnvelopeError> {
        self.id = self.id.trim().to_owned();
        self.namespace = self.namespace.trim().to_owned();
        self.kind = self.kind.trim().to_owned();
        self.version = self.version.trim().to_owned();
        self.issued_at = self.issued_at.map(|at| at.with_timezone(&Utc));
        self.target.workspace_id = self.target.workspace_id.trim().to_owned();
        self.target.document_id = self.target.document_id.trim().to_owned();
        self.merge_key = self.merge_key.trim().to_owned();
        self.label = self.label.trim().to_owned();
        self.domain_hint = self.domain_hint.trim().to_owned();
        self.forward_ops = normalize_patch_ops(self.forward_ops)?;
        self.reverse_ops = normalize_patch_ops(self.reverse_ops)?;
        Ok(self)
    }

    /// Validate a normalized command against the executing coordinates.
    ///
    /// `document_id` is `Some` for document-scoped primitives; route and
    /// settings primitives pass `None` and additionally reject a document
    /// target.
    pub fn validate(
        &self,
        workspace_id: &str,
        document_id: Option<&str>,
    ) -> Result<(), EnvelopeError> {
        if self.id.is_empty() {
            return Err(EnvelopeError::invalid_payload("command.id is required"));
        }
        if self.namespace.is_empty() {
            return Err(EnvelopeError::invalid_payload("command.namespace is required"));
        }
        if self.kind.is_empty() {
            return Err(EnvelopeError::invalid_payload("command.type is required"));
        }
        if self.version.is_empty() {
            return Err(EnvelopeError::invalid_payload("command.version is required"));
        }
        if self.issued_at.is_none() {
            return Err(EnvelopeError::invalid_payload("command.issuedAt is required"));
        }
        if self.target.workspace_id.is_empty() {
            return Err(EnvelopeError::invalid_payload(
                "command.target.workspaceId is required",
            ));
        }
        if self.target.workspace_id != workspace_id {
            return Err(EnvelopeError::invalid_payload(
                "command.target.workspaceId does not match the executing workspace",
            ));
        }

        match document_id {
            Some(expected) => {
                if self.target.document_id.is_empty() {
                    return Err(EnvelopeError::invalid_payload(
                        "command.target.documentId is required for document mutations",
                    ));
                }
                if self.target.document_id != expected {
                    return Err(EnvelopeError::invalid_payload(
                        "command.target.documentId does not match the executing document",
                    ));
                }
            }
            None => {
                if !self.target.document_id.is_empty() {
                    return Err(EnvelopeError::invalid_payload(
                        "command.target.documentId must be empty for workspace mutations",
                    ));
                }
            }
        }
        Ok(())
    }
}

fn is_supported_patch_op(op: &str) -> bool {
    matches!(op, "add" | "remove" | "replace" | "move" | "copy" | "test")
}

fn normalize_patch_ops(ops: Vec<PatchOp>) -> Result<Vec<PatchOp>, EnvelopeError> {
    ops.into_iter()
        .enumerate()
        .map(|(index, mut op)| {
            op.op = op.op.trim().to_lowercase();
            op.path = op.path.trim().to_owned();
            op.from = op.from.trim().to_owned();

            if op.path.is_empty() {
                return Err(EnvelopeError::invalid_payload(format!(
                    "patch operation {index} missing path"
                )));
            }
            if !is_supported_patch_op(&op.op) {
                return Err(EnvelopeError::invalid_payload(format!(
                    "patch operation {index} uses unsupported op {:?}",
                    op.op
                )));
            }
            if (op.op == "copy" || op.op == "move") && op.from.is_empty() {
                return Err(EnvelopeError::invalid_payload(format!(
                    "patch operation {index} missing from for {}",
                    op.op
                )));
            }
            Ok(op)
        })
        .collect()
}
