//! Workspace mutation service: executor primitives, intent routing, batch
//! coordination, and lazy bootstrap.
//!
//! The service validates and canonicalizes envelopes before any transaction
//! opens, then delegates the transactional work to the [`WorkspaceStore`]
//! port. Handlers hold it behind `Arc` and stay free of persistence details.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::domain::error::{EnvelopeError, WorkspaceError};
use crate::domain::ports::{
    DocumentSave, NewDocument, NewWorkspace, ProjectCatalog, ProjectSeed, RouteManifestSave,
    SettingsSave, WorkspaceStore, WorkspaceStoreError,
};

use super::batch::{parse_operation, BatchOperation};
use super::command::CommandEnvelope;
use super::intent::{
    is_reserved_domain, resolve_supported_intent, IntentEnvelope, SupportedIntent,
    SUPPORTED_INTENT_VERSION,
};
use super::records::{
    default_mir_document, default_route_manifest, default_settings, default_tree, normalize_blob,
    DocumentType, MutationResult, WorkspaceSnapshot,
};

/// Identifier of the document seeded at bootstrap.
pub const ROOT_DOCUMENT_ID: &str = "doc_root";

/// A document save as accepted from clients; the command envelope is
/// synthesized when omitted.
#[derive(Debug, Clone, Default)]
pub struct DocumentSaveRequest {
    pub expected_content_rev: i64,
    pub content: Option<Value>,
    pub command: Option<CommandEnvelope>,
}

/// An intent application as accepted from clients.
#[derive(Debug, Clone)]
pub struct IntentRequest {
    pub expected_workspace_rev: i64,
    pub expected_route_rev: i64,
    pub intent: IntentEnvelope,
}

/// A batch of operations executed sequentially against carried revisions.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub expected_workspace_rev: i64,
    pub expected_route_rev: i64,
    pub operations: Vec<Value>,
}

/// The workspace mutation engine's application service.
#[derive(Clone)]
pub struct WorkspaceService {
    store: Arc<dyn WorkspaceStore>,
    projects: Arc<dyn ProjectCatalog>,
}

impl WorkspaceService {
    /// Construct the service from explicit port implementations.
    pub fn new(store: Arc<dyn WorkspaceStore>, projects: Arc<dyn ProjectCatalog>) -> Self {
        Self { store, projects }
    }

    /// Read the workspace snapshot, bootstrapping it from the enclosing
    /// project on first access.
    ///
    /// An absent project surfaces as [`WorkspaceError::WorkspaceNotFound`];
    /// workspaces are the engine's vocabulary, projects are not.
    pub async fn snapshot_for_user(
        &self,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<WorkspaceSnapshot, WorkspaceError> {
        let workspace_id = workspace_id.trim();
        match self.store.get_snapshot(workspace_id).await {
            Ok(snapshot) => return Ok(snapshot),
            Err(WorkspaceStoreError::WorkspaceNotFound) => {}
            Err(other) => return Err(other.into()),
        }

        let project = self
            .projects
            .find_owned(user_id.trim(), workspace_id)
            .await
            .map_err(|err| {
                warn!(workspace = workspace_id, error = %err, "project lookup failed during bootstrap");
                WorkspaceError::internal(err.to_string())
            })?
            .ok_or(WorkspaceError::WorkspaceNotFound)?;

        self.bootstrap(&project).await?;
        self.store
            .get_snapshot(workspace_id)
            .await
            .map_err(Into::into)
    }

    /// Create the workspace row, default route manifest, and seed document
    /// for a project. Idempotent: duplicate-key violations from a racing
    /// bootstrap are swallowed on both inserts.
    async fn bootstrap(&self, project: &ProjectSeed) -> Result<(), WorkspaceError> {
        let workspace_id = project.id.trim();
        if workspace_id.is_empty() {
            return Err(WorkspaceError::internal(
                "project id is required to bootstrap a workspace",
            ));
        }
        info!(workspace = workspace_id, "bootstrapping workspace from project");

        let created = self
            .store
            .create_workspace(NewWorkspace {
                workspace_id: workspace_id.to_owned(),
                project_id: project.id.clone(),
                owner_id: project.owner_id.clone(),
                name: project.name.trim().to_owned(),
                tree: default_tree(),
                route_manifest: default_route_manifest(),
            })
            .await;
        match created {
            Ok(()) | Err(WorkspaceStoreError::DuplicateKey { .. }) => {}
            Err(other) => return Err(other.into()),
        }

        let seeded = self
            .store
            .create_document(NewDocument {
                workspace_id: workspace_id.to_owned(),
                document_id: ROOT_DOCUMENT_ID.to_owned(),
                doc_type: DocumentType::MirPage,
                name: "Root".to_owned(),
                path: "/".to_owned(),
                content: normalize_blob(Some(project.mir.clone()), default_mir_document),
            })
            .await;
        match seeded {
            Ok(()) | Err(WorkspaceStoreError::DuplicateKey { .. }) => Ok(()),
            Err(other) => Err(other.into()),
        }
    }

    /// Primitive A: replace a document's content under optimistic
    /// concurrency. Bumps `content_rev` and `op_seq` only.
    pub async fn save_document(
        &self,
        workspace_id: &str,
        document_id: &str,
        request: DocumentSaveRequest,
    ) -> Result<MutationResult, WorkspaceError> {
        let workspace_id = workspace_id.trim();
        let document_id = document_id.trim();
        if request.expected_content_rev <= 0 {
            return Err(
                EnvelopeError::invalid_payload("expectedContentRev must be positive.").into(),
            );
        }
        if request.content.is_none() {
            return Err(EnvelopeError::mir_validation_failed("content is required.").into());
        }
        let content = normalize_blob(request.content, default_mir_document);

        let command = request
            .command
            .unwrap_or_else(|| CommandEnvelope::synthesized_document_update(workspace_id, document_id))
            .normalized()?;
        command.validate(workspace_id, Some(document_id))?;

        let result = self
            .store
            .save_document_content(DocumentSave {
                workspace_id: workspace_id.to_owned(),
                document_id: document_id.to_owned(),
                expected_content_rev: request.expected_content_rev,
                content,
                command,
            })
            .await?;
        Ok(result)
    }

    /// Validate an intent envelope and route it to the matching executor
    /// primitive. Reserved and unknown domains never reach the store.
    pub async fn apply_intent(
        &self,
        workspace_id: &str,
        request: IntentRequest,
    ) -> Result<MutationResult, WorkspaceError> {
        let workspace_id = workspace_id.trim();
        if request.expected_workspace_rev <= 0 {
            return Err(
                EnvelopeError::invalid_payload("expectedWorkspaceRev must be positive.").into(),
            );
        }
        let intent = request.intent.normalized();
        if !intent.is_complete() {
            return Err(EnvelopeError::invalid_payload("intent envelope is incomplete.").into());
        }
        if intent.version != SUPPORTED_INTENT_VERSION {
            return Err(EnvelopeError::invalid_version(&intent.version).into());
        }
        if is_reserved_domain(&intent.namespace) {
            return Err(EnvelopeError::reserved_domain(&intent.namespace).into());
        }

        // Checked before payload extraction so a route intent with both a
        // bad revision and a bad payload reports the revision first.
        if intent.namespace == "core.route"
            && intent.kind == "manifest.update"
            && request.expected_route_rev <= 0
        {
            return Err(EnvelopeError::invalid_payload(
                "expectedRouteRev must be positive for route intents.",
            )
            .into());
        }

        let command = intent.to_command(workspace_id).normalized()?;
        command.validate(workspace_id, None)?;

        match resolve_supported_intent(&intent)? {
            SupportedIntent::RouteManifestUpdate { manifest } => {
                let result = self
                    .store
                    .save_route_manifest(RouteManifestSave {
                        workspace_id: workspace_id.to_owned(),
                        expected_workspace_rev: request.expected_workspace_rev,
                        expected_route_rev: request.expected_route_rev,
                        manifest: normalize_blob(Some(manifest), default_route_manifest),
                        command,
                    })
                    .await?;
                Ok(result)
            }
            SupportedIntent::SettingsGlobalUpdate { settings } => {
                let result = self
                    .store
                    .save_workspace_settings(SettingsSave {
                        workspace_id: workspace_id.to_owned(),
                        expected_workspace_rev: request.expected_workspace_rev,
                        settings: normalize_blob(Some(settings), default_settings),
                        command,
                    })
                    .await?;
                Ok(result)
            }
        }
    }

    /// Execute a batch of operations sequentially, each as its own
    /// transaction, against a monotonically carried `(workspaceRev,
    /// routeRev)` pair.
    ///
    /// The first failure aborts the batch and is annotated with the
    /// zero-based index of the offending operation; prior operations stay
    /// committed.
    pub async fn apply_batch(
        &self,
        workspace_id: &str,
        request: BatchRequest,
    ) -> Result<MutationResult, WorkspaceError> {
        let workspace_id = workspace_id.trim();
        if request.expected_workspace_rev <= 0 {
            return Err(
                EnvelopeError::invalid_payload("expectedWorkspaceRev must be positive.").into(),
            );
        }
        if request.operations.is_empty() {
            return Err(EnvelopeError::invalid_payload("operations must not be empty.").into());
        }

        let mut current_workspace_rev = request.expected_workspace_rev;
        let mut current_route_rev = request.expected_route_rev;
        let mut latest = None;

        for (index, raw) in request.operations.iter().enumerate() {
            let result = self
                .apply_batch_operation(workspace_id, raw, index, current_workspace_rev, current_route_rev)
                .await
                .map_err(|err| err.at_batch_index(index))?;
            current_workspace_rev = result.workspace_rev;
            current_route_rev = result.route_rev;
            latest = Some(result);
        }

        latest.ok_or_else(|| {
            EnvelopeError::invalid_payload("Batch did not include executable operations.").into()
        })
    }

    async fn apply_batch_operation(
        &self,
        workspace_id: &str,
        raw: &Value,
        index: usize,
        current_workspace_rev: i64,
        current_route_rev: i64,
    ) -> Result<MutationResult, WorkspaceError> {
        match parse_operation(raw, index)? {
            BatchOperation::SaveDocument {
                document_id,
                expected_content_rev,
                content,
                command,
            } => {
                let document_id = document_id.trim().to_owned();
                if document_id.is_empty() {
                    return Err(EnvelopeError::invalid_payload(
                        "saveDocument operation requires documentId.",
                    )
                    .with_details(json!({ "index": index }))
                    .into());
                }
                if expected_content_rev <= 0 {
                    return Err(EnvelopeError::invalid_payload(
                        "saveDocument operation requires expectedContentRev > 0.",
                    )
                    .with_details(json!({ "index": index }))
                    .into());
                }
                if content.is_none() {
                    return Err(EnvelopeError::mir_validation_failed(
                        "saveDocument operation requires content.",
                    )
                    .with_details(json!({ "index": index }))
                    .into());
                }
                self.save_document(
                    workspace_id,
                    &document_id,
                    DocumentSaveRequest {
                        expected_content_rev,
                        content,
                        command,
                    },
                )
                .await
            }
            BatchOperation::Intent { intent } => {
                self.apply_intent(
                    workspace_id,
                    IntentRequest {
                        expected_workspace_rev: current_workspace_rev,
                        expected_route_rev: current_route_rev,
                        intent,
                    },
                )
                .await
            }
        }
    }

    /// Write the workspace's canonical page document back to the project
    /// catalog. Best-effort: failures are logged and swallowed so a mirror
    /// outage never fails an accepted mutation.
    pub async fn sync_project_mirror(&self, user_id: &str, workspace_id: &str) {
        let snapshot = match self.snapshot_for_user(user_id, workspace_id).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(workspace = workspace_id, error = %err, "mirror sync skipped");
                return;
            }
        };
        let Some(mir) = resolve_canonical_mir(&snapshot) else {
            warn!(workspace = workspace_id, "mirror sync skipped: no canonical document");
            return;
        };
        let project_id = match snapshot.workspace.project_id.trim() {
            "" => workspace_id,
            id => id,
        };
        match self.projects.save_mir(user_id.trim(), project_id, mir).await {
            Ok(()) => {
                info!(workspace = workspace_id, project = project_id, "mirror sync success");
            }
            Err(err) => {
                warn!(
                    workspace = workspace_id,
                    project = project_id,
                    error = %err,
                    "mirror sync failed"
                );
            }
        }
    }
}

/// The document mirrored into the catalog: the `mir-page` at the root path,
/// else any `mir-page`, else the first document.
pub fn resolve_canonical_mir(snapshot: &WorkspaceSnapshot) -> Option<&Value> {
    let root_page = snapshot.documents.iter().find(|document| {
        document.doc_type == DocumentType::MirPage
            && matches!(document.path.trim(), "/" | "")
    });
    if let Some(document) = root_page {
        return Some(&document.content);
    }
    if let Some(document) = snapshot
        .documents
        .iter()
        .find(|document| document.doc_type == DocumentType::MirPage)
    {
        return Some(&document.content);
    }
    snapshot.documents.first().map(|document| &document.content)
}

impl From<WorkspaceStoreError> for WorkspaceError {
    fn from(err: WorkspaceStoreError) -> Self {
        match err {
            WorkspaceStoreError::WorkspaceNotFound => Self::WorkspaceNotFound,
            WorkspaceStoreError::DocumentNotFound => Self::DocumentNotFound,
            WorkspaceStoreError::Conflict(conflict) => {
                warn!(
                    conflict_type = %conflict.conflict_type,
                    workspace = %conflict.workspace_id,
                    server_workspace_rev = conflict.server_workspace_rev,
                    server_route_rev = conflict.server_route_rev,
                    server_op_seq = conflict.server_op_seq,
                    "workspace revision conflict"
                );
                Self::Conflict(conflict)
            }
            WorkspaceStoreError::Timeout => {
                warn!("workspace store transaction deadline exceeded");
                Self::internal("workspace store transaction deadline exceeded")
            }
            WorkspaceStoreError::DuplicateKey { message }
            | WorkspaceStoreError::Connection { message }
            | WorkspaceStoreError::Query { message } => {
                warn!(error = %message, "workspace store failure");
                Self::internal(message)
            }
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
