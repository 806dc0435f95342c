//! In-memory port implementations shared by unit and handler tests.
//!
//! The in-memory store mirrors the revision semantics of the Diesel adapter
//! (lock-check-write-bump-append per mutation) so service and handler tests
//! can exercise the engine's invariants without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::domain::ports::{
    DocumentSave, NewDocument, NewWorkspace, ProjectCatalog, ProjectCatalogError, ProjectSeed,
    RouteManifestSave, SettingsSave, WorkspaceStore, WorkspaceStoreError,
};
use crate::domain::workspace::{
    default_route_manifest, default_settings, DocumentRecord, DocumentRevision, MutationResult,
    RevisionConflict, WorkspaceRecord, WorkspaceSnapshot,
};

/// One appended operation log entry, exposed for assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredOperation {
    pub op_seq: i64,
    pub domain: String,
    pub document_id: Option<String>,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
struct WorkspaceState {
    workspace: WorkspaceRecord,
    route_manifest: Value,
    settings: Option<Value>,
    documents: HashMap<String, DocumentRecord>,
    operations: Vec<StoredOperation>,
}

/// In-memory [`WorkspaceStore`] with full revision semantics.
#[derive(Default)]
pub struct InMemoryWorkspaceStore {
    state: Mutex<HashMap<String, WorkspaceState>>,
}

fn fixture_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 8, 9, 0, 0).unwrap()
}

impl InMemoryWorkspaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a workspace row at the given revisions.
    pub fn seed_workspace(&self, workspace_id: &str, workspace_rev: i64, route_rev: i64, op_seq: i64) {
        let mut state = self.state.lock().expect("store poisoned");
        state.insert(
            workspace_id.to_owned(),
            WorkspaceState {
                workspace: WorkspaceRecord {
                    id: workspace_id.to_owned(),
                    project_id: workspace_id.to_owned(),
                    owner_id: "user_1".to_owned(),
                    name: "Workspace One".to_owned(),
                    workspace_rev,
                    route_rev,
                    op_seq,
                    tree_root_id: "root".to_owned(),
                    tree: crate::domain::workspace::default_tree(),
                    created_at: fixture_time(),
                    updated_at: fixture_time(),
                },
                route_manifest: default_route_manifest(),
                settings: None,
                documents: HashMap::new(),
                operations: Vec::new(),
            },
        );
    }

    /// Seed a document row at the given revisions.
    pub fn seed_document(
        &self,
        workspace_id: &str,
        document_id: &str,
        path: &str,
        content_rev: i64,
        meta_rev: i64,
        content: Value,
    ) {
        let mut state = self.state.lock().expect("store poisoned");
        let workspace = state
            .get_mut(workspace_id)
            .expect("seed_document requires a seeded workspace");
        workspace.documents.insert(
            document_id.to_owned(),
            DocumentRecord {
                workspace_id: workspace_id.to_owned(),
                id: document_id.to_owned(),
                doc_type: crate::domain::workspace::DocumentType::MirPage,
                name: document_id.to_owned(),
                path: path.to_owned(),
                content_rev,
                meta_rev,
                content,
                updated_at: fixture_time(),
            },
        );
    }

    /// All appended operations for a workspace, in append order.
    pub fn operations(&self, workspace_id: &str) -> Vec<StoredOperation> {
        let state = self.state.lock().expect("store poisoned");
        state
            .get(workspace_id)
            .map(|workspace| workspace.operations.clone())
            .unwrap_or_default()
    }

    /// Current revision triple for assertions.
    pub fn revisions(&self, workspace_id: &str) -> Option<(i64, i64, i64)> {
        let state = self.state.lock().expect("store poisoned");
        state.get(workspace_id).map(|workspace| {
            (
                workspace.workspace.workspace_rev,
                workspace.workspace.route_rev,
                workspace.workspace.op_seq,
            )
        })
    }

    fn append_operation(
        workspace: &mut WorkspaceState,
        document_id: Option<&str>,
        command: &crate::domain::workspace::CommandEnvelope,
    ) -> Result<(), WorkspaceStoreError> {
        let payload = serde_json::to_value(command)
            .map_err(|err| WorkspaceStoreError::query(err.to_string()))?;
        workspace.operations.push(StoredOperation {
            op_seq: workspace.workspace.op_seq,
            domain: command.domain(),
            document_id: document_id.map(str::to_owned),
            payload,
            created_at: command.issued_at.unwrap_or_else(Utc::now),
        });
        Ok(())
    }
}

#[async_trait]
impl WorkspaceStore for InMemoryWorkspaceStore {
    async fn get_snapshot(
        &self,
        workspace_id: &str,
    ) -> Result<WorkspaceSnapshot, WorkspaceStoreError> {
        let state = self.state.lock().expect("store poisoned");
        let workspace = state
            .get(workspace_id)
            .ok_or(WorkspaceStoreError::WorkspaceNotFound)?;
        let mut documents: Vec<DocumentRecord> = workspace.documents.values().cloned().collect();
        documents.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(WorkspaceSnapshot {
            workspace: workspace.workspace.clone(),
            route_manifest: workspace.route_manifest.clone(),
            settings: workspace.settings.clone().unwrap_or_else(default_settings),
            documents,
        })
    }

    async fn create_workspace(&self, params: NewWorkspace) -> Result<(), WorkspaceStoreError> {
        let mut state = self.state.lock().expect("store poisoned");
        if state.contains_key(&params.workspace_id) {
            return Err(WorkspaceStoreError::duplicate_key("workspaces_pkey"));
        }
        let now = Utc::now();
        state.insert(
            params.workspace_id.clone(),
            WorkspaceState {
                workspace: WorkspaceRecord {
                    id: params.workspace_id,
                    project_id: params.project_id,
                    owner_id: params.owner_id,
                    name: params.name,
                    workspace_rev: 1,
                    route_rev: 1,
                    op_seq: 1,
                    tree_root_id: "root".to_owned(),
                    tree: params.tree,
                    created_at: now,
                    updated_at: now,
                },
                route_manifest: params.route_manifest,
                settings: None,
                documents: HashMap::new(),
                operations: Vec::new(),
            },
        );
        Ok(())
    }

    async fn create_document(&self, params: NewDocument) -> Result<(), WorkspaceStoreError> {
        let mut state = self.state.lock().expect("store poisoned");
        let workspace = state
            .get_mut(&params.workspace_id)
            .ok_or_else(|| WorkspaceStoreError::query("workspace row missing"))?;
        if workspace.documents.contains_key(&params.document_id)
            || workspace
                .documents
                .values()
                .any(|document| document.path == params.path)
        {
            return Err(WorkspaceStoreError::duplicate_key("workspace_documents_pkey"));
        }
        workspace.documents.insert(
            params.document_id.clone(),
            DocumentRecord {
                workspace_id: params.workspace_id,
                id: params.document_id,
                doc_type: params.doc_type,
                name: params.name,
                path: params.path,
                content_rev: 1,
                meta_rev: 1,
                content: params.content,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn save_document_content(
        &self,
        params: DocumentSave,
    ) -> Result<MutationResult, WorkspaceStoreError> {
        let mut state = self.state.lock().expect("store poisoned");
        let workspace = state
            .get_mut(&params.workspace_id)
            .ok_or(WorkspaceStoreError::WorkspaceNotFound)?;

        let (current_content_rev, current_meta_rev) = match workspace.documents.get(&params.document_id)
        {
            Some(document) => (document.content_rev, document.meta_rev),
            None => return Err(WorkspaceStoreError::DocumentNotFound),
        };

        if current_content_rev != params.expected_content_rev {
            return Err(WorkspaceStoreError::Conflict(RevisionConflict::document(
                params.workspace_id.clone(),
                DocumentRevision {
                    id: params.document_id.clone(),
                    content_rev: current_content_rev,
                    meta_rev: current_meta_rev,
                },
                workspace.workspace.workspace_rev,
                workspace.workspace.route_rev,
                workspace.workspace.op_seq,
            )));
        }

        let document = workspace
            .documents
            .get_mut(&params.document_id)
            .expect("checked above");
        document.content = params.content;
        document.content_rev += 1;
        document.updated_at = Utc::now();
        let updated = DocumentRevision {
            id: document.id.clone(),
            content_rev: document.content_rev,
            meta_rev: document.meta_rev,
        };

        workspace.workspace.op_seq += 1;
        workspace.workspace.updated_at = Utc::now();
        Self::append_operation(workspace, Some(&params.document_id), &params.command)?;

        Ok(MutationResult {
            workspace_id: params.workspace_id,
            workspace_rev: workspace.workspace.workspace_rev,
            route_rev: workspace.workspace.route_rev,
            op_seq: workspace.workspace.op_seq,
            updated_documents: vec![updated],
        })
    }

    async fn save_route_manifest(
        &self,
        params: RouteManifestSave,
    ) -> Result<MutationResult, WorkspaceStoreError> {
        let mut state = self.state.lock().expect("store poisoned");
        let workspace = state
            .get_mut(&params.workspace_id)
            .ok_or(WorkspaceStoreError::WorkspaceNotFound)?;

        if workspace.workspace.workspace_rev != params.expected_workspace_rev {
            return Err(WorkspaceStoreError::Conflict(RevisionConflict::workspace(
                params.workspace_id.clone(),
                workspace.workspace.workspace_rev,
                workspace.workspace.route_rev,
                workspace.workspace.op_seq,
            )));
        }
        if workspace.workspace.route_rev != params.expected_route_rev {
            return Err(WorkspaceStoreError::Conflict(RevisionConflict::route(
                params.workspace_id.clone(),
                workspace.workspace.workspace_rev,
                workspace.workspace.route_rev,
                workspace.workspace.op_seq,
            )));
        }

        workspace.route_manifest = params.manifest;
        workspace.workspace.workspace_rev += 1;
        workspace.workspace.route_rev += 1;
        workspace.workspace.op_seq += 1;
        workspace.workspace.updated_at = Utc::now();
        Self::append_operation(workspace, None, &params.command)?;

        Ok(MutationResult {
            workspace_id: params.workspace_id,
            workspace_rev: workspace.workspace.workspace_rev,
            route_rev: workspace.workspace.route_rev,
            op_seq: workspace.workspace.op_seq,
            updated_documents: Vec::new(),
        })
    }

    async fn save_workspace_settings(
        &self,
        params: SettingsSave,
    ) -> Result<MutationResult, WorkspaceStoreError> {
        let mut state = self.state.lock().expect("store poisoned");
        let workspace = state
            .get_mut(&params.workspace_id)
            .ok_or(WorkspaceStoreError::WorkspaceNotFound)?;

        if workspace.workspace.workspace_rev != params.expected_workspace_rev {
            return Err(WorkspaceStoreError::Conflict(RevisionConflict::workspace(
                params.workspace_id.clone(),
                workspace.workspace.workspace_rev,
                workspace.workspace.route_rev,
                workspace.workspace.op_seq,
            )));
        }

        workspace.settings = Some(params.settings);
        workspace.workspace.workspace_rev += 1;
        workspace.workspace.op_seq += 1;
        workspace.workspace.updated_at = Utc::now();
        Self::append_operation(workspace, None, &params.command)?;

        Ok(MutationResult {
            workspace_id: params.workspace_id,
            workspace_rev: workspace.workspace.workspace_rev,
            route_rev: workspace.workspace.route_rev,
            op_seq: workspace.workspace.op_seq,
            updated_documents: Vec::new(),
        })
    }
}

/// In-memory [`ProjectCatalog`] recording mirror writes for assertions.
#[derive(Default)]
pub struct InMemoryProjectCatalog {
    projects: Mutex<HashMap<(String, String), ProjectSeed>>,
    mirror_writes: Mutex<Vec<(String, String, Value)>>,
}

impl InMemoryProjectCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a project owned by `seed.owner_id`.
    pub fn with_project(self, seed: ProjectSeed) -> Self {
        self.projects
            .lock()
            .expect("catalog poisoned")
            .insert((seed.owner_id.clone(), seed.id.clone()), seed);
        self
    }

    /// All `(owner, project, mir)` mirror writes, in order.
    pub fn mirror_writes(&self) -> Vec<(String, String, Value)> {
        self.mirror_writes.lock().expect("catalog poisoned").clone()
    }
}

#[async_trait]
impl ProjectCatalog for InMemoryProjectCatalog {
    async fn find_owned(
        &self,
        owner_id: &str,
        project_id: &str,
    ) -> Result<Option<ProjectSeed>, ProjectCatalogError> {
        let projects = self.projects.lock().expect("catalog poisoned");
        Ok(projects
            .get(&(owner_id.to_owned(), project_id.to_owned()))
            .cloned())
    }

    async fn save_mir(
        &self,
        owner_id: &str,
        project_id: &str,
        mir: &Value,
    ) -> Result<(), ProjectCatalogError> {
        let projects = self.projects.lock().expect("catalog poisoned");
        if !projects.contains_key(&(owner_id.to_owned(), project_id.to_owned())) {
            return Err(ProjectCatalogError::query("project not found"));
        }
        drop(projects);
        self.mirror_writes
            .lock()
            .expect("catalog poisoned")
            .push((owner_id.to_owned(), project_id.to_owned(), mir.clone()));
        Ok(())
    }
}
