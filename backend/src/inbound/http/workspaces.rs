//! Workspace API handlers.
//!
//! ```text
//! GET  /api/workspaces/{workspaceId}
//! GET  /api/workspaces/{workspaceId}/capabilities
//! PUT  /api/workspaces/{workspaceId}/documents/{documentId}
//! POST /api/workspaces/{workspaceId}/intents
//! POST /api/workspaces/{workspaceId}/batch
//! ```
//!
//! Handlers stay thin: session extraction, DTO mapping, one service call,
//! and the best-effort mirror write after an accepted mutation.

use std::collections::BTreeMap;

use actix_web::{get, post, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::workspace::{
    default_capabilities, BatchRequest, CommandEnvelope, DocumentSaveRequest, DocumentType,
    IntentEnvelope, IntentRequest, MutationResult, WorkspaceSnapshot,
};
use crate::inbound::http::error::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

#[derive(Debug, Deserialize)]
struct WorkspacePath {
    workspace_id: String,
}

#[derive(Debug, Deserialize)]
struct DocumentPath {
    workspace_id: String,
    document_id: String,
}

/// Request payload for `PUT …/documents/{documentId}`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveDocumentRequest {
    #[serde(default)]
    pub expected_content_rev: i64,
    #[serde(default)]
    pub expected_workspace_rev: i64,
    #[serde(default)]
    pub expected_route_rev: i64,
    #[schema(value_type = Option<Object>)]
    pub content: Option<Value>,
    #[serde(default)]
    pub client_mutation_id: String,
    #[schema(value_type = Option<Object>)]
    #[serde(default)]
    pub command: Option<CommandEnvelope>,
}

/// Request payload for `POST …/intents`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyIntentHttpRequest {
    #[serde(default)]
    pub expected_workspace_rev: i64,
    #[serde(default)]
    pub expected_route_rev: i64,
    #[schema(value_type = Object)]
    pub intent: IntentEnvelope,
    #[serde(default)]
    pub client_mutation_id: String,
}

/// Request payload for `POST …/batch`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyBatchRequest {
    #[serde(default)]
    pub expected_workspace_rev: i64,
    #[serde(default)]
    pub expected_route_rev: i64,
    #[schema(value_type = Vec<Object>)]
    #[serde(default)]
    pub operations: Vec<Value>,
    #[serde(default)]
    pub client_batch_id: String,
}

/// One document inside a snapshot response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: String,
    #[serde(rename = "type")]
    #[schema(value_type = String)]
    pub doc_type: DocumentType,
    pub path: String,
    pub content_rev: i64,
    pub meta_rev: i64,
    #[schema(value_type = Object)]
    pub content: Value,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot body: the workspace root with its documents, manifest, and
/// settings.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    pub id: String,
    pub workspace_rev: i64,
    pub route_rev: i64,
    pub op_seq: i64,
    #[schema(value_type = Object)]
    pub tree: Value,
    pub documents: Vec<DocumentResponse>,
    #[schema(value_type = Object)]
    pub route_manifest: Value,
    #[schema(value_type = Object)]
    pub settings: Value,
}

/// Wire envelope around [`SnapshotResponse`].
#[derive(Debug, Serialize, ToSchema)]
pub struct SnapshotEnvelope {
    pub workspace: SnapshotResponse,
}

impl From<WorkspaceSnapshot> for SnapshotEnvelope {
    fn from(snapshot: WorkspaceSnapshot) -> Self {
        let documents = snapshot
            .documents
            .into_iter()
            .map(|document| DocumentResponse {
                id: document.id,
                doc_type: document.doc_type,
                path: document.path,
                content_rev: document.content_rev,
                meta_rev: document.meta_rev,
                content: document.content,
                updated_at: document.updated_at,
            })
            .collect();
        Self {
            workspace: SnapshotResponse {
                id: snapshot.workspace.id,
                workspace_rev: snapshot.workspace.workspace_rev,
                route_rev: snapshot.workspace.route_rev,
                op_seq: snapshot.workspace.op_seq,
                tree: snapshot.workspace.tree,
                documents,
                route_manifest: snapshot.route_manifest,
                settings: snapshot.settings,
            },
        }
    }
}

/// Revision pair returned for each updated document.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRevisionResponse {
    pub id: String,
    pub content_rev: i64,
    pub meta_rev: i64,
}

/// Success body for every mutation endpoint.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    pub workspace_id: String,
    pub workspace_rev: i64,
    pub route_rev: i64,
    pub op_seq: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub updated_documents: Vec<DocumentRevisionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_mutation_id: Option<String>,
}

impl MutationResponse {
    fn from_result(result: MutationResult, client_mutation_id: &str) -> Self {
        let accepted = client_mutation_id.trim();
        Self {
            workspace_id: result.workspace_id,
            workspace_rev: result.workspace_rev,
            route_rev: result.route_rev,
            op_seq: result.op_seq,
            updated_documents: result
                .updated_documents
                .into_iter()
                .map(|document| DocumentRevisionResponse {
                    id: document.id,
                    content_rev: document.content_rev,
                    meta_rev: document.meta_rev,
                })
                .collect(),
            accepted_mutation_id: if accepted.is_empty() {
                None
            } else {
                Some(accepted.to_owned())
            },
        }
    }
}

/// Capability map advertised for one workspace.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitiesResponse {
    pub workspace_id: String,
    #[schema(value_type = Object)]
    pub capabilities: BTreeMap<&'static str, bool>,
}

/// Fetch the workspace snapshot, bootstrapping it from the enclosing
/// project on first access.
#[utoipa::path(
    get,
    path = "/api/workspaces/{workspace_id}",
    params(("workspace_id" = String, Path, description = "Workspace identifier")),
    responses(
        (status = 200, description = "Workspace snapshot", body = SnapshotEnvelope),
        (status = 401, description = "Unauthorised"),
        (status = 404, description = "Workspace not found")
    ),
    tags = ["workspaces"],
    operation_id = "getWorkspace"
)]
#[get("/workspaces/{workspace_id}")]
pub async fn get_workspace(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<WorkspacePath>,
) -> ApiResult<web::Json<SnapshotEnvelope>> {
    let user_id = session.require_user_id()?;
    let WorkspacePath { workspace_id } = path.into_inner();
    let snapshot = state
        .workspaces
        .snapshot_for_user(&user_id, &workspace_id)
        .await?;
    Ok(web::Json(SnapshotEnvelope::from(snapshot)))
}

/// Advertise the capability map so clients can feature-gate their UI.
#[utoipa::path(
    get,
    path = "/api/workspaces/{workspace_id}/capabilities",
    params(("workspace_id" = String, Path, description = "Workspace identifier")),
    responses(
        (status = 200, description = "Capability map", body = CapabilitiesResponse),
        (status = 401, description = "Unauthorised"),
        (status = 404, description = "Workspace not found")
    ),
    tags = ["workspaces"],
    operation_id = "getWorkspaceCapabilities"
)]
#[get("/workspaces/{workspace_id}/capabilities")]
pub async fn get_capabilities(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<WorkspacePath>,
) -> ApiResult<web::Json<CapabilitiesResponse>> {
    let user_id = session.require_user_id()?;
    let WorkspacePath { workspace_id } = path.into_inner();
    state
        .workspaces
        .snapshot_for_user(&user_id, &workspace_id)
        .await?;
    Ok(web::Json(CapabilitiesResponse {
        workspace_id: workspace_id.trim().to_owned(),
        capabilities: default_capabilities(),
    }))
}

/// Replace a document's content under optimistic concurrency.
#[utoipa::path(
    put,
    path = "/api/workspaces/{workspace_id}/documents/{document_id}",
    request_body = SaveDocumentRequest,
    params(
        ("workspace_id" = String, Path, description = "Workspace identifier"),
        ("document_id" = String, Path, description = "Document identifier")
    ),
    responses(
        (status = 200, description = "Accepted mutation", body = MutationResponse),
        (status = 401, description = "Unauthorised"),
        (status = 404, description = "Workspace or document not found"),
        (status = 409, description = "Revision conflict"),
        (status = 422, description = "Invalid envelope or content")
    ),
    tags = ["workspaces"],
    operation_id = "saveWorkspaceDocument"
)]
#[put("/workspaces/{workspace_id}/documents/{document_id}")]
pub async fn save_document(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<DocumentPath>,
    payload: web::Json<SaveDocumentRequest>,
) -> ApiResult<web::Json<MutationResponse>> {
    let user_id = session.require_user_id()?;
    let DocumentPath {
        workspace_id,
        document_id,
    } = path.into_inner();
    let request = payload.into_inner();

    let result = state
        .workspaces
        .save_document(
            &workspace_id,
            &document_id,
            DocumentSaveRequest {
                expected_content_rev: request.expected_content_rev,
                content: request.content,
                command: request.command,
            },
        )
        .await?;
    state
        .workspaces
        .sync_project_mirror(&user_id, workspace_id.trim())
        .await;
    Ok(web::Json(MutationResponse::from_result(
        result,
        &request.client_mutation_id,
    )))
}

/// Validate an intent envelope and execute the matching primitive.
#[utoipa::path(
    post,
    path = "/api/workspaces/{workspace_id}/intents",
    request_body = ApplyIntentHttpRequest,
    params(("workspace_id" = String, Path, description = "Workspace identifier")),
    responses(
        (status = 200, description = "Accepted mutation", body = MutationResponse),
        (status = 401, description = "Unauthorised"),
        (status = 404, description = "Workspace not found"),
        (status = 409, description = "Revision conflict"),
        (status = 422, description = "Invalid, reserved, or unsupported intent")
    ),
    tags = ["workspaces"],
    operation_id = "applyWorkspaceIntent"
)]
#[post("/workspaces/{workspace_id}/intents")]
pub async fn apply_intent(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<WorkspacePath>,
    payload: web::Json<ApplyIntentHttpRequest>,
) -> ApiResult<web::Json<MutationResponse>> {
    let user_id = session.require_user_id()?;
    let WorkspacePath { workspace_id } = path.into_inner();
    let request = payload.into_inner();

    let result = state
        .workspaces
        .apply_intent(
            &workspace_id,
            IntentRequest {
                expected_workspace_rev: request.expected_workspace_rev,
                expected_route_rev: request.expected_route_rev,
                intent: request.intent,
            },
        )
        .await?;
    state
        .workspaces
        .sync_project_mirror(&user_id, workspace_id.trim())
        .await;
    Ok(web::Json(MutationResponse::from_result(
        result,
        &request.client_mutation_id,
    )))
}

/// Execute an ordered list of operations, aborting on the first failure.
#[utoipa::path(
    post,
    path = "/api/workspaces/{workspace_id}/batch",
    request_body = ApplyBatchRequest,
    params(("workspace_id" = String, Path, description = "Workspace identifier")),
    responses(
        (status = 200, description = "All operations accepted", body = MutationResponse),
        (status = 401, description = "Unauthorised"),
        (status = 404, description = "Workspace not found"),
        (status = 409, description = "Revision conflict at some index"),
        (status = 422, description = "Invalid operation at some index")
    ),
    tags = ["workspaces"],
    operation_id = "applyWorkspaceBatch"
)]
#[post("/workspaces/{workspace_id}/batch")]
pub async fn apply_batch(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<WorkspacePath>,
    payload: web::Json<ApplyBatchRequest>,
) -> ApiResult<web::Json<MutationResponse>> {
    let user_id = session.require_user_id()?;
    let WorkspacePath { workspace_id } = path.into_inner();
    let request = payload.into_inner();

    let result = state
        .workspaces
        .apply_batch(
            &workspace_id,
            BatchRequest {
                expected_workspace_rev: request.expected_workspace_rev,
                expected_route_rev: request.expected_route_rev,
                operations: request.operations,
            },
        )
        .await?;
    state
        .workspaces
        .sync_project_mirror(&user_id, workspace_id.trim())
        .await;
    Ok(web::Json(MutationResponse::from_result(
        result,
        &request.client_batch_id,
    )))
}

#[cfg(test)]
#[path = "workspaces_tests.rs"]
mod tests;
