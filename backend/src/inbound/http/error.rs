//! HTTP mapping for workspace engine failures.
//!
//! Keep the domain free of transport concerns by translating
//! [`WorkspaceError`] into Actix responses here. The payload shapes are part
//! of the client contract; internal details never leave the server.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::{json, Map, Value};
use tracing::{error, warn};

use crate::domain::error::WorkspaceError;
use crate::domain::workspace::RevisionConflict;

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, WorkspaceError>;

fn conflict_payload(conflict: &RevisionConflict) -> Value {
    let mut payload = json!({
        "error": "revision_conflict",
        "conflictType": conflict.conflict_type.as_str(),
        "workspaceId": conflict.workspace_id,
        "serverWorkspaceRev": conflict.server_workspace_rev,
        "serverRouteRev": conflict.server_route_rev,
        "opSeq": conflict.server_op_seq,
    });
    if let Some(document) = &conflict.document {
        payload["serverDocument"] = json!({
            "id": document.id,
            "contentRev": document.content_rev,
            "metaRev": document.meta_rev,
        });
    }
    payload
}

fn error_payload(err: &WorkspaceError) -> Value {
    match err {
        WorkspaceError::WorkspaceNotFound => json!({
            "error": "not_found",
            "message": "Workspace not found.",
        }),
        WorkspaceError::DocumentNotFound => json!({
            "error": "not_found",
            "message": "Workspace document not found.",
        }),
        WorkspaceError::Unauthorized => json!({
            "error": "unauthorized",
            "message": "Authentication required.",
        }),
        WorkspaceError::Conflict(conflict) => conflict_payload(conflict),
        WorkspaceError::Envelope(envelope) => {
            let mut payload = json!({
                "error": "request_error",
                "code": envelope.code().as_str(),
                "message": envelope.message(),
            });
            if let Some(details) = envelope.details() {
                payload["details"] = details.clone();
            }
            payload
        }
        WorkspaceError::Batch { index, source } => {
            let mut payload = error_payload(source);
            if let Some(object) = payload.as_object_mut() {
                object.insert("index".to_owned(), json!(index));
            }
            payload
        }
        WorkspaceError::Internal { .. } => json!({
            "error": "workspace_operation_failed",
            "message": "Could not process workspace request.",
        }),
    }
}

fn status_for(err: &WorkspaceError) -> StatusCode {
    match err {
        WorkspaceError::WorkspaceNotFound | WorkspaceError::DocumentNotFound => {
            StatusCode::NOT_FOUND
        }
        WorkspaceError::Unauthorized => StatusCode::UNAUTHORIZED,
        WorkspaceError::Conflict(_) => StatusCode::CONFLICT,
        WorkspaceError::Envelope(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WorkspaceError::Batch { source, .. } => status_for(source),
        WorkspaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ResponseError for WorkspaceError {
    fn status_code(&self) -> StatusCode {
        status_for(self)
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            WorkspaceError::Conflict(conflict) => {
                warn!(
                    conflict_type = %conflict.conflict_type,
                    workspace = %conflict.workspace_id,
                    server_workspace_rev = conflict.server_workspace_rev,
                    server_route_rev = conflict.server_route_rev,
                    server_op_seq = conflict.server_op_seq,
                    "409 returned to client"
                );
            }
            WorkspaceError::Batch { index, source } => {
                if matches!(**source, WorkspaceError::Conflict(_)) {
                    warn!(index, error = %source, "batch aborted on conflict");
                }
            }
            WorkspaceError::Internal { message } => {
                error!(error = %message, "workspace request failed");
            }
            _ => {}
        }
        HttpResponse::build(self.status_code()).json(error_payload(self))
    }
}

/// Payload handed to Actix for JSON bodies that fail to decode.
pub fn invalid_body_payload() -> Map<String, Value> {
    let payload = json!({
        "error": "request_error",
        "code": "INVALID_ENVELOPE_PAYLOAD",
        "message": "Invalid request payload.",
    });
    match payload {
        Value::Object(map) => map,
        _ => unreachable!("payload is an object literal"),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::domain::error::EnvelopeError;
    use crate::domain::workspace::DocumentRevision;

    use super::*;

    fn document_conflict() -> WorkspaceError {
        WorkspaceError::Conflict(RevisionConflict::document(
            "ws_1",
            DocumentRevision {
                id: "doc_home".into(),
                content_rev: 6,
                meta_rev: 2,
            },
            10,
            5,
            40,
        ))
    }

    #[rstest]
    fn conflict_payload_carries_server_revisions() {
        let err = document_conflict();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        let payload = error_payload(&err);
        assert_eq!(payload["error"], "revision_conflict");
        assert_eq!(payload["conflictType"], "DOCUMENT_CONFLICT");
        assert_eq!(payload["serverWorkspaceRev"], 10);
        assert_eq!(payload["serverRouteRev"], 5);
        assert_eq!(payload["opSeq"], 40);
        assert_eq!(payload["serverDocument"]["contentRev"], 6);
    }

    #[rstest]
    fn workspace_conflict_omits_server_document() {
        let err = WorkspaceError::Conflict(RevisionConflict::workspace("ws_1", 10, 4, 35));
        let payload = error_payload(&err);
        assert_eq!(payload["conflictType"], "WORKSPACE_CONFLICT");
        assert!(payload.get("serverDocument").is_none());
    }

    #[rstest]
    fn batch_wrapper_injects_the_index_and_keeps_the_status() {
        let err = document_conflict().at_batch_index(1);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        let payload = error_payload(&err);
        assert_eq!(payload["index"], 1);
        assert_eq!(payload["conflictType"], "DOCUMENT_CONFLICT");
    }

    #[rstest]
    fn envelope_errors_carry_stable_codes() {
        let err = WorkspaceError::Envelope(EnvelopeError::reserved_domain("core.nodegraph"));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        let payload = error_payload(&err);
        assert_eq!(payload["error"], "request_error");
        assert_eq!(payload["code"], "RESERVED_DOMAIN_DISABLED");
        assert_eq!(payload["details"]["namespace"], "core.nodegraph");
    }

    #[rstest]
    fn internal_errors_are_opaque() {
        let err = WorkspaceError::internal("pool exhausted: secret-host:5432");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let payload = error_payload(&err);
        assert_eq!(payload["error"], "workspace_operation_failed");
        assert!(payload["message"]
            .as_str()
            .is_some_and(|message| !message.contains("secret-host")));
    }

    #[rstest]
    #[case(WorkspaceError::WorkspaceNotFound, "Workspace not found.")]
    #[case(WorkspaceError::DocumentNotFound, "Workspace document not found.")]
    fn not_found_payloads(#[case] err: WorkspaceError, #[case] message: &str) {
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        let payload = error_payload(&err);
        assert_eq!(payload["error"], "not_found");
        assert_eq!(payload["message"], message);
    }
}
