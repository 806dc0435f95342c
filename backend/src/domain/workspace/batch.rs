//! Batch operations: an ordered list of mutations executed sequentially,
//! each as its own transaction, aborting on the first failure.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::error::EnvelopeError;

use super::command::CommandEnvelope;
use super::intent::IntentEnvelope;

/// One operation inside a batch, dispatched on the `op` discriminator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op")]
pub enum BatchOperation {
    #[serde(rename = "saveDocument", rename_all = "camelCase")]
    SaveDocument {
        #[serde(default)]
        document_id: String,
        #[serde(default)]
        expected_content_rev: i64,
        #[serde(default)]
        content: Option<Value>,
        #[serde(default)]
        command: Option<CommandEnvelope>,
    },
    #[serde(rename = "intent")]
    Intent { intent: IntentEnvelope },
}

/// Decode one raw batch operation, distinguishing an unknown discriminator
/// from a malformed payload so the client sees which it was.
pub fn parse_operation(raw: &Value, index: usize) -> Result<BatchOperation, EnvelopeError> {
    let discriminator = raw.get("op").and_then(Value::as_str).map(str::trim);
    match discriminator {
        Some("saveDocument") | Some("intent") => {
            serde_json::from_value(raw.clone()).map_err(|_| {
                EnvelopeError::invalid_payload("Invalid batch operation payload.")
                    .with_details(serde_json::json!({ "index": index }))
            })
        }
        Some(other) => Err(EnvelopeError::invalid_payload("Unsupported batch operation.")
            .with_details(serde_json::json!({ "index": index, "op": other }))),
        None => Err(EnvelopeError::invalid_payload("Invalid batch operation payload.")
            .with_details(serde_json::json!({ "index": index }))),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    fn save_document_operation_parses() {
        let raw = json!({
            "op": "saveDocument",
            "documentId": "doc_home",
            "expectedContentRev": 3,
            "content": { "title": "next" }
        });
        match parse_operation(&raw, 0).expect("parses") {
            BatchOperation::SaveDocument {
                document_id,
                expected_content_rev,
                content,
                command,
            } => {
                assert_eq!(document_id, "doc_home");
                assert_eq!(expected_content_rev, 3);
                assert_eq!(content, Some(json!({ "title": "next" })));
                assert!(command.is_none());
            }
            other => panic!("unexpected operation: {other:?}"),
        }
    }

    #[rstest]
    fn intent_operation_parses() {
        let raw = json!({
            "op": "intent",
            "intent": {
                "id": "intent_1",
                "namespace": "core.settings",
                "type": "global.update",
                "version": "1.0",
                "payload": { "settings": {} },
                "issuedAt": "2026-02-08T10:05:00Z"
            }
        });
        match parse_operation(&raw, 1).expect("parses") {
            BatchOperation::Intent { intent } => {
                assert_eq!(intent.namespace, "core.settings");
                assert!(intent.issued_at.is_some());
            }
            other => panic!("unexpected operation: {other:?}"),
        }
    }

    #[rstest]
    fn unknown_discriminator_reports_the_op_and_index() {
        let err = parse_operation(&json!({ "op": "noop" }), 2).expect_err("rejects");
        assert!(err.message().contains("Unsupported batch operation"));
        assert_eq!(err.details(), Some(&json!({ "index": 2, "op": "noop" })));
    }

    #[rstest]
    fn missing_discriminator_reports_the_index() {
        let err = parse_operation(&json!({ "documentId": "doc_home" }), 0).expect_err("rejects");
        assert!(err.message().contains("Invalid batch operation payload"));
        assert_eq!(err.details(), Some(&json!({ "index": 0 })));
    }

    #[rstest]
    fn malformed_intent_operation_reports_the_index() {
        let err =
            parse_operation(&json!({ "op": "intent", "intent": 7 }), 3).expect_err("rejects");
        assert_eq!(err.details(), Some(&json!({ "index": 3 })));
    }
}
