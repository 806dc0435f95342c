//! Failure types surfaced by the workspace mutation engine.
//!
//! Keep this module free from HTTP or framework concerns so the same error
//! shape can be mapped by any adapter. The inbound HTTP adapter owns the
//! translation into status codes and wire payloads.

use serde_json::Value;
use thiserror::Error;

use super::workspace::RevisionConflict;

/// Stable machine-readable codes for rejected command or intent envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeErrorCode {
    /// A required field is missing or fails shape validation.
    InvalidPayload,
    /// The envelope version is not understood by this server.
    InvalidVersion,
    /// The namespace belongs to a reserved, disabled domain.
    ReservedDomain,
    /// The `(namespace, type)` pair has no registered executor.
    UnsupportedIntent,
    /// A document blob failed MIR validation.
    MirValidationFailed,
}

impl EnvelopeErrorCode {
    /// Wire representation of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidPayload => "INVALID_ENVELOPE_PAYLOAD",
            Self::InvalidVersion => "INVALID_ENVELOPE_VERSION",
            Self::ReservedDomain => "RESERVED_DOMAIN_DISABLED",
            Self::UnsupportedIntent => "UNSUPPORTED_INTENT",
            Self::MirValidationFailed => "MIR_VALIDATION_FAILED",
        }
    }
}

/// A command or intent envelope rejected during normalization or validation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct EnvelopeError {
    code: EnvelopeErrorCode,
    message: String,
    details: Option<Value>,
}

impl EnvelopeError {
    /// Construct an envelope error with an explicit code.
    pub fn new(code: EnvelopeErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured details for clients (field names, offsets, indices).
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Helper for [`EnvelopeErrorCode::InvalidPayload`].
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::new(EnvelopeErrorCode::InvalidPayload, message)
    }

    /// Helper for [`EnvelopeErrorCode::InvalidVersion`].
    pub fn invalid_version(version: &str) -> Self {
        Self::new(EnvelopeErrorCode::InvalidVersion, "Unsupported intent version.")
            .with_details(serde_json::json!({ "version": version }))
    }

    /// Helper for [`EnvelopeErrorCode::ReservedDomain`].
    pub fn reserved_domain(namespace: &str) -> Self {
        Self::new(EnvelopeErrorCode::ReservedDomain, "Reserved domain is disabled.")
            .with_details(serde_json::json!({ "namespace": namespace }))
    }

    /// Helper for [`EnvelopeErrorCode::UnsupportedIntent`].
    pub fn unsupported_intent(namespace: &str, kind: &str) -> Self {
        Self::new(EnvelopeErrorCode::UnsupportedIntent, "Unsupported intent.")
            .with_details(serde_json::json!({ "namespace": namespace, "type": kind }))
    }

    /// Helper for [`EnvelopeErrorCode::MirValidationFailed`].
    pub fn mir_validation_failed(message: impl Into<String>) -> Self {
        Self::new(EnvelopeErrorCode::MirValidationFailed, message)
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> EnvelopeErrorCode {
        self.code
    }

    /// Human-readable message returned to clients.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Supplementary details for clients.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }
}

/// Failures surfaced by the workspace engine to inbound adapters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkspaceError {
    /// No workspace row exists for the requested id.
    #[error("workspace not found")]
    WorkspaceNotFound,
    /// The workspace exists but the addressed document does not.
    #[error("workspace document not found")]
    DocumentNotFound,
    /// The caller is not authenticated.
    #[error("authentication required")]
    Unauthorized,
    /// An expected revision did not match the server's current state.
    #[error("workspace revision conflict: {0}")]
    Conflict(RevisionConflict),
    /// A command or intent envelope was rejected.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    /// A batch operation failed; carries the zero-based operation index.
    #[error("batch operation {index} failed: {source}")]
    Batch {
        index: usize,
        source: Box<WorkspaceError>,
    },
    /// Transaction, pool, or driver failure. Details are logged, never
    /// returned to clients.
    #[error("workspace operation failed: {message}")]
    Internal { message: String },
}

impl WorkspaceError {
    /// Helper for opaque internal failures.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Annotate a failure with the batch operation index that produced it.
    ///
    /// Idempotent: an already-annotated failure keeps its original index.
    pub fn at_batch_index(self, index: usize) -> Self {
        match self {
            already @ Self::Batch { .. } => already,
            source => Self::Batch {
                index,
                source: Box::new(source),
            },
        }
    }
}
