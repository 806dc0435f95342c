//! The workspace mutation engine's domain core.

pub mod batch;
pub mod capabilities;
pub mod command;
pub mod conflict;
pub mod intent;
pub mod records;
pub mod service;

pub use batch::BatchOperation;
pub use capabilities::default_capabilities;
pub use command::{CommandEnvelope, CommandTarget, PatchOp};
pub use conflict::{ConflictType, RevisionConflict};
pub use intent::{IntentActor, IntentEnvelope, SUPPORTED_INTENT_VERSION};
pub use records::{
    default_mir_document, default_route_manifest, default_settings, default_tree, normalize_blob,
    DocumentRecord, DocumentRevision, DocumentType, MutationResult, WorkspaceRecord,
    WorkspaceSnapshot,
};
pub use service::{
    BatchRequest, DocumentSaveRequest, IntentRequest, WorkspaceService, ROOT_DOCUMENT_ID,
};
