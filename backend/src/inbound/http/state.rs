//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they only depend
//! on the domain service and remain testable without I/O.

use crate::domain::workspace::WorkspaceService;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub workspaces: WorkspaceService,
}

impl HttpState {
    /// Construct state from the workspace service.
    pub fn new(workspaces: WorkspaceService) -> Self {
        Self { workspaces }
    }
}
