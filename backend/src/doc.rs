//! OpenAPI documentation setup.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::inbound::http::workspaces::{
    ApplyBatchRequest, ApplyIntentHttpRequest, CapabilitiesResponse, DocumentResponse,
    DocumentRevisionResponse, MutationResponse, SaveDocumentRequest, SnapshotEnvelope,
    SnapshotResponse,
};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);
        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie established by the identity collaborator.",
            ))),
        );
    }
}

/// OpenAPI document for the workspace mutation API.
/// Swagger UI is mounted in debug builds only.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Workspace mutation engine API",
        description = "Optimistic-concurrency mutation surface for collaborative MIR workspaces.",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0.html"
        )
    ),
    servers((url = "/", description = "Relative to the deployment base URL")),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::workspaces::get_workspace,
        crate::inbound::http::workspaces::get_capabilities,
        crate::inbound::http::workspaces::save_document,
        crate::inbound::http::workspaces::apply_intent,
        crate::inbound::http::workspaces::apply_batch,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        SaveDocumentRequest,
        ApplyIntentHttpRequest,
        ApplyBatchRequest,
        SnapshotEnvelope,
        SnapshotResponse,
        DocumentResponse,
        DocumentRevisionResponse,
        MutationResponse,
        CapabilitiesResponse,
    )),
    tags(
        (name = "workspaces", description = "Workspace snapshots and mutations"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;
