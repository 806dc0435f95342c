//! Intent envelopes: the client-facing description of a semantic mutation.
//!
//! Intents are dispatched on `(namespace, type)` over a closed set;
//! reserved-namespace detection is a prefix check so new members of a
//! reserved family are implicitly rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::EnvelopeError;

use super::command::{CommandEnvelope, CommandTarget};

/// The only intent version this server executes.
pub const SUPPORTED_INTENT_VERSION: &str = "1.0";

const RESERVED_NAMESPACE_PREFIXES: [&str; 2] = ["core.nodegraph", "core.animation"];

/// Optional client attribution carried on an intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentActor {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub client_id: String,
}

/// A semantic mutation request: `namespace.type@version` plus payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentEnvelope {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub idempotency_key: String,
    #[serde(default)]
    pub actor: Option<IntentActor>,
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
}

impl IntentEnvelope {
    /// Trim string fields and normalize `issuedAt` to UTC.
    pub fn normalized(mut self) -> Self {
        self.id = self.id.trim().to_owned();
        self.namespace = self.namespace.trim().to_owned();
        self.kind = self.kind.trim().to_owned();
        self.version = self.version.trim().to_owned();
        self.idempotency_key = self.idempotency_key.trim().to_owned();
        self.issued_at = self.issued_at.map(|at| at.with_timezone(&Utc));
        self
    }

    /// Whether every field required for dispatch is present.
    pub fn is_complete(&self) -> bool {
        !self.id.is_empty()
            && !self.namespace.is_empty()
            && !self.kind.is_empty()
            && !self.version.is_empty()
            && self.issued_at.is_some()
    }

    /// Synthesize the command envelope written to the log for this intent.
    ///
    /// Fields are copied across; intents carry no patch ops and target the
    /// workspace as a whole.
    pub fn to_command(&self, workspace_id: &str) -> CommandEnvelope {
        CommandEnvelope {
            id: self.id.clone(),
            namespace: self.namespace.clone(),
            kind: self.kind.clone(),
            version: self.version.clone(),
            issued_at: self.issued_at,
            forward_ops: Vec::new(),
            reverse_ops: Vec::new(),
            target: CommandTarget {
                workspace_id: workspace_id.into(),
                document_id: String::new(),
            },
            merge_key: String::new(),
            label: String::new(),
            domain_hint: String::new(),
        }
    }
}

/// Whether the namespace belongs to a reserved, disabled domain.
pub fn is_reserved_domain(namespace: &str) -> bool {
    RESERVED_NAMESPACE_PREFIXES
        .iter()
        .any(|prefix| namespace.starts_with(prefix))
}

/// The closed set of intents this server can execute.
#[derive(Debug, Clone, PartialEq)]
pub enum SupportedIntent {
    /// `core.route` / `manifest.update`
    RouteManifestUpdate { manifest: Value },
    /// `core.settings` / `global.update`
    SettingsGlobalUpdate { settings: Value },
}

/// Resolve a normalized, complete intent into an executable dispatch.
///
/// The caller has already rejected reserved domains and version mismatches;
/// this only checks the dispatch table and the per-intent payload contract.
pub fn resolve_supported_intent(intent: &IntentEnvelope) -> Result<SupportedIntent, EnvelopeError> {
    match (intent.namespace.as_str(), intent.kind.as_str()) {
        ("core.route", "manifest.update") => {
            let manifest = required_payload_field(intent, "routeManifest")?;
            Ok(SupportedIntent::RouteManifestUpdate { manifest })
        }
        ("core.settings", "global.update") => {
            let settings = required_payload_field(intent, "settings")?;
            Ok(SupportedIntent::SettingsGlobalUpdate { settings })
        }
        (namespace, kind) => Err(EnvelopeError::unsupported_intent(namespace, kind)),
    }
}

fn required_payload_field(intent: &IntentEnvelope, field: &str) -> Result<Value, EnvelopeError> {
    intent
        .payload
        .as_ref()
        .and_then(|payload| payload.get(field))
        .filter(|value| !value.is_null())
        .cloned()
        .ok_or_else(|| {
            EnvelopeError::invalid_payload(format!("intent payload.{field} is required."))
        })
}
