//! Collaborative workspace mutation engine.
//!
//! Hexagonal layout: the `domain` module owns the revision model, envelope
//! validation, intent routing, and batch coordination; `inbound` adapts HTTP
//! onto the service; `outbound` persists through Diesel/PostgreSQL.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;

#[cfg(test)]
pub mod test_support;

pub use doc::ApiDoc;
pub use middleware::Trace;
