//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Repository implementations convert
//! between these rows and domain records, keeping Diesel confined to the
//! outbound adapter.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use serde_json::Value;

use super::schema::{workspace_documents, workspace_routes, workspace_settings, workspaces};

/// Row struct for reading the workspace aggregate root.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = workspaces)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct WorkspaceRow {
    pub id: String,
    pub project_id: String,
    pub owner_id: String,
    pub name: String,
    pub workspace_rev: i64,
    pub route_rev: i64,
    pub op_seq: i64,
    pub tree_root_id: String,
    pub tree_json: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for the bootstrap workspace row. Revisions start at 1.
#[derive(Debug, Insertable)]
#[diesel(table_name = workspaces)]
pub(crate) struct NewWorkspaceRow<'a> {
    pub id: &'a str,
    pub project_id: &'a str,
    pub owner_id: &'a str,
    pub name: &'a str,
    pub workspace_rev: i64,
    pub route_rev: i64,
    pub op_seq: i64,
    pub tree_root_id: &'a str,
    pub tree_json: &'a Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row struct for reading the route manifest blob.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = workspace_routes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RouteRow {
    #[expect(dead_code, reason = "schema column read alongside the manifest")]
    pub workspace_id: String,
    pub manifest_json: Value,
    #[expect(dead_code, reason = "schema column read alongside the manifest")]
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for the bootstrap route manifest row.
#[derive(Debug, Insertable)]
#[diesel(table_name = workspace_routes)]
pub(crate) struct NewRouteRow<'a> {
    pub workspace_id: &'a str,
    pub manifest_json: &'a Value,
    pub updated_at: DateTime<Utc>,
}

/// Row struct for reading the settings blob.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = workspace_settings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SettingsRow {
    #[expect(dead_code, reason = "schema column read alongside the settings")]
    pub workspace_id: String,
    pub settings_json: Value,
    #[expect(dead_code, reason = "schema column read alongside the settings")]
    pub updated_at: DateTime<Utc>,
}

/// Row struct for reading documents.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = workspace_documents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct DocumentRow {
    pub workspace_id: String,
    pub id: String,
    pub doc_type: String,
    pub name: String,
    pub path: String,
    pub content_rev: i64,
    pub meta_rev: i64,
    pub content_json: Value,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for seeding documents. Revisions start at 1.
#[derive(Debug, Insertable)]
#[diesel(table_name = workspace_documents)]
pub(crate) struct NewDocumentRow<'a> {
    pub workspace_id: &'a str,
    pub id: &'a str,
    pub doc_type: &'a str,
    pub name: &'a str,
    pub path: &'a str,
    pub content_rev: i64,
    pub meta_rev: i64,
    pub content_json: &'a Value,
    pub updated_at: DateTime<Utc>,
}

/// Result row of the joined document + workspace `FOR UPDATE` lock.
///
/// Raw SQL because the query builder cannot express `FOR UPDATE OF d, w`;
/// both rows must be locked in one statement to avoid lock-order inversion.
#[derive(Debug, QueryableByName)]
pub(crate) struct DocumentLockRow {
    #[diesel(sql_type = BigInt)]
    pub content_rev: i64,
    #[diesel(sql_type = BigInt)]
    pub meta_rev: i64,
    #[diesel(sql_type = BigInt)]
    pub workspace_rev: i64,
    #[diesel(sql_type = BigInt)]
    pub route_rev: i64,
    #[diesel(sql_type = BigInt)]
    pub op_seq: i64,
}
