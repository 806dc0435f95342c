//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the migrations under `backend/migrations/`
//! exactly; `diesel print-schema` can regenerate them from a live database.

diesel::table! {
    /// One row per workspace: the aggregate root with its revision counters.
    workspaces (id) {
        /// Opaque identifier, inherited from the enclosing project.
        id -> Text,
        project_id -> Text,
        owner_id -> Text,
        name -> Text,
        /// Bumped by workspace-level mutations (route, settings), never by
        /// document-content edits.
        workspace_rev -> Int8,
        /// Bumped only by route-manifest mutations, together with
        /// `workspace_rev`.
        route_rev -> Int8,
        /// Bumped by every accepted mutation; the per-workspace log sequence.
        op_seq -> Int8,
        tree_root_id -> Text,
        tree_json -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// 1:1 route manifest blob per workspace.
    workspace_routes (workspace_id) {
        workspace_id -> Text,
        manifest_json -> Jsonb,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// 1:1 settings blob per workspace; absent rows read as `{}`.
    workspace_settings (workspace_id) {
        workspace_id -> Text,
        settings_json -> Jsonb,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Editable JSON documents; `(workspace_id, path)` is unique.
    workspace_documents (workspace_id, id) {
        workspace_id -> Text,
        id -> Text,
        doc_type -> Text,
        name -> Text,
        path -> Text,
        content_rev -> Int8,
        meta_rev -> Int8,
        content_json -> Jsonb,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only operation log, `op_seq`-ordered within a workspace.
    workspace_operations (workspace_id, op_seq) {
        workspace_id -> Text,
        op_seq -> Int8,
        /// `namespace.type@version` of the accepted command.
        domain -> Text,
        document_id -> Nullable<Text>,
        payload_json -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Project catalog rows; owned by the catalog collaborator, read for
    /// bootstrap and written by the mirror sync.
    projects (id) {
        id -> Text,
        owner_id -> Text,
        resource_type -> Text,
        name -> Text,
        description -> Text,
        mir_json -> Jsonb,
        is_public -> Bool,
        stars_count -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    workspaces,
    workspace_routes,
    workspace_settings,
    workspace_documents,
    workspace_operations,
);
