//! PostgreSQL-backed [`WorkspaceStore`] implementation using Diesel.
//!
//! Every mutation primitive is one serial transaction: lock the affected
//! rows, check expected revisions, write, bump revisions, append one
//! operation log entry, commit. Row-level locks on the workspace row
//! serialize all mutations of a workspace, which keeps `op_seq` gap-free.
//!
//! The document primitive locks the document row *and* its workspace row in
//! a single joined `SELECT … FOR UPDATE OF d, w`; the query builder cannot
//! express the `OF` list, so that one statement is raw SQL.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel::upsert::excluded;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde_json::Value;
use tracing::warn;

use crate::domain::ports::{
    DocumentSave, NewDocument, NewWorkspace, RouteManifestSave, SettingsSave, WorkspaceStore,
    WorkspaceStoreError,
};
use crate::domain::workspace::{
    default_route_manifest, default_settings, DocumentRecord, DocumentRevision, DocumentType,
    MutationResult, RevisionConflict, WorkspaceRecord, WorkspaceSnapshot,
};

use super::error_mapping::map_pool_error;
use super::models::{
    DocumentLockRow, DocumentRow, NewDocumentRow, NewRouteRow, NewWorkspaceRow, RouteRow,
    SettingsRow, WorkspaceRow,
};
use super::pool::DbPool;
use super::schema::{
    workspace_documents, workspace_operations, workspace_routes, workspace_settings, workspaces,
};

/// Upper bound for one primitive's transaction, checkout included.
const STORE_DEADLINE: Duration = Duration::from_secs(5);

const LOCK_DOCUMENT_AND_WORKSPACE: &str = "SELECT d.content_rev, d.meta_rev, w.workspace_rev, \
     w.route_rev, w.op_seq \
     FROM workspace_documents d \
     JOIN workspaces w ON w.id = d.workspace_id \
     WHERE d.workspace_id = $1 AND d.id = $2 \
     FOR UPDATE OF d, w";

/// Diesel-backed implementation of the [`WorkspaceStore`] port.
#[derive(Clone)]
pub struct DieselWorkspaceStore {
    pool: DbPool,
}

impl DieselWorkspaceStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn with_deadline<T>(
        &self,
        work: impl std::future::Future<Output = Result<T, WorkspaceStoreError>>,
    ) -> Result<T, WorkspaceStoreError> {
        tokio::time::timeout(STORE_DEADLINE, work)
            .await
            .map_err(|_| WorkspaceStoreError::Timeout)?
    }
}

fn row_to_workspace(row: WorkspaceRow) -> WorkspaceRecord {
    WorkspaceRecord {
        id: row.id,
        project_id: row.project_id,
        owner_id: row.owner_id,
        name: row.name,
        workspace_rev: row.workspace_rev,
        route_rev: row.route_rev,
        op_seq: row.op_seq,
        tree_root_id: row.tree_root_id,
        tree: row.tree_json,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn row_to_document(row: DocumentRow) -> Result<DocumentRecord, WorkspaceStoreError> {
    let doc_type = DocumentType::parse(&row.doc_type).ok_or_else(|| {
        WorkspaceStoreError::query(format!(
            "unknown document type {:?} for document {}",
            row.doc_type, row.id
        ))
    })?;
    Ok(DocumentRecord {
        workspace_id: row.workspace_id,
        id: row.id,
        doc_type,
        name: row.name,
        path: row.path,
        content_rev: row.content_rev,
        meta_rev: row.meta_rev,
        content: row.content_json,
        updated_at: row.updated_at,
    })
}

/// Serialize a command envelope into the log payload column.
fn command_payload(
    command: &crate::domain::workspace::CommandEnvelope,
) -> Result<Value, WorkspaceStoreError> {
    serde_json::to_value(command)
        .map_err(|err| WorkspaceStoreError::query(format!("serialise command envelope: {err}")))
}

async fn append_operation(
    conn: &mut AsyncPgConnection,
    workspace_id: &str,
    op_seq: i64,
    domain: &str,
    document_id: Option<&str>,
    payload: &Value,
    created_at: DateTime<Utc>,
) -> Result<(), diesel::result::Error> {
    diesel::insert_into(workspace_operations::table)
        .values((
            workspace_operations::workspace_id.eq(workspace_id),
            workspace_operations::op_seq.eq(op_seq),
            workspace_operations::domain.eq(domain),
            workspace_operations::document_id.eq(document_id),
            workspace_operations::payload_json.eq(payload),
            workspace_operations::created_at.eq(created_at),
        ))
        .execute(conn)
        .await
        .map(|_| ())
}

/// Lock the workspace row alone and return its revision triple.
async fn lock_workspace(
    conn: &mut AsyncPgConnection,
    workspace_id: &str,
) -> Result<(i64, i64, i64), WorkspaceStoreError> {
    workspaces::table
        .filter(workspaces::id.eq(workspace_id))
        .select((workspaces::workspace_rev, workspaces::route_rev, workspaces::op_seq))
        .for_update()
        .first::<(i64, i64, i64)>(conn)
        .await
        .optional()?
        .ok_or(WorkspaceStoreError::WorkspaceNotFound)
}

#[async_trait]
impl WorkspaceStore for DieselWorkspaceStore {
    async fn get_snapshot(
        &self,
        workspace_id: &str,
    ) -> Result<WorkspaceSnapshot, WorkspaceStoreError> {
        let workspace_id = workspace_id.trim().to_owned();
        if workspace_id.is_empty() {
            return Err(WorkspaceStoreError::WorkspaceNotFound);
        }

        self.with_deadline(async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            // One transaction so all reads observe a consistent MVCC
            // snapshot while concurrent mutations commit.
            conn.transaction::<WorkspaceSnapshot, WorkspaceStoreError, _>(|conn| {
                async move {
                    let workspace: Option<WorkspaceRow> = workspaces::table
                        .filter(workspaces::id.eq(&workspace_id))
                        .select(WorkspaceRow::as_select())
                        .first(conn)
                        .await
                        .optional()?;
                    let workspace =
                        workspace.ok_or(WorkspaceStoreError::WorkspaceNotFound)?;

                    let route: Option<RouteRow> = workspace_routes::table
                        .filter(workspace_routes::workspace_id.eq(&workspace_id))
                        .select(RouteRow::as_select())
                        .first(conn)
                        .await
                        .optional()?;
                    let settings: Option<SettingsRow> = workspace_settings::table
                        .filter(workspace_settings::workspace_id.eq(&workspace_id))
                        .select(SettingsRow::as_select())
                        .first(conn)
                        .await
                        .optional()?;
                    let documents: Vec<DocumentRow> = workspace_documents::table
                        .filter(workspace_documents::workspace_id.eq(&workspace_id))
                        .order_by(workspace_documents::path.asc())
                        .select(DocumentRow::as_select())
                        .load(conn)
                        .await?;

                    Ok(WorkspaceSnapshot {
                        workspace: row_to_workspace(workspace),
                        route_manifest: route
                            .map(|row| row.manifest_json)
                            .unwrap_or_else(default_route_manifest),
                        settings: settings
                            .map(|row| row.settings_json)
                            .unwrap_or_else(default_settings),
                        documents: documents
                            .into_iter()
                            .map(row_to_document)
                            .collect::<Result<Vec<_>, _>>()?,
                    })
                }
                .scope_boxed()
            })
            .await
        })
        .await
    }

    async fn create_workspace(&self, params: NewWorkspace) -> Result<(), WorkspaceStoreError> {
        let now = Utc::now();
        self.with_deadline(async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            conn.transaction::<(), WorkspaceStoreError, _>(|conn| {
                async move {
                    diesel::insert_into(workspaces::table)
                        .values(&NewWorkspaceRow {
                            id: &params.workspace_id,
                            project_id: &params.project_id,
                            owner_id: &params.owner_id,
                            name: &params.name,
                            workspace_rev: 1,
                            route_rev: 1,
                            op_seq: 1,
                            tree_root_id: "root",
                            tree_json: &params.tree,
                            created_at: now,
                            updated_at: now,
                        })
                        .execute(conn)
                        .await?;
                    diesel::insert_into(workspace_routes::table)
                        .values(&NewRouteRow {
                            workspace_id: &params.workspace_id,
                            manifest_json: &params.route_manifest,
                            updated_at: now,
                        })
                        .execute(conn)
                        .await?;
                    Ok(())
                }
                .scope_boxed()
            })
            .await
        })
        .await
    }

    async fn create_document(&self, params: NewDocument) -> Result<(), WorkspaceStoreError> {
        self.with_deadline(async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            diesel::insert_into(workspace_documents::table)
                .values(&NewDocumentRow {
                    workspace_id: &params.workspace_id,
                    id: &params.document_id,
                    doc_type: params.doc_type.as_str(),
                    name: &params.name,
                    path: &params.path,
                    content_rev: 1,
                    meta_rev: 1,
                    content_json: &params.content,
                    updated_at: Utc::now(),
                })
                .execute(&mut conn)
                .await
                .map(|_| ())
                .map_err(Into::into)
        })
        .await
    }

    async fn save_document_content(
        &self,
        params: DocumentSave,
    ) -> Result<MutationResult, WorkspaceStoreError> {
        let payload = command_payload(&params.command)?;
        let issued_at = params.command.issued_at.unwrap_or_else(Utc::now);
        let domain = params.command.domain();
        let DocumentSave {
            workspace_id,
            document_id,
            expected_content_rev,
            content,
            ..
        } = params;

        self.with_deadline(async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            conn.transaction::<MutationResult, WorkspaceStoreError, _>(|conn| {
                async move {
                    let lock: Option<DocumentLockRow> =
                        diesel::sql_query(LOCK_DOCUMENT_AND_WORKSPACE)
                            .bind::<Text, _>(workspace_id.clone())
                            .bind::<Text, _>(document_id.clone())
                            .get_result(conn)
                            .await
                            .optional()?;

                    let Some(lock) = lock else {
                        // Joined row missing: a second lookup distinguishes
                        // the absent workspace from the absent document.
                        let exists: Option<String> = workspaces::table
                            .filter(workspaces::id.eq(&workspace_id))
                            .select(workspaces::id)
                            .first(conn)
                            .await
                            .optional()?;
                        return Err(match exists {
                            Some(_) => WorkspaceStoreError::DocumentNotFound,
                            None => WorkspaceStoreError::WorkspaceNotFound,
                        });
                    };

                    if lock.content_rev != expected_content_rev {
                        warn!(
                            workspace = %workspace_id,
                            document = %document_id,
                            expected_content_rev,
                            server_content_rev = lock.content_rev,
                            server_workspace_rev = lock.workspace_rev,
                            server_route_rev = lock.route_rev,
                            server_op_seq = lock.op_seq,
                            "document save conflict"
                        );
                        return Err(WorkspaceStoreError::Conflict(RevisionConflict::document(
                            workspace_id,
                            DocumentRevision {
                                id: document_id,
                                content_rev: lock.content_rev,
                                meta_rev: lock.meta_rev,
                            },
                            lock.workspace_rev,
                            lock.route_rev,
                            lock.op_seq,
                        )));
                    }

                    let (next_content_rev, next_meta_rev): (i64, i64) = diesel::update(
                        workspace_documents::table.filter(
                            workspace_documents::workspace_id
                                .eq(&workspace_id)
                                .and(workspace_documents::id.eq(&document_id)),
                        ),
                    )
                    .set((
                        workspace_documents::content_json.eq(&content),
                        workspace_documents::content_rev.eq(workspace_documents::content_rev + 1),
                        workspace_documents::updated_at.eq(diesel::dsl::now),
                    ))
                    .returning((
                        workspace_documents::content_rev,
                        workspace_documents::meta_rev,
                    ))
                    .get_result(conn)
                    .await?;

                    // Document edits advance the log sequence only.
                    let (workspace_rev, route_rev, op_seq): (i64, i64, i64) =
                        diesel::update(workspaces::table.filter(workspaces::id.eq(&workspace_id)))
                            .set((
                                workspaces::op_seq.eq(workspaces::op_seq + 1),
                                workspaces::updated_at.eq(diesel::dsl::now),
                            ))
                            .returning((
                                workspaces::workspace_rev,
                                workspaces::route_rev,
                                workspaces::op_seq,
                            ))
                            .get_result(conn)
                            .await?;

                    append_operation(
                        conn,
                        &workspace_id,
                        op_seq,
                        &domain,
                        Some(&document_id),
                        &payload,
                        issued_at,
                    )
                    .await?;

                    Ok(MutationResult {
                        workspace_id,
                        workspace_rev,
                        route_rev,
                        op_seq,
                        updated_documents: vec![DocumentRevision {
                            id: document_id,
                            content_rev: next_content_rev,
                            meta_rev: next_meta_rev,
                        }],
                    })
                }
                .scope_boxed()
            })
            .await
        })
        .await
    }

    async fn save_route_manifest(
        &self,
        params: RouteManifestSave,
    ) -> Result<MutationResult, WorkspaceStoreError> {
        let payload = command_payload(&params.command)?;
        let issued_at = params.command.issued_at.unwrap_or_else(Utc::now);
        let domain = params.command.domain();
        let RouteManifestSave {
            workspace_id,
            expected_workspace_rev,
            expected_route_rev,
            manifest,
            ..
        } = params;

        self.with_deadline(async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            conn.transaction::<MutationResult, WorkspaceStoreError, _>(|conn| {
                async move {
                    let (current_workspace_rev, current_route_rev, current_op_seq) =
                        lock_workspace(conn, &workspace_id).await?;

                    // Workspace revision is checked first: it wins even when
                    // the route revision would also mismatch.
                    if current_workspace_rev != expected_workspace_rev {
                        warn!(
                            workspace = %workspace_id,
                            expected_workspace_rev,
                            server_workspace_rev = current_workspace_rev,
                            server_route_rev = current_route_rev,
                            server_op_seq = current_op_seq,
                            "route manifest save conflict on workspace revision"
                        );
                        return Err(WorkspaceStoreError::Conflict(RevisionConflict::workspace(
                            workspace_id,
                            current_workspace_rev,
                            current_route_rev,
                            current_op_seq,
                        )));
                    }
                    if current_route_rev != expected_route_rev {
                        warn!(
                            workspace = %workspace_id,
                            expected_route_rev,
                            server_workspace_rev = current_workspace_rev,
                            server_route_rev = current_route_rev,
                            server_op_seq = current_op_seq,
                            "route manifest save conflict on route revision"
                        );
                        return Err(WorkspaceStoreError::Conflict(RevisionConflict::route(
                            workspace_id,
                            current_workspace_rev,
                            current_route_rev,
                            current_op_seq,
                        )));
                    }

                    diesel::insert_into(workspace_routes::table)
                        .values((
                            workspace_routes::workspace_id.eq(&workspace_id),
                            workspace_routes::manifest_json.eq(&manifest),
                            workspace_routes::updated_at.eq(diesel::dsl::now),
                        ))
                        .on_conflict(workspace_routes::workspace_id)
                        .do_update()
                        .set((
                            workspace_routes::manifest_json
                                .eq(excluded(workspace_routes::manifest_json)),
                            workspace_routes::updated_at
                                .eq(excluded(workspace_routes::updated_at)),
                        ))
                        .execute(conn)
                        .await?;

                    let (workspace_rev, route_rev, op_seq): (i64, i64, i64) =
                        diesel::update(workspaces::table.filter(workspaces::id.eq(&workspace_id)))
                            .set((
                                workspaces::workspace_rev.eq(workspaces::workspace_rev + 1),
                                workspaces::route_rev.eq(workspaces::route_rev + 1),
                                workspaces::op_seq.eq(workspaces::op_seq + 1),
                                workspaces::updated_at.eq(diesel::dsl::now),
                            ))
                            .returning((
                                workspaces::workspace_rev,
                                workspaces::route_rev,
                                workspaces::op_seq,
                            ))
                            .get_result(conn)
                            .await?;

                    append_operation(conn, &workspace_id, op_seq, &domain, None, &payload, issued_at)
                        .await?;

                    Ok(MutationResult {
                        workspace_id,
                        workspace_rev,
                        route_rev,
                        op_seq,
                        updated_documents: Vec::new(),
                    })
                }
                .scope_boxed()
            })
            .await
        })
        .await
    }

    async fn save_workspace_settings(
        &self,
        params: SettingsSave,
    ) -> Result<MutationResult, WorkspaceStoreError> {
        let payload = command_payload(&params.command)?;
        let issued_at = params.command.issued_at.unwrap_or_else(Utc::now);
        let domain = params.command.domain();
        let SettingsSave {
            workspace_id,
            expected_workspace_rev,
            settings,
            ..
        } = params;

        self.with_deadline(async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            conn.transaction::<MutationResult, WorkspaceStoreError, _>(|conn| {
                async move {
                    let (current_workspace_rev, current_route_rev, current_op_seq) =
                        lock_workspace(conn, &workspace_id).await?;

                    if current_workspace_rev != expected_workspace_rev {
                        warn!(
                            workspace = %workspace_id,
                            expected_workspace_rev,
                            server_workspace_rev = current_workspace_rev,
                            server_route_rev = current_route_rev,
                            server_op_seq = current_op_seq,
                            "settings save conflict on workspace revision"
                        );
                        return Err(WorkspaceStoreError::Conflict(RevisionConflict::workspace(
                            workspace_id,
                            current_workspace_rev,
                            current_route_rev,
                            current_op_seq,
                        )));
                    }

                    diesel::insert_into(workspace_settings::table)
                        .values((
                            workspace_settings::workspace_id.eq(&workspace_id),
                            workspace_settings::settings_json.eq(&settings),
                            workspace_settings::updated_at.eq(diesel::dsl::now),
                        ))
                        .on_conflict(workspace_settings::workspace_id)
                        .do_update()
                        .set((
                            workspace_settings::settings_json
                                .eq(excluded(workspace_settings::settings_json)),
                            workspace_settings::updated_at
                                .eq(excluded(workspace_settings::updated_at)),
                        ))
                        .execute(conn)
                        .await?;

                    // Settings bump the workspace revision; the route
                    // revision is untouched.
                    let (workspace_rev, route_rev, op_seq): (i64, i64, i64) =
                        diesel::update(workspaces::table.filter(workspaces::id.eq(&workspace_id)))
                            .set((
                                workspaces::workspace_rev.eq(workspaces::workspace_rev + 1),
                                workspaces::op_seq.eq(workspaces::op_seq + 1),
                                workspaces::updated_at.eq(diesel::dsl::now),
                            ))
                            .returning((
                                workspaces::workspace_rev,
                                workspaces::route_rev,
                                workspaces::op_seq,
                            ))
                            .get_result(conn)
                            .await?;

                    append_operation(conn, &workspace_id, op_seq, &domain, None, &payload, issued_at)
                        .await?;

                    Ok(MutationResult {
                        workspace_id,
                        workspace_rev,
                        route_rev,
                        op_seq,
                        updated_documents: Vec::new(),
                    })
                }
                .scope_boxed()
            })
            .await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn lock_statement_covers_both_rows() {
        assert!(LOCK_DOCUMENT_AND_WORKSPACE.contains("FOR UPDATE OF d, w"));
        assert!(LOCK_DOCUMENT_AND_WORKSPACE.contains("JOIN workspaces w"));
    }

    #[rstest]
    fn unknown_document_types_fail_row_conversion() {
        let row = DocumentRow {
            workspace_id: "ws_1".into(),
            id: "doc_1".into(),
            doc_type: "mir-unknown".into(),
            name: "Doc".into(),
            path: "/".into(),
            content_rev: 1,
            meta_rev: 1,
            content_json: serde_json::json!({}),
            updated_at: Utc::now(),
        };
        let err = row_to_document(row).expect_err("unknown type rejected");
        assert!(matches!(err, WorkspaceStoreError::Query { .. }));
        assert!(err.to_string().contains("mir-unknown"));
    }

    #[rstest]
    fn workspace_rows_map_field_for_field() {
        let now = Utc::now();
        let record = row_to_workspace(WorkspaceRow {
            id: "ws_1".into(),
            project_id: "prj_1".into(),
            owner_id: "user_1".into(),
            name: "Workspace".into(),
            workspace_rev: 9,
            route_rev: 4,
            op_seq: 33,
            tree_root_id: "root".into(),
            tree_json: serde_json::json!({ "rootId": "root", "nodes": [] }),
            created_at: now,
            updated_at: now,
        });
        assert_eq!(record.id, "ws_1");
        assert_eq!(record.workspace_rev, 9);
        assert_eq!(record.route_rev, 4);
        assert_eq!(record.op_seq, 33);
        assert_eq!(record.tree["rootId"], "root");
    }
}
