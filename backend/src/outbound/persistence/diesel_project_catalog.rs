//! PostgreSQL-backed [`ProjectCatalog`] implementation using Diesel.
//!
//! The catalog is owned by the project collaborator; this adapter reads the
//! slice the engine needs for bootstrap and writes the MIR mirror column
//! after accepted mutations.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::Value;

use crate::domain::ports::{ProjectCatalog, ProjectCatalogError, ProjectSeed};
use crate::domain::workspace::default_mir_document;

use super::error_mapping::{map_catalog_diesel_error, map_catalog_pool_error};
use super::pool::DbPool;
use super::schema::projects;

/// Diesel-backed implementation of the [`ProjectCatalog`] port.
#[derive(Clone)]
pub struct DieselProjectCatalog {
    pool: DbPool,
}

impl DieselProjectCatalog {
    /// Create a new catalog adapter with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectCatalog for DieselProjectCatalog {
    async fn find_owned(
        &self,
        owner_id: &str,
        project_id: &str,
    ) -> Result<Option<ProjectSeed>, ProjectCatalogError> {
        let mut conn = self.pool.get().await.map_err(map_catalog_pool_error)?;

        let row: Option<(String, String, String, Value)> = projects::table
            .filter(
                projects::owner_id
                    .eq(owner_id)
                    .and(projects::id.eq(project_id)),
            )
            .select((
                projects::id,
                projects::owner_id,
                projects::name,
                projects::mir_json,
            ))
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_catalog_diesel_error)?;

        Ok(row.map(|(id, owner_id, name, mir)| ProjectSeed {
            id,
            owner_id,
            name,
            mir: if mir.is_null() { default_mir_document() } else { mir },
        }))
    }

    async fn save_mir(
        &self,
        owner_id: &str,
        project_id: &str,
        mir: &Value,
    ) -> Result<(), ProjectCatalogError> {
        let mut conn = self.pool.get().await.map_err(map_catalog_pool_error)?;

        let updated = diesel::update(
            projects::table.filter(
                projects::owner_id
                    .eq(owner_id)
                    .and(projects::id.eq(project_id)),
            ),
        )
        .set((
            projects::mir_json.eq(mir),
            projects::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_catalog_diesel_error)?;

        if updated == 0 {
            return Err(ProjectCatalogError::query("project not found"));
        }
        Ok(())
    }
}
