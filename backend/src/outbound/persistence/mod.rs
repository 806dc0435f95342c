//! Outbound persistence adapters (Diesel + PostgreSQL).

mod diesel_project_catalog;
mod diesel_workspace_store;
mod error_mapping;
mod models;
pub mod pool;
pub mod schema;

pub use diesel_project_catalog::DieselProjectCatalog;
pub use diesel_workspace_store::DieselWorkspaceStore;
pub use pool::{DbPool, PoolConfig, PoolError};
