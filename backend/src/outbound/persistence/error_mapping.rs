//! Error mapping from pool and Diesel failures to port error enums.

use tracing::debug;

use crate::domain::ports::{ProjectCatalogError, WorkspaceStoreError};

use super::pool::PoolError;

/// Map pool errors to workspace store errors.
pub(crate) fn map_pool_error(error: PoolError) -> WorkspaceStoreError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            WorkspaceStoreError::connection(message)
        }
    }
}

/// Map pool errors to project catalog errors.
pub(crate) fn map_catalog_pool_error(error: PoolError) -> ProjectCatalogError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            ProjectCatalogError::connection(message)
        }
    }
}

/// Map Diesel errors to project catalog errors.
pub(crate) fn map_catalog_diesel_error(error: diesel::result::Error) -> ProjectCatalogError {
    debug!(error = %error, "project catalog query failed");
    match error {
        diesel::result::Error::NotFound => ProjectCatalogError::query("record not found"),
        _ => ProjectCatalogError::query("database error"),
    }
}

/// Diesel errors convert directly so transaction closures can use `?`.
///
/// `UniqueViolation` becomes [`WorkspaceStoreError::DuplicateKey`]; bootstrap
/// idempotency depends on that distinction.
impl From<diesel::result::Error> for WorkspaceStoreError {
    fn from(error: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error as DieselError};

        match &error {
            DieselError::DatabaseError(kind, info) => {
                debug!(?kind, message = info.message(), "diesel operation failed");
            }
            other => {
                debug!(error = %other, "diesel operation failed");
            }
        }

        match error {
            DieselError::NotFound => Self::query("record not found"),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::duplicate_key(info.message().to_owned())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
                Self::connection("database connection error")
            }
            DieselError::DatabaseError(_, _) => Self::query("database error"),
            _ => Self::query("database error"),
        }
    }
}
