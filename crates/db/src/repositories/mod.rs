//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Each one implements a `residia_core::store` trait.

pub mod billing;
mod community;
pub mod ledger;
mod mapping;

pub use billing::BillingRepository;
pub use ledger::LedgerRepository;

use residia_core::store::StoreError;
use sea_orm::DbErr;

/// Error types for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<RepositoryError> for StoreError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Database(err) => match err {
                DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => Self::Unavailable(err.to_string()),
                DbErr::Type(_) | DbErr::TryIntoErr { .. } | DbErr::Json(_) => {
                    Self::Mapping(err.to_string())
                }
                _ => Self::Query(err.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_errors_map_to_query() {
        let err = RepositoryError::from(DbErr::RecordNotInserted);
        assert!(matches!(StoreError::from(err), StoreError::Query(_)));
    }

    #[test]
    fn test_type_errors_map_to_mapping() {
        let err = RepositoryError::from(DbErr::Type("numeric overflow".to_string()));
        assert!(matches!(StoreError::from(err), StoreError::Mapping(_)));
    }
}
