//! SQLite adapters for the approval engine.

pub mod approval_repository;
pub mod connection;
pub mod directory;
pub mod form_repository;
pub mod leave_balance_repository;
pub mod migrations;
pub mod workflow_template_repository;

pub use approval_repository::SqliteApprovalRepository;
pub use connection::{create_pool, create_test_pool, ConnectionError};
pub use directory::{DepartmentRecord, DirectorySnapshot, EmployeeRecord, SqliteDirectory, SubUnitRecord};
pub use form_repository::SqliteFormRepository;
pub use leave_balance_repository::SqliteLeaveBalanceRepository;
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator};
pub use workflow_template_repository::SqliteWorkflowTemplateRepository;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::DatabaseConfig;

/// Parse a UUID string from a SQLite row field.
pub fn parse_uuid(s: &str) -> DomainResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DomainError::SerializationError(e.to_string()))
}

/// Parse an RFC3339 datetime string from a SQLite row field.
pub fn parse_datetime(s: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map_err(|e| DomainError::SerializationError(e.to_string()))
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a JSON column.
pub fn parse_json<T: serde::de::DeserializeOwned>(s: &str) -> DomainResult<T> {
    serde_json::from_str(s).map_err(|e| DomainError::SerializationError(e.to_string()))
}

/// `?, ?, ?` for an `IN (...)` clause of `n` bindings.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),
}

/// Open the configured database and bring its schema up to date.
pub async fn initialize_database(config: &DatabaseConfig) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(config).await?;
    Migrator::new(pool.clone()).run(&all_embedded_migrations()).await?;
    Ok(pool)
}

/// Create an in-memory test pool with all migrations applied.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, DatabaseError> {
    let pool = create_test_pool().await?;
    Migrator::new(pool.clone()).run(&all_embedded_migrations()).await?;
    Ok(pool)
}
