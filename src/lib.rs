//! Approval Engine - multi-step approval workflows for HR requests
//!
//! Forms are bound to workflow templates. Submitting a form compiles the
//! template against the organization directory into a concrete chain of
//! approval steps, which approvers then approve, reject or return until the
//! request reaches a terminal state. Approval of the final step runs the
//! form's terminal effect, such as deducting a leave balance.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Request state machine, models and ports
//! - **Service Layer** (`services`): Step compilation, advancement and use cases
//! - **Adapters** (`adapters`): SQLite persistence and directory
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use approval_engine::adapters::sqlite::{create_migrated_test_pool, SqliteDirectory};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = create_migrated_test_pool().await?;
//!     let directory = SqliteDirectory::new(pool.clone());
//!     // Import a snapshot, register forms, then submit through ApprovalService
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    ApplicantContext, ApprovalRequest, Config, DatabaseConfig, EngineConfig, FormTemplate, Identity,
    LoggingConfig, RequestStatus, WorkflowTemplate,
};
pub use domain::ports::{ApprovalRepository, Directory, RequestFilter, TerminalEffect};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ApprovalService, StepCompiler, WorkflowAdminService};
