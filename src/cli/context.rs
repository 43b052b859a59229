//! Wiring of adapters and services for CLI commands.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::adapters::sqlite::{
    initialize_database, SqliteApprovalRepository, SqliteDirectory, SqliteFormRepository,
    SqliteLeaveBalanceRepository, SqliteWorkflowTemplateRepository,
};
use crate::domain::models::Config;
use crate::services::{ApprovalService, EffectRegistry, LeaveDeductionEffect, WorkflowAdminService};

pub type CliApprovalService = ApprovalService<
    SqliteApprovalRepository,
    SqliteWorkflowTemplateRepository,
    SqliteFormRepository,
    SqliteDirectory,
>;

pub type CliAdminService = WorkflowAdminService<SqliteFormRepository, SqliteWorkflowTemplateRepository>;

pub struct AppContext {
    pub config: Config,
    pub pool: SqlitePool,
}

impl AppContext {
    pub async fn open(config: Config) -> Result<Self> {
        let pool = initialize_database(&config.database)
            .await
            .with_context(|| format!("Failed to open database at {}. Run 'approvals init' first.", config.database.path))?;
        Ok(Self { config, pool })
    }

    pub fn directory(&self) -> SqliteDirectory {
        SqliteDirectory::new(self.pool.clone())
    }

    pub fn admin(&self) -> CliAdminService {
        WorkflowAdminService::new(
            Arc::new(SqliteFormRepository::new(self.pool.clone())),
            Arc::new(SqliteWorkflowTemplateRepository::new(self.pool.clone())),
        )
    }

    /// Every built-in terminal effect.
    pub fn effects(&self) -> EffectRegistry {
        let balances = Arc::new(SqliteLeaveBalanceRepository::new(self.pool.clone()));
        EffectRegistry::new().with(Arc::new(LeaveDeductionEffect::new(balances)))
    }

    pub fn approvals(&self) -> CliApprovalService {
        ApprovalService::new(
            Arc::new(SqliteApprovalRepository::new(self.pool.clone())),
            Arc::new(SqliteWorkflowTemplateRepository::new(self.pool.clone())),
            Arc::new(SqliteFormRepository::new(self.pool.clone())),
            Arc::new(self.directory()),
        )
        .with_effects(self.effects())
        .with_engine_config(self.config.engine.clone())
    }
}
