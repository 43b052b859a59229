//! SQLite implementation of the WorkflowTemplateRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::{parse_datetime, parse_json};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::WorkflowTemplate;
use crate::domain::ports::WorkflowTemplateRepository;

#[derive(Clone)]
pub struct SqliteWorkflowTemplateRepository {
    pool: SqlitePool,
}

impl SqliteWorkflowTemplateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowTemplateRepository for SqliteWorkflowTemplateRepository {
    async fn get(&self, form_id: &str) -> DomainResult<Option<WorkflowTemplate>> {
        let row: Option<WorkflowTemplateRow> =
            sqlx::query_as("SELECT form_id, steps, overdue, updated_at FROM workflow_templates WHERE form_id = ?")
                .bind(form_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn replace(&self, template: &WorkflowTemplate) -> DomainResult<()> {
        let overdue = template.overdue.as_ref().map(serde_json::to_string).transpose()?;

        sqlx::query(
            r#"INSERT INTO workflow_templates (form_id, steps, overdue, updated_at) VALUES (?, ?, ?, ?)
               ON CONFLICT(form_id) DO UPDATE SET steps = excluded.steps, overdue = excluded.overdue,
               updated_at = excluded.updated_at"#,
        )
        .bind(&template.form_id)
        .bind(serde_json::to_string(&template.steps)?)
        .bind(overdue)
        .bind(template.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct WorkflowTemplateRow {
    form_id: String,
    steps: String,
    overdue: Option<String>,
    updated_at: String,
}

impl TryFrom<WorkflowTemplateRow> for WorkflowTemplate {
    type Error = DomainError;

    fn try_from(row: WorkflowTemplateRow) -> Result<Self, Self::Error> {
        Ok(WorkflowTemplate {
            form_id: row.form_id,
            steps: parse_json(&row.steps)?,
            overdue: row.overdue.as_deref().map(parse_json).transpose()?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}
