//! Administration of forms and their workflows.

use std::sync::Arc;

use tracing::info;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{FormTemplate, OverduePolicy, StepTemplate, WorkflowTemplate};
use crate::domain::ports::{FormRepository, WorkflowTemplateRepository};

pub struct WorkflowAdminService<F: FormRepository, W: WorkflowTemplateRepository> {
    forms: Arc<F>,
    templates: Arc<W>,
}

impl<F: FormRepository, W: WorkflowTemplateRepository> WorkflowAdminService<F, W> {
    pub fn new(forms: Arc<F>, templates: Arc<W>) -> Self {
        Self { forms, templates }
    }

    /// Register a form, or update its name and effect.
    pub async fn register_form(&self, form: FormTemplate) -> DomainResult<FormTemplate> {
        if form.id.trim().is_empty() {
            return Err(DomainError::ValidationFailed("Form id cannot be empty".to_string()));
        }
        self.forms.upsert(&form).await?;
        info!(form_id = %form.id, effect = ?form.effect, "form registered");
        Ok(form)
    }

    pub async fn list_forms(&self) -> DomainResult<Vec<FormTemplate>> {
        self.forms.list().await
    }

    /// Replace the whole workflow of a form.
    ///
    /// Steps are renumbered densely in the given order. Requests already
    /// submitted keep the steps they were compiled with.
    pub async fn set_workflow(
        &self,
        form_id: &str,
        steps: Vec<StepTemplate>,
        overdue: Option<OverduePolicy>,
    ) -> DomainResult<WorkflowTemplate> {
        if self.forms.get(form_id).await?.is_none() {
            return Err(DomainError::FormNotFound(form_id.to_string()));
        }

        let mut template = WorkflowTemplate::new(form_id, steps);
        template.overdue = overdue;
        template.validate().map_err(DomainError::ValidationFailed)?;

        self.templates.replace(&template).await?;
        info!(form_id, steps = template.steps.len(), "workflow replaced");
        Ok(template)
    }

    pub async fn get_workflow(&self, form_id: &str) -> DomainResult<WorkflowTemplate> {
        self.templates
            .get(form_id)
            .await?
            .ok_or_else(|| DomainError::WorkflowNotConfigured(form_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{
        create_migrated_test_pool, SqliteFormRepository, SqliteWorkflowTemplateRepository,
    };
    use crate::domain::models::{ApproverSelector, OverdueAction};

    async fn setup() -> WorkflowAdminService<SqliteFormRepository, SqliteWorkflowTemplateRepository> {
        let pool = create_migrated_test_pool().await.unwrap();
        WorkflowAdminService::new(
            Arc::new(SqliteFormRepository::new(pool.clone())),
            Arc::new(SqliteWorkflowTemplateRepository::new(pool)),
        )
    }

    #[tokio::test]
    async fn test_set_workflow_requires_form() {
        let admin = setup().await;
        let err = admin
            .set_workflow("leave", vec![StepTemplate::new(ApproverSelector::manager())], None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::FormNotFound(_)));
    }

    #[tokio::test]
    async fn test_replace_workflow_wholesale() {
        let admin = setup().await;
        admin.register_form(FormTemplate::new("leave", "Leave request")).await.unwrap();

        admin
            .set_workflow(
                "leave",
                vec![
                    StepTemplate::new(ApproverSelector::manager()),
                    StepTemplate::new(ApproverSelector::tag("HR")),
                ],
                Some(OverduePolicy { after_days: 3, action: OverdueAction::AutoPass }),
            )
            .await
            .unwrap();
        admin
            .set_workflow("leave", vec![StepTemplate::new(ApproverSelector::role("finance"))], None)
            .await
            .unwrap();

        let stored = admin.get_workflow("leave").await.unwrap();
        assert_eq!(stored.steps.len(), 1);
        assert_eq!(stored.steps[0].order, 1);
        assert_eq!(stored.overdue, None);
    }

    #[tokio::test]
    async fn test_missing_workflow_is_configuration_error() {
        let admin = setup().await;
        let err = admin.get_workflow("payroll").await.unwrap_err();
        assert!(matches!(err, DomainError::WorkflowNotConfigured(_)));
    }

    #[tokio::test]
    async fn test_register_form_rejects_blank_id() {
        let admin = setup().await;
        let err = admin.register_form(FormTemplate::new(" ", "x")).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
    }
}
