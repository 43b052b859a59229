//! Workflow template repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::WorkflowTemplate;

/// Repository interface for workflow templates, keyed by form.
#[async_trait]
pub trait WorkflowTemplateRepository: Send + Sync {
    /// Get the workflow of a form.
    async fn get(&self, form_id: &str) -> DomainResult<Option<WorkflowTemplate>>;

    /// Store a workflow, replacing any previous one for the same form.
    async fn replace(&self, template: &WorkflowTemplate) -> DomainResult<()>;
}
