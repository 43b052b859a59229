//! Form template repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::FormTemplate;

#[async_trait]
pub trait FormRepository: Send + Sync {
    /// Insert or replace a form.
    async fn upsert(&self, form: &FormTemplate) -> DomainResult<()>;

    async fn get(&self, id: &str) -> DomainResult<Option<FormTemplate>>;

    async fn list(&self) -> DomainResult<Vec<FormTemplate>>;
}
