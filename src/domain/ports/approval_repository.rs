//! Approval request repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ApprovalRequest, Identity, RequestStatus};

/// Filter criteria for listing approval requests.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub applicant: Option<Identity>,
    pub form_id: Option<String>,
}

/// Repository interface for approval request persistence.
///
/// Requests are written as whole documents. `update` is a conditional write
/// keyed on `request.version`: it succeeds only if the stored version still
/// equals the in-memory one, and fails with
/// [`DomainError::ConcurrencyConflict`](crate::domain::errors::DomainError::ConcurrencyConflict)
/// otherwise.
#[async_trait]
pub trait ApprovalRepository: Send + Sync {
    /// Insert a new request.
    async fn create(&self, request: &ApprovalRequest) -> DomainResult<()>;

    /// Get a request by ID.
    async fn get(&self, id: Uuid) -> DomainResult<Option<ApprovalRequest>>;

    /// Conditionally update a request; returns the new stored version.
    async fn update(&self, request: &ApprovalRequest) -> DomainResult<u64>;

    /// List requests matching the filter, newest first.
    async fn list(&self, filter: RequestFilter) -> DomainResult<Vec<ApprovalRequest>>;

    /// Pending requests whose current step awaits a decision from `actor`.
    async fn list_pending_for(&self, actor: &Identity) -> DomainResult<Vec<ApprovalRequest>>;
}
