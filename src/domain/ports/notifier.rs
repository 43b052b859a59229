//! Approver notification port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ApprovalRequest, Identity};

/// Tells approvers that a request is waiting for them.
///
/// Delivery is fire-and-forget relative to the transition that made the
/// approvers eligible: errors are logged by the caller and never undo a
/// committed transition.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, request: &ApprovalRequest, approvers: &[Identity]) -> DomainResult<()>;
}
