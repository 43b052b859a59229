//! Terminal effect port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::ApprovalRequest;

/// Domain side effect run once when a request is approved.
///
/// Implementations receive the committed, approved request. A returned error
/// is recorded on the request's audit trail; the approval itself stands.
#[async_trait]
pub trait TerminalEffect: Send + Sync {
    /// Short name used in audit entries.
    fn name(&self) -> &str;

    async fn apply(&self, request: &ApprovalRequest) -> DomainResult<()>;
}
