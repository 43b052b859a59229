//! Default notifier that writes notifications to the tracing log.

use async_trait::async_trait;
use tracing::info;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ApprovalRequest, Identity};
use crate::domain::ports::Notifier;

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(&self, request: &ApprovalRequest, approvers: &[Identity]) -> DomainResult<()> {
        for approver in approvers {
            info!(
                request_id = %request.id,
                form_id = %request.form_id,
                applicant = %request.applicant.identity,
                approver = %approver,
                step = request.current_step().map(|s| s.order),
                "approval requested"
            );
        }
        Ok(())
    }
}
