//! Terminal effect that deducts approved leave from the applicant's balance.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::ApprovalRequest;
use crate::domain::ports::{LeaveBalanceRepository, TerminalEffect};

pub const LEAVE_DEDUCTION: &str = "leave_deduction";

/// Shape of the form data this effect reads.
#[derive(Debug, Deserialize)]
struct LeaveForm {
    leave_type: String,
    days: f64,
}

pub struct LeaveDeductionEffect<L: LeaveBalanceRepository> {
    balances: Arc<L>,
}

impl<L: LeaveBalanceRepository> LeaveDeductionEffect<L> {
    pub fn new(balances: Arc<L>) -> Self {
        Self { balances }
    }
}

#[async_trait]
impl<L: LeaveBalanceRepository + 'static> TerminalEffect for LeaveDeductionEffect<L> {
    fn name(&self) -> &str {
        LEAVE_DEDUCTION
    }

    async fn apply(&self, request: &ApprovalRequest) -> DomainResult<()> {
        let form: LeaveForm = serde_json::from_value(request.form_data.clone())
            .map_err(|e| DomainError::ValidationFailed(format!("invalid leave form data: {e}")))?;
        if !form.days.is_finite() || form.days <= 0.0 {
            return Err(DomainError::ValidationFailed(format!("invalid leave duration: {}", form.days)));
        }

        let employee = &request.applicant.identity;
        let remaining = self.balances.deduct(employee, &form.leave_type, form.days).await?;
        info!(
            request_id = %request.id,
            employee = %employee,
            leave_type = %form.leave_type,
            days = form.days,
            remaining,
            "deducted approved leave"
        );
        Ok(())
    }
}
