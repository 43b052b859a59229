//! Leave balance repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Identity;

/// Per-employee remaining leave, by leave type, in days.
#[async_trait]
pub trait LeaveBalanceRepository: Send + Sync {
    /// Remaining days, or `None` if the employee has no balance of this type.
    async fn get(&self, employee: &Identity, leave_type: &str) -> DomainResult<Option<f64>>;

    /// Set the remaining days.
    async fn set(&self, employee: &Identity, leave_type: &str, days: f64) -> DomainResult<()>;

    /// Atomically subtract `days`; fails without change if the balance is
    /// missing or too small. Returns the remaining days.
    async fn deduct(&self, employee: &Identity, leave_type: &str, days: f64) -> DomainResult<f64>;
}
