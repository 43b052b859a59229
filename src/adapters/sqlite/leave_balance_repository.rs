//! SQLite implementation of the LeaveBalanceRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Identity;
use crate::domain::ports::LeaveBalanceRepository;

#[derive(Clone)]
pub struct SqliteLeaveBalanceRepository {
    pool: SqlitePool,
}

impl SqliteLeaveBalanceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeaveBalanceRepository for SqliteLeaveBalanceRepository {
    async fn get(&self, employee: &Identity, leave_type: &str) -> DomainResult<Option<f64>> {
        let days: Option<f64> =
            sqlx::query_scalar("SELECT days FROM leave_balances WHERE employee_id = ? AND leave_type = ?")
                .bind(employee.as_str())
                .bind(leave_type)
                .fetch_optional(&self.pool)
                .await?;
        Ok(days)
    }

    async fn set(&self, employee: &Identity, leave_type: &str, days: f64) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO leave_balances (employee_id, leave_type, days, updated_at) VALUES (?, ?, ?, ?)
               ON CONFLICT(employee_id, leave_type) DO UPDATE SET days = excluded.days,
               updated_at = excluded.updated_at"#,
        )
        .bind(employee.as_str())
        .bind(leave_type)
        .bind(days)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn deduct(&self, employee: &Identity, leave_type: &str, days: f64) -> DomainResult<f64> {
        // Single conditional statement so concurrent deductions cannot overdraw.
        let remaining: Option<f64> = sqlx::query_scalar(
            r#"UPDATE leave_balances SET days = days - ?, updated_at = ?
               WHERE employee_id = ? AND leave_type = ? AND days >= ?
               RETURNING days"#,
        )
        .bind(days)
        .bind(Utc::now().to_rfc3339())
        .bind(employee.as_str())
        .bind(leave_type)
        .bind(days)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(remaining) = remaining {
            return Ok(remaining);
        }
        match self.get(employee, leave_type).await? {
            Some(available) => Err(DomainError::ValidationFailed(format!(
                "insufficient {leave_type} balance for {employee}: {available} day(s) left, {days} requested"
            ))),
            None => Err(DomainError::ValidationFailed(format!(
                "{employee} has no {leave_type} balance"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup_test_repo() -> SqliteLeaveBalanceRepository {
        SqliteLeaveBalanceRepository::new(create_migrated_test_pool().await.unwrap())
    }

    #[tokio::test]
    async fn test_set_and_deduct() {
        let repo = setup_test_repo().await;
        let employee = Identity::new("A1");
        repo.set(&employee, "annual", 5.0).await.unwrap();

        assert_eq!(repo.deduct(&employee, "annual", 2.0).await.unwrap(), 3.0);
        assert_eq!(repo.deduct(&employee, "annual", 3.0).await.unwrap(), 0.0);
        assert_eq!(repo.get(&employee, "annual").await.unwrap(), Some(0.0));
    }

    #[tokio::test]
    async fn test_deduct_refuses_overdraw_and_missing_balance() {
        let repo = setup_test_repo().await;
        let employee = Identity::new("A1");
        repo.set(&employee, "sick", 1.0).await.unwrap();

        let err = repo.deduct(&employee, "sick", 1.5).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
        assert_eq!(repo.get(&employee, "sick").await.unwrap(), Some(1.0));

        let err = repo.deduct(&employee, "annual", 1.0).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
    }
}
