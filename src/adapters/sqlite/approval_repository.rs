//! SQLite implementation of the ApprovalRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{parse_datetime, parse_json, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ApprovalRequest, Identity, RequestStatus};
use crate::domain::ports::{ApprovalRepository, RequestFilter};

const SELECT_COLUMNS: &str = "SELECT id, form_id, applicant, status, current_step_index, steps, audit_log, \
     form_data, version, created_at, updated_at FROM approval_requests";

#[derive(Clone)]
pub struct SqliteApprovalRepository {
    pool: SqlitePool,
}

impl SqliteApprovalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: Uuid) -> DomainResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM approval_requests WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl ApprovalRepository for SqliteApprovalRepository {
    async fn create(&self, request: &ApprovalRequest) -> DomainResult<()> {
        let current_step_index = to_sql_int(request.current_step_index)?;
        let version = to_sql_int(request.version)?;
        sqlx::query(
            r#"INSERT INTO approval_requests (id, form_id, applicant_id, applicant, status, current_step_index,
               steps, audit_log, form_data, version, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(request.id.to_string())
        .bind(&request.form_id)
        .bind(request.applicant.identity.as_str())
        .bind(serde_json::to_string(&request.applicant)?)
        .bind(request.status.as_str())
        .bind(current_step_index)
        .bind(serde_json::to_string(&request.steps)?)
        .bind(serde_json::to_string(&request.audit_log)?)
        .bind(serde_json::to_string(&request.form_data)?)
        .bind(version)
        .bind(request.created_at.to_rfc3339())
        .bind(request.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<ApprovalRequest>> {
        let row: Option<ApprovalRequestRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn update(&self, request: &ApprovalRequest) -> DomainResult<u64> {
        let current_step_index = to_sql_int(request.current_step_index)?;
        let version = to_sql_int(request.version)?;
        let result = sqlx::query(
            r#"UPDATE approval_requests SET applicant = ?, status = ?, current_step_index = ?, steps = ?,
               audit_log = ?, form_data = ?, version = version + 1, updated_at = ?
               WHERE id = ? AND version = ?"#,
        )
        .bind(serde_json::to_string(&request.applicant)?)
        .bind(request.status.as_str())
        .bind(current_step_index)
        .bind(serde_json::to_string(&request.steps)?)
        .bind(serde_json::to_string(&request.audit_log)?)
        .bind(serde_json::to_string(&request.form_data)?)
        .bind(request.updated_at.to_rfc3339())
        .bind(request.id.to_string())
        .bind(version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            if self.exists(request.id).await? {
                return Err(DomainError::ConcurrencyConflict {
                    entity: "approval_request".to_string(),
                    id: request.id.to_string(),
                });
            }
            return Err(DomainError::RequestNotFound(request.id));
        }

        Ok(request.version + 1)
    }

    async fn list(&self, filter: RequestFilter) -> DomainResult<Vec<ApprovalRequest>> {
        let mut query = format!("{SELECT_COLUMNS} WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(status) = &filter.status {
            query.push_str(" AND status = ?");
            bindings.push(status.as_str().to_string());
        }
        if let Some(applicant) = &filter.applicant {
            query.push_str(" AND applicant_id = ?");
            bindings.push(applicant.to_string());
        }
        if let Some(form_id) = &filter.form_id {
            query.push_str(" AND form_id = ?");
            bindings.push(form_id.clone());
        }
        query.push_str(" ORDER BY created_at DESC");

        let mut q = sqlx::query_as::<_, ApprovalRequestRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<ApprovalRequestRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_pending_for(&self, actor: &Identity) -> DomainResult<Vec<ApprovalRequest>> {
        // Step membership lives in the JSON document, so filter in code.
        let rows: Vec<ApprovalRequestRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE status = 'pending' ORDER BY created_at"))
                .fetch_all(&self.pool)
                .await?;

        let pending: Vec<ApprovalRequest> = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pending.into_iter().filter(|r| r.is_awaiting(actor)).collect())
    }
}

#[derive(sqlx::FromRow)]
struct ApprovalRequestRow {
    id: String,
    form_id: String,
    applicant: String,
    status: String,
    current_step_index: i64,
    steps: String,
    audit_log: String,
    form_data: String,
    version: i64,
    created_at: String,
    updated_at: String,
}

fn to_sql_int<T>(value: T) -> DomainResult<i64>
where
    i64: TryFrom<T, Error = std::num::TryFromIntError>,
{
    i64::try_from(value).map_err(|e| DomainError::SerializationError(e.to_string()))
}

impl TryFrom<ApprovalRequestRow> for ApprovalRequest {
    type Error = DomainError;

    fn try_from(row: ApprovalRequestRow) -> Result<Self, Self::Error> {
        let status = RequestStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid status: {}", row.status)))?;
        let current_step_index = usize::try_from(row.current_step_index)
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;
        let version = u64::try_from(row.version).map_err(|e| DomainError::SerializationError(e.to_string()))?;

        Ok(ApprovalRequest {
            id: parse_uuid(&row.id)?,
            form_id: row.form_id,
            applicant: parse_json(&row.applicant)?,
            status,
            current_step_index,
            steps: parse_json(&row.steps)?,
            audit_log: parse_json(&row.audit_log)?,
            form_data: parse_json(&row.form_data)?,
            version,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::domain::models::{ApplicantContext, DecisionAction, RequestStep};
    use chrono::Utc;

    async fn setup_test_repo() -> SqliteApprovalRepository {
        SqliteApprovalRepository::new(create_migrated_test_pool().await.unwrap())
    }

    fn request(applicant: &str, approvers: &[&str]) -> ApprovalRequest {
        let step = RequestStep::new(1, approvers.iter().map(|a| Identity::new(*a)).collect());
        ApprovalRequest::new(
            "leave",
            ApplicantContext::new(applicant).with_department("sales"),
            serde_json::json!({"leave_type": "annual", "days": 2}),
            vec![step],
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_out_of_range_version_is_refused() {
        let repo = setup_test_repo().await;
        let mut req = request("A1", &["M1"]);
        req.version = u64::MAX;

        let err = repo.create(&req).await.unwrap_err();
        assert!(matches!(err, DomainError::SerializationError(_)));
        assert!(repo.get(req.id).await.unwrap().is_none());

        let err = repo.update(&req).await.unwrap_err();
        assert!(matches!(err, DomainError::SerializationError(_)));
    }

    #[tokio::test]
    async fn test_create_and_get_request() {
        let repo = setup_test_repo().await;
        let req = request("A1", &["M1"]);
        repo.create(&req).await.unwrap();

        let stored = repo.get(req.id).await.unwrap().unwrap();
        assert_eq!(stored.applicant, req.applicant);
        assert_eq!(stored.steps, req.steps);
        assert_eq!(stored.audit_log.len(), 1);
        assert_eq!(stored.form_data["days"], 2);
        assert_eq!(stored.version, 1);

        assert!(repo.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let repo = setup_test_repo().await;
        let mut req = request("A1", &["M1"]);
        repo.create(&req).await.unwrap();

        req.decide(&"M1".into(), DecisionAction::Reject, None, Utc::now()).unwrap();
        let version = repo.update(&req).await.unwrap();
        assert_eq!(version, 2);

        let stored = repo.get(req.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Rejected);
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let repo = setup_test_repo().await;
        let req = request("A1", &["M1"]);
        repo.create(&req).await.unwrap();

        let mut first = repo.get(req.id).await.unwrap().unwrap();
        let mut second = first.clone();
        first.decide(&"M1".into(), DecisionAction::Approve, None, Utc::now()).unwrap();
        repo.update(&first).await.unwrap();

        second.decide(&"M1".into(), DecisionAction::Reject, None, Utc::now()).unwrap();
        let err = repo.update(&second).await.unwrap_err();
        assert!(err.is_conflict());

        let stored = repo.get(req.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Pending);
        assert!(stored.current_step().unwrap().is_complete());
    }

    #[tokio::test]
    async fn test_update_missing_request() {
        let repo = setup_test_repo().await;
        let err = repo.update(&request("A1", &["M1"])).await.unwrap_err();
        assert!(matches!(err, DomainError::RequestNotFound(_)));
    }

    #[tokio::test]
    async fn test_list_with_filter() {
        let repo = setup_test_repo().await;
        let first = request("A1", &["M1"]);
        let mut second = request("A2", &["M1"]);
        second.status = RequestStatus::Canceled;
        repo.create(&first).await.unwrap();
        repo.create(&second).await.unwrap();

        let pending = repo
            .list(RequestFilter { status: Some(RequestStatus::Pending), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, first.id);

        let by_applicant = repo
            .list(RequestFilter { applicant: Some(Identity::new("A2")), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(by_applicant.len(), 1);
        assert_eq!(by_applicant[0].id, second.id);

        let all = repo
            .list(RequestFilter { form_id: Some("leave".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_list_pending_for_actor() {
        let repo = setup_test_repo().await;
        let waiting = request("A1", &["M1", "H1"]);
        let other = request("A2", &["H2"]);
        let mut decided = request("A3", &["M1"]);
        decided.decide(&"M1".into(), DecisionAction::Reject, None, Utc::now()).unwrap();
        for req in [&waiting, &other, &decided] {
            repo.create(req).await.unwrap();
        }

        let for_m1 = repo.list_pending_for(&Identity::new("M1")).await.unwrap();
        assert_eq!(for_m1.iter().map(|r| r.id).collect::<Vec<_>>(), vec![waiting.id]);
        assert!(repo.list_pending_for(&Identity::new("X")).await.unwrap().is_empty());
    }
}
