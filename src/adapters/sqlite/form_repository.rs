//! SQLite implementation of the FormRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::errors::DomainResult;
use crate::domain::models::FormTemplate;
use crate::domain::ports::FormRepository;

#[derive(Clone)]
pub struct SqliteFormRepository {
    pool: SqlitePool,
}

impl SqliteFormRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FormRepository for SqliteFormRepository {
    async fn upsert(&self, form: &FormTemplate) -> DomainResult<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"INSERT INTO forms (id, name, effect, created_at, updated_at) VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET name = excluded.name, effect = excluded.effect,
               updated_at = excluded.updated_at"#,
        )
        .bind(&form.id)
        .bind(&form.name)
        .bind(&form.effect)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: &str) -> DomainResult<Option<FormTemplate>> {
        let row: Option<FormRow> = sqlx::query_as("SELECT id, name, effect FROM forms WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn list(&self) -> DomainResult<Vec<FormTemplate>> {
        let rows: Vec<FormRow> = sqlx::query_as("SELECT id, name, effect FROM forms ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(sqlx::FromRow)]
struct FormRow {
    id: String,
    name: String,
    effect: Option<String>,
}

impl From<FormRow> for FormTemplate {
    fn from(row: FormRow) -> Self {
        Self { id: row.id, name: row.name, effect: row.effect }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    #[tokio::test]
    async fn test_upsert_replaces_name_and_effect() {
        let repo = SqliteFormRepository::new(create_migrated_test_pool().await.unwrap());
        repo.upsert(&FormTemplate::new("leave", "Leave")).await.unwrap();
        repo.upsert(&FormTemplate::new("leave", "Leave request").with_effect("leave_deduction"))
            .await
            .unwrap();
        repo.upsert(&FormTemplate::new("expense", "Expense claim")).await.unwrap();

        let leave = repo.get("leave").await.unwrap().unwrap();
        assert_eq!(leave.name, "Leave request");
        assert_eq!(leave.effect.as_deref(), Some("leave_deduction"));

        let ids: Vec<String> = repo.list().await.unwrap().into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec!["expense", "leave"]);
        assert!(repo.get("payroll").await.unwrap().is_none());
    }
}
