//! SQLite-backed organization directory.
//!
//! The directory is loaded from a [`DirectorySnapshot`] (typically a YAML
//! export of the HR system) and queried by the approver resolver. Every
//! lookup returns identities ordered by employee id.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use super::placeholders;
use crate::domain::errors::DomainResult;
use crate::domain::models::{ApplicantContext, Identity};
use crate::domain::ports::{Directory, ScopeFilter};

/// Full directory content, as imported from an external source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    #[serde(default)]
    pub orgs: Vec<String>,
    #[serde(default)]
    pub departments: Vec<DepartmentRecord>,
    #[serde(default)]
    pub sub_units: Vec<SubUnitRecord>,
    #[serde(default)]
    pub employees: Vec<EmployeeRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentRecord {
    pub id: String,
    #[serde(default)]
    pub org: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubUnitRecord {
    pub id: String,
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub supervisor: Option<String>,
    /// Whether this employee may be named directly as a manager approver.
    #[serde(default)]
    pub supervisor_capable: bool,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sub_units: Vec<String>,
    /// Leave type to remaining days.
    #[serde(default)]
    pub leave_balances: BTreeMap<String, f64>,
}

#[derive(Clone)]
pub struct SqliteDirectory {
    pool: SqlitePool,
}

impl SqliteDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load a snapshot, upserting every record it contains.
    ///
    /// Employees listed in the snapshot have their roles, tags and sub-unit
    /// memberships replaced. Records not mentioned are left alone.
    pub async fn import(&self, snapshot: &DirectorySnapshot) -> DomainResult<usize> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now().to_rfc3339();

        for org in &snapshot.orgs {
            sqlx::query("INSERT OR IGNORE INTO orgs (id) VALUES (?)")
                .bind(org)
                .execute(&mut *tx)
                .await?;
        }
        for department in &snapshot.departments {
            sqlx::query(
                "INSERT INTO departments (id, org_id) VALUES (?, ?)
                 ON CONFLICT(id) DO UPDATE SET org_id = excluded.org_id",
            )
            .bind(&department.id)
            .bind(&department.org)
            .execute(&mut *tx)
            .await?;
        }
        for sub_unit in &snapshot.sub_units {
            sqlx::query(
                "INSERT INTO sub_units (id, department_id) VALUES (?, ?)
                 ON CONFLICT(id) DO UPDATE SET department_id = excluded.department_id",
            )
            .bind(&sub_unit.id)
            .bind(&sub_unit.department)
            .execute(&mut *tx)
            .await?;
        }

        for employee in &snapshot.employees {
            sqlx::query(
                r#"INSERT INTO employees (id, name, department_id, org_id, supervisor_id, supervisor_capable)
                   VALUES (?, ?, ?, ?, ?, ?)
                   ON CONFLICT(id) DO UPDATE SET name = excluded.name, department_id = excluded.department_id,
                   org_id = excluded.org_id, supervisor_id = excluded.supervisor_id,
                   supervisor_capable = excluded.supervisor_capable"#,
            )
            .bind(&employee.id)
            .bind(employee.name.as_deref().unwrap_or_default())
            .bind(&employee.department)
            .bind(&employee.org)
            .bind(&employee.supervisor)
            .bind(employee.supervisor_capable)
            .execute(&mut *tx)
            .await?;

            for table in ["employee_roles", "employee_tags", "employee_sub_units"] {
                sqlx::query(&format!("DELETE FROM {table} WHERE employee_id = ?"))
                    .bind(&employee.id)
                    .execute(&mut *tx)
                    .await?;
            }
            for role in &employee.roles {
                sqlx::query("INSERT OR IGNORE INTO employee_roles (employee_id, role) VALUES (?, ?)")
                    .bind(&employee.id)
                    .bind(role)
                    .execute(&mut *tx)
                    .await?;
            }
            for tag in &employee.tags {
                sqlx::query("INSERT OR IGNORE INTO employee_tags (employee_id, tag) VALUES (?, ?)")
                    .bind(&employee.id)
                    .bind(tag)
                    .execute(&mut *tx)
                    .await?;
            }
            for sub_unit in &employee.sub_units {
                sqlx::query("INSERT OR IGNORE INTO employee_sub_units (employee_id, sub_unit_id) VALUES (?, ?)")
                    .bind(&employee.id)
                    .bind(sub_unit)
                    .execute(&mut *tx)
                    .await?;
            }
            for (leave_type, days) in &employee.leave_balances {
                sqlx::query(
                    r#"INSERT INTO leave_balances (employee_id, leave_type, days, updated_at) VALUES (?, ?, ?, ?)
                       ON CONFLICT(employee_id, leave_type) DO UPDATE SET days = excluded.days,
                       updated_at = excluded.updated_at"#,
                )
                .bind(&employee.id)
                .bind(leave_type)
                .bind(days)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        info!(
            orgs = snapshot.orgs.len(),
            departments = snapshot.departments.len(),
            sub_units = snapshot.sub_units.len(),
            employees = snapshot.employees.len(),
            "imported directory snapshot"
        );
        Ok(snapshot.employees.len())
    }

    /// Run an employee id query with an extra scope restriction appended.
    async fn fetch_ids(&self, base: &str, mut bindings: Vec<String>, scope: &ScopeFilter) -> DomainResult<Vec<Identity>> {
        let mut query = base.to_string();
        match scope {
            ScopeFilter::Unrestricted => {}
            ScopeFilter::Department(department) => {
                query.push_str(" AND e.department_id = ?");
                bindings.push(department.clone());
            }
            ScopeFilter::Org(org) => {
                query.push_str(" AND e.org_id = ?");
                bindings.push(org.clone());
            }
            ScopeFilter::SubUnits(sub_units) => {
                if sub_units.is_empty() {
                    return Ok(Vec::new());
                }
                query.push_str(&format!(
                    " AND EXISTS (SELECT 1 FROM employee_sub_units s WHERE s.employee_id = e.id AND s.sub_unit_id IN ({}))",
                    placeholders(sub_units.len())
                ));
                bindings.extend(sub_units.iter().cloned());
            }
        }
        query.push_str(" ORDER BY e.id");

        let mut q = sqlx::query_scalar::<_, String>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }
        let ids = q.fetch_all(&self.pool).await?;
        Ok(ids.into_iter().map(Identity::new).collect())
    }
}

#[async_trait]
impl Directory for SqliteDirectory {
    async fn lookup_by_tag(&self, tag: &str, scope: &ScopeFilter) -> DomainResult<Vec<Identity>> {
        self.fetch_ids(
            "SELECT e.id FROM employees e JOIN employee_tags t ON t.employee_id = e.id WHERE t.tag = ?",
            vec![tag.to_string()],
            scope,
        )
        .await
    }

    async fn lookup_by_role(&self, role: &str, scope: &ScopeFilter) -> DomainResult<Vec<Identity>> {
        self.fetch_ids(
            "SELECT e.id FROM employees e JOIN employee_roles r ON r.employee_id = e.id WHERE r.role = ?",
            vec![role.to_string()],
            scope,
        )
        .await
    }

    async fn lookup_by_department(&self, department: &str) -> DomainResult<Vec<Identity>> {
        self.fetch_ids(
            "SELECT e.id FROM employees e WHERE e.department_id = ?",
            vec![department.to_string()],
            &ScopeFilter::Unrestricted,
        )
        .await
    }

    async fn lookup_by_org(&self, org: &str) -> DomainResult<Vec<Identity>> {
        self.fetch_ids(
            "SELECT e.id FROM employees e WHERE e.org_id = ?",
            vec![org.to_string()],
            &ScopeFilter::Unrestricted,
        )
        .await
    }

    async fn lookup_by_sub_units(&self, sub_units: &[String], scope: &ScopeFilter) -> DomainResult<Vec<Identity>> {
        if sub_units.is_empty() {
            return Ok(Vec::new());
        }
        let base = format!(
            "SELECT DISTINCT e.id FROM employees e JOIN employee_sub_units m ON m.employee_id = e.id \
             WHERE m.sub_unit_id IN ({})",
            placeholders(sub_units.len())
        );
        self.fetch_ids(&base, sub_units.to_vec(), scope).await
    }

    async fn validate_sub_units(&self, sub_units: &[String]) -> DomainResult<Vec<String>> {
        if sub_units.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!("SELECT id FROM sub_units WHERE id IN ({})", placeholders(sub_units.len()));
        let mut q = sqlx::query_scalar::<_, String>(&query);
        for sub_unit in sub_units {
            q = q.bind(sub_unit);
        }
        let known: HashSet<String> = q.fetch_all(&self.pool).await?.into_iter().collect();

        let mut seen = HashSet::new();
        Ok(sub_units
            .iter()
            .filter(|s| known.contains(*s) && seen.insert(s.as_str()))
            .cloned()
            .collect())
    }

    async fn get_applicant(&self, id: &Identity) -> DomainResult<Option<ApplicantContext>> {
        let row: Option<EmployeeRow> = sqlx::query_as(
            "SELECT id, name, department_id, org_id, supervisor_id FROM employees WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let sub_units: Vec<String> = sqlx::query_scalar(
            "SELECT sub_unit_id FROM employee_sub_units WHERE employee_id = ? ORDER BY sub_unit_id",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(ApplicantContext {
            identity: Identity::new(row.id),
            name: row.name,
            department: row.department_id,
            org: row.org_id,
            supervisor: row.supervisor_id.filter(|s| !s.trim().is_empty()).map(Identity::new),
            sub_units,
        }))
    }

    async fn is_supervisor(&self, id: &Identity) -> DomainResult<bool> {
        let capable: Option<bool> = sqlx::query_scalar("SELECT supervisor_capable FROM employees WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(capable.unwrap_or(false))
    }
}

#[derive(sqlx::FromRow)]
struct EmployeeRow {
    id: String,
    name: String,
    department_id: Option<String>,
    org_id: Option<String>,
    supervisor_id: Option<String>,
}
