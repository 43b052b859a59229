//! Organization directory port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ApplicantContext, Identity};

/// Restriction applied to directory lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScopeFilter {
    #[default]
    Unrestricted,
    /// Only members of this department.
    Department(String),
    /// Only members of this organization.
    Org(String),
    /// Only members of at least one of these sub-units.
    SubUnits(Vec<String>),
}

/// Read-only view of the employee/organization directory.
///
/// Lookups return identities in a stable order (the directory's natural
/// ordering); the engine deduplicates on top of that.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Members carrying `tag`.
    async fn lookup_by_tag(&self, tag: &str, scope: &ScopeFilter) -> DomainResult<Vec<Identity>>;

    /// Members holding `role`.
    async fn lookup_by_role(&self, role: &str, scope: &ScopeFilter) -> DomainResult<Vec<Identity>>;

    /// Members of a department.
    async fn lookup_by_department(&self, department: &str) -> DomainResult<Vec<Identity>>;

    /// Members of an organization.
    async fn lookup_by_org(&self, org: &str) -> DomainResult<Vec<Identity>>;

    /// Members of any of the given sub-units.
    async fn lookup_by_sub_units(
        &self,
        sub_units: &[String],
        scope: &ScopeFilter,
    ) -> DomainResult<Vec<Identity>>;

    /// Filter `sub_units` down to the ones that exist.
    async fn validate_sub_units(&self, sub_units: &[String]) -> DomainResult<Vec<String>>;

    /// Organizational context of an employee, if they exist.
    async fn get_applicant(&self, id: &Identity) -> DomainResult<Option<ApplicantContext>>;

    /// Whether the employee holds the supervisor capability.
    async fn is_supervisor(&self, id: &Identity) -> DomainResult<bool>;
}
