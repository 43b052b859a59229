//! Resolution of approver selectors against the organization directory.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    ApplicantContext, ApproverSelector, Identity, Scope, SelectorKind, APPLICANT_SUPERVISOR,
};
use crate::domain::ports::{Directory, ScopeFilter};

/// Turns an [`ApproverSelector`] into the identities that may approve.
///
/// No match is not an error: an empty result is a valid outcome and makes
/// the step auto-skippable. Directory I/O failures are still propagated so a
/// broken directory never silently waves a request through.
pub struct DirectoryResolver<D: Directory> {
    directory: Arc<D>,
}

impl<D: Directory> DirectoryResolver<D> {
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    /// Resolve a selector for an applicant. The result may contain
    /// duplicates; callers deduplicate.
    pub async fn resolve(
        &self,
        selector: &ApproverSelector,
        applicant: &ApplicantContext,
    ) -> DomainResult<Vec<Identity>> {
        let resolved = match selector.kind {
            SelectorKind::Manager => self.resolve_manager(selector, applicant).await?,
            SelectorKind::Tag => match (selector.first_value(), scope_filter(selector.scope, applicant)) {
                (Some(tag), Some(scope)) => self.directory.lookup_by_tag(tag, &scope).await?,
                _ => Vec::new(),
            },
            SelectorKind::Role => match (selector.first_value(), scope_filter(selector.scope, applicant)) {
                (Some(role), Some(scope)) => self.directory.lookup_by_role(role, &scope).await?,
                _ => Vec::new(),
            },
            SelectorKind::User => selector.values().map(Identity::new).collect(),
            SelectorKind::Department => {
                match selector.first_value().or(applicant.department.as_deref()) {
                    Some(department) => self.directory.lookup_by_department(department).await?,
                    None => Vec::new(),
                }
            }
            SelectorKind::Org => match selector.first_value().or(applicant.org.as_deref()) {
                Some(org) => self.directory.lookup_by_org(org).await?,
                None => Vec::new(),
            },
            SelectorKind::Group => self.resolve_group(selector, applicant).await?,
            SelectorKind::Unsupported => {
                warn!(value = ?selector.value, "unsupported approver selector kind; resolving to nobody");
                Vec::new()
            }
        };

        debug!(
            kind = selector.kind.as_str(),
            scope = selector.scope.as_str(),
            applicant = %applicant.identity,
            resolved = resolved.len(),
            "resolved approver selector"
        );
        Ok(resolved)
    }

    async fn resolve_manager(
        &self,
        selector: &ApproverSelector,
        applicant: &ApplicantContext,
    ) -> DomainResult<Vec<Identity>> {
        match selector.first_value() {
            None | Some(APPLICANT_SUPERVISOR) => Ok(applicant.supervisor.iter().cloned().collect()),
            Some(candidate) => {
                let candidate = Identity::new(candidate);
                if self.directory.is_supervisor(&candidate).await? {
                    Ok(vec![candidate])
                } else {
                    debug!(candidate = %candidate, "named manager lacks supervisor capability");
                    Ok(Vec::new())
                }
            }
        }
    }

    async fn resolve_group(
        &self,
        selector: &ApproverSelector,
        applicant: &ApplicantContext,
    ) -> DomainResult<Vec<Identity>> {
        let requested: Vec<String> = selector.values().map(str::to_string).collect();
        if requested.is_empty() {
            return Ok(Vec::new());
        }
        let Some(scope) = scope_filter(selector.scope, applicant) else {
            return Ok(Vec::new());
        };

        let valid = self.directory.validate_sub_units(&requested).await?;
        if valid.len() < requested.len() {
            warn!(
                requested = requested.len(),
                valid = valid.len(),
                "group selector references unknown sub-units"
            );
        }
        if valid.is_empty() {
            return Ok(Vec::new());
        }
        self.directory.lookup_by_sub_units(&valid, &scope).await
    }
}

/// Build the lookup restriction for a scope.
///
/// `None` means the scope cannot be satisfied because the applicant has no
/// unit of that kind, so nobody qualifies.
fn scope_filter(scope: Scope, applicant: &ApplicantContext) -> Option<ScopeFilter> {
    match scope {
        Scope::None => Some(ScopeFilter::Unrestricted),
        Scope::Department => applicant.department.clone().map(ScopeFilter::Department),
        Scope::Org => applicant.org.clone().map(ScopeFilter::Org),
        Scope::Group => {
            if applicant.sub_units.is_empty() {
                None
            } else {
                Some(ScopeFilter::SubUnits(applicant.sub_units.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, DirectorySnapshot, SqliteDirectory};

    async fn setup() -> DirectoryResolver<SqliteDirectory> {
        let pool = create_migrated_test_pool().await.unwrap();
        let directory = SqliteDirectory::new(pool);
        let snapshot: DirectorySnapshot = serde_yaml::from_str(
            r"
orgs: [acme]
departments:
  - { id: sales, org: acme }
  - { id: ops, org: acme }
sub_units:
  - { id: team-a, department: sales }
  - { id: team-b, department: ops }
employees:
  - { id: A1, department: sales, org: acme, supervisor: M1, sub_units: [team-a] }
  - { id: M1, department: sales, org: acme, supervisor_capable: true, roles: [manager] }
  - { id: H1, department: sales, org: acme, tags: [HR], sub_units: [team-a] }
  - { id: H2, department: ops, org: acme, tags: [HR], sub_units: [team-b] }
  - { id: F1, department: ops, org: acme, roles: [finance] }
",
        )
        .unwrap();
        directory.import(&snapshot).await.unwrap();
        DirectoryResolver::new(Arc::new(directory))
    }

    fn applicant() -> ApplicantContext {
        ApplicantContext::new("A1")
            .with_department("sales")
            .with_org("acme")
            .with_supervisor("M1")
            .with_sub_unit("team-a")
    }

    fn sel(kind: SelectorKind) -> ApproverSelector {
        ApproverSelector::new(kind)
    }

    #[tokio::test]
    async fn test_manager_sentinel_and_empty_use_supervisor() {
        let resolver = setup().await;
        let got = resolver.resolve(&ApproverSelector::manager(), &applicant()).await.unwrap();
        assert_eq!(got, vec![Identity::new("M1")]);

        let got = resolver.resolve(&sel(SelectorKind::Manager), &applicant()).await.unwrap();
        assert_eq!(got, vec![Identity::new("M1")]);

        let no_supervisor = ApplicantContext::new("A1");
        let got = resolver.resolve(&ApproverSelector::manager(), &no_supervisor).await.unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn test_named_manager_requires_capability() {
        let resolver = setup().await;
        let named = sel(SelectorKind::Manager).with_value("").with_value("M1");
        assert_eq!(resolver.resolve(&named, &applicant()).await.unwrap(), vec![Identity::new("M1")]);

        let not_capable = sel(SelectorKind::Manager).with_value("H1");
        assert!(resolver.resolve(&not_capable, &applicant()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tag_with_and_without_scope() {
        let resolver = setup().await;
        let all = resolver.resolve(&ApproverSelector::tag("HR"), &applicant()).await.unwrap();
        assert_eq!(all, vec![Identity::new("H1"), Identity::new("H2")]);

        let scoped = ApproverSelector::tag("HR").with_scope(Scope::Department);
        let got = resolver.resolve(&scoped, &applicant()).await.unwrap();
        assert_eq!(got, vec![Identity::new("H1")]);
    }

    #[tokio::test]
    async fn test_scope_without_applicant_unit_resolves_nobody() {
        let resolver = setup().await;
        let scoped = ApproverSelector::tag("HR").with_scope(Scope::Department);
        let got = resolver.resolve(&scoped, &ApplicantContext::new("A1")).await.unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn test_role_user_department_org() {
        let resolver = setup().await;
        let got = resolver.resolve(&ApproverSelector::role("finance"), &applicant()).await.unwrap();
        assert_eq!(got, vec![Identity::new("F1")]);

        let users = ApproverSelector::users(["X1", " ", "X2"]);
        let got = resolver.resolve(&users, &applicant()).await.unwrap();
        assert_eq!(got, vec![Identity::new("X1"), Identity::new("X2")]);

        let own_department = resolver.resolve(&sel(SelectorKind::Department), &applicant()).await.unwrap();
        assert_eq!(own_department, vec![Identity::new("A1"), Identity::new("H1"), Identity::new("M1")]);

        let ops = sel(SelectorKind::Department).with_value("ops");
        assert_eq!(resolver.resolve(&ops, &applicant()).await.unwrap().len(), 2);

        let org = resolver.resolve(&sel(SelectorKind::Org), &applicant()).await.unwrap();
        assert_eq!(org.len(), 5);
    }

    #[tokio::test]
    async fn test_group_ignores_unknown_sub_units() {
        let resolver = setup().await;
        let group = sel(SelectorKind::Group).with_value("team-b").with_value("ghost");
        assert_eq!(resolver.resolve(&group, &applicant()).await.unwrap(), vec![Identity::new("H2")]);

        let only_ghost = sel(SelectorKind::Group).with_value("ghost");
        assert!(resolver.resolve(&only_ghost, &applicant()).await.unwrap().is_empty());

        let scoped = sel(SelectorKind::Group)
            .with_value("team-a")
            .with_value("team-b")
            .with_scope(Scope::Department);
        let got = resolver.resolve(&scoped, &applicant()).await.unwrap();
        assert_eq!(got, vec![Identity::new("A1"), Identity::new("H1")]);
    }

    #[tokio::test]
    async fn test_unsupported_kind_resolves_nobody() {
        let resolver = setup().await;
        let got = resolver.resolve(&sel(SelectorKind::Unsupported), &applicant()).await.unwrap();
        assert!(got.is_empty());
    }
}
