//! Employee identities and the applicant's organizational context.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an employee in the organization directory.
///
/// Identities are opaque strings (employee numbers, account names). Their
/// `Ord` implementation is the canonical order used when comparing approver
/// sets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Organizational facts about an applicant, frozen at submission time.
///
/// A request keeps this snapshot for its whole life: later transfers or
/// supervisor changes in the directory do not re-route an in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantContext {
    pub identity: Identity,
    #[serde(default)]
    pub name: String,
    pub department: Option<String>,
    pub org: Option<String>,
    pub supervisor: Option<Identity>,
    /// Sub-units (teams, groups) the applicant belongs to.
    #[serde(default)]
    pub sub_units: Vec<String>,
}

impl ApplicantContext {
    pub fn new(identity: impl Into<Identity>) -> Self {
        Self {
            identity: identity.into(),
            name: String::new(),
            department: None,
            org: None,
            supervisor: None,
            sub_units: Vec::new(),
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_org(mut self, org: impl Into<String>) -> Self {
        self.org = Some(org.into());
        self
    }

    pub fn with_supervisor(mut self, supervisor: impl Into<Identity>) -> Self {
        self.supervisor = Some(supervisor.into());
        self
    }

    pub fn with_sub_unit(mut self, sub_unit: impl Into<String>) -> Self {
        self.sub_units.push(sub_unit.into());
        self
    }
}
