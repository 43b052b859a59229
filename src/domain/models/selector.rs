//! Approver selectors: declarative rules describing how to find approvers.

use serde::{Deserialize, Deserializer, Serialize};

/// Manager selector value meaning "whoever supervises the applicant".
pub const APPLICANT_SUPERVISOR: &str = "applicant_supervisor";

/// Kind of approver selector.
///
/// Unknown kinds found in stored templates deserialize to `Unsupported`
/// instead of failing, so a template written by a newer version never blocks
/// submission: the step resolves to nobody and is auto-skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum SelectorKind {
    /// A supervisor: the applicant's own, or a named one.
    Manager,
    /// Everyone carrying a tag.
    Tag,
    /// Literal identities.
    User,
    /// Everyone holding a role.
    Role,
    /// Every member of a department.
    Department,
    /// Every member of an organization.
    Org,
    /// Every member of a list of sub-units.
    Group,
    Unsupported,
}

impl From<String> for SelectorKind {
    fn from(s: String) -> Self {
        Self::parse_str(&s)
    }
}

impl SelectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::Tag => "tag",
            Self::User => "user",
            Self::Role => "role",
            Self::Department => "department",
            Self::Org => "org",
            Self::Group => "group",
            Self::Unsupported => "unsupported",
        }
    }

    pub fn parse_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "manager" => Self::Manager,
            "tag" => Self::Tag,
            "user" => Self::User,
            "role" => Self::Role,
            "department" => Self::Department,
            "org" => Self::Org,
            "group" => Self::Group,
            _ => Self::Unsupported,
        }
    }
}

/// Restriction of candidates to the applicant's own organizational unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[default]
    None,
    Department,
    Org,
    Group,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Department => "department",
            Self::Org => "org",
            Self::Group => "group",
        }
    }
}

/// How to find the approvers of one step.
///
/// `value` is always a list; a bare string in YAML/JSON is accepted as a
/// one-element list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverSelector {
    pub kind: SelectorKind,
    #[serde(default, deserialize_with = "one_or_many")]
    pub value: Vec<String>,
    #[serde(default)]
    pub scope: Scope,
}

impl ApproverSelector {
    pub fn new(kind: SelectorKind) -> Self {
        Self { kind, value: Vec::new(), scope: Scope::None }
    }

    /// The applicant's own supervisor.
    pub fn manager() -> Self {
        Self::new(SelectorKind::Manager).with_value(APPLICANT_SUPERVISOR)
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self::new(SelectorKind::Tag).with_value(tag)
    }

    pub fn role(role: impl Into<String>) -> Self {
        Self::new(SelectorKind::Role).with_value(role)
    }

    pub fn users<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: SelectorKind::User,
            value: users.into_iter().map(Into::into).collect(),
            scope: Scope::None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value.push(value.into());
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// First entry of `value` that is not blank.
    pub fn first_value(&self) -> Option<&str> {
        self.value.iter().map(|v| v.trim()).find(|v| !v.is_empty())
    }

    /// All non-blank entries of `value`.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.value.iter().map(|v| v.trim()).filter(|v| !v.is_empty())
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Nothing(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
        OneOrMany::Nothing(()) => Vec::new(),
    })
}
