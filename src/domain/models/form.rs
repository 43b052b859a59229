//! Form templates.

use serde::{Deserialize, Serialize};

/// A submittable form (leave request, overtime claim, expense, ...).
///
/// `effect` names the terminal effect handler run once a request for this
/// form is approved. `None` means approval has no side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub effect: Option<String>,
}

impl FormTemplate {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), effect: None }
    }

    pub fn with_effect(mut self, effect: impl Into<String>) -> Self {
        self.effect = Some(effect.into());
        self
    }
}
