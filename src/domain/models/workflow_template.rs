//! Workflow templates: the declarative approval chain attached to a form.
//!
//! A `WorkflowTemplate` belongs to exactly one form. Administrators replace
//! its step list wholesale; the engine snapshots the steps into each request
//! at submission so later edits never affect in-flight requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::selector::ApproverSelector;

/// One declarative approval gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTemplate {
    /// 1-based position; renumbered densely whenever the list is replaced.
    #[serde(default)]
    pub order: u32,
    pub approver_selector: ApproverSelector,
    /// Unanimous (`true`) or any-one-approves (`false`).
    #[serde(default)]
    pub all_must_approve: bool,
    #[serde(default = "default_true")]
    pub is_required: bool,
    #[serde(default)]
    pub can_return: bool,
}

fn default_true() -> bool {
    true
}

impl StepTemplate {
    pub fn new(approver_selector: ApproverSelector) -> Self {
        Self {
            order: 0,
            approver_selector,
            all_must_approve: false,
            is_required: true,
            can_return: false,
        }
    }

    pub fn all_must_approve(mut self, value: bool) -> Self {
        self.all_must_approve = value;
        self
    }

    pub fn required(mut self, value: bool) -> Self {
        self.is_required = value;
        self
    }

    pub fn returnable(mut self, value: bool) -> Self {
        self.can_return = value;
        self
    }
}

/// What to do with a request that waits too long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverdueAction {
    AutoPass,
    AutoReject,
}

/// Overdue handling attached to a workflow.
///
/// Stored and returned as configured; the engine itself never acts on it.
/// An external scheduler owns any timeout behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverduePolicy {
    pub after_days: u32,
    pub action: OverdueAction,
}

/// The approval chain of a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub form_id: String,
    pub steps: Vec<StepTemplate>,
    #[serde(default)]
    pub overdue: Option<OverduePolicy>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowTemplate {
    pub fn new(form_id: impl Into<String>, steps: Vec<StepTemplate>) -> Self {
        let mut template = Self {
            form_id: form_id.into(),
            steps: Vec::new(),
            overdue: None,
            updated_at: Utc::now(),
        };
        template.replace_steps(steps);
        template
    }

    pub fn with_overdue(mut self, overdue: OverduePolicy) -> Self {
        self.overdue = Some(overdue);
        self
    }

    /// Replace the whole step list, renumbering from 1 in the given order.
    pub fn replace_steps(&mut self, steps: Vec<StepTemplate>) {
        self.steps = steps
            .into_iter()
            .enumerate()
            .map(|(i, mut step)| {
                step.order = u32::try_from(i + 1).unwrap_or(u32::MAX);
                step
            })
            .collect();
        self.updated_at = Utc::now();
    }

    /// Check the template can be stored.
    pub fn validate(&self) -> Result<(), String> {
        if self.form_id.trim().is_empty() {
            return Err("Workflow form id cannot be empty".to_string());
        }
        if let Some(overdue) = &self.overdue {
            if overdue.after_days == 0 {
                return Err("Overdue policy must wait at least one day".to_string());
            }
        }
        Ok(())
    }
}
