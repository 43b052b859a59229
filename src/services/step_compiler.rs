//! Compilation of workflow step templates into concrete request steps.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::domain::errors::DomainResult;
use crate::domain::models::{ApplicantContext, Identity, RequestStep, StepTemplate};
use crate::domain::ports::Directory;
use crate::services::directory_resolver::DirectoryResolver;

/// A step template paired with the identities its selector resolved to.
#[derive(Debug, Clone)]
pub struct ResolvedStep {
    pub template: StepTemplate,
    pub approvers: Vec<Identity>,
}

/// Structural identity of a compiled step, used to collapse adjacent
/// duplicates. Approvers are kept in canonical (sorted) order so that the
/// comparison does not depend on resolution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSignature {
    approvers: Vec<Identity>,
    all_must_approve: bool,
    is_required: bool,
    can_return: bool,
}

impl StepSignature {
    pub fn of(step: &RequestStep) -> Self {
        let mut approvers = step.approver_identities();
        approvers.sort();
        Self {
            approvers,
            all_must_approve: step.all_must_approve,
            is_required: step.is_required,
            can_return: step.can_return,
        }
    }
}

/// Keep the first occurrence of every identity, dropping blanks.
pub fn dedup_identities(identities: Vec<Identity>) -> Vec<Identity> {
    let mut seen = HashSet::new();
    identities
        .into_iter()
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

/// Build request steps from already-resolved templates.
///
/// Adjacent steps with equal [`StepSignature`]s collapse into one, survivors
/// are renumbered from 1, and the first one is marked started at `now`.
pub fn assemble(resolved: Vec<ResolvedStep>, now: DateTime<Utc>) -> Vec<RequestStep> {
    let mut steps: Vec<RequestStep> = Vec::with_capacity(resolved.len());
    let mut last_signature: Option<StepSignature> = None;

    for ResolvedStep { template, approvers } in resolved {
        let mut step = RequestStep::new(0, dedup_identities(approvers));
        step.all_must_approve = template.all_must_approve;
        step.is_required = template.is_required;
        step.can_return = template.can_return;

        let signature = StepSignature::of(&step);
        if last_signature.as_ref() == Some(&signature) {
            debug!(template_order = template.order, "collapsed step identical to its predecessor");
            continue;
        }
        last_signature = Some(signature);
        steps.push(step);
    }

    for (i, step) in steps.iter_mut().enumerate() {
        step.order = u32::try_from(i + 1).unwrap_or(u32::MAX);
    }
    if let Some(first) = steps.first_mut() {
        first.started_at = Some(now);
    }
    steps
}

/// Resolves and assembles the steps of a new request.
pub struct StepCompiler<D: Directory> {
    resolver: DirectoryResolver<D>,
}

impl<D: Directory> StepCompiler<D> {
    pub fn new(directory: Arc<D>) -> Self {
        Self { resolver: DirectoryResolver::new(directory) }
    }

    #[instrument(skip(self, templates, applicant), fields(applicant = %applicant.identity, templates = templates.len()))]
    pub async fn compile(
        &self,
        templates: &[StepTemplate],
        applicant: &ApplicantContext,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<RequestStep>> {
        let mut resolved = Vec::with_capacity(templates.len());
        for template in templates {
            let approvers = self.resolver.resolve(&template.approver_selector, applicant).await?;
            resolved.push(ResolvedStep { template: template.clone(), approvers });
        }

        let steps = assemble(resolved, now);
        debug!(
            compiled = steps.len(),
            collapsed = templates.len() - steps.len(),
            "compiled workflow steps"
        );
        Ok(steps)
    }
}
