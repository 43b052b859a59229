//! Approval request aggregate and its decision state machine.
//!
//! ```text
//! Pending ──approve (last step complete)──▶ Approved
//!    │  ├──reject──────────────────────────▶ Rejected
//!    │  ├──return at first gate────────────▶ Returned
//!    │  └──applicant cancels───────────────▶ Canceled
//!    └──return at gate i>0──▶ Pending (gate i-1 re-opened)
//! ```
//!
//! Every transition checks all of its preconditions before touching any
//! field, so a rejected call leaves the request exactly as it was. Moving
//! between steps after a decision is the job of
//! [`AdvancementDriver`](crate::services::AdvancementDriver).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::identity::{ApplicantContext, Identity};
use crate::domain::errors::{DomainError, DomainResult};

/// Lifecycle status of an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    /// Sent back to the applicant from the first gate.
    Returned,
    /// Withdrawn by the applicant.
    Canceled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Returned => "returned",
            Self::Canceled => "canceled",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "returned" => Some(Self::Returned),
            "canceled" | "cancelled" => Some(Self::Canceled),
            _ => None,
        }
    }

    /// Every status except `Pending` is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one approver's decision on one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionState {
    #[default]
    Pending,
    Approved,
    Rejected,
    Returned,
}

impl DecisionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Returned => "returned",
        }
    }
}

/// What an approver asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Approve,
    Reject,
    Return,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Return => "return",
        }
    }

    /// Parse a caller-supplied decision value.
    pub fn parse(s: &str) -> DomainResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "approve" | "approved" => Ok(Self::Approve),
            "reject" | "rejected" => Ok(Self::Reject),
            "return" | "returned" => Ok(Self::Return),
            other => Err(DomainError::UnsupportedDecision(other.to_string())),
        }
    }
}

/// One approver's slot on one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub approver: Identity,
    pub decision: DecisionState,
    pub comment: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Decision {
    pub fn pending(approver: Identity) -> Self {
        Self { approver, decision: DecisionState::Pending, comment: None, decided_at: None }
    }

    pub fn is_pending(&self) -> bool {
        self.decision == DecisionState::Pending
    }

    fn record(&mut self, state: DecisionState, comment: Option<String>, at: DateTime<Utc>) {
        self.decision = state;
        self.comment = comment;
        self.decided_at = Some(at);
    }

    fn reset(&mut self) {
        self.decision = DecisionState::Pending;
        self.comment = None;
        self.decided_at = None;
    }
}

/// A concrete gate of a request, compiled from a step template.
///
/// The approver list is fixed at compile time; only decisions change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStep {
    pub order: u32,
    pub approvers: Vec<Decision>,
    pub all_must_approve: bool,
    pub is_required: bool,
    pub can_return: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RequestStep {
    pub fn new(order: u32, approvers: Vec<Identity>) -> Self {
        Self {
            order,
            approvers: approvers.into_iter().map(Decision::pending).collect(),
            all_must_approve: false,
            is_required: true,
            can_return: false,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn has_approvers(&self) -> bool {
        !self.approvers.is_empty()
    }

    /// A step is complete when nobody needs to act on it.
    pub fn is_complete(&self) -> bool {
        self.approvers.iter().all(|d| d.decision == DecisionState::Approved)
    }

    pub fn approver_identities(&self) -> Vec<Identity> {
        self.approvers.iter().map(|d| d.approver.clone()).collect()
    }

    pub fn pending_decision(&self, actor: &Identity) -> Option<&Decision> {
        self.approvers.iter().find(|d| &d.approver == actor && d.is_pending())
    }

    fn pending_decision_mut(&mut self, actor: &Identity) -> Option<&mut Decision> {
        self.approvers.iter_mut().find(|d| &d.approver == actor && d.is_pending())
    }

    /// Re-open decisions left by a return so the step can be decided again.
    /// Approvals recorded before the return stand.
    pub fn reopen_returned(&mut self) {
        self.approvers
            .iter_mut()
            .filter(|d| d.decision == DecisionState::Returned)
            .for_each(Decision::reset);
    }

    /// Put the step back into its freshly compiled shape.
    fn reset(&mut self) {
        self.approvers.iter_mut().for_each(Decision::reset);
        self.started_at = None;
        self.finished_at = None;
    }
}

/// Kind of audit trail entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Submitted,
    Approved,
    Rejected,
    Returned,
    Canceled,
    StepSkipped,
    StepAdvanced,
    Finished,
    EffectApplied,
    EffectFailed,
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Returned => "returned",
            Self::Canceled => "canceled",
            Self::StepSkipped => "step_skipped",
            Self::StepAdvanced => "step_advanced",
            Self::Finished => "finished",
            Self::EffectApplied => "effect_applied",
            Self::EffectFailed => "effect_failed",
        }
    }
}

/// Append-only audit trail entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub actor: Option<Identity>,
    pub action: LogAction,
    pub message: String,
}

/// Result of a successful [`ApprovalRequest::decide`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// The actor's approval was recorded; the step may now be complete.
    Approved,
    /// The request was vetoed.
    Rejected,
    /// The pointer moved back to an earlier gate.
    ReturnedToStep(usize),
    /// The request went back to the applicant.
    ReturnedToApplicant,
}

/// One submission of a form moving through its approval chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: Uuid,
    pub form_id: String,
    pub applicant: ApplicantContext,
    pub status: RequestStatus,
    /// 0-based pointer into `steps`.
    pub current_step_index: usize,
    pub steps: Vec<RequestStep>,
    pub audit_log: Vec<LogEntry>,
    /// Opaque payload, read only by terminal effects.
    pub form_data: serde_json::Value,
    /// Version for optimistic locking
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApprovalRequest {
    pub fn new(
        form_id: impl Into<String>,
        applicant: ApplicantContext,
        form_data: serde_json::Value,
        steps: Vec<RequestStep>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut request = Self {
            id: Uuid::new_v4(),
            form_id: form_id.into(),
            applicant,
            status: RequestStatus::Pending,
            current_step_index: 0,
            steps,
            audit_log: Vec::new(),
            form_data,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        let message = format!("submitted with {} approval step(s)", request.steps.len());
        let applicant = request.applicant.identity.clone();
        request.log(now, Some(applicant), LogAction::Submitted, message);
        request
    }

    pub fn current_step(&self) -> Option<&RequestStep> {
        self.steps.get(self.current_step_index)
    }

    pub fn current_step_mut(&mut self) -> Option<&mut RequestStep> {
        self.steps.get_mut(self.current_step_index)
    }

    /// Whether `actor` holds a pending decision on the current step.
    pub fn is_awaiting(&self, actor: &Identity) -> bool {
        self.status == RequestStatus::Pending
            && self.current_step().is_some_and(|s| s.pending_decision(actor).is_some())
    }

    /// Append an audit entry.
    pub fn log(
        &mut self,
        at: DateTime<Utc>,
        actor: Option<Identity>,
        action: LogAction,
        message: impl Into<String>,
    ) {
        self.audit_log.push(LogEntry { at, actor, action, message: message.into() });
        self.updated_at = at;
    }

    fn ensure_pending(&self) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::RequestNotPending { request_id: self.id, status: self.status });
        }
        Ok(())
    }

    /// Apply one approver's decision to the current step.
    pub fn decide(
        &mut self,
        actor: &Identity,
        action: DecisionAction,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<DecisionOutcome> {
        self.ensure_pending()?;
        let index = self.current_step_index;
        let step = self
            .steps
            .get(index)
            .filter(|s| s.pending_decision(actor).is_some())
            .ok_or_else(|| DomainError::NotAnApprover { request_id: self.id, actor: actor.clone() })?;

        if action == DecisionAction::Return && !step.can_return {
            return Err(DomainError::StepNotReturnable { request_id: self.id, step: step.order });
        }

        match action {
            DecisionAction::Approve => Ok(self.approve(index, actor, comment, now)),
            DecisionAction::Reject => Ok(self.reject(index, actor, comment, now)),
            DecisionAction::Return => Ok(self.send_back(index, actor, comment, now)),
        }
    }

    fn approve(
        &mut self,
        index: usize,
        actor: &Identity,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> DecisionOutcome {
        let step = &mut self.steps[index];
        if let Some(decision) = step.pending_decision_mut(actor) {
            decision.record(DecisionState::Approved, comment, now);
        }
        // One approval passes an any-one gate; peers are recorded as approved.
        if !step.all_must_approve {
            for peer in step.approvers.iter_mut().filter(|d| d.is_pending()) {
                peer.record(DecisionState::Approved, None, now);
            }
        }
        let order = step.order;
        self.log(now, Some(actor.clone()), LogAction::Approved, format!("approved step {order}"));
        DecisionOutcome::Approved
    }

    fn reject(
        &mut self,
        index: usize,
        actor: &Identity,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> DecisionOutcome {
        let step = &mut self.steps[index];
        if let Some(decision) = step.pending_decision_mut(actor) {
            decision.record(DecisionState::Rejected, comment, now);
        }
        step.finished_at = Some(now);
        let order = step.order;
        self.status = RequestStatus::Rejected;
        self.log(now, Some(actor.clone()), LogAction::Rejected, format!("rejected at step {order}"));
        DecisionOutcome::Rejected
    }

    /// Return moves back to the nearest earlier gate that has approvers.
    ///
    /// Gates without approvers were passed automatically and cannot
    /// re-adjudicate anything, so they are stepped over. When no such gate
    /// exists the request goes back to the applicant. The returning step
    /// keeps its decisions; only the actor's slot is marked returned.
    fn send_back(
        &mut self,
        index: usize,
        actor: &Identity,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> DecisionOutcome {
        let order = self.steps[index].order;
        let target = (0..index).rev().find(|&i| self.steps[i].has_approvers());

        let mut message = match target {
            Some(target) => format!("returned from step {order} to step {}", self.steps[target].order),
            None => format!("returned to applicant from step {order}"),
        };
        if let Some(comment) = comment.as_deref().filter(|c| !c.trim().is_empty()) {
            message.push_str(": ");
            message.push_str(comment);
        }

        if let Some(decision) = self.steps[index].pending_decision_mut(actor) {
            decision.record(DecisionState::Returned, comment, now);
        }

        let Some(target) = target else {
            self.status = RequestStatus::Returned;
            self.log(now, Some(actor.clone()), LogAction::Returned, message);
            return DecisionOutcome::ReturnedToApplicant;
        };

        // The target gate and any empty gates stepped over start fresh.
        for step in &mut self.steps[target..index] {
            step.reset();
        }
        self.steps[target].started_at = Some(now);
        self.current_step_index = target;
        self.log(now, Some(actor.clone()), LogAction::Returned, message);
        DecisionOutcome::ReturnedToStep(target)
    }

    /// Withdraw a pending request. Only the applicant may cancel.
    pub fn cancel(&mut self, actor: &Identity, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_pending()?;
        if actor != &self.applicant.identity {
            return Err(DomainError::NotApplicant { request_id: self.id, actor: actor.clone() });
        }
        self.status = RequestStatus::Canceled;
        if let Some(step) = self.current_step_mut() {
            step.finished_at = Some(now);
        }
        self.log(now, Some(actor.clone()), LogAction::Canceled, "canceled by applicant");
        Ok(())
    }
}
