//! Advancement driver: moves a request between steps after decisions.
//!
//! The driver mutates the in-memory request only. Anything that leaves the
//! process (notifications, the terminal effect) is returned as a
//! [`FollowUp`] so the caller can run it after the write has committed.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::models::{
    ApprovalRequest, DecisionOutcome, Identity, LogAction, RequestStatus,
};

/// Work to perform once the transition is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    /// These approvers are now eligible to decide.
    Notify { step_order: u32, approvers: Vec<Identity> },
    /// The request reached `approved`; run the form's terminal effect.
    RunTerminalEffect,
}

/// Result of a single [`AdvancementDriver::try_advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The current step still waits on someone, or the request is closed.
    Incomplete,
    Moved { from: usize, to: usize },
    Finished,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AdvancementDriver;

impl AdvancementDriver {
    pub fn new() -> Self {
        Self
    }

    /// Close the current step if it is complete and move on.
    pub fn try_advance(&self, request: &mut ApprovalRequest, now: DateTime<Utc>) -> Advance {
        if request.status != RequestStatus::Pending {
            return Advance::Incomplete;
        }
        let index = request.current_step_index;

        let (order, skipped) = match request.steps.get_mut(index) {
            Some(step) if !step.is_complete() => return Advance::Incomplete,
            Some(step) => {
                step.started_at.get_or_insert(now);
                step.finished_at = Some(now);
                (step.order, !step.has_approvers())
            }
            None => (0, true),
        };

        let next = index + 1;
        if next < request.steps.len() {
            request.current_step_index = next;
            request.steps[next].started_at = Some(now);
            request.steps[next].reopen_returned();
            let next_order = request.steps[next].order;
            let (action, message) = if skipped {
                (
                    LogAction::StepSkipped,
                    format!("step {order} has no eligible approvers; moved to step {next_order}"),
                )
            } else {
                (LogAction::StepAdvanced, format!("step {order} complete; moved to step {next_order}"))
            };
            request.log(now, None, action, message);
            debug!(request_id = %request.id, from = index, to = next, skipped, "advanced to next step");
            return Advance::Moved { from: index, to: next };
        }

        request.status = RequestStatus::Approved;
        request.log(now, None, LogAction::Finished, "all steps complete; request approved");
        info!(request_id = %request.id, form_id = %request.form_id, "approval request finished");
        Advance::Finished
    }

    /// Settle a freshly compiled request: skip gates nobody can approve and
    /// announce the first gate that needs a human.
    pub fn start(&self, request: &mut ApprovalRequest, now: DateTime<Utc>) -> Vec<FollowUp> {
        self.settle(request, now, true)
    }

    /// Continue after a successful decision.
    pub fn after_decision(
        &self,
        request: &mut ApprovalRequest,
        outcome: DecisionOutcome,
        now: DateTime<Utc>,
    ) -> Vec<FollowUp> {
        match outcome {
            DecisionOutcome::Approved => self.settle(request, now, false),
            DecisionOutcome::ReturnedToStep(_) => announce(request),
            DecisionOutcome::Rejected | DecisionOutcome::ReturnedToApplicant => Vec::new(),
        }
    }

    /// Advance until the request rests on a gate with pending approvers or
    /// finishes.
    ///
    /// Bounded by the step count: every productive iteration moves the
    /// pointer forward, so the bound is only reached if the steps are
    /// inconsistent. In that case the request stays pending and waits for a
    /// human rather than approving itself.
    fn settle(&self, request: &mut ApprovalRequest, now: DateTime<Utc>, announce_current: bool) -> Vec<FollowUp> {
        let bound = request.steps.len() + 1;
        let mut moved = false;

        for _ in 0..bound {
            match self.try_advance(request, now) {
                Advance::Incomplete => {
                    return if request.status == RequestStatus::Pending && (announce_current || moved) {
                        announce(request)
                    } else {
                        Vec::new()
                    };
                }
                Advance::Moved { .. } => moved = true,
                Advance::Finished => return vec![FollowUp::RunTerminalEffect],
            }
        }

        warn!(
            request_id = %request.id,
            current_step = request.current_step_index,
            "advancement bound reached; leaving request pending"
        );
        announce(request)
    }
}

fn announce(request: &ApprovalRequest) -> Vec<FollowUp> {
    match request.current_step() {
        Some(step) if request.status == RequestStatus::Pending && step.has_approvers() => {
            let approvers = step
                .approvers
                .iter()
                .filter(|d| d.is_pending())
                .map(|d| d.approver.clone())
                .collect();
            vec![FollowUp::Notify { step_order: step.order, approvers }]
        }
        _ => Vec::new(),
    }
}
