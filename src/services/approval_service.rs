//! Approval service: the entry point for submitting and deciding requests.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ApprovalRequest, DecisionAction, EngineConfig, Identity, LogAction,
};
use crate::domain::ports::{
    ApprovalRepository, Directory, FormRepository, Notifier, RequestFilter,
    WorkflowTemplateRepository,
};
use crate::services::advancement::{AdvancementDriver, FollowUp};
use crate::services::effect_registry::EffectRegistry;
use crate::services::notifier::LoggingNotifier;
use crate::services::step_compiler::StepCompiler;

/// Coordinates compilation, decisions and persistence of approval requests.
///
/// Every mutation is a read-modify-write against the repository's
/// conditional update. Losing a write re-reads the request and re-applies
/// the transition, so preconditions are always checked against the state
/// that is actually committed. Notifications and terminal effects run only
/// after the write that produced them has committed.
pub struct ApprovalService<R, W, F, D>
where
    R: ApprovalRepository,
    W: WorkflowTemplateRepository,
    F: FormRepository,
    D: Directory,
{
    requests: Arc<R>,
    templates: Arc<W>,
    forms: Arc<F>,
    directory: Arc<D>,
    compiler: StepCompiler<D>,
    driver: AdvancementDriver,
    notifier: Arc<dyn Notifier>,
    effects: EffectRegistry,
    config: EngineConfig,
}

impl<R, W, F, D> ApprovalService<R, W, F, D>
where
    R: ApprovalRepository,
    W: WorkflowTemplateRepository,
    F: FormRepository,
    D: Directory,
{
    pub fn new(requests: Arc<R>, templates: Arc<W>, forms: Arc<F>, directory: Arc<D>) -> Self {
        Self {
            requests,
            templates,
            forms,
            compiler: StepCompiler::new(directory.clone()),
            directory,
            driver: AdvancementDriver::new(),
            notifier: Arc::new(LoggingNotifier),
            effects: EffectRegistry::new(),
            config: EngineConfig::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_effects(mut self, effects: EffectRegistry) -> Self {
        self.effects = effects;
        self
    }

    pub fn with_engine_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Submit a form on behalf of an applicant.
    ///
    /// Fails with a configuration error, before anything is stored, if the
    /// form or its workflow is missing.
    #[instrument(skip(self, applicant, form_data), fields(applicant = %applicant))]
    pub async fn submit(
        &self,
        form_id: &str,
        applicant: &Identity,
        form_data: serde_json::Value,
    ) -> DomainResult<ApprovalRequest> {
        let form = self
            .forms
            .get(form_id)
            .await?
            .ok_or_else(|| DomainError::FormNotFound(form_id.to_string()))?;
        let workflow = self
            .templates
            .get(form_id)
            .await?
            .ok_or_else(|| DomainError::WorkflowNotConfigured(form_id.to_string()))?;
        let context = self
            .directory
            .get_applicant(applicant)
            .await?
            .ok_or_else(|| DomainError::ApplicantNotFound(applicant.clone()))?;

        let now = Utc::now();
        let steps = self.compiler.compile(&workflow.steps, &context, now).await?;
        let mut request = ApprovalRequest::new(form.id, context, form_data, steps, now);
        let follow_ups = self.driver.start(&mut request, now);

        self.requests.create(&request).await?;
        info!(
            request_id = %request.id,
            steps = request.steps.len(),
            status = %request.status,
            "approval request submitted"
        );

        Ok(self.run_follow_ups(request, follow_ups).await)
    }

    /// Record `actor`'s decision on the current step of a request.
    #[instrument(skip(self, actor, comment), fields(actor = %actor))]
    pub async fn decide(
        &self,
        request_id: Uuid,
        actor: &Identity,
        decision: &str,
        comment: Option<String>,
    ) -> DomainResult<ApprovalRequest> {
        let action = DecisionAction::parse(decision)?;
        let driver = self.driver;

        let (request, follow_ups) = self
            .mutate(request_id, |request, now| {
                let outcome = request.decide(actor, action, comment.clone(), now)?;
                Ok(driver.after_decision(request, outcome, now))
            })
            .await?;
        info!(
            action = action.as_str(),
            status = %request.status,
            current_step = request.current_step_index,
            "decision recorded"
        );

        Ok(self.run_follow_ups(request, follow_ups).await)
    }

    /// Withdraw a pending request. Only its applicant may do so.
    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn cancel(&self, request_id: Uuid, actor: &Identity) -> DomainResult<ApprovalRequest> {
        let (request, ()) = self
            .mutate(request_id, |request, now| request.cancel(actor, now))
            .await?;
        info!("approval request canceled");
        Ok(request)
    }

    pub async fn get(&self, request_id: Uuid) -> DomainResult<ApprovalRequest> {
        self.requests
            .get(request_id)
            .await?
            .ok_or(DomainError::RequestNotFound(request_id))
    }

    pub async fn list(&self, filter: RequestFilter) -> DomainResult<Vec<ApprovalRequest>> {
        self.requests.list(filter).await
    }

    pub async fn list_by_applicant(&self, applicant: &Identity) -> DomainResult<Vec<ApprovalRequest>> {
        self.requests
            .list(RequestFilter { applicant: Some(applicant.clone()), ..RequestFilter::default() })
            .await
    }

    /// Requests whose current step waits on `actor`.
    pub async fn pending_for(&self, actor: &Identity) -> DomainResult<Vec<ApprovalRequest>> {
        self.requests.list_pending_for(actor).await
    }

    /// Load, transition and conditionally write a request, retrying when a
    /// concurrent writer wins.
    ///
    /// A transition error aborts immediately without writing.
    async fn mutate<T, M>(&self, request_id: Uuid, mut transition: M) -> DomainResult<(ApprovalRequest, T)>
    where
        M: FnMut(&mut ApprovalRequest, DateTime<Utc>) -> DomainResult<T>,
    {
        let mut attempt: u32 = 0;
        loop {
            let mut request = self.get(request_id).await?;
            let value = transition(&mut request, Utc::now())?;

            match self.requests.update(&request).await {
                Ok(version) => {
                    if attempt > 0 {
                        debug!(request_id = %request_id, attempts = attempt + 1, "write succeeded after conflict retry");
                    }
                    request.version = version;
                    return Ok((request, value));
                }
                Err(err) if err.is_conflict() && attempt < self.config.max_conflict_retries => {
                    attempt += 1;
                    warn!(request_id = %request_id, attempt, "conflicting write; re-applying on fresh state");
                    let backoff = self.config.conflict_backoff_ms.saturating_mul(u64::from(attempt));
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn run_follow_ups(&self, mut request: ApprovalRequest, follow_ups: Vec<FollowUp>) -> ApprovalRequest {
        for follow_up in follow_ups {
            match follow_up {
                FollowUp::Notify { step_order, approvers } => {
                    if let Err(err) = self.notifier.notify(&request, &approvers).await {
                        warn!(
                            request_id = %request.id,
                            step = step_order,
                            error = %err,
                            "failed to notify approvers"
                        );
                    }
                }
                FollowUp::RunTerminalEffect => {
                    request = self.run_terminal_effect(request).await;
                }
            }
        }
        request
    }

    /// Run the form's terminal effect once and record the outcome.
    ///
    /// The approval is already committed; a failure is only written to the
    /// audit trail.
    async fn run_terminal_effect(&self, request: ApprovalRequest) -> ApprovalRequest {
        let key = match self.forms.get(&request.form_id).await {
            Ok(form) => form.and_then(|f| f.effect),
            Err(err) => {
                error!(request_id = %request.id, error = %err, "failed to load form for terminal effect");
                None
            }
        };
        let Some(key) = key else {
            debug!(request_id = %request.id, "form has no terminal effect");
            return request;
        };

        let result = match self.effects.resolve(&key) {
            Ok(effect) => effect.apply(&request).await,
            Err(err) => Err(err),
        };
        let (action, message) = match result {
            Ok(()) => {
                info!(request_id = %request.id, effect = %key, "terminal effect applied");
                (LogAction::EffectApplied, format!("terminal effect '{key}' applied"))
            }
            Err(err) => {
                error!(request_id = %request.id, effect = %key, error = %err, "terminal effect failed");
                (LogAction::EffectFailed, format!("terminal effect '{key}' failed: {err}"))
            }
        };

        let recorded = self
            .mutate(request.id, |fresh, now| {
                fresh.log(now, None, action, message.clone());
                Ok(())
            })
            .await;
        match recorded {
            Ok((updated, ())) => updated,
            Err(err) => {
                error!(
                    request_id = %request.id,
                    error = %err,
                    outcome = action.as_str(),
                    "failed to record terminal effect outcome"
                );
                request
            }
        }
    }
}
