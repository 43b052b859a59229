//! Domain errors for the approval engine.

use thiserror::Error;
use uuid::Uuid;

use super::models::{Identity, RequestStatus};

/// Coarse classification of a [`DomainError`].
///
/// Callers map these onto their own response codes; the engine only
/// guarantees that nothing but `Infrastructure` and `Conflict` can occur
/// after a transition has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The form or its workflow is not set up; nothing was created.
    Configuration,
    /// The actor is not allowed to perform the action.
    Authorization,
    /// The request is not in a state that allows the action.
    State,
    /// The input itself is malformed.
    Validation,
    NotFound,
    /// Optimistic write lost against a concurrent writer.
    Conflict,
    Infrastructure,
}

/// Domain-level errors that can occur in the approval engine.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("No workflow configured for form {0}")]
    WorkflowNotConfigured(String),

    #[error("Form not found: {0}")]
    FormNotFound(String),

    #[error("No terminal effect registered under key '{0}'")]
    EffectNotRegistered(String),

    #[error("{actor} is not a pending approver for the current step of request {request_id}")]
    NotAnApprover { request_id: Uuid, actor: Identity },

    #[error("{actor} is not the applicant of request {request_id}")]
    NotApplicant { request_id: Uuid, actor: Identity },

    #[error("Request {request_id} is not pending (status: {status})")]
    RequestNotPending { request_id: Uuid, status: RequestStatus },

    #[error("Step {step} of request {request_id} does not allow returning")]
    StepNotReturnable { request_id: Uuid, step: u32 },

    #[error("Unsupported decision: {0}")]
    UnsupportedDecision(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Approval request not found: {0}")]
    RequestNotFound(Uuid),

    #[error("Applicant not found: {0}")]
    ApplicantNotFound(Identity),

    #[error("Concurrency conflict: {entity} {id} was modified")]
    ConcurrencyConflict { entity: String, id: String },

    #[error("Terminal effect failed: {0}")]
    EffectFailed(String),

    #[error("Notification failed: {0}")]
    NotificationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DomainError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::WorkflowNotConfigured(_) | Self::FormNotFound(_) | Self::EffectNotRegistered(_) => {
                ErrorCategory::Configuration
            }
            Self::NotAnApprover { .. } | Self::NotApplicant { .. } => ErrorCategory::Authorization,
            Self::RequestNotPending { .. } | Self::StepNotReturnable { .. } => ErrorCategory::State,
            Self::UnsupportedDecision(_) | Self::ValidationFailed(_) => ErrorCategory::Validation,
            Self::RequestNotFound(_) | Self::ApplicantNotFound(_) => ErrorCategory::NotFound,
            Self::ConcurrencyConflict { .. } => ErrorCategory::Conflict,
            Self::EffectFailed(_)
            | Self::NotificationFailed(_)
            | Self::DatabaseError(_)
            | Self::SerializationError(_) => ErrorCategory::Infrastructure,
        }
    }

    /// Whether a fresh read-modify-write attempt could succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
