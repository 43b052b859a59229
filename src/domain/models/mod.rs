pub mod approval_request;
pub mod config;
pub mod form;
pub mod identity;
pub mod selector;
pub mod workflow_template;

pub use approval_request::{
    ApprovalRequest, Decision, DecisionAction, DecisionOutcome, DecisionState, LogAction,
    LogEntry, RequestStatus, RequestStep,
};
pub use config::{Config, DatabaseConfig, EngineConfig, LoggingConfig};
pub use form::FormTemplate;
pub use identity::{ApplicantContext, Identity};
pub use selector::{ApproverSelector, Scope, SelectorKind, APPLICANT_SUPERVISOR};
pub use workflow_template::{OverdueAction, OverduePolicy, StepTemplate, WorkflowTemplate};
