//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - Directory: organization/employee lookups used to resolve approvers
//! - ApprovalRepository: versioned persistence of approval requests
//! - WorkflowTemplateRepository / FormRepository: form and workflow setup
//! - LeaveBalanceRepository: balances touched by the leave deduction effect
//! - Notifier / TerminalEffect: outbound side effects of transitions

pub mod approval_repository;
pub mod directory;
pub mod form_repository;
pub mod leave_balance_repository;
pub mod notifier;
pub mod terminal_effect;
pub mod workflow_template_repository;

pub use approval_repository::{ApprovalRepository, RequestFilter};
pub use directory::{Directory, ScopeFilter};
pub use form_repository::FormRepository;
pub use leave_balance_repository::LeaveBalanceRepository;
pub use notifier::Notifier;
pub use terminal_effect::TerminalEffect;
pub use workflow_template_repository::WorkflowTemplateRepository;
