//! Approval engine services.

pub mod advancement;
pub mod approval_service;
pub mod directory_resolver;
pub mod effect_registry;
pub mod leave_deduction;
pub mod notifier;
pub mod step_compiler;
pub mod workflow_admin;

pub use advancement::{Advance, AdvancementDriver, FollowUp};
pub use approval_service::ApprovalService;
pub use directory_resolver::DirectoryResolver;
pub use effect_registry::EffectRegistry;
pub use leave_deduction::{LeaveDeductionEffect, LEAVE_DEDUCTION};
pub use notifier::LoggingNotifier;
pub use step_compiler::{assemble, dedup_identities, ResolvedStep, StepCompiler, StepSignature};
pub use workflow_admin::WorkflowAdminService;
