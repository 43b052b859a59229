//! Common test utilities for integration tests
//!
//! Builds an in-memory engine with a small organization loaded, plus
//! recording doubles for the notification and terminal effect ports.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use approval_engine::adapters::sqlite::{
    create_migrated_test_pool, DepartmentRecord, DirectorySnapshot, EmployeeRecord,
    SqliteApprovalRepository, SqliteDirectory, SqliteFormRepository, SqliteLeaveBalanceRepository,
    SqliteWorkflowTemplateRepository, SubUnitRecord,
};
use approval_engine::domain::errors::{DomainError, DomainResult};
use approval_engine::domain::models::{
    ApprovalRequest, EngineConfig, FormTemplate, Identity, StepTemplate,
};
use approval_engine::domain::ports::{Notifier, TerminalEffect};
use approval_engine::services::{
    ApprovalService, EffectRegistry, LeaveDeductionEffect, WorkflowAdminService,
};

pub type TestApprovalService = ApprovalService<
    SqliteApprovalRepository,
    SqliteWorkflowTemplateRepository,
    SqliteFormRepository,
    SqliteDirectory,
>;

pub type TestAdminService = WorkflowAdminService<SqliteFormRepository, SqliteWorkflowTemplateRepository>;

/// Notifier that remembers every call and can be told to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    pub calls: Mutex<Vec<(Uuid, Vec<Identity>)>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self { fail: true, calls: Mutex::new(Vec::new()) }
    }

    pub fn calls_for(&self, request_id: Uuid) -> Vec<Vec<Identity>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == request_id)
            .map(|(_, approvers)| approvers.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, request: &ApprovalRequest, approvers: &[Identity]) -> DomainResult<()> {
        self.calls.lock().unwrap().push((request.id, approvers.to_vec()));
        if self.fail {
            return Err(DomainError::NotificationFailed("mail relay unavailable".to_string()));
        }
        Ok(())
    }
}

/// Terminal effect that counts invocations and can be told to fail.
pub struct RecordingEffect {
    pub key: &'static str,
    pub fail: bool,
    pub applied: Mutex<Vec<Uuid>>,
}

impl RecordingEffect {
    pub fn new(key: &'static str) -> Self {
        Self { key, fail: false, applied: Mutex::new(Vec::new()) }
    }

    pub fn failing(key: &'static str) -> Self {
        Self { key, fail: true, applied: Mutex::new(Vec::new()) }
    }

    pub fn count(&self) -> usize {
        self.applied.lock().unwrap().len()
    }
}

#[async_trait]
impl TerminalEffect for RecordingEffect {
    fn name(&self) -> &str {
        self.key
    }

    async fn apply(&self, request: &ApprovalRequest) -> DomainResult<()> {
        self.applied.lock().unwrap().push(request.id);
        if self.fail {
            return Err(DomainError::EffectFailed("payroll system unavailable".to_string()));
        }
        Ok(())
    }
}

pub const RECORD_EFFECT: &str = "record";
pub const FAILING_EFFECT: &str = "failing";

/// An engine over an in-memory database.
pub struct Harness {
    pub pool: SqlitePool,
    pub notifier: Arc<RecordingNotifier>,
    pub effect: Arc<RecordingEffect>,
    pub failing_effect: Arc<RecordingEffect>,
    pub service: Arc<TestApprovalService>,
    pub admin: TestAdminService,
    pub balances: Arc<SqliteLeaveBalanceRepository>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_engine_config(EngineConfig::default()).await
    }

    pub async fn with_engine_config(config: EngineConfig) -> Self {
        Self::build(config, RecordingNotifier::default()).await
    }

    /// Engine whose notifier errors on every call.
    pub async fn with_failing_notifier() -> Self {
        Self::build(EngineConfig::default(), RecordingNotifier::failing()).await
    }

    async fn build(config: EngineConfig, notifier: RecordingNotifier) -> Self {
        let pool = create_migrated_test_pool().await.expect("Failed to create test pool");
        let directory = SqliteDirectory::new(pool.clone());
        directory.import(&org_snapshot()).await.expect("Failed to import directory");

        let notifier = Arc::new(notifier);
        let effect = Arc::new(RecordingEffect::new(RECORD_EFFECT));
        let failing_effect = Arc::new(RecordingEffect::failing(FAILING_EFFECT));
        let balances = Arc::new(SqliteLeaveBalanceRepository::new(pool.clone()));

        let effects = EffectRegistry::new()
            .with(effect.clone())
            .with(failing_effect.clone())
            .with(Arc::new(LeaveDeductionEffect::new(balances.clone())));

        let service = ApprovalService::new(
            Arc::new(SqliteApprovalRepository::new(pool.clone())),
            Arc::new(SqliteWorkflowTemplateRepository::new(pool.clone())),
            Arc::new(SqliteFormRepository::new(pool.clone())),
            Arc::new(directory),
        )
        .with_notifier(notifier.clone())
        .with_effects(effects)
        .with_engine_config(config);

        let admin = WorkflowAdminService::new(
            Arc::new(SqliteFormRepository::new(pool.clone())),
            Arc::new(SqliteWorkflowTemplateRepository::new(pool.clone())),
        );

        Self { pool, notifier, effect, failing_effect, service: Arc::new(service), admin, balances }
    }

    /// Register a form with the given effect and workflow.
    pub async fn form(&self, id: &str, effect: Option<&str>, steps: Vec<StepTemplate>) {
        let mut form = FormTemplate::new(id, id);
        form.effect = effect.map(str::to_string);
        self.admin.register_form(form).await.expect("Failed to register form");
        self.admin.set_workflow(id, steps, None).await.expect("Failed to set workflow");
    }

    pub async fn submit(&self, form: &str, applicant: &str) -> ApprovalRequest {
        self.service
            .submit(form, &id(applicant), serde_json::json!({}))
            .await
            .expect("Failed to submit")
    }

    pub async fn decide(&self, request: &ApprovalRequest, actor: &str, decision: &str) -> ApprovalRequest {
        self.service
            .decide(request.id, &id(actor), decision, None)
            .await
            .expect("Failed to decide")
    }
}

pub fn id(name: &str) -> Identity {
    Identity::new(name)
}

fn employee(id: &str, department: &str, supervisor: Option<&str>) -> EmployeeRecord {
    EmployeeRecord {
        id: id.to_string(),
        name: Some(id.to_string()),
        department: Some(department.to_string()),
        org: Some("ACME".to_string()),
        supervisor: supervisor.map(str::to_string),
        supervisor_capable: false,
        roles: Vec::new(),
        tags: Vec::new(),
        sub_units: Vec::new(),
        leave_balances: BTreeMap::new(),
    }
}

/// Org ACME with departments ENG and HR.
///
/// * `A1` (ENG, supervisor `S1`) has 10 annual leave days.
/// * `A2` (ENG) has no supervisor.
/// * `S1` manages ENG and is tagged `lead`.
/// * `H1` and `H2` are tagged `HR`; `H1` also has role `payroll`.
/// * `F1` has role `finance`.
pub fn org_snapshot() -> DirectorySnapshot {
    let mut a1 = employee("A1", "ENG", Some("S1"));
    a1.sub_units = vec!["ENG-PLATFORM".to_string()];
    a1.leave_balances.insert("annual".to_string(), 10.0);

    let mut s1 = employee("S1", "ENG", None);
    s1.supervisor_capable = true;
    s1.tags = vec!["lead".to_string()];
    s1.sub_units = vec!["ENG-PLATFORM".to_string()];

    let mut h1 = employee("H1", "HR", None);
    h1.tags = vec!["HR".to_string()];
    h1.roles = vec!["payroll".to_string()];

    let mut h2 = employee("H2", "HR", None);
    h2.tags = vec!["HR".to_string()];

    let mut f1 = employee("F1", "HR", None);
    f1.roles = vec!["finance".to_string()];

    DirectorySnapshot {
        orgs: vec!["ACME".to_string()],
        departments: vec![
            DepartmentRecord { id: "ENG".to_string(), org: Some("ACME".to_string()) },
            DepartmentRecord { id: "HR".to_string(), org: Some("ACME".to_string()) },
        ],
        sub_units: vec![SubUnitRecord { id: "ENG-PLATFORM".to_string(), department: Some("ENG".to_string()) }],
        employees: vec![a1, employee("A2", "ENG", None), s1, h1, h2, f1],
    }
}
