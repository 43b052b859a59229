//! Approval request CLI commands.

use anyhow::{Context, Result};
use clap::Args;
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::output::{list_table, output, render_list, truncate, CommandOutput};
use crate::domain::models::{ApprovalRequest, Identity, RequestStatus};
use crate::domain::ports::RequestFilter;

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Form id
    pub form: String,
    /// Applicant employee id
    #[arg(long = "as", value_name = "EMPLOYEE")]
    pub applicant: String,
    /// Form data as a JSON object, e.g. '{"leave_type":"annual","days":2}'
    #[arg(short, long, default_value = "{}")]
    pub data: String,
}

#[derive(Args, Debug)]
pub struct DecideArgs {
    /// Request id
    pub id: Uuid,
    /// Approver employee id
    #[arg(long = "as", value_name = "EMPLOYEE")]
    pub actor: String,
    /// approve, reject or return
    pub decision: String,
    /// Optional comment recorded with the decision
    #[arg(long)]
    pub comment: Option<String>,
}

#[derive(Args, Debug)]
pub struct CancelArgs {
    /// Request id
    pub id: Uuid,
    /// Applicant employee id
    #[arg(long = "as", value_name = "EMPLOYEE")]
    pub actor: String,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Request id
    pub id: Uuid,
}

#[derive(Args, Debug)]
pub struct PendingArgs {
    /// Approver employee id
    pub actor: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Filter by status (pending, approved, rejected, returned, canceled)
    #[arg(short, long)]
    pub status: Option<String>,
    /// Filter by applicant
    #[arg(short, long)]
    pub applicant: Option<String>,
    /// Filter by form
    #[arg(short, long)]
    pub form: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct RequestSummary {
    pub id: String,
    pub form_id: String,
    pub applicant: String,
    pub status: String,
    pub current_step: Option<u32>,
    pub steps: usize,
    pub waiting_on: Vec<String>,
    pub updated_at: String,
}

impl From<&ApprovalRequest> for RequestSummary {
    fn from(request: &ApprovalRequest) -> Self {
        let current = request.current_step().filter(|_| request.status == RequestStatus::Pending);
        Self {
            id: request.id.to_string(),
            form_id: request.form_id.clone(),
            applicant: request.applicant.identity.to_string(),
            status: request.status.as_str().to_string(),
            current_step: current.map(|s| s.order),
            steps: request.steps.len(),
            waiting_on: current
                .map(|s| {
                    s.approvers
                        .iter()
                        .filter(|d| d.is_pending())
                        .map(|d| d.approver.to_string())
                        .collect()
                })
                .unwrap_or_default(),
            updated_at: request.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct RequestListOutput {
    pub requests: Vec<RequestSummary>,
    pub total: usize,
}

impl CommandOutput for RequestListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "form", "applicant", "status", "step", "waiting on"]);
        for r in &self.requests {
            table.add_row(vec![
                r.id[..8].to_string(),
                truncate(&r.form_id, 20),
                r.applicant.clone(),
                r.status.clone(),
                r.current_step.map_or_else(|| "-".to_string(), |o| format!("{o}/{}", r.steps)),
                truncate(&r.waiting_on.join(", "), 40),
            ]);
        }
        render_list("request", &table, self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct RequestDetailOutput {
    pub message: Option<String>,
    pub request: ApprovalRequest,
}

impl CommandOutput for RequestDetailOutput {
    fn to_human(&self) -> String {
        let r = &self.request;
        let mut lines = Vec::new();
        if let Some(message) = &self.message {
            lines.push(message.clone());
            lines.push(String::new());
        }
        lines.push(format!("Request: {}", r.id));
        lines.push(format!("Form: {}", r.form_id));
        lines.push(format!("Applicant: {}", r.applicant.identity));
        lines.push(format!("Status: {}", r.status));
        lines.push(format!("Created: {}", r.created_at.format("%Y-%m-%d %H:%M:%S UTC")));

        if r.steps.is_empty() {
            lines.push("\nNo approval steps.".to_string());
        } else {
            let mut steps = list_table(&["", "step", "policy", "approver", "decision", "comment"]);
            for (index, step) in r.steps.iter().enumerate() {
                let marker = if index == r.current_step_index && r.status == RequestStatus::Pending { ">" } else { "" };
                let policy = if step.all_must_approve { "all" } else { "any" };
                if step.approvers.is_empty() {
                    steps.add_row(vec![
                        marker.to_string(),
                        step.order.to_string(),
                        policy.to_string(),
                        "-".to_string(),
                        "skipped".to_string(),
                        String::new(),
                    ]);
                }
                for (i, decision) in step.approvers.iter().enumerate() {
                    let first = i == 0;
                    steps.add_row(vec![
                        if first { marker.to_string() } else { String::new() },
                        if first { step.order.to_string() } else { String::new() },
                        if first { policy.to_string() } else { String::new() },
                        decision.approver.to_string(),
                        decision.decision.as_str().to_string(),
                        truncate(decision.comment.as_deref().unwrap_or(""), 40),
                    ]);
                }
            }
            lines.push(String::new());
            lines.push(steps.to_string());
        }

        let mut log = list_table(&["at", "actor", "action", "message"]);
        for entry in &r.audit_log {
            log.add_row(vec![
                entry.at.format("%Y-%m-%d %H:%M:%S").to_string(),
                entry.actor.as_ref().map_or_else(|| "engine".to_string(), ToString::to_string),
                entry.action.as_str().to_string(),
                entry.message.clone(),
            ]);
        }
        lines.push(String::new());
        lines.push("Audit log:".to_string());
        lines.push(log.to_string());
        lines.join("\n")
    }
}

fn detail(message: impl Into<String>, request: ApprovalRequest) -> RequestDetailOutput {
    RequestDetailOutput { message: Some(message.into()), request }
}

fn list_output(requests: &[ApprovalRequest]) -> RequestListOutput {
    let requests: Vec<RequestSummary> = requests.iter().map(RequestSummary::from).collect();
    let total = requests.len();
    RequestListOutput { requests, total }
}

pub async fn submit(args: SubmitArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let form_data: serde_json::Value =
        serde_json::from_str(&args.data).context("Form data must be valid JSON")?;
    let request = ctx.approvals().submit(&args.form, &Identity::new(args.applicant), form_data).await?;
    let message = format!("Submitted request {} ({})", request.id, request.status);
    output(&detail(message, request), json_mode);
    Ok(())
}

pub async fn decide(args: DecideArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let request = ctx
        .approvals()
        .decide(args.id, &Identity::new(args.actor), &args.decision, args.comment)
        .await?;
    let message = format!("Decision recorded; request is {}", request.status);
    output(&detail(message, request), json_mode);
    Ok(())
}

pub async fn cancel(args: CancelArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let request = ctx.approvals().cancel(args.id, &Identity::new(args.actor)).await?;
    output(&detail("Request canceled", request), json_mode);
    Ok(())
}

pub async fn show(args: ShowArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let request = ctx.approvals().get(args.id).await?;
    output(&RequestDetailOutput { message: None, request }, json_mode);
    Ok(())
}

pub async fn pending(args: PendingArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let requests = ctx.approvals().pending_for(&Identity::new(args.actor)).await?;
    output(&list_output(&requests), json_mode);
    Ok(())
}

pub async fn list(args: ListArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let status = args
        .status
        .map(|s| RequestStatus::from_str(&s).ok_or_else(|| anyhow::anyhow!("Invalid status: {s}")))
        .transpose()?;
    let filter = RequestFilter { status, applicant: args.applicant.map(Identity::new), form_id: args.form };
    let requests = ctx.approvals().list(filter).await?;
    output(&list_output(&requests), json_mode);
    Ok(())
}
