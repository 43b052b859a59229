//! Workflow template CLI commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Deserialize;

use crate::cli::context::AppContext;
use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::models::{OverduePolicy, StepTemplate, WorkflowTemplate};

#[derive(Args, Debug)]
pub struct TemplateArgs {
    #[command(subcommand)]
    pub command: TemplateCommands,
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    /// Replace the workflow of a form with the steps in a YAML file
    Set {
        /// Form id
        form: String,
        /// YAML file: a list of steps, or a map with `steps` and `overdue`
        file: PathBuf,
    },
    /// Show the workflow of a form
    Show {
        /// Form id
        form: String,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TemplateFile {
    Steps(Vec<StepTemplate>),
    Full {
        steps: Vec<StepTemplate>,
        #[serde(default)]
        overdue: Option<OverduePolicy>,
    },
}

impl TemplateFile {
    fn into_parts(self) -> (Vec<StepTemplate>, Option<OverduePolicy>) {
        match self {
            Self::Steps(steps) => (steps, None),
            Self::Full { steps, overdue } => (steps, overdue),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct TemplateOutput {
    #[serde(flatten)]
    pub template: WorkflowTemplate,
}

impl CommandOutput for TemplateOutput {
    fn to_human(&self) -> String {
        let t = &self.template;
        let mut table = list_table(&["step", "selector", "value", "scope", "policy", "required", "returnable"]);
        for step in &t.steps {
            let selector = &step.approver_selector;
            table.add_row(vec![
                step.order.to_string(),
                selector.kind.as_str().to_string(),
                selector.value.join(", "),
                selector.scope.as_str().to_string(),
                if step.all_must_approve { "all" } else { "any" }.to_string(),
                yes_no(step.is_required),
                yes_no(step.can_return),
            ]);
        }

        let mut lines = vec![
            format!("Workflow for form '{}' ({} step(s))", t.form_id, t.steps.len()),
            format!("Updated: {}", t.updated_at.format("%Y-%m-%d %H:%M:%S UTC")),
        ];
        if let Some(overdue) = &t.overdue {
            lines.push(format!("Overdue: {:?} after {} day(s) (not enforced)", overdue.action, overdue.after_days));
        }
        lines.push(table.to_string());
        lines.join("\n")
    }
}

fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

pub async fn execute(args: TemplateArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let admin = ctx.admin();

    match args.command {
        TemplateCommands::Set { form, file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let parsed: TemplateFile =
                serde_yaml::from_str(&raw).with_context(|| format!("Invalid workflow file {}", file.display()))?;
            let (steps, overdue) = parsed.into_parts();
            let template = admin.set_workflow(&form, steps, overdue).await?;
            output(&TemplateOutput { template }, json_mode);
        }
        TemplateCommands::Show { form } => {
            let template = admin.get_workflow(&form).await?;
            output(&TemplateOutput { template }, json_mode);
        }
    }
    Ok(())
}
