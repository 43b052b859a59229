//! Directory CLI commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::adapters::sqlite::DirectorySnapshot;
use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{ApplicantContext, Identity};
use crate::domain::ports::Directory;

#[derive(Args, Debug)]
pub struct DirectoryArgs {
    #[command(subcommand)]
    pub command: DirectoryCommands,
}

#[derive(Subcommand, Debug)]
pub enum DirectoryCommands {
    /// Import orgs, departments, sub-units and employees from a YAML file
    Import {
        /// Path to the snapshot file
        file: PathBuf,
    },
    /// Show an employee's organizational context
    Show {
        /// Employee id
        employee: String,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct ImportOutput {
    pub file: PathBuf,
    pub employees: usize,
}

impl CommandOutput for ImportOutput {
    fn to_human(&self) -> String {
        format!("Imported {} employee(s) from {}", self.employees, self.file.display())
    }
}

#[derive(Debug, serde::Serialize)]
pub struct EmployeeOutput {
    #[serde(flatten)]
    pub context: ApplicantContext,
    pub supervisor_capable: bool,
}

impl CommandOutput for EmployeeOutput {
    fn to_human(&self) -> String {
        let c = &self.context;
        let or_dash = |v: Option<&str>| v.unwrap_or("-").to_string();
        let mut lines = vec![
            format!("Employee: {}", c.identity),
            format!("Name: {}", if c.name.is_empty() { "-" } else { &c.name }),
            format!("Department: {}", or_dash(c.department.as_deref())),
            format!("Org: {}", or_dash(c.org.as_deref())),
            format!("Supervisor: {}", or_dash(c.supervisor.as_ref().map(Identity::as_str))),
            format!("Supervisor capable: {}", if self.supervisor_capable { "yes" } else { "no" }),
        ];
        if !c.sub_units.is_empty() {
            lines.push(format!("Sub-units: {}", c.sub_units.join(", ")));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: DirectoryArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let directory = ctx.directory();

    match args.command {
        DirectoryCommands::Import { file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let snapshot: DirectorySnapshot =
                serde_yaml::from_str(&raw).with_context(|| format!("Invalid directory file {}", file.display()))?;
            let employees = directory.import(&snapshot).await?;
            output(&ImportOutput { file, employees }, json_mode);
        }
        DirectoryCommands::Show { employee } => {
            let id = Identity::new(employee);
            let context = directory
                .get_applicant(&id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Employee not found: {id}"))?;
            let supervisor_capable = directory.is_supervisor(&id).await?;
            output(&EmployeeOutput { context, supervisor_capable }, json_mode);
        }
    }
    Ok(())
}
