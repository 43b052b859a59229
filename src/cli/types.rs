//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::commands::directory::DirectoryArgs;
use super::commands::form::FormArgs;
use super::commands::init::InitArgs;
use super::commands::request::{CancelArgs, DecideArgs, ListArgs, PendingArgs, ShowArgs, SubmitArgs};
use super::commands::template::TemplateArgs;

#[derive(Parser, Debug)]
#[command(name = "approvals")]
#[command(about = "Multi-step approval workflows for HR requests", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of .approvals/
    #[arg(short, long, global = true, env = "APPROVALS_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the .approvals directory, default config and database
    Init(InitArgs),

    /// Organization directory management
    Directory(DirectoryArgs),

    /// Form registration
    Form(FormArgs),

    /// Workflow templates of forms
    Template(TemplateArgs),

    /// Submit a form for approval
    Submit(SubmitArgs),

    /// Approve, reject or return the current step of a request
    Decide(DecideArgs),

    /// Withdraw a pending request (applicant only)
    Cancel(CancelArgs),

    /// Show a request with its steps and audit trail
    Show(ShowArgs),

    /// List requests waiting on an approver
    Pending(PendingArgs),

    /// List requests
    List(ListArgs),
}
