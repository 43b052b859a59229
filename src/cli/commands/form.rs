//! Form CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::context::AppContext;
use crate::cli::output::{list_table, output, render_list, CommandOutput};
use crate::domain::models::FormTemplate;

#[derive(Args, Debug)]
pub struct FormArgs {
    #[command(subcommand)]
    pub command: FormCommands,
}

#[derive(Subcommand, Debug)]
pub enum FormCommands {
    /// Register a form or update an existing one
    Register {
        /// Form id
        id: String,
        /// Display name (defaults to the id)
        #[arg(short, long)]
        name: Option<String>,
        /// Terminal effect run when a request is approved (e.g. leave_deduction)
        #[arg(short, long)]
        effect: Option<String>,
    },
    /// List registered forms
    List,
}

#[derive(Debug, serde::Serialize)]
pub struct FormListOutput {
    pub forms: Vec<FormTemplate>,
}

impl CommandOutput for FormListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "effect"]);
        for form in &self.forms {
            table.add_row(vec![form.id.as_str(), form.name.as_str(), form.effect.as_deref().unwrap_or("-")]);
        }
        render_list("form", &table, self.forms.len())
    }
}

#[derive(Debug, serde::Serialize)]
pub struct FormRegisteredOutput {
    pub form: FormTemplate,
    pub effect_known: bool,
}

impl CommandOutput for FormRegisteredOutput {
    fn to_human(&self) -> String {
        let mut message = format!("Registered form '{}' ({})", self.form.id, self.form.name);
        if let Some(effect) = &self.form.effect {
            message.push_str(&format!("\nTerminal effect: {effect}"));
            if !self.effect_known {
                message.push_str(" (not a built-in effect; approvals will record a failure)");
            }
        }
        message
    }
}

pub async fn execute(args: FormArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let admin = ctx.admin();

    match args.command {
        FormCommands::Register { id, name, effect } => {
            let mut form = FormTemplate::new(id.clone(), name.unwrap_or(id));
            form.effect = effect;
            let form = admin.register_form(form).await?;
            let effect_known = form.effect.as_deref().map_or(true, |e| ctx.effects().contains(e));
            output(&FormRegisteredOutput { form, effect_known }, json_mode);
        }
        FormCommands::List => {
            let forms = admin.list_forms().await?;
            output(&FormListOutput { forms }, json_mode);
        }
    }
    Ok(())
}
