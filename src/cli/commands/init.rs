//! Implementation of the `approvals init` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tokio::fs;

use crate::adapters::sqlite::initialize_database;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::CONFIG_DIR;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config.yaml with defaults
    #[arg(long, short)]
    pub force: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub config_path: PathBuf,
    pub config_written: bool,
    pub database_path: String,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if self.config_written {
            lines.push(format!("Wrote default configuration to {}", self.config_path.display()));
        }
        lines.push(format!("Database ready at {}", self.database_path));
        lines.join("\n")
    }
}

pub async fn execute(args: InitArgs, config: &Config, json_mode: bool) -> Result<()> {
    let config_dir = Path::new(CONFIG_DIR);
    fs::create_dir_all(config_dir)
        .await
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;

    let config_path = config_dir.join("config.yaml");
    let config_written = args.force || !config_path.exists();
    if config_written {
        let yaml = serde_yaml::to_string(&Config::default()).context("Failed to serialize default config")?;
        fs::write(&config_path, yaml)
            .await
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
    }

    initialize_database(&config.database).await.context("Failed to initialize database")?;

    let result = InitOutput {
        success: true,
        message: "Approval engine initialized.".to_string(),
        config_path,
        config_written,
        database_path: config.database.path.clone(),
    };
    output(&result, json_mode);
    Ok(())
}
