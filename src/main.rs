//! Approval engine CLI entry point.

use anyhow::Result;
use clap::Parser;

use approval_engine::cli::{commands, AppContext, Cli, Commands};
use approval_engine::infrastructure::config::ConfigLoader;
use approval_engine::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(err) = run(cli).await {
        approval_engine::cli::handle_error(err, json_mode);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let _logger = LoggerImpl::init(&config.logging)?;
    let json = cli.json;

    let command = match cli.command {
        Commands::Init(args) => return commands::init::execute(args, &config, json).await,
        other => other,
    };

    let ctx = AppContext::open(config).await?;
    match command {
        Commands::Init(_) => Ok(()),
        Commands::Directory(args) => commands::directory::execute(args, &ctx, json).await,
        Commands::Form(args) => commands::form::execute(args, &ctx, json).await,
        Commands::Template(args) => commands::template::execute(args, &ctx, json).await,
        Commands::Submit(args) => commands::request::submit(args, &ctx, json).await,
        Commands::Decide(args) => commands::request::decide(args, &ctx, json).await,
        Commands::Cancel(args) => commands::request::cancel(args, &ctx, json).await,
        Commands::Show(args) => commands::request::show(args, &ctx, json).await,
        Commands::Pending(args) => commands::request::pending(args, &ctx, json).await,
        Commands::List(args) => commands::request::list(args, &ctx, json).await,
    }
}
