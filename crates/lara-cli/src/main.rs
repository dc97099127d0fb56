mod chat;
mod cli;
mod history;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use lara_core::{AppCore, config::LaraConfig, paths};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log to a file; stdout belongs to the chat
    let log_dir = paths::logs_dir()?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "lara.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    let mut config = LaraConfig::load()?;
    if let Some(db_path) = cli.db_path {
        config.storage.db_path = Some(db_path);
    }
    let core = Arc::new(AppCore::new(&config).await?);

    match cli.command.unwrap_or(Commands::Chat { user: None }) {
        Commands::Chat { user } => chat::run(core, user).await,
        Commands::History { user, format } => history::show(&core, &user, format),
        Commands::Users => history::list_users(&core),
        Commands::Reset { user } => history::reset(&core, &user),
    }
}
