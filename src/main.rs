use std::fs::File;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use smartmarks::app::AppContext;
use smartmarks::cli::{commands, Cli, Commands};
use smartmarks::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; the TUI owns the screen, so logs go to a file if asked
    let filter = EnvFilter::from_default_env();
    match &cli.log {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
                .with(filter)
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
    }

    let config = Config::load()?;
    let ctx = AppContext::new(config)?;

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Login => {
            commands::login(&ctx).await?;
        }
        Commands::Logout => {
            commands::logout(&ctx).await?;
        }
        Commands::Whoami => {
            commands::whoami(&ctx).await?;
        }
        Commands::Add { url, title } => {
            commands::add_bookmark(&ctx, &url, &title).await?;
        }
        Commands::List => {
            commands::list_bookmarks(&ctx).await?;
        }
        Commands::Remove { id } => {
            commands::remove_bookmark(&ctx, &id).await?;
        }
        Commands::Tui => {
            smartmarks::tui::run(Arc::new(ctx)).await?;
        }
    }

    Ok(())
}
