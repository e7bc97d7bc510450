//! KEEL Server: application entry point.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use keel_command::Dispatcher;
use keel_db::{DbManager, SurrealStore};
use keel_server::logging::init_logging;
use keel_server::{Cli, serve};
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format)?;

    tracing::info!("Starting KEEL server...");

    let manager = DbManager::connect(&cli.db_config()).await?;
    let store = Arc::new(SurrealStore::new(manager.client().clone()));
    let dispatcher = Arc::new(Dispatcher::new(store, cli.command_settings())?);

    let input = BufReader::new(tokio::io::stdin());
    let output = tokio::io::stdout();

    tokio::select! {
        summary = serve(dispatcher, input, output, cli.max_concurrency as usize) => {
            let summary = summary?;
            tracing::info!(dispatched = summary.dispatched, "KEEL server stopped.");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted; in-flight commands were abandoned.");
        }
    }

    Ok(())
}
