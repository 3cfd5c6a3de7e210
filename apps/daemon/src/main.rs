//! Headless host for the sync core: opens the local database, establishes
//! the session, loads the owner's records and keeps syncing until Ctrl-C.

mod config;
mod context;

use anyhow::Result;
use dotenvy::dotenv;
use log::{info, warn};

use crate::config::DaemonConfig;
use crate::context::ServiceContext;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenv() {
        if !e.not_found() {
            eprintln!("Failed to read .env: {}", e);
        }
    }

    let config = DaemonConfig::from_env()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting thyro daemon (database {})", config.db_path);
    let context = ServiceContext::build(&config)?;
    context.start();

    match context.sync_service.bootstrap().await {
        Ok((owner_id, load)) => info!(
            "Owner {} ready: profile {:?}, config {:?}",
            owner_id, load.profile, load.config
        ),
        Err(e) => warn!("Bootstrap failed, continuing with an empty session: {}", e),
    }

    let mut cards = context.card_feed.watch();
    let card_log = tokio::spawn(async move {
        loop {
            let tags: Vec<&'static str> = cards
                .borrow_and_update()
                .iter()
                .map(|card| card.card_type.tag())
                .collect();
            info!("[CardFeed] {} card(s): {:?}", tags.len(), tags);
            if cards.changed().await.is_err() {
                break;
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    card_log.abort();
    context.shutdown().await;
    Ok(())
}
