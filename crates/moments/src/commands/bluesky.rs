//! `moments bluesky`: manage the cross-post account.

use anyhow::{anyhow, Context, Result};
use clap::Subcommand;
use skypost::{BlueskyClient, Credentials};
use std::time::Duration;

use crate::context::AppContext;
use crate::ui;

#[derive(Subcommand, Debug)]
pub enum BlueskyCommand {
    /// Log in with the configured handle and app password
    Verify {
        /// Handle to check instead of crosspost.handle
        #[arg(long)]
        handle: Option<String>,
    },
}

pub async fn run(ctx: &AppContext, command: BlueskyCommand) -> Result<()> {
    match command {
        BlueskyCommand::Verify { handle } => verify(ctx, handle).await,
    }
}

async fn verify(ctx: &AppContext, handle: Option<String>) -> Result<()> {
    let crosspost = &ctx.config.bootstrap.crosspost;
    let handle = handle
        .or_else(|| Some(crosspost.handle.clone()))
        .filter(|h| !h.is_empty())
        .context("No Bluesky handle configured; set crosspost.handle or pass --handle")?;
    let password = crosspost
        .app_password
        .clone()
        .filter(|p| !p.is_empty())
        .context("Set MOMENTS_BLUESKY_APP_PASSWORD to a Bluesky app password")?;

    let client = BlueskyClient::new(&crosspost.service_url)
        .with_timeout(Duration::from_secs(crosspost.timeout_secs));

    match client.verify(&Credentials::new(handle, password)).await {
        Ok(account) => {
            ui::success(format!("Connected as @{} ({})", account.handle, account.did));
            Ok(())
        }
        Err(e) => {
            ui::failure(e.user_message());
            Err(anyhow!(e).context("Bluesky verification failed"))
        }
    }
}
