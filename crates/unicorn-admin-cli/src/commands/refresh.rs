//! Refresh command implementation.

use anyhow::{Result, bail};
use chrono::Utc;
use clap::Args;
use colored::Colorize;

use unisession_core::RenewOutcome;

use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct RefreshArgs {}

pub async fn run(_args: RefreshArgs, ctx: &AppContext) -> Result<()> {
    let wired = ctx.one_shot()?;

    eprintln!("{}", "Refreshing session...".dimmed());

    let outcome = wired.manager.renew().await;
    wired.manager.cancel_renewal();

    match outcome {
        RenewOutcome::Renewed => {
            output::success("Session refreshed");
            if let Some(session) = wired.manager.current_session()
                && let Ok(at) = session.access_token().expires_at()
            {
                output::field("Expires", &output::expiry(at, Utc::now()));
            }
            Ok(())
        }
        RenewOutcome::NoSession => bail!("No active session. Run 'unicorn-admin login' first."),
        RenewOutcome::Failed => bail!("Failed to refresh session (run with -v for details)"),
    }
}
