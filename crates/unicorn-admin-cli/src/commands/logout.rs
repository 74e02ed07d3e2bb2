//! Logout command implementation.

use anyhow::{Context, Result, bail};
use clap::Args;

use unisession_core::SessionStore;

use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub async fn run(_args: LogoutArgs, ctx: &AppContext) -> Result<()> {
    let wired = ctx.one_shot()?;
    let had_session = wired.manager.is_authenticated();

    wired.manager.logout();

    if !wired.store.is_empty().context("Failed to read session store")? {
        bail!("Failed to clear the stored session");
    }

    if had_session {
        output::success("Logged out");
    } else {
        output::success("No active session");
    }

    Ok(())
}
