//! Whoami command implementation.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use serde::Serialize;

use unisession_core::Identity;

use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct WhoamiArgs {
    /// Print the identity and expiry as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WhoamiOutput<'a> {
    user: &'a Identity,
    expires_at: Option<String>,
}

pub async fn run(args: WhoamiArgs, ctx: &AppContext) -> Result<()> {
    let wired = ctx.one_shot()?;
    let session = wired
        .manager
        .current_session()
        .context("No active session. Run 'unicorn-admin login' first.")?;

    let identity = session.identity();
    let expires_at = match session.access_token().expires_at() {
        Ok(at) => Some(at),
        Err(e) => {
            tracing::warn!(error = %e, "Cannot decode access token expiry");
            None
        }
    };

    if args.json {
        return output::json_pretty(&WhoamiOutput {
            user: identity,
            expires_at: expires_at.map(|at| at.to_rfc3339()),
        });
    }

    output::field("User", &identity.label());
    output::field("Id", &identity.id);
    if let Some(email) = &identity.email {
        output::field("Email", email);
    }
    output::field("Role", &identity.role);
    if let Some(status) = &identity.status {
        output::field("Status", status);
    }
    match expires_at {
        Some(at) => output::field("Expires", &output::expiry(at, Utc::now())),
        None => output::field("Expires", "unknown"),
    }

    Ok(())
}
