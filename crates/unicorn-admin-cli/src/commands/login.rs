//! Login command implementation.

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;

use unisession_core::{Credentials, SessionStore, StoreKey};

use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Email address or username
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long, env = "UNICORN_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn run(args: LoginArgs, ctx: &AppContext) -> Result<()> {
    let wired = ctx.one_shot()?;
    let credentials = Credentials::new(&args.email, &args.password);

    eprintln!("{}", "Logging in...".dimmed());

    let login = wired
        .api
        .login(&credentials)
        .await
        .context("Failed to login")?;

    let identity = login.identity.clone();
    let expires_at = login.access_token.expires_at().ok();

    wired
        .manager
        .login(login.access_token, login.refresh_token, login.identity);
    wired.manager.cancel_renewal();

    // The manager logs storage failures instead of returning them
    if wired
        .store
        .get(StoreKey::RefreshToken)
        .context("Failed to read session store")?
        .is_none()
    {
        bail!("Logged in, but the session could not be saved");
    }

    output::success(&format!("Logged in as {}", identity.label()));
    println!();
    output::field("User", &identity.id);
    output::field("Role", &identity.role);
    if let Some(expires_at) = expires_at {
        output::field("Expires", &output::expiry(expires_at, chrono::Utc::now()));
    }
    output::field("API", wired.api.url().as_str());

    if !identity.is_admin() {
        output::warning("This account has no administrative role; dashboard requests will be refused");
    }

    Ok(())
}
