//! Subcommand implementations.

mod login;
mod logout;
mod refresh;
mod watch;
mod whoami;

use anyhow::Result;
use clap::Subcommand;

use crate::context::AppContext;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the session
    Login(login::LoginArgs),

    /// Clear the stored session
    Logout(logout::LogoutArgs),

    /// Display the stored session
    Whoami(whoami::WhoamiArgs),

    /// Renew the access token now
    Refresh(refresh::RefreshArgs),

    /// Keep the session alive, printing session events until interrupted
    Watch(watch::WatchArgs),
}

pub async fn handle(cmd: Commands, ctx: &AppContext) -> Result<()> {
    match cmd {
        Commands::Login(args) => login::run(args, ctx).await,
        Commands::Logout(args) => logout::run(args, ctx).await,
        Commands::Whoami(args) => whoami::run(args, ctx).await,
        Commands::Refresh(args) => refresh::run(args, ctx).await,
        Commands::Watch(args) => watch::run(args, ctx).await,
    }
}
