//! Watch command implementation.

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use unisession_core::{Session, SessionConfig, SessionEvent};

use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Seconds before expiry at which the access token is renewed
    #[arg(long, default_value_t = 60)]
    pub lead_time_secs: u64,

    /// Output events as JSON
    #[arg(long)]
    pub json: bool,
}

/// One line of `--json` output.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventLine<'a> {
    event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<String>,
}

pub async fn run(args: WatchArgs, ctx: &AppContext) -> Result<()> {
    let config =
        SessionConfig::default().with_lead_time(Duration::from_secs(args.lead_time_secs));
    let wired = ctx.long_running(config)?;
    let mut events = wired.manager.subscribe();

    match wired.manager.current_session() {
        Some(session) => eprintln!(
            "{} {}",
            "Keeping session alive for".dimmed(),
            session.identity().label()
        ),
        None => eprintln!("{}", "No active session; waiting for a login...".dimmed()),
    }
    eprintln!("{}", "Press Ctrl+C to stop.".dimmed());
    eprintln!();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => print_event(&event, args.json),
                Err(RecvError::Lagged(skipped)) => {
                    output::error(&format!("Missed {} session events", skipped));
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}

fn print_event(event: &SessionEvent, json_output: bool) {
    let (name, session) = match event {
        SessionEvent::LoggedIn(session) => ("login", Some(session)),
        SessionEvent::Renewed(session) => ("renewed", Some(session)),
        SessionEvent::LoggedOut => ("logout", None),
        SessionEvent::Synced(session) => ("synced", session.as_ref()),
    };

    if json_output {
        let line = EventLine {
            event: name,
            user: session.map(|s| s.identity().id.as_str()),
            expires_at: session.and_then(expires_at).map(|at| at.to_rfc3339()),
        };
        if let Ok(json) = serde_json::to_string(&line) {
            println!("{}", json);
        }
        return;
    }

    let tag = match event {
        SessionEvent::LoggedIn(_) => "LOGIN".green(),
        SessionEvent::Renewed(_) => "RENEWED".cyan(),
        SessionEvent::LoggedOut => "LOGOUT".red(),
        SessionEvent::Synced(_) => "SYNCED".blue(),
    };

    match session {
        Some(session) => {
            let expiry = expires_at(session)
                .map(|at| output::expiry(at, Utc::now()))
                .unwrap_or_else(|| "unknown expiry".to_string());
            println!(
                "{} {} expires {}",
                tag,
                session.identity().label().dimmed(),
                expiry
            );
        }
        None if matches!(event, SessionEvent::Synced(None)) => {
            println!("{} {}", tag, "session cleared by another process".dimmed());
        }
        None => println!("{}", tag),
    }
}

fn expires_at(session: &Session) -> Option<chrono::DateTime<Utc>> {
    session.access_token().expires_at().ok()
}
