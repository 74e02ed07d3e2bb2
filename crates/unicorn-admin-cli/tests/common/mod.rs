#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Run the CLI against `api_url` with an isolated data directory.
pub fn run_cli(args: &[&str], data_dir: &Path, api_url: &str) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_unicorn-admin"));
    cmd.args(args);
    cmd.env("UNICORN_DATA_DIR", data_dir);
    cmd.env("UNICORN_API_URL", api_url);
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("RUST_LOG");
    cmd.env_remove("UNICORN_PASSWORD");
    cmd.output().expect("Failed to execute CLI")
}

/// A CLI process left running, with its output collected line by line.
pub struct RunningCli {
    child: Child,
    lines: Receiver<Line>,
}

/// One line of output from a [`RunningCli`].
#[derive(Debug)]
pub enum Line {
    Stdout(String),
    Stderr(String),
}

impl RunningCli {
    /// Wait until a line satisfies `accept`, returning it.
    pub fn wait_for(&self, timeout: Duration, accept: impl Fn(&Line) -> bool) -> Line {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(remaining) {
                Ok(line) if accept(&line) => return line,
                Ok(_) => continue,
                Err(e) => panic!("No matching output line: {}", e),
            }
        }
    }
}

impl Drop for RunningCli {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Start the CLI in the background with the same isolation as [`run_cli`].
pub fn spawn_cli(args: &[&str], data_dir: &Path, api_url: &str) -> RunningCli {
    let mut child = Command::new(env!("CARGO_BIN_EXE_unicorn-admin"))
        .args(args)
        .env("UNICORN_DATA_DIR", data_dir)
        .env("UNICORN_API_URL", api_url)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("UNICORN_PASSWORD")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn CLI");

    let (tx, lines) = mpsc::channel();
    let stdout = child.stdout.take().expect("stdout is piped");
    let stderr = child.stderr.take().expect("stderr is piped");
    forward_lines(stdout, tx.clone(), Line::Stdout);
    forward_lines(stderr, tx, Line::Stderr);

    RunningCli { child, lines }
}

fn forward_lines<R>(source: R, tx: mpsc::Sender<Line>, wrap: fn(String) -> Line)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        for line in BufReader::new(source).lines() {
            let Ok(line) = line else { break };
            if tx.send(wrap(line)).is_err() {
                break;
            }
        }
    });
}

/// Run the CLI and expect success, returning stdout.
pub fn run_cli_success(args: &[&str], data_dir: &Path, api_url: &str) -> String {
    let output = run_cli(args, data_dir, api_url);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// An unsigned JWT expiring `secs` seconds from now.
pub fn jwt_expiring_in(secs: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(
        r#"{{"sub":"admin@unicorn.test","exp":{}}}"#,
        chrono::Utc::now().timestamp() + secs
    ));
    format!("{}.{}.signature", header, payload)
}

/// Read the stored session entries.
pub fn stored_entries(data_dir: &Path) -> Option<serde_json::Map<String, serde_json::Value>> {
    let content = std::fs::read_to_string(data_dir.join("session.json")).ok()?;
    Some(serde_json::from_str(&content).expect("session file is JSON"))
}
