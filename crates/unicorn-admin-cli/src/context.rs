//! Shared wiring for commands: data directory, store, backend and manager.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use unisession_core::{ApiUrl, SessionConfig, SessionManager};
use unisession_file::FileSessionStore;
use unisession_http::AuthApi;

use crate::cli::Cli;

/// Global options every command runs with.
#[derive(Debug, Clone)]
pub struct AppContext {
    api_url: String,
    data_dir: Option<PathBuf>,
}

/// A session manager wired to the file store and the backend.
pub struct Wired {
    pub manager: SessionManager,
    pub store: Arc<FileSessionStore>,
    pub api: Arc<AuthApi>,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            api_url: cli.api_url.clone(),
            data_dir: cli.data_dir.clone(),
        }
    }

    /// The directory holding the session file.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }

        let dirs = ProjectDirs::from("", "", "unicorn-admin")
            .context("Could not determine data directory")?;
        Ok(dirs.data_dir().to_path_buf())
    }

    pub fn auth_api(&self) -> Result<AuthApi> {
        let url = ApiUrl::new(&self.api_url).context("Invalid API URL")?;
        AuthApi::new(url).context("Failed to create HTTP client")
    }

    /// Wire a manager for a single command.
    ///
    /// The renewal timer is disarmed so the command never refreshes in the
    /// background while it runs.
    pub fn one_shot(&self) -> Result<Wired> {
        let store = FileSessionStore::open(self.data_dir()?).context("Failed to open session store")?;
        let wired = self.wire(store, SessionConfig::default())?;
        wired.manager.cancel_renewal();
        Ok(wired)
    }

    /// Wire a manager that follows other writers and renews on schedule.
    pub fn long_running(&self, config: SessionConfig) -> Result<Wired> {
        let store = FileSessionStore::open_watched(self.data_dir()?)
            .context("Failed to open session store")?;
        self.wire(store, config)
    }

    fn wire(&self, store: FileSessionStore, config: SessionConfig) -> Result<Wired> {
        let store = Arc::new(store);
        let api = Arc::new(self.auth_api()?);
        let manager = SessionManager::new(store.clone(), api.clone(), config);
        Ok(Wired {
            manager,
            store,
            api,
        })
    }
}
