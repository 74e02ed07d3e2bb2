//! Session manager configuration.

use std::time::Duration;

/// Margin before access token expiry at which proactive renewal fires.
pub const DEFAULT_LEAD_TIME: Duration = Duration::from_secs(60);

/// Tunables for [`SessionManager`](crate::SessionManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long before expiry the access token is renewed.
    pub lead_time: Duration,
}

impl SessionConfig {
    pub fn with_lead_time(mut self, lead_time: Duration) -> Self {
        self.lead_time = lead_time;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lead_time: DEFAULT_LEAD_TIME,
        }
    }
}
