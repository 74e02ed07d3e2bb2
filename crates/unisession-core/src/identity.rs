//! The authenticated principal cached alongside the tokens.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, InvalidInputError};

/// Profile of the logged-in user, as returned by the backend at login.
///
/// Fields the dashboard does not model (timestamps, suspension details,
/// profile flags) are kept in `extra` so that the identity survives a round
/// trip through the session store unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Identity {
    /// Create an identity with only the required fields set.
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            role: role.into(),
            status: None,
            username: None,
            display_name: None,
            first_name: None,
            last_name: None,
            extra: Map::new(),
        }
    }

    /// Set the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Best human-readable label: display name, full name, username, email, id.
    pub fn label(&self) -> String {
        if let Some(name) = &self.display_name {
            return name.clone();
        }
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => return format!("{} {}", first, last),
            (Some(first), None) => return first.clone(),
            _ => {}
        }
        self.username
            .as_ref()
            .or(self.email.as_ref())
            .cloned()
            .unwrap_or_else(|| self.id.clone())
    }

    /// Whether the principal holds an administrative role.
    pub fn is_admin(&self) -> bool {
        matches!(self.role.as_str(), "ADMIN" | "SUPER_ADMIN")
    }

    /// Serialize for the session store.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| {
            InvalidInputError::Identity {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Parse the serialized form kept in the session store.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| {
            InvalidInputError::Identity {
                reason: e.to_string(),
            }
            .into()
        })
    }
}
