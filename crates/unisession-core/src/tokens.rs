//! Token types for dashboard authentication.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::TokenError;
use crate::jwt::{self, Claims};

/// A short-lived bearer credential attached to API requests.
///
/// Access tokens are JWTs issued by the backend. The session manager only
/// reads the `exp` claim to decide when to renew; the signature is never
/// checked client-side.
///
/// # Security
///
/// - Never logged or displayed in Debug output
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Create a new access token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token value for use in authorization headers.
    ///
    /// # Security
    ///
    /// Use only when constructing HTTP authorization headers or persisting
    /// the session.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the unverified claims carried by this token.
    pub fn claims(&self) -> Result<Claims, TokenError> {
        jwt::decode_claims(&self.0)
    }

    /// Returns the instant this token expires.
    pub fn expires_at(&self) -> Result<DateTime<Utc>, TokenError> {
        self.claims()?.expires_at()
    }
}

// Hide token value in Debug output
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&"[REDACTED]").finish()
    }
}

/// A longer-lived credential used solely to mint a new access token.
///
/// # Security
///
/// - Never logged or displayed in Debug output
/// - Treat as opaque; do not parse or inspect
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshToken(String);

impl RefreshToken {
    /// Create a new refresh token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token value for use in refresh requests.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RefreshToken").field(&"[REDACTED]").finish()
    }
}
