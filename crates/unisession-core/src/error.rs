//! Error types for session management.
//!
//! A single [`Error`] enum with explicit variants for transport,
//! authentication, protocol, token decoding, storage and input validation
//! failures.

use std::fmt;
use thiserror::Error;

/// The unified error type for unisession operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors (invalid credentials, rejected refresh token).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Unexpected responses from the backend.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// An access token could not be decoded.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// The durable session store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input validation errors (invalid URL, identity payload).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid credentials provided at login.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The refresh token was rejected by the backend.
    #[error("refresh token invalid")]
    RefreshTokenInvalid,
}

/// Protocol-level errors from backend responses.
#[derive(Debug)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Error code or reason phrase (if present).
    pub error: Option<String>,
    /// Error message from the server.
    pub message: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref error) = self.error {
            write!(f, " [{}]", error)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(status: u16, error: Option<String>, message: Option<String>) -> Self {
        Self {
            status,
            error,
            message,
        }
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        self.status == 401 || self.status == 403
    }
}

/// Access token decoding errors.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token is not three dot-separated segments.
    #[error("expected 3 JWT segments, found {found}")]
    Segments { found: usize },

    /// The payload segment is not valid base64url.
    #[error("payload is not valid base64url: {message}")]
    Base64 { message: String },

    /// The payload is not a JSON object with a numeric `exp` claim.
    #[error("invalid claims: {message}")]
    Claims { message: String },

    /// The `exp` claim cannot be represented as a timestamp.
    #[error("expiry claim {exp} is out of range")]
    ExpiryOutOfRange { exp: f64 },
}

/// Durable storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    #[error("I/O error: {message}")]
    Io { message: String },

    /// The stored data could not be parsed.
    #[error("corrupt session data: {message}")]
    Corrupt { message: String },

    /// Change notifications could not be set up.
    #[error("watch error: {message}")]
    Watch { message: String },
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io {
            message: err.to_string(),
        }
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// Identity payload could not be (de)serialized.
    #[error("invalid identity: {reason}")]
    Identity { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_display_includes_details() {
        let err = ProtocolError::new(
            401,
            Some("Unauthorized".to_string()),
            Some("Refresh token expired".to_string()),
        );
        assert_eq!(err.to_string(), "HTTP 401 [Unauthorized]: Refresh token expired");
        assert!(err.is_auth_error());
    }

    #[test]
    fn server_errors_are_not_auth_errors() {
        let err = ProtocolError::new(503, None, None);
        assert_eq!(err.to_string(), "HTTP 503");
        assert!(!err.is_auth_error());
    }
}
