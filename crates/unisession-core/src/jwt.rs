//! Unverified JWT claim decoding.
//!
//! Only the payload segment is read. The backend is the authority on
//! signatures; the client needs nothing more than the expiry to plan a
//! renewal.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::TokenError;

/// Claims read from an access token payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Claims {
    /// Expiry in seconds since the Unix epoch. Fractional values are accepted.
    pub exp: f64,
    /// Subject, usually the user id or email.
    #[serde(default)]
    pub sub: Option<String>,
    /// Issued-at in seconds since the Unix epoch.
    #[serde(default)]
    pub iat: Option<f64>,
}

impl Claims {
    /// Returns the expiry as a UTC timestamp.
    pub fn expires_at(&self) -> Result<DateTime<Utc>, TokenError> {
        let millis = self.exp * 1000.0;
        if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
            return Err(TokenError::ExpiryOutOfRange { exp: self.exp });
        }
        DateTime::from_timestamp_millis(millis as i64)
            .ok_or(TokenError::ExpiryOutOfRange { exp: self.exp })
    }
}

/// Decode the claims of a JWT without verifying its signature.
pub fn decode_claims(token: &str) -> Result<Claims, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::Segments {
            found: segments.len(),
        });
    }

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .map_err(|e| TokenError::Base64 {
            message: e.to_string(),
        })?;

    serde_json::from_slice(&payload).map_err(|e| TokenError::Claims {
        message: e.to_string(),
    })
}
