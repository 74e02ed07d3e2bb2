//! Auth endpoint paths and request/response types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Exchange credentials for a token pair.
pub(crate) const LOGIN: &str = "/api/v1/auth/login";

/// Exchange a refresh token for a new access token.
pub(crate) const REFRESH_TOKEN: &str = "/api/v1/auth/refresh-token";

/// Request body for login. The backend accepts an email or a username in
/// the `email` field.
#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

impl fmt::Debug for LoginRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Response from login.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: Value,
}

/// Request body for refresh-token.
#[derive(Serialize)]
pub(crate) struct RefreshTokenRequest<'a> {
    pub token: &'a str,
}

/// Response from refresh-token.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Error body returned by the backend for failed requests.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
