//! Token-issuing backend trait.

use async_trait::async_trait;

use crate::tokens::{AccessToken, RefreshToken};
use crate::Result;

/// Tokens minted by a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub access_token: AccessToken,
    /// Present when the backend rotates refresh tokens.
    pub refresh_token: Option<RefreshToken>,
}

/// The backend endpoint that exchanges a refresh token for a new access token.
///
/// Implementations must not attach any access token to the request.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<RefreshedTokens>;
}
