//! Login and token refresh against the backend.

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use unisession_core::error::{AuthError, Error, InvalidInputError};
use unisession_core::traits::{RefreshedTokens, TokenRefresher};
use unisession_core::types::ApiUrl;
use unisession_core::{AccessToken, Credentials, Identity, RefreshToken, Result, Session};

use crate::client::ApiClient;
use crate::endpoints::*;

/// Tokens and identity returned by a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutput {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub identity: Identity,
}

impl LoginOutput {
    /// Bundle the login result as a session.
    pub fn into_session(self) -> Session {
        Session::new(self.access_token, self.refresh_token, self.identity)
    }
}

/// The backend's auth endpoints.
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    /// Create a client for the backend at `api`.
    pub fn new(api: ApiUrl) -> Result<Self> {
        Ok(Self {
            client: ApiClient::new(api)?,
        })
    }

    /// Returns the backend URL.
    pub fn url(&self) -> &ApiUrl {
        self.client.api()
    }

    /// Log in with an email (or username) and password.
    #[instrument(skip(self, credentials), fields(identifier = %credentials.identifier()))]
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutput> {
        let request = LoginRequest {
            email: credentials.identifier(),
            password: credentials.password(),
        };

        let response: LoginResponse = self
            .client
            .post_json(LOGIN, &request)
            .await
            .map_err(|e| match e {
                Error::Protocol(ref p) if p.is_auth_error() => {
                    warn!(status = p.status, "Login rejected");
                    Error::Auth(AuthError::InvalidCredentials)
                }
                other => other,
            })?;

        let identity: Identity =
            serde_json::from_value(response.user).map_err(|e| InvalidInputError::Identity {
                reason: e.to_string(),
            })?;

        info!(user = %identity.id, role = %identity.role, "Logged in");
        Ok(LoginOutput {
            access_token: AccessToken::new(response.access_token),
            refresh_token: RefreshToken::new(response.refresh_token),
            identity,
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The request carries only the refresh token in its body, never an
    /// access token.
    #[instrument(skip_all)]
    pub async fn refresh_token(&self, refresh_token: &RefreshToken) -> Result<RefreshedTokens> {
        let request = RefreshTokenRequest {
            token: refresh_token.as_str(),
        };

        let response: RefreshTokenResponse = self
            .client
            .post_json(REFRESH_TOKEN, &request)
            .await
            .map_err(|e| match e {
                Error::Protocol(ref p) if p.is_auth_error() => {
                    warn!(status = p.status, "Refresh token rejected");
                    Error::Auth(AuthError::RefreshTokenInvalid)
                }
                other => other,
            })?;

        debug!(rotated = response.refresh_token.is_some(), "Access token refreshed");
        Ok(RefreshedTokens {
            access_token: AccessToken::new(response.access_token),
            refresh_token: response.refresh_token.map(RefreshToken::new),
        })
    }
}

#[async_trait]
impl TokenRefresher for AuthApi {
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<RefreshedTokens> {
        self.refresh_token(refresh_token).await
    }
}
