//! JSON HTTP client for the backend API.

use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument, trace};

use unisession_core::error::{Error, ProtocolError, TransportError};
use unisession_core::types::ApiUrl;

use crate::endpoints::ErrorResponse;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client bound to one backend.
#[derive(Debug, Clone)]
pub(crate) struct ApiClient {
    client: reqwest::Client,
    api: ApiUrl,
}

impl ApiClient {
    /// Create a new client for the given backend.
    pub(crate) fn new(api: ApiUrl) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("unisession/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(map_reqwest)?;

        Ok(Self { client, api })
    }

    /// Returns the backend URL this client is configured for.
    pub(crate) fn api(&self) -> &ApiUrl {
        &self.api
    }

    /// POST a JSON body without credentials and decode the JSON response.
    #[instrument(skip(self, body), fields(api = %self.api))]
    pub(crate) async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, Error>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let url = self.api.endpoint(path);
        debug!(%url, "POST");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest)?;

        self.handle_response(response).await
    }

    /// Handle a response, parsing the body or error.
    async fn handle_response<R: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<R, Error> {
        let status = response.status();
        trace!(status = %status, "API response");

        if status.is_success() {
            let body = response.json::<R>().await.map_err(|e| {
                ProtocolError::new(
                    status.as_u16(),
                    Some("InvalidResponse".to_string()),
                    Some(e.to_string()),
                )
            })?;
            Ok(body)
        } else {
            Err(Error::Protocol(parse_error_response(response).await))
        }
    }
}

/// Parse a backend error body, falling back to the reason phrase.
async fn parse_error_response(response: reqwest::Response) -> ProtocolError {
    let status = response.status();
    let reason = status.canonical_reason().map(str::to_string);

    match response.json::<ErrorResponse>().await {
        Ok(body) => ProtocolError::new(status.as_u16(), body.error.or(reason), body.message),
        Err(_) => ProtocolError::new(status.as_u16(), reason, None),
    }
}

/// Classify a reqwest failure as a transport error.
pub(crate) fn map_reqwest(err: reqwest::Error) -> Error {
    let transport = if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    };
    Error::Transport(transport)
}
