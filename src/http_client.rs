use anyhow::Context;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Request, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::SessionManager;
use crate::error::{ApiError, Result};

/// Build the shared reqwest client
pub fn build_client(connect_timeout: u64, request_timeout: u64) -> anyhow::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout))
        .timeout(Duration::from_secs(request_timeout))
        .build()
        .context("Failed to create HTTP client")
}

/// HTTP client that attaches the session's bearer token.
///
/// A 401 triggers one refresh through the session's coordinator and one
/// re-issue of the original request. The second response is returned whatever
/// its status; it is never retried again.
pub struct AuthenticatedClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Session and refresh coordination
    session: Arc<SessionManager>,
}

impl AuthenticatedClient {
    pub fn new(client: Client, session: Arc<SessionManager>) -> Self {
        Self { client, session }
    }

    /// Send a request with no credentials (login, register)
    pub async fn execute_public(&self, request: Request) -> Result<Response> {
        tracing::debug!(method = %request.method(), url = %request.url(), "Sending public request");
        self.send(request).await
    }

    /// Send a request as the logged-in user
    pub async fn execute(&self, mut request: Request) -> Result<Response> {
        let token = self.session.valid_access_token().await?;
        set_bearer(&mut request, &token)?;

        // Keep a copy to replay after a refresh
        let replay = request.try_clone();

        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!(method = %method, url = %url, "Sending HTTP request");

        let response = self.send(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::warn!(url = %url, "Received 401, refreshing token and retrying once");

        let mut replay = replay.ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!("Request body is not cloneable"))
        })?;

        let token = self.session.refresh().await?;
        set_bearer(&mut replay, &token)?;

        let response = self.send(replay).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::error!(url = %url, "Request still unauthorized after refresh");
        }
        Ok(response)
    }

    async fn send(&self, request: Request) -> Result<Response> {
        let url = request.url().clone();
        let response = self.client.execute(request).await.map_err(|e| {
            tracing::warn!(error = %e, url = %url, "HTTP request error");
            ApiError::from_transport(&e)
        })?;

        tracing::debug!(status = %response.status(), url = %url, "Received HTTP response");
        Ok(response)
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }
}

fn set_bearer(request: &mut Request, token: &str) -> Result<()> {
    let value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| ApiError::Internal(anyhow::anyhow!("Access token is not a valid header value")))?;
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_bearer_replaces_existing_header() {
        let client = Client::new();
        let mut request = client
            .get("http://localhost/api/stats")
            .bearer_auth("stale")
            .build()
            .unwrap();

        set_bearer(&mut request, "fresh").unwrap();
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "Bearer fresh"
        );
        assert_eq!(request.headers().get_all(AUTHORIZATION).iter().count(), 1);
    }

    #[test]
    fn test_set_bearer_rejects_invalid_token() {
        let client = Client::new();
        let mut request = client.get("http://localhost/").build().unwrap();
        assert!(set_bearer(&mut request, "bad\ntoken").is_err());
    }

    #[test]
    fn test_build_client() {
        assert!(build_client(10, 60).is_ok());
    }
}
