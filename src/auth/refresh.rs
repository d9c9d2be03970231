// Token refresh network call

use async_trait::async_trait;
use reqwest::Client;

use super::types::{RefreshResponse, RefreshedTokens};
use crate::error::{ApiError, Result};

/// Exchanges a refresh token for a new access token
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens>;
}

/// Refresh against `{base_url}/auth/refresh`
pub struct HttpRefresher {
    client: Client,
    url: String,
}

impl HttpRefresher {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            url: format!("{}/auth/refresh", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens> {
        tracing::debug!(url = %self.url, "Requesting new access token");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(refresh_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                body = %error_text,
                "Token refresh rejected"
            );
            return Err(ApiError::from_response(status.as_u16(), &error_text));
        }

        let data: RefreshResponse = response
            .json()
            .await
            .map_err(|e| ApiError::from_transport(&e))?;

        if data.token.is_empty() {
            return Err(ApiError::Internal(anyhow::anyhow!(
                "Refresh response does not contain a token"
            )));
        }

        tracing::info!(
            rotated = data.refresh_token.is_some(),
            "Access token refreshed"
        );

        Ok(data.into())
    }
}
