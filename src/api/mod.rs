// Typed calls to the paraphrasing API

pub mod history;
pub mod models;
pub mod plans;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, RwLock};

use crate::auth::{
    AuthResponse, HttpRefresher, Navigator, Session, SessionManager, SessionStore, User,
};
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::http_client::{self, AuthenticatedClient};
use crate::validation;
use models::{
    ActivityEvent, CheckoutRequest, CheckoutSession, HistoryEntry, HistoryResponse, LoginRequest,
    ParaphraseRequest, ParaphraseResult, Platform, RegisterRequest, SettingsUpdate, Subscription,
};

/// Client for every backend endpoint
pub struct ApiClient {
    base_url: String,
    http: AuthenticatedClient,

    /// Last subscription fetched for the current user
    subscription: RwLock<Option<Subscription>>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        client: Client,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
        expiry_margin_secs: u64,
    ) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let refresher = Arc::new(HttpRefresher::new(client.clone(), &base_url));
        let session = Arc::new(
            SessionManager::new(store, refresher, navigator).with_expiry_margin(expiry_margin_secs),
        );

        Self {
            base_url,
            http: AuthenticatedClient::new(client, session),
            subscription: RwLock::new(None),
        }
    }

    pub fn from_config(
        config: &Config,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> anyhow::Result<Self> {
        let client =
            http_client::build_client(config.http_connect_timeout, config.http_request_timeout)?;
        Ok(Self::new(
            &config.api_url,
            client,
            store,
            navigator,
            config.token_refresh_margin,
        ))
    }

    pub fn session(&self) -> &SessionManager {
        self.http.session()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .client()
            .request(method, format!("{}{}", self.base_url, path))
            .header("Content-Type", "application/json")
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder.build().map_err(|e| ApiError::from_transport(&e))?;
        self.http.execute(request).await
    }

    async fn send_public(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder.build().map_err(|e| ApiError::from_transport(&e))?;
        self.http.execute_public(request).await
    }

    // ==================================================================================
    // Authentication
    // ==================================================================================

    /// Log in and persist the session
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let builder = self
            .request(Method::POST, "/auth/login")
            .json(&LoginRequest { email, password });
        let response = self.send_public(builder).await?;
        self.start_session(response).await
    }

    /// Create an account and persist the session
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let mut problems = Vec::new();
        if name.trim().is_empty() {
            problems.push("Name is required".to_string());
        }
        problems.extend(validation::validate_email(email));
        problems.extend(validation::validate_password(password));
        if !problems.is_empty() {
            return Err(ApiError::Validation(problems.join("; ")));
        }

        let builder = self
            .request(Method::POST, "/auth/register")
            .json(&RegisterRequest {
                name,
                email,
                password,
            });
        let response = self.send_public(builder).await?;
        self.start_session(response).await
    }

    async fn start_session(&self, response: Response) -> Result<User> {
        let status = response.status().as_u16();
        let body: Value = read_json(response).await?.unwrap_or(Value::Null);

        // Some failures come back as 2xx with an `error` field
        if let Some(message) = body.get("error").and_then(|v| v.as_str()) {
            return Err(ApiError::Api {
                status,
                message: message.to_string(),
            });
        }

        let auth: AuthResponse = serde_json::from_value(body).map_err(|e| {
            ApiError::Internal(anyhow::anyhow!("Malformed authentication response: {}", e))
        })?;
        let session = Session::from(auth);
        self.session().save(&session)?;
        self.clear_subscription();
        Ok(session.user)
    }

    /// End the session locally
    pub fn logout(&self) -> Result<()> {
        self.clear_subscription();
        self.session().logout()
    }

    // ==================================================================================
    // Paraphrasing
    // ==================================================================================

    /// Paraphrase `text`, gated by the cached subscription's character limit
    pub async fn paraphrase(
        &self,
        text: &str,
        language: &str,
        style: &str,
    ) -> Result<ParaphraseResult> {
        plans::check_paraphrase_request(text, self.cached_subscription().as_ref())?;

        let builder = self
            .request(Method::POST, "/paraphrase")
            .json(&ParaphraseRequest {
                text,
                language,
                style,
            });
        let response = self.send(builder).await?;
        read_json(response)
            .await?
            .ok_or_else(|| empty_body("/paraphrase"))
    }

    pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
        let response = self.send(self.request(Method::GET, "/history")).await?;
        let data: HistoryResponse = read_json(response).await?.unwrap_or_default();
        Ok(data.history.unwrap_or_default())
    }

    /// Languages the user has paraphrased into
    pub async fn used_languages(&self) -> Result<Vec<String>> {
        let response = self.send(self.request(Method::GET, "/languages")).await?;
        let data: Option<Value> = read_json(response).await?;
        Ok(match data {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        })
    }

    /// Usage statistics; the shape is owned by the server
    pub async fn stats(&self) -> Result<Value> {
        let response = self.send(self.request(Method::GET, "/stats")).await?;
        Ok(read_json(response).await?.unwrap_or(Value::Null))
    }

    // ==================================================================================
    // Account
    // ==================================================================================

    pub async fn update_settings(&self, update: &SettingsUpdate) -> Result<Value> {
        if update.is_empty() {
            return Err(ApiError::Validation("Nothing to update".to_string()));
        }
        if let Some(ref email) = update.email {
            let problems = validation::validate_email(email);
            if !problems.is_empty() {
                return Err(ApiError::Validation(problems.join("; ")));
            }
        }
        if let Some(ref password) = update.new_password {
            if update.current_password.is_none() {
                return Err(ApiError::Validation(
                    "Current password is required to set a new one".to_string(),
                ));
            }
            let problems = validation::validate_password(password);
            if !problems.is_empty() {
                return Err(ApiError::Validation(problems.join("; ")));
            }
        }

        let builder = self.request(Method::PUT, "/settings").json(update);
        let response = self.send(builder).await?;
        Ok(read_json(response).await?.unwrap_or(Value::Null))
    }

    /// Record a usage event
    pub async fn track_activity(&self, action: &str, metadata: Value) -> Result<()> {
        let builder = self
            .request(Method::POST, "/activity/track")
            .json(&ActivityEvent {
                action,
                metadata,
                timestamp: chrono::Utc::now(),
            });
        let response = self.send(builder).await?;
        read_json::<Value>(response).await?;
        Ok(())
    }

    // ==================================================================================
    // Subscription and billing
    // ==================================================================================

    fn cached_subscription(&self) -> Option<Subscription> {
        self.subscription
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn cache_subscription(&self, subscription: Option<Subscription>) {
        *self.subscription.write().unwrap_or_else(|e| e.into_inner()) = subscription;
    }

    fn clear_subscription(&self) {
        self.cache_subscription(None);
    }

    /// Current subscription, `None` when the user has none
    pub async fn subscription(&self) -> Result<Option<Subscription>> {
        let response = self.send(self.request(Method::GET, "/subscription")).await?;
        let subscription = if response.status() == StatusCode::NOT_FOUND {
            None
        } else {
            read_json(response).await?
        };

        self.cache_subscription(subscription.clone());
        Ok(subscription)
    }

    pub async fn cancel_subscription(&self) -> Result<Value> {
        let response = self
            .send(self.request(Method::POST, "/subscription/cancel"))
            .await?;
        let result = read_json(response).await?.unwrap_or(Value::Null);
        self.clear_subscription();
        Ok(result)
    }

    pub async fn activate_trial(&self) -> Result<Option<Subscription>> {
        let response = self
            .send(self.request(Method::POST, "/subscription/trial"))
            .await?;
        let subscription: Option<Subscription> = read_json(response).await?;
        if subscription.is_some() {
            self.cache_subscription(subscription.clone());
        }
        Ok(subscription)
    }

    pub async fn create_checkout_session(
        &self,
        plan_id: &str,
        platform: Platform,
    ) -> Result<CheckoutSession> {
        if plans::find_plan(plan_id).is_none() {
            return Err(ApiError::Validation(format!("Unknown plan: {}", plan_id)));
        }

        let builder = self
            .request(Method::POST, "/checkout/session")
            .json(&CheckoutRequest { plan_id, platform });
        let response = self.send(builder).await?;
        read_json(response)
            .await?
            .ok_or_else(|| empty_body("/checkout/session"))
    }
}

fn empty_body(path: &str) -> ApiError {
    ApiError::Internal(anyhow::anyhow!("Empty response body from {}", path))
}

/// Turn a response into JSON.
/// Error statuses become `ApiError::Api`; 204 and empty bodies are `None`.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<Option<T>> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::from_transport(&e))?;

    if !status.is_success() {
        tracing::debug!(status = status.as_u16(), body = %text, "Error response");
        return Err(ApiError::from_response(status.as_u16(), &text));
    }

    if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&text).map(Some).map_err(|e| {
        tracing::warn!(error = %e, "Failed to parse response body");
        ApiError::Internal(anyhow::anyhow!("Malformed response body: {}", e))
    })
}
