use chrono::{Duration, Utc};
use std::sync::{Arc, RwLock};

use super::coordinator::{Navigator, RefreshCoordinator};
use super::refresh::TokenRefresher;
use super::store::SessionStore;
use super::token::{self, DEFAULT_EXPIRY_MARGIN_SECS};
use super::types::{Session, User, REFRESH_TOKEN_KEY, TOKEN_KEY, USER_KEY};
use crate::error::{ApiError, Result};

/// Session manager
/// Owns the persisted session, the in-memory user and the refresh coordinator
pub struct SessionManager {
    /// Persistent session keys
    store: Arc<dyn SessionStore>,

    /// Single-flight refresh
    coordinator: RefreshCoordinator,

    /// User hydrated from storage or set on login
    current_user: RwLock<Option<User>>,

    /// Refresh this long before the access token expires
    expiry_margin: Duration,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        refresher: Arc<dyn TokenRefresher>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            coordinator: RefreshCoordinator::new(store.clone(), refresher, navigator),
            store,
            current_user: RwLock::new(None),
            expiry_margin: Duration::seconds(DEFAULT_EXPIRY_MARGIN_SECS),
        }
    }

    /// Override the early-refresh margin (seconds).
    /// Margins past what `Duration` can hold saturate, so every token counts as expiring.
    pub fn with_expiry_margin(mut self, secs: u64) -> Self {
        self.expiry_margin = i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        self
    }

    fn set_user(&self, user: Option<User>) {
        let mut current = self.current_user.write().unwrap_or_else(|e| e.into_inner());
        *current = user;
    }

    /// Load a persisted session into memory.
    /// Corrupt user data ends the session rather than half-restoring it.
    pub fn bootstrap(&self) -> Result<Option<User>> {
        let token = self.store.get(TOKEN_KEY)?;
        let user_data = self.store.get(USER_KEY)?;

        let (Some(_), Some(user_data)) = (token, user_data) else {
            tracing::debug!("No persisted session");
            return Ok(None);
        };

        match serde_json::from_str::<User>(&user_data) {
            Ok(user) => {
                tracing::info!(user_id = user.id, "Restored session");
                self.set_user(Some(user.clone()));
                Ok(Some(user))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse persisted user data, clearing session");
                self.store.clear()?;
                self.set_user(None);
                Ok(None)
            }
        }
    }

    /// Persist a new session (login or register)
    pub fn save(&self, session: &Session) -> Result<()> {
        let user_json = serde_json::to_string(&session.user)
            .map_err(|e| ApiError::Internal(e.into()))?;

        self.store.set(TOKEN_KEY, &session.access_token)?;
        self.store.set(REFRESH_TOKEN_KEY, &session.refresh_token)?;
        self.store.set(USER_KEY, &user_json)?;
        self.set_user(Some(session.user.clone()));

        tracing::info!(user_id = session.user.id, "Session saved");
        Ok(())
    }

    /// Drop the session from storage and memory
    pub fn logout(&self) -> Result<()> {
        self.store.clear()?;
        self.set_user(None);
        tracing::info!("Logged out");
        Ok(())
    }

    /// Currently logged-in user
    pub fn current_user(&self) -> Option<User> {
        self.current_user
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Stored access token, as-is
    pub fn access_token(&self) -> Result<Option<String>> {
        self.store.get(TOKEN_KEY)
    }

    /// Access token that is not about to expire, refreshing first if needed
    pub async fn valid_access_token(&self) -> Result<String> {
        let token = self.access_token()?.ok_or(ApiError::NotAuthenticated)?;

        if token::is_token_expired_at(&token, Utc::now(), self.expiry_margin) {
            tracing::debug!("Access token expired or expiring soon, refreshing");
            return self.refresh().await;
        }

        Ok(token)
    }

    /// Force a refresh through the single-flight coordinator.
    /// Only a terminal failure forgets the user; storage was cleared with it.
    pub async fn refresh(&self) -> Result<String> {
        let result = self.coordinator.refresh().await;
        if let Err(ApiError::SessionExpired) = result {
            self.set_user(None);
        }
        result
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }
}
