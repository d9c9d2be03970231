// Single-flight refresh coordination
//
// One refresh request at a time. Callers arriving while a refresh is in flight
// queue up and receive the same outcome as the caller that started it.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

use super::refresh::TokenRefresher;
use super::store::SessionStore;
use super::types::{REFRESH_TOKEN_KEY, TOKEN_KEY};
use crate::error::{ApiError, Result};

/// Where the client goes after a terminal auth failure
pub const ROOT_PATH: &str = "/";

/// Performs the full navigation that follows a terminal auth failure.
/// Everything held in memory should be considered stale after this call.
pub trait Navigator: Send + Sync {
    fn hard_navigate(&self, path: &str);
}

/// Navigator for headless use: records the event in the log
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn hard_navigate(&self, path: &str) {
        tracing::warn!(path = path, "Session ended, returning to start");
    }
}

/// What a queued caller learns about the refresh it waited on
#[derive(Clone)]
enum Outcome {
    Token(String),
    /// Terminal: the session is gone
    Failed,
    /// The initiating caller was dropped before the refresh finished
    Cancelled,
}

impl Outcome {
    /// Log label that never includes the token
    fn label(&self) -> &'static str {
        match self {
            Outcome::Token(_) => "refreshed",
            Outcome::Failed => "failed",
            Outcome::Cancelled => "cancelled",
        }
    }
}

type Waiter = oneshot::Sender<Outcome>;

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    waiters: Vec<Waiter>,
}

/// Coordinates access token refreshes so only one is ever in flight
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    store: Arc<dyn SessionStore>,
    refresher: Arc<dyn TokenRefresher>,
    navigator: Arc<dyn Navigator>,
}

/// Marks the refresh started by this caller. Dropping it returns the
/// coordinator to idle and hands `outcome` to every queued waiter. Unless the
/// refresh finished, the outcome is `Cancelled`.
struct InFlight<'a> {
    coordinator: &'a RefreshCoordinator,
    outcome: Outcome,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let outcome = std::mem::replace(&mut self.outcome, Outcome::Cancelled);
        self.coordinator.complete(outcome);
    }
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        refresher: Arc<dyn TokenRefresher>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            state: Mutex::new(RefreshState::default()),
            store,
            refresher,
            navigator,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        // State stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// True while a refresh request is outstanding
    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    /// Number of callers waiting on the in-flight refresh
    pub fn pending_waiters(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Obtain a fresh access token.
    ///
    /// Returns `ApiError::SessionExpired` when the refresh path is exhausted. By
    /// then the session has been cleared and the navigator sent to the root.
    /// If the caller that started the refresh goes away first, waiters start a
    /// new one instead.
    pub async fn refresh(&self) -> Result<String> {
        loop {
            let waiter = {
                let mut state = self.lock();
                if state.refreshing {
                    let (tx, rx) = oneshot::channel();
                    state.waiters.push(tx);
                    Some(rx)
                } else {
                    state.refreshing = true;
                    None
                }
            };

            let Some(rx) = waiter else {
                return self.lead_refresh().await;
            };

            tracing::debug!("Refresh already in flight, waiting for its result");
            match rx.await {
                Ok(Outcome::Token(token)) => return Ok(token),
                Ok(Outcome::Failed) => return Err(ApiError::SessionExpired),
                Ok(Outcome::Cancelled) | Err(_) => {
                    tracing::debug!("Refresh was abandoned by its initiator, retrying");
                }
            }
        }
    }

    async fn lead_refresh(&self) -> Result<String> {
        let mut in_flight = InFlight {
            coordinator: self,
            outcome: Outcome::Cancelled,
        };

        match self.perform_refresh().await {
            Ok(token) => {
                in_flight.outcome = Outcome::Token(token.clone());
                drop(in_flight);
                Ok(token)
            }
            Err(e) => {
                tracing::error!(error = %e, "Token refresh failed, ending session");

                if let Err(e) = self.store.clear() {
                    tracing::error!(error = %e, "Failed to clear session storage");
                }
                // Reject waiters before leaving
                in_flight.outcome = Outcome::Failed;
                drop(in_flight);
                self.navigator.hard_navigate(ROOT_PATH);

                Err(ApiError::SessionExpired)
            }
        }
    }

    async fn perform_refresh(&self) -> Result<String> {
        let refresh_token = self
            .store
            .get(REFRESH_TOKEN_KEY)?
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::NotAuthenticated)?;

        let tokens = self.refresher.refresh(&refresh_token).await?;

        self.store.set(TOKEN_KEY, &tokens.access_token)?;
        if let Some(ref rotated) = tokens.refresh_token {
            self.store.set(REFRESH_TOKEN_KEY, rotated)?;
        }

        Ok(tokens.access_token)
    }

    fn complete(&self, outcome: Outcome) {
        let waiters = {
            let mut state = self.lock();
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };

        if !waiters.is_empty() {
            tracing::debug!(
                waiters = waiters.len(),
                outcome = outcome.label(),
                "Releasing refresh waiters"
            );
        }

        // Queue order
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}
