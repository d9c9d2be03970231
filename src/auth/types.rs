// Authentication types

use serde::{Deserialize, Serialize};

/// Storage key for the access token
pub const TOKEN_KEY: &str = "auth_token";

/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Storage key for the serialized user
pub const USER_KEY: &str = "user_data";

/// Every key that makes up a session; all are removed together
pub const SESSION_KEYS: [&str; 3] = [TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

/// Logged-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Complete persisted session
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

/// Login and register response
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: User,
}

impl From<AuthResponse> for Session {
    fn from(resp: AuthResponse) -> Self {
        Session {
            access_token: resp.token,
            refresh_token: resp.refresh_token,
            user: resp.user,
        }
    }
}

/// Refresh endpoint response
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub token: String,
    /// Present only when the server rotates the refresh token
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Tokens obtained from a successful refresh
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshedTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl From<RefreshResponse> for RefreshedTokens {
    fn from(resp: RefreshResponse) -> Self {
        RefreshedTokens {
            access_token: resp.token,
            refresh_token: resp.refresh_token,
        }
    }
}
