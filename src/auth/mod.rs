// Authentication module
// Session persistence, token expiry and single-flight refresh

mod coordinator;
mod manager;
mod refresh;
mod store;
pub mod token;
mod types;

pub use coordinator::{LogNavigator, Navigator, RefreshCoordinator, ROOT_PATH};
pub use manager::SessionManager;
pub use refresh::{HttpRefresher, TokenRefresher};
pub use store::{MemorySessionStore, SessionStore, SqliteSessionStore};
pub use types::{
    AuthResponse, RefreshedTokens, Session, User, REFRESH_TOKEN_KEY, SESSION_KEYS, TOKEN_KEY,
    USER_KEY,
};
