// Paraphrase client - library root

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod http_client;
pub mod languages;
pub mod validation;

pub use api::ApiClient;
pub use error::{ApiError, Result};
