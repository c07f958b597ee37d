//! Client side of CoverForMe: the auth session manager and a typed backend
//! client that routes every 401 through one session-expiry handler.

pub mod api;
pub mod backend;
pub mod config;
pub mod cookie;
pub mod error;
pub mod guard;
pub mod manager;
pub mod models;
pub mod navigator;
pub mod provider;
pub mod store;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::SessionError;
pub use manager::SessionManager;
