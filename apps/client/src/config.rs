use std::path::PathBuf;

use anyhow::{Context, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL including the `/api` prefix, no trailing slash.
    pub api_base_url: String,
    /// Web API key of the identity provider project.
    pub firebase_api_key: String,
    pub login_path: String,
    /// Directory backing the durable session store.
    pub storage_dir: PathBuf,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_base_url = std::env::var("COVERFORME_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let storage_dir = std::env::var("COVERFORME_STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".coverforme"));

        Ok(ClientConfig {
            api_base_url: normalize_base_url(&api_base_url),
            firebase_api_key: std::env::var("FIREBASE_API_KEY")
                .context("Required environment variable 'FIREBASE_API_KEY' is not set")?,
            login_path: LOGIN_PATH.to_string(),
            storage_dir,
        })
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url_strips_trailing_slash() {
        assert_eq!(
            normalize_base_url("http://localhost:8000/api/ "),
            "http://localhost:8000/api"
        );
        assert_eq!(normalize_base_url(DEFAULT_API_URL), DEFAULT_API_URL);
    }
}
