//! Salesforce connection configuration loaded from environment variables.
//!
//! The WordPress host usually injects these from its own settings screen;
//! `from_env` exists for standalone tooling and local development.

use std::env;

/// Connected-app configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Connected-app consumer key (public)
    pub client_id: String,
    /// Connected-app consumer secret
    pub client_secret: String,
    /// OAuth callback URL registered on the connected app
    pub redirect_uri: String,
    /// OAuth host: `https://login.salesforce.com`, or
    /// `https://test.salesforce.com` for sandbox orgs.
    pub login_url: String,
    /// REST API version path segment, e.g. `v58.0`
    pub api_version: String,
    /// HMAC key for signing the OAuth state parameter (raw bytes)
    pub state_signing_key: Vec<u8>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            client_id: "test_client_id".to_string(),
            client_secret: "test_secret".to_string(),
            redirect_uri: "http://localhost:8080/callback".to_string(),
            login_url: "https://login.salesforce.com".to_string(),
            api_version: "v58.0".to_string(),
            state_signing_key: b"test_state_key_32_bytes_minimum!".to_vec(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            client_id: env::var("SALESFORCE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("SALESFORCE_CLIENT_ID"))?,
            client_secret: env::var("SALESFORCE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SALESFORCE_CLIENT_SECRET"))?,
            redirect_uri: env::var("SALESFORCE_REDIRECT_URI")
                .map_err(|_| ConfigError::Missing("SALESFORCE_REDIRECT_URI"))?,
            login_url: env::var("SALESFORCE_LOGIN_URL")
                .unwrap_or_else(|_| "https://login.salesforce.com".to_string()),
            api_version: env::var("SALESFORCE_API_VERSION")
                .unwrap_or_else(|_| "v58.0".to_string()),
            state_signing_key: env::var("SALESFORCE_STATE_KEY")
                .map_err(|_| ConfigError::Missing("SALESFORCE_STATE_KEY"))?
                .into_bytes(),
        })
    }

    /// Whether this config points at a sandbox org.
    pub fn is_sandbox(&self) -> bool {
        self.login_url.contains("test.salesforce.com")
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
