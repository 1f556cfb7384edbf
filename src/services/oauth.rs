// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Salesforce OAuth2 token lifecycle.
//!
//! Handles:
//! - Authorization URL with HMAC-signed state
//! - Authorization-code exchange and token persistence
//! - Proactive refresh with a process-wide lock
//! - Revocation on disconnect

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::models::StoredToken;
use crate::store::TokenStore;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Signed state parameters older than this are rejected.
const STATE_MAX_AGE_MS: u128 = 15 * 60 * 1000;

/// Session lifetime assumed when the token endpoint omits expires_in
/// (Salesforce's default session timeout).
const DEFAULT_EXPIRES_IN_SECS: i64 = 2 * 60 * 60;

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// A token guaranteed valid for immediate use.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub access_token: String,
    pub instance_url: String,
}

/// Cached access token with expiry information.
#[derive(Clone)]
struct CachedToken {
    access_token: String,
    instance_url: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn as_access(&self) -> AccessToken {
        AccessToken {
            access_token: self.access_token.clone(),
            instance_url: self.instance_url.clone(),
        }
    }
}

/// Manages the org's OAuth token lifecycle.
///
/// Clones share the token cache and refresh lock, so every caller in the
/// process sees one token and at most one in-flight refresh.
#[derive(Clone)]
pub struct OAuthManager {
    http: reqwest::Client,
    config: Config,
    tokens: TokenStore,
    /// In-memory copy of the current access token.
    cache: Arc<RwLock<Option<CachedToken>>>,
    /// Serializes refresh operations; concurrent refreshes could
    /// invalidate each other's refresh token.
    refresh_lock: Arc<Mutex<()>>,
}

impl OAuthManager {
    pub fn new(config: Config, tokens: TokenStore) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            config,
            tokens,
            cache: Arc::new(RwLock::new(None)),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    fn oauth_url(&self, endpoint: &str) -> String {
        format!(
            "{}/services/oauth2/{}",
            self.config.login_url.trim_end_matches('/'),
            endpoint
        )
    }

    // ─── Interactive authorization flow ──────────────────────────────

    /// Authorization redirect URL with a signed state parameter.
    pub fn authorize_url(&self) -> Result<String> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| SyncError::Internal(anyhow::anyhow!("System time error: {}", e)))?
            .as_millis();

        let payload = format!("{:x}", timestamp);
        let mut mac = HmacSha256::new_from_slice(&self.config.state_signing_key)
            .map_err(|e| SyncError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
        mac.update(payload.as_bytes());
        let signed = format!("{}|{}", payload, hex::encode(mac.finalize().into_bytes()));
        let state = URL_SAFE_NO_PAD.encode(signed.as_bytes());

        Ok(format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&state={}",
            self.oauth_url("authorize"),
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            state
        ))
    }

    /// Verify the HMAC signature and freshness of a callback state parameter.
    pub fn verify_state(&self, state: &str) -> bool {
        let Some((timestamp_hex, signature_hex)) = decode_state(state) else {
            return false;
        };

        let Ok(mut mac) = HmacSha256::new_from_slice(&self.config.state_signing_key) else {
            return false;
        };
        mac.update(timestamp_hex.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());
        if signature_hex != expected {
            tracing::warn!("OAuth state signature mismatch");
            return false;
        }

        let Ok(timestamp) = u128::from_str_radix(&timestamp_hex, 16) else {
            return false;
        };
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        if now.saturating_sub(timestamp) > STATE_MAX_AGE_MS {
            tracing::warn!("OAuth state parameter expired");
            return false;
        }
        true
    }

    /// Exchange an authorization code for tokens and persist them.
    pub async fn exchange_code(&self, code: &str) -> Result<()> {
        let response = self
            .http
            .post(self.oauth_url("token"))
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| SyncError::Authentication(format!("Token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Salesforce token exchange failed");
            return Err(SyncError::Authentication(format!(
                "Token exchange failed with status {}",
                status
            )));
        }

        let token: TokenEndpointResponse = response.json().await.map_err(|e| {
            SyncError::Authentication(format!("Failed to parse token response: {}", e))
        })?;

        let refresh_token = token.refresh_token.ok_or_else(|| {
            SyncError::Authentication(
                "Token response missing refresh_token; enable the refresh_token scope on the connected app".to_string(),
            )
        })?;
        let instance_url = token.instance_url.ok_or_else(|| {
            SyncError::Authentication("Token response missing instance_url".to_string())
        })?;

        let expires_at =
            Utc::now() + Duration::seconds(token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS));

        let stored = StoredToken {
            access_token: token.access_token.clone(),
            refresh_token,
            instance_url: instance_url.clone(),
            expires_at: expires_at.to_rfc3339(),
        };
        self.tokens.set(&stored).await?;

        *self.cache.write().await = Some(CachedToken {
            access_token: token.access_token,
            instance_url: instance_url.clone(),
            expires_at,
        });

        tracing::info!(instance_url = %instance_url, "Authorization code exchanged, tokens stored");
        Ok(())
    }

    // ─── Token Management ────────────────────────────────────────────

    /// Get a valid (non-expired) access token.
    ///
    /// 1. Check in-memory cache (fast path - no I/O)
    /// 2. Acquire the refresh lock
    /// 3. Re-check cache after lock (another task may have refreshed)
    /// 4. Load the stored triple
    /// 5. If still valid, cache and return
    /// 6. Otherwise refresh, persist, and cache
    pub async fn get_valid_token(&self) -> Result<AccessToken> {
        let now = Utc::now();
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if now + margin < cached.expires_at {
                    return Ok(cached.as_access());
                }
            }
        }

        let _guard = self.refresh_lock.lock().await;

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if now + margin < cached.expires_at {
                    // Another task already refreshed while we waited
                    return Ok(cached.as_access());
                }
            }
        }

        let stored = self.tokens.get().await?.ok_or_else(|| {
            SyncError::Authentication(
                "Not connected to Salesforce; run the authorization flow".to_string(),
            )
        })?;

        let expires_at = DateTime::parse_from_rfc3339(&stored.expires_at)
            .map_err(|e| SyncError::Storage(format!("Invalid stored token expiry: {}", e)))?
            .with_timezone(&Utc);

        if now + margin < expires_at {
            let cached = CachedToken {
                access_token: stored.access_token.clone(),
                instance_url: stored.instance_url.clone(),
                expires_at,
            };
            *self.cache.write().await = Some(cached.clone());
            return Ok(cached.as_access());
        }

        tracing::info!("Access token expired, refreshing");
        let refreshed = self.refresh(&stored).await?;

        let new_expires_at = DateTime::parse_from_rfc3339(&refreshed.expires_at)
            .map_err(|e| SyncError::Storage(format!("Invalid refreshed expiry: {}", e)))?
            .with_timezone(&Utc);

        self.tokens.set(&refreshed).await?;

        let cached = CachedToken {
            access_token: refreshed.access_token.clone(),
            instance_url: refreshed.instance_url.clone(),
            expires_at: new_expires_at,
        };
        *self.cache.write().await = Some(cached.clone());

        tracing::info!("Token refreshed and cached");
        Ok(cached.as_access())
    }

    /// Refresh-token grant. Any failure here is fatal for the caller:
    /// the state machine drops back to unauthenticated.
    async fn refresh(&self, stored: &StoredToken) -> Result<StoredToken> {
        let response = self
            .http
            .post(self.oauth_url("token"))
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", stored.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                SyncError::Authentication(format!("Token refresh request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if body.contains("invalid_grant") {
                // Revoked or consumed refresh token: the stored triple is dead
                tracing::warn!("Refresh token revoked, clearing stored credentials");
                self.tokens.clear().await.ok();
                *self.cache.write().await = None;
                return Err(SyncError::Authentication(
                    "Refresh token revoked; re-authorization required".to_string(),
                ));
            }
            tracing::error!(status = %status, body = %body, "Salesforce token refresh failed");
            return Err(SyncError::Authentication(format!(
                "Token refresh failed with status {}",
                status
            )));
        }

        let token: TokenEndpointResponse = response.json().await.map_err(|e| {
            SyncError::Authentication(format!("Failed to parse refresh response: {}", e))
        })?;

        let expires_at =
            Utc::now() + Duration::seconds(token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS));

        Ok(StoredToken {
            access_token: token.access_token,
            // Salesforce keeps the refresh token stable unless rotation is on
            refresh_token: token.refresh_token.unwrap_or_else(|| stored.refresh_token.clone()),
            instance_url: token
                .instance_url
                .unwrap_or_else(|| stored.instance_url.clone()),
            expires_at: expires_at.to_rfc3339(),
        })
    }

    /// Whether a token triple is stored (says nothing about validity).
    pub async fn is_connected(&self) -> Result<bool> {
        Ok(self.tokens.get().await?.is_some())
    }

    /// Lightweight authenticated GET of the REST version index.
    /// Health checks only, never part of the steady-state flow.
    pub async fn test_connection(&self) -> bool {
        let token = match self.get_valid_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Connection test failed to obtain a token");
                return false;
            }
        };

        let url = format!("{}/services/data/", token.instance_url.trim_end_matches('/'));
        match self
            .http
            .get(&url)
            .bearer_auth(&token.access_token)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(status = %response.status(), "Connection test rejected");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Connection test request failed");
                false
            }
        }
    }

    /// Revoke the refresh token at the org and clear local credentials.
    pub async fn disconnect(&self) -> Result<()> {
        if let Some(stored) = self.tokens.get().await? {
            let url = self.oauth_url("revoke");
            match self
                .http
                .post(&url)
                .form(&[("token", stored.refresh_token.as_str())])
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    tracing::info!("Salesforce token revoked");
                }
                Ok(response) => {
                    tracing::warn!(
                        status = %response.status(),
                        "Token revocation rejected (clearing local credentials anyway)"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Token revocation request failed (clearing local credentials anyway)"
                    );
                }
            }
        }

        self.tokens.clear().await?;
        *self.cache.write().await = None;
        Ok(())
    }
}

/// Decode a state parameter into (timestamp_hex, signature_hex).
fn decode_state(state: &str) -> Option<(String, String)> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let decoded = String::from_utf8(bytes).ok()?;
    let (timestamp_hex, signature_hex) = decoded.split_once('|')?;
    Some((timestamp_hex.to_string(), signature_hex.to_string()))
}

/// Response from `POST /services/oauth2/token` (both grant types).
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    instance_url: Option<String>,
    /// Not always present; Salesforce session settings govern the real TTL
    #[serde(default)]
    expires_in: Option<i64>,
}
