// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Salesforce REST API client.
//!
//! Handles:
//! - SObject create (POST) and update (PATCH)
//! - SOQL query endpoint
//! - Object describe metadata
//! - Response classification into the typed error taxonomy

use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::error::{Result, SyncError};
use crate::services::oauth::OAuthManager;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Low-level REST client. Caller supplies instance URL and token per call.
#[derive(Clone)]
pub struct SalesforceClient {
    http: reqwest::Client,
    api_version: String,
}

impl SalesforceClient {
    pub fn new(api_version: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            api_version: api_version.to_string(),
        }
    }

    fn data_url(&self, instance_url: &str, path: &str) -> String {
        format!(
            "{}/services/data/{}/{}",
            instance_url.trim_end_matches('/'),
            self.api_version,
            path
        )
    }

    /// Create a record, returning the new record id.
    pub async fn create(
        &self,
        instance_url: &str,
        access_token: &str,
        object: &str,
        payload: &Map<String, Value>,
    ) -> Result<String> {
        let url = self.data_url(instance_url, &format!("sobjects/{}", object));
        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(payload)
            .send()
            .await
            .map_err(request_error)?;

        let created: CreateResponse = Self::read_json(response).await?;
        if !created.success {
            return Err(SyncError::Permanent {
                status: 400,
                message: format!("Create reported failure: {:?}", created.errors),
            });
        }
        Ok(created.id)
    }

    /// Update a record in place (PATCH by id). Salesforce answers 204.
    pub async fn update(
        &self,
        instance_url: &str,
        access_token: &str,
        object: &str,
        record_id: &str,
        payload: &Map<String, Value>,
    ) -> Result<()> {
        let url = self.data_url(instance_url, &format!("sobjects/{}/{}", object, record_id));
        let response = self
            .http
            .patch(&url)
            .bearer_auth(access_token)
            .json(payload)
            .send()
            .await
            .map_err(request_error)?;

        Self::check_status(response).await
    }

    /// Run a SOQL query.
    pub async fn query(
        &self,
        instance_url: &str,
        access_token: &str,
        soql: &str,
    ) -> Result<QueryResponse> {
        let url = self.data_url(instance_url, "query/");
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("q", soql)])
            .send()
            .await
            .map_err(request_error)?;

        Self::read_json(response).await
    }

    /// Fetch object metadata (field names, types, picklists).
    pub async fn describe(
        &self,
        instance_url: &str,
        access_token: &str,
        object: &str,
    ) -> Result<Value> {
        let url = self.data_url(instance_url, &format!("sobjects/{}/describe/", object));
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(request_error)?;

        Self::read_json(response).await
    }

    async fn check_status(response: reqwest::Response) -> Result<()> {
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::error_from_response(response).await)
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| SyncError::Transient(format!("JSON parse error: {}", e)))
    }

    /// Classify a non-success response per the error taxonomy:
    /// 401/403 → Authentication, other 4xx → Permanent, 5xx → Transient.
    async fn error_from_response(response: reqwest::Response) -> SyncError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = parse_api_errors(&body).unwrap_or_else(|| body.clone());

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return SyncError::Authentication(message);
        }
        if status.is_client_error() {
            return SyncError::Permanent {
                status: status.as_u16(),
                message,
            };
        }
        SyncError::Transient(format!("HTTP {}: {}", status, message))
    }
}

/// Map reqwest transport failures (connect, timeout) to transient errors.
fn request_error(e: reqwest::Error) -> SyncError {
    SyncError::Transient(format!("Salesforce request failed: {}", e))
}

/// Salesforce error bodies are arrays of {message, errorCode}.
fn parse_api_errors(body: &str) -> Option<String> {
    let errors: Vec<ApiErrorBody> = serde_json::from_str(body).ok()?;
    if errors.is_empty() {
        return None;
    }
    Some(
        errors
            .iter()
            .map(|e| format!("{}: {}", e.error_code, e.message))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(rename = "errorCode")]
    error_code: String,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    id: String,
    success: bool,
    #[serde(default)]
    errors: Vec<Value>,
}

/// SOQL query result page. Record payloads stay untyped.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub total_size: u64,
    pub done: bool,
    pub records: Vec<Value>,
}

// ─────────────────────────────────────────────────────────────────────
// SalesforceApi - authenticated facade
// ─────────────────────────────────────────────────────────────────────

/// Authenticated Salesforce API facade.
///
/// Wraps the low-level client with token acquisition via
/// [`OAuthManager`], so every call gets a token that is valid right now.
#[derive(Clone)]
pub struct SalesforceApi {
    client: SalesforceClient,
    oauth: OAuthManager,
}

impl SalesforceApi {
    pub fn new(oauth: OAuthManager, api_version: &str) -> Self {
        Self {
            client: SalesforceClient::new(api_version),
            oauth,
        }
    }

    pub async fn create(&self, object: &str, payload: &Map<String, Value>) -> Result<String> {
        let token = self.oauth.get_valid_token().await?;
        self.client
            .create(&token.instance_url, &token.access_token, object, payload)
            .await
    }

    pub async fn update(
        &self,
        object: &str,
        record_id: &str,
        payload: &Map<String, Value>,
    ) -> Result<()> {
        let token = self.oauth.get_valid_token().await?;
        self.client
            .update(
                &token.instance_url,
                &token.access_token,
                object,
                record_id,
                payload,
            )
            .await
    }

    pub async fn query(&self, soql: &str) -> Result<QueryResponse> {
        let token = self.oauth.get_valid_token().await?;
        self.client
            .query(&token.instance_url, &token.access_token, soql)
            .await
    }

    pub async fn describe(&self, object: &str) -> Result<Value> {
        let token = self.oauth.get_valid_token().await?;
        self.client
            .describe(&token.instance_url, &token.access_token, object)
            .await
    }
}
