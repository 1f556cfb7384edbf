// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed storage for the OAuth token triple.

use std::sync::Arc;

use crate::error::{Result, SyncError};
use crate::models::StoredToken;
use crate::store::{keys, KeyValueStore};

/// Persists the current [`StoredToken`] through the host's store.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Current token triple, if the org is connected.
    pub async fn get(&self) -> Result<Option<StoredToken>> {
        let Some(raw) = self.store.get(keys::OAUTH_TOKEN).await? else {
            return Ok(None);
        };
        let token = serde_json::from_str(&raw)
            .map_err(|e| SyncError::Storage(format!("Corrupt stored token: {}", e)))?;
        Ok(Some(token))
    }

    pub async fn set(&self, token: &StoredToken) -> Result<()> {
        let raw = serde_json::to_string(token)
            .map_err(|e| SyncError::Storage(format!("Failed to encode token: {}", e)))?;
        self.store.set(keys::OAUTH_TOKEN, &raw).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.delete(keys::OAUTH_TOKEN).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_token_store_round_trip() {
        let store = TokenStore::new(Arc::new(MemoryStore::new()));
        assert!(store.get().await.unwrap().is_none());

        let token = StoredToken {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            instance_url: "https://example.my.salesforce.com".to_string(),
            expires_at: "2026-01-01T00:00:00+00:00".to_string(),
        };
        store.set(&token).await.unwrap();

        let loaded = store.get().await.unwrap().expect("token stored");
        assert_eq!(loaded.access_token, "access");
        assert_eq!(loaded.instance_url, "https://example.my.salesforce.com");

        store.clear().await.unwrap();
        assert!(store.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_token_is_a_storage_error() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(keys::OAUTH_TOKEN, "not json").await.unwrap();

        let store = TokenStore::new(kv);
        let err = store.get().await.unwrap_err();
        assert!(matches!(err, SyncError::Storage(_)));
    }
}
