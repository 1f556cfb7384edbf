//! Storage for the admin-editable mapping overlay document.

use std::sync::Arc;

use crate::error::{Result, SyncError};
use crate::models::MappingDocument;
use crate::store::{keys, KeyValueStore};

/// Persists the field-mapping overlay as one JSON document.
#[derive(Clone)]
pub struct MappingStore {
    store: Arc<dyn KeyValueStore>,
}

impl MappingStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The overlay document, or None when only built-in defaults apply.
    pub async fn load_overlay(&self) -> Result<Option<MappingDocument>> {
        let Some(raw) = self.store.get(keys::FIELD_MAPPINGS).await? else {
            return Ok(None);
        };
        let doc = serde_json::from_str(&raw)
            .map_err(|e| SyncError::Mapping(format!("Corrupt mapping document: {}", e)))?;
        Ok(Some(doc))
    }

    pub async fn save_overlay(&self, doc: &MappingDocument) -> Result<()> {
        let raw = serde_json::to_string(doc)
            .map_err(|e| SyncError::Storage(format!("Failed to encode mappings: {}", e)))?;
        self.store.set(keys::FIELD_MAPPINGS, &raw).await
    }

    pub async fn clear_overlay(&self) -> Result<()> {
        self.store.delete(keys::FIELD_MAPPINGS).await
    }
}
