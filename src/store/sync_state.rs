// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-entity sync state side-store.

use std::sync::Arc;

use crate::error::{Result, SyncError};
use crate::models::{SyncRecord, SyncStatus, WpEntity, WpEntityType};
use crate::store::{keys, KeyValueStore};

/// Records where each (entity, Salesforce object) pair is in its
/// sync lifecycle, including the Salesforce record id.
#[derive(Clone)]
pub struct SyncStateStore {
    store: Arc<dyn KeyValueStore>,
}

fn record_key(entity_type: WpEntityType, entity_id: u64, object: &str) -> String {
    format!(
        "{}:{}:{}:{}",
        keys::SYNC_RECORD_PREFIX,
        entity_type,
        entity_id,
        object
    )
}

impl SyncStateStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn get(
        &self,
        entity_type: WpEntityType,
        entity_id: u64,
        object: &str,
    ) -> Result<Option<SyncRecord>> {
        let key = record_key(entity_type, entity_id, object);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };
        let record = serde_json::from_str(&raw)
            .map_err(|e| SyncError::Storage(format!("Corrupt sync record {}: {}", key, e)))?;
        Ok(Some(record))
    }

    pub async fn put(&self, record: &SyncRecord) -> Result<()> {
        let key = record_key(
            record.entity_type,
            record.wp_entity_id,
            &record.salesforce_object,
        );
        let raw = serde_json::to_string(record)
            .map_err(|e| SyncError::Storage(format!("Failed to encode sync record: {}", e)))?;
        self.store.set(&key, &raw).await
    }

    /// Record a successful sync: record id, status, timestamp; clears any
    /// prior error flag.
    pub async fn record_success(
        &self,
        entity: &WpEntity,
        object: &str,
        external_id_field: &str,
        salesforce_record_id: &str,
        status: SyncStatus,
    ) -> Result<()> {
        self.put(&SyncRecord {
            wp_entity_id: entity.id(),
            entity_type: entity.entity_type(),
            salesforce_object: object.to_string(),
            external_id_field: external_id_field.to_string(),
            salesforce_record_id: Some(salesforce_record_id.to_string()),
            status,
            last_error: None,
            synced_at: Some(chrono::Utc::now().to_rfc3339()),
        })
        .await
    }

    /// Record a failed sync. Keeps any previously-known record id so a
    /// later retry still updates instead of re-creating.
    pub async fn record_failure(
        &self,
        entity: &WpEntity,
        object: &str,
        external_id_field: &str,
        message: &str,
    ) -> Result<()> {
        let existing = self.get(entity.entity_type(), entity.id(), object).await?;
        let mut record = existing.unwrap_or(SyncRecord {
            wp_entity_id: entity.id(),
            entity_type: entity.entity_type(),
            salesforce_object: object.to_string(),
            external_id_field: external_id_field.to_string(),
            salesforce_record_id: None,
            status: SyncStatus::Unsynced,
            last_error: None,
            synced_at: None,
        });
        record.status = SyncStatus::SyncError;
        record.last_error = Some(message.to_string());
        self.put(&record).await
    }
}
