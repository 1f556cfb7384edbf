//! Per-entity sync state recorded in the side-store.

use serde::{Deserialize, Serialize};

use crate::models::WpEntityType;

/// Where an entity is in its sync lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Unsynced,
    /// User synced as a Lead, not yet approved
    LeadCreated,
    /// Post (or non-Lead object) synced
    Created,
    /// User approved; Contact and Account exist, Lead patched
    Converted,
    /// Last attempt failed; does not block retries
    SyncError,
}

/// Sync state for one (entity, Salesforce object) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRecord {
    pub wp_entity_id: u64,
    pub entity_type: WpEntityType,
    /// Target Salesforce object API name
    pub salesforce_object: String,
    /// External-id field correlating the record back to WordPress
    pub external_id_field: String,
    /// Record id once the entity exists on Salesforce
    pub salesforce_record_id: Option<String>,
    pub status: SyncStatus,
    /// Message from the last failed attempt, cleared on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Last successful sync (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<String>,
}
