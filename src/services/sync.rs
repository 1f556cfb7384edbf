// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync orchestration.
//!
//! Handles the core workflow for one entity + target object:
//! 1. Resolve field mappings and build the payload (required-field
//!    check happens here, before any network call)
//! 2. Decide update vs create: known record id → PATCH, duplicate-guard
//!    hit → adopt and PATCH, otherwise POST
//! 3. Record the outcome in the sync-state side-store
//!
//! The engine performs no retries; transient errors propagate to the
//! caller's queue. Concurrent syncs of the same entity must be
//! serialized by the caller — the duplicate check is not atomic against
//! Salesforce.

use serde_json::{Map, Value};
use std::fmt;

use crate::error::{Result, SyncError};
use crate::models::{SyncEvent, SyncStatus, WpEntity, WpEntityType};
use crate::services::conversion::ConversionReport;
use crate::services::duplicate::DuplicateGuard;
use crate::services::registry::MappingRegistry;
use crate::services::salesforce::SalesforceApi;
use crate::services::transform::transform;
use crate::store::SyncStateStore;

/// External-id field on user-derived objects (Lead, Contact, Account).
pub const USER_EXTERNAL_ID_FIELD: &str = "WordPress_User_ID__c";
/// External-id field on post-derived objects.
pub const POST_EXTERNAL_ID_FIELD: &str = "WordPress_Post_ID__c";

/// Default custom object for listing posts.
pub const DEFAULT_LISTING_OBJECT: &str = "Listing__c";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
    Create,
    Update,
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOperation::Create => write!(f, "create"),
            SyncOperation::Update => write!(f, "update"),
        }
    }
}

/// Outcome of one sync call.
#[derive(Debug, Clone)]
pub struct SyncResult {
    pub salesforce_id: String,
    pub operation: SyncOperation,
}

/// Outcome of an event dispatch.
#[derive(Debug)]
pub enum EventOutcome {
    Synced(SyncResult),
    Converted(ConversionReport),
}

#[derive(Clone)]
pub struct SyncEngine {
    pub(crate) api: SalesforceApi,
    pub(crate) registry: MappingRegistry,
    pub(crate) state: SyncStateStore,
    pub(crate) guard: DuplicateGuard,
    listing_object: String,
}

impl SyncEngine {
    pub fn new(api: SalesforceApi, registry: MappingRegistry, state: SyncStateStore) -> Self {
        Self {
            guard: DuplicateGuard::new(api.clone()),
            api,
            registry,
            state,
            listing_object: DEFAULT_LISTING_OBJECT.to_string(),
        }
    }

    /// Override the custom object that listing posts sync to.
    pub fn with_listing_object(mut self, object: &str) -> Self {
        self.listing_object = object.to_string();
        self
    }

    /// External-id field used for this kind of entity.
    pub fn external_id_field(entity_type: WpEntityType) -> &'static str {
        match entity_type {
            WpEntityType::User => USER_EXTERNAL_ID_FIELD,
            WpEntityType::Post => POST_EXTERNAL_ID_FIELD,
        }
    }

    /// Build the outbound payload for one object.
    ///
    /// A required mapping that resolves to nothing aborts here, before
    /// any network call. A field whose transformation yields nothing is
    /// logged and omitted; the sync continues.
    pub async fn build_payload(
        &self,
        entity: &WpEntity,
        object: &str,
    ) -> Result<Map<String, Value>> {
        let mappings = self.registry.get_mappings(object).await?;
        let mut payload = Map::new();

        for mapping in mappings.iter() {
            let Some(raw) = self.registry.resolve_value(entity, mapping) else {
                if mapping.required {
                    return Err(SyncError::Validation {
                        object: object.to_string(),
                        field: mapping.salesforce_field.clone(),
                    });
                }
                continue;
            };
            match transform(&raw, &mapping.transformation) {
                Some(value) => {
                    payload.insert(mapping.salesforce_field.clone(), value);
                }
                None => {
                    tracing::warn!(
                        object,
                        field = %mapping.salesforce_field,
                        "Transformation yielded no value, field omitted"
                    );
                }
            }
        }

        Ok(payload)
    }

    /// Sync one entity to one Salesforce object.
    pub async fn sync(&self, entity: &WpEntity, object: &str) -> Result<SyncResult> {
        self.sync_object(entity, object, None).await
    }

    /// Sync with extra payload fields merged in after mapping resolution
    /// (the conversion flow injects relationship ids this way).
    pub(crate) async fn sync_object(
        &self,
        entity: &WpEntity,
        object: &str,
        extra: Option<Map<String, Value>>,
    ) -> Result<SyncResult> {
        let external_id_field = Self::external_id_field(entity.entity_type());
        let result = self.sync_inner(entity, object, external_id_field, extra).await;

        match &result {
            Ok(sync) => {
                tracing::info!(
                    entity_id = entity.id(),
                    entity_type = %entity.entity_type(),
                    object,
                    salesforce_id = %sync.salesforce_id,
                    operation = %sync.operation,
                    "Entity synced"
                );
            }
            // Pre-flight failure: nothing reached the network, nothing to record
            Err(SyncError::Validation { .. }) => {}
            Err(e) => {
                tracing::warn!(
                    entity_id = entity.id(),
                    object,
                    error = %e,
                    "Sync failed"
                );
                if let Err(store_err) = self
                    .state
                    .record_failure(entity, object, external_id_field, &e.to_string())
                    .await
                {
                    tracing::error!(error = %store_err, "Failed to record sync error state");
                }
            }
        }

        result
    }

    async fn sync_inner(
        &self,
        entity: &WpEntity,
        object: &str,
        external_id_field: &str,
        extra: Option<Map<String, Value>>,
    ) -> Result<SyncResult> {
        let mut payload = self.build_payload(entity, object).await?;
        if let Some(extra) = extra {
            payload.extend(extra);
        }

        let known_id = self
            .state
            .get(entity.entity_type(), entity.id(), object)
            .await?
            .and_then(|record| record.salesforce_record_id);

        let (salesforce_id, operation) = if let Some(id) = known_id {
            self.api.update(object, &id, &payload).await?;
            (id, SyncOperation::Update)
        } else if let Some(existing) = self
            .guard
            .find_existing(object, external_id_field, &entity.external_id())
            .await?
        {
            // Adopt the record a prior integration created
            self.api.update(object, &existing.id, &payload).await?;
            (existing.id, SyncOperation::Update)
        } else {
            let id = self.api.create(object, &payload).await?;
            (id, SyncOperation::Create)
        };

        let status = match (entity.entity_type(), object) {
            (WpEntityType::User, "Lead") => SyncStatus::LeadCreated,
            _ => SyncStatus::Created,
        };
        self.state
            .record_success(entity, object, external_id_field, &salesforce_id, status)
            .await?;

        Ok(SyncResult {
            salesforce_id,
            operation,
        })
    }

    /// Dispatch a host notification to the matching operation.
    pub async fn handle_event(&self, event: SyncEvent, entity: &WpEntity) -> Result<EventOutcome> {
        match event {
            SyncEvent::UserRegistered | SyncEvent::UserUpdated => {
                self.sync(entity, "Lead").await.map(EventOutcome::Synced)
            }
            SyncEvent::UserApproved => self
                .sync_approval(entity)
                .await
                .map(EventOutcome::Converted),
            SyncEvent::PostPublished | SyncEvent::PostUpdated => {
                let object = self.listing_object.clone();
                self.sync(entity, &object).await.map(EventOutcome::Synced)
            }
        }
    }
}
