// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Field mapping registry.
//!
//! Resolution order for an object's mappings: in-memory cache → overlay
//! document saved by the admin → built-in defaults. The overlay replaces
//! a whole object's mapping set, never individual fields.

use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, SyncError};
use crate::models::{
    is_api_name, FieldMapping, MappingDocument, TransformationKind as Kind, WpEntity, WpSource,
};
use crate::store::MappingStore;

/// Objects with built-in mapping tables.
pub const DEFAULT_OBJECTS: [&str; 4] = ["Lead", "Contact", "Account", "Listing__c"];

/// A computed-field resolver; `wp_field` on a `computed` mapping names one.
pub type ComputedResolver = Arc<dyn Fn(&WpEntity) -> Option<Value> + Send + Sync>;

#[derive(Clone)]
pub struct MappingRegistry {
    store: MappingStore,
    /// Resolved mapping sets, shared across clones.
    cache: Arc<DashMap<String, Arc<Vec<FieldMapping>>>>,
    computed: Arc<HashMap<String, ComputedResolver>>,
}

impl MappingRegistry {
    pub fn new(store: MappingStore) -> Self {
        let mut computed: HashMap<String, ComputedResolver> = HashMap::new();
        computed.insert("full_name".to_string(), Arc::new(full_name) as ComputedResolver);
        computed.insert(
            "account_name".to_string(),
            Arc::new(account_name) as ComputedResolver,
        );
        Self {
            store,
            cache: Arc::new(DashMap::new()),
            computed: Arc::new(computed),
        }
    }

    /// Register a computed-field resolver; replaces a built-in of the
    /// same name. Call before the registry is shared.
    pub fn register_computed(&mut self, name: &str, resolver: ComputedResolver) {
        Arc::make_mut(&mut self.computed).insert(name.to_string(), resolver);
    }

    /// Mapping set for one object, in definition order.
    pub async fn get_mappings(&self, object: &str) -> Result<Arc<Vec<FieldMapping>>> {
        if let Some(cached) = self.cache.get(object) {
            return Ok(cached.clone());
        }

        if let Some(doc) = self.store.load_overlay().await? {
            if let Some(entries) = doc.get(object) {
                let mappings: Arc<Vec<FieldMapping>> = Arc::new(
                    entries
                        .iter()
                        .map(|(field, entry)| FieldMapping::from_entry(field, entry))
                        .collect(),
                );
                self.cache.insert(object.to_string(), mappings.clone());
                return Ok(mappings);
            }
        }

        let defaults = defaults_for(object).ok_or_else(|| {
            SyncError::Mapping(format!("No field mappings defined for object {}", object))
        })?;
        let mappings = Arc::new(defaults);
        self.cache.insert(object.to_string(), mappings.clone());
        Ok(mappings)
    }

    /// Read the raw WordPress value a mapping points at; a source miss
    /// falls back to the mapping default.
    pub fn resolve_value(&self, entity: &WpEntity, mapping: &FieldMapping) -> Option<Value> {
        let found = match mapping.wp_source {
            WpSource::User | WpSource::Post => entity.attribute(&mapping.wp_field).cloned(),
            WpSource::UserMeta => entity.meta(&mapping.wp_field).cloned(),
            WpSource::Acf => entity.acf(&mapping.wp_field).cloned(),
            WpSource::Computed => self
                .computed
                .get(mapping.wp_field.as_str())
                .and_then(|resolver| resolver(entity)),
            WpSource::Custom => entity
                .meta(&mapping.wp_field)
                .or_else(|| entity.attribute(&mapping.wp_field))
                .or_else(|| entity.acf(&mapping.wp_field))
                .cloned(),
        };
        found
            .filter(|v| !v.is_null())
            .or_else(|| mapping.default.clone().map(Value::String))
    }

    /// Full effective document: built-in objects (with any overlay
    /// applied) plus overlay-only objects.
    pub async fn export_document(&self) -> Result<MappingDocument> {
        let mut doc = MappingDocument::new();
        for object in DEFAULT_OBJECTS {
            let mappings = self.get_mappings(object).await?;
            doc.insert(
                object.to_string(),
                mappings.iter().map(|m| m.to_entry()).collect(),
            );
        }
        if let Some(overlay) = self.store.load_overlay().await? {
            for (object, entries) in overlay {
                doc.entry(object).or_insert(entries);
            }
        }
        Ok(doc)
    }

    pub async fn export_json(&self) -> Result<String> {
        let doc = self.export_document().await?;
        serde_json::to_string_pretty(&doc)
            .map_err(|e| SyncError::Internal(anyhow::anyhow!("Mapping export failed: {}", e)))
    }

    /// Replace the overlay with an imported document. Validated before
    /// anything is persisted; the mapping cache is invalidated on success.
    pub async fn import_json(&self, json: &str) -> Result<()> {
        let doc: MappingDocument = serde_json::from_str(json)
            .map_err(|e| SyncError::Mapping(format!("Invalid mapping document: {}", e)))?;
        validate_document(&doc)?;
        self.store.save_overlay(&doc).await?;
        self.cache.clear();
        tracing::info!(objects = doc.len(), "Field mapping overlay imported");
        Ok(())
    }
}

fn validate_document(doc: &MappingDocument) -> Result<()> {
    for (object, entries) in doc {
        if !is_api_name(object) {
            return Err(SyncError::Mapping(format!(
                "Invalid object API name: {:?}",
                object
            )));
        }
        if entries.is_empty() {
            return Err(SyncError::Mapping(format!(
                "Object {} has no field mappings",
                object
            )));
        }
        for (field, entry) in entries {
            if !is_api_name(field) {
                return Err(SyncError::Mapping(format!(
                    "Invalid field API name {:?} on {}",
                    field, object
                )));
            }
            if entry.wp_field.is_empty() {
                return Err(SyncError::Mapping(format!(
                    "Empty wp_field for {}.{}",
                    object, field
                )));
            }
        }
    }
    Ok(())
}

// ─── Built-in mapping tables ─────────────────────────────────────────

fn defaults_for(object: &str) -> Option<Vec<FieldMapping>> {
    let mappings = match object {
        "Lead" => vec![
            FieldMapping::new("FirstName", "first_name", WpSource::User, Kind::Text),
            FieldMapping::new("LastName", "last_name", WpSource::User, Kind::Text)
                .required()
                .describe("Salesforce requires LastName on every Lead"),
            FieldMapping::new("Email", "user_email", WpSource::User, Kind::Email).required(),
            FieldMapping::new("Company", "company_name", WpSource::UserMeta, Kind::Text)
                .with_default("Unknown")
                .describe("Salesforce requires Company on every Lead"),
            FieldMapping::new("Phone", "phone", WpSource::UserMeta, Kind::Phone),
            FieldMapping::new("Website", "user_url", WpSource::User, Kind::Url),
            FieldMapping::new("Title", "job_title", WpSource::UserMeta, Kind::Text),
            FieldMapping::new("Description", "description", WpSource::UserMeta, Kind::Textarea),
            FieldMapping::new("LeadSource", "lead_source", WpSource::UserMeta, Kind::Text)
                .with_default("WordPress"),
            FieldMapping::new("WordPress_User_ID__c", "ID", WpSource::User, Kind::Text)
                .required()
                .describe("External id correlating the Lead to its WordPress user"),
        ],
        "Contact" => vec![
            FieldMapping::new("FirstName", "first_name", WpSource::User, Kind::Text),
            FieldMapping::new("LastName", "last_name", WpSource::User, Kind::Text).required(),
            FieldMapping::new("Email", "user_email", WpSource::User, Kind::Email).required(),
            FieldMapping::new("Phone", "phone", WpSource::UserMeta, Kind::Phone),
            FieldMapping::new("Title", "job_title", WpSource::UserMeta, Kind::Text),
            FieldMapping::new("MailingCity", "city", WpSource::UserMeta, Kind::Text),
            FieldMapping::new("WordPress_User_ID__c", "ID", WpSource::User, Kind::Text).required(),
        ],
        "Account" => vec![
            FieldMapping::new("Name", "account_name", WpSource::Computed, Kind::Text)
                .required()
                .describe("Company name, falling back to the user's full name"),
            FieldMapping::new("Phone", "phone", WpSource::UserMeta, Kind::Phone),
            FieldMapping::new("Website", "user_url", WpSource::User, Kind::Url),
            FieldMapping::new("BillingCity", "city", WpSource::UserMeta, Kind::Text),
            FieldMapping::new("WordPress_User_ID__c", "ID", WpSource::User, Kind::Text).required(),
        ],
        "Listing__c" => vec![
            FieldMapping::new("Name", "post_title", WpSource::Post, Kind::Text).required(),
            FieldMapping::new("Description__c", "post_content", WpSource::Post, Kind::Textarea),
            FieldMapping::new("Status__c", "post_status", WpSource::Post, Kind::Text),
            FieldMapping::new("Listing_URL__c", "permalink", WpSource::Custom, Kind::Url),
            FieldMapping::new("Price__c", "price", WpSource::Acf, Kind::Currency),
            FieldMapping::new(
                "Categories__c",
                "categories",
                WpSource::Acf,
                Kind::Checkbox(crate::models::CheckboxStrategy::SemicolonSeparated),
            ),
            FieldMapping::new(
                "Amenities__c",
                "amenities",
                WpSource::Acf,
                Kind::Checkbox(crate::models::CheckboxStrategy::SemicolonSeparated),
            ),
            FieldMapping::new("Featured__c", "featured", WpSource::Acf, Kind::Boolean),
            FieldMapping::new("Listing_Date__c", "post_date", WpSource::Post, Kind::Date),
            FieldMapping::new("WordPress_Post_ID__c", "ID", WpSource::Post, Kind::Text)
                .required()
                .describe("External id correlating the listing to its WordPress post"),
        ],
        _ => return None,
    };
    Some(mappings)
}

// ─── Built-in computed resolvers ─────────────────────────────────────

fn text_of(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string()
}

/// "first last" from user attributes (falling back to meta).
fn full_name(entity: &WpEntity) -> Option<Value> {
    let first = text_of(entity.attribute("first_name").or_else(|| entity.meta("first_name")));
    let last = text_of(entity.attribute("last_name").or_else(|| entity.meta("last_name")));
    let name = format!("{} {}", first, last).trim().to_string();
    (!name.is_empty()).then_some(Value::String(name))
}

/// Company name when present, otherwise the user's full name.
fn account_name(entity: &WpEntity) -> Option<Value> {
    let company = text_of(entity.meta("company_name").or_else(|| entity.acf("company_name")));
    if !company.is_empty() {
        return Some(Value::String(company));
    }
    full_name(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, MappingStore};
    use serde_json::json;

    fn test_registry() -> MappingRegistry {
        MappingRegistry::new(MappingStore::new(Arc::new(MemoryStore::new())))
    }

    #[tokio::test]
    async fn test_defaults_have_unique_salesforce_fields() {
        let registry = test_registry();
        for object in DEFAULT_OBJECTS {
            let mappings = registry.get_mappings(object).await.unwrap();
            let mut seen = std::collections::HashSet::new();
            for m in mappings.iter() {
                assert!(
                    seen.insert(m.salesforce_field.clone()),
                    "{} duplicated on {}",
                    m.salesforce_field,
                    object
                );
            }
        }
    }

    #[tokio::test]
    async fn test_unknown_object_is_a_mapping_error() {
        let registry = test_registry();
        let err = registry.get_mappings("Gadget__c").await.unwrap_err();
        assert!(matches!(err, SyncError::Mapping(_)));
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let registry = test_registry();
        let mapping = FieldMapping::new("Company", "company_name", WpSource::UserMeta, Kind::Text)
            .with_default("Unknown");
        let entity = WpEntity::user(1);
        assert_eq!(
            registry.resolve_value(&entity, &mapping),
            Some(json!("Unknown"))
        );
    }

    #[test]
    fn test_resolve_custom_source_checks_meta_then_attribute() {
        let registry = test_registry();
        let mapping = FieldMapping::new("X__c", "permalink", WpSource::Custom, Kind::Url);

        let entity = WpEntity::post(1).with_attribute("permalink", "https://a.example");
        assert_eq!(
            registry.resolve_value(&entity, &mapping),
            Some(json!("https://a.example"))
        );

        let entity = WpEntity::post(1)
            .with_attribute("permalink", "https://a.example")
            .with_meta("permalink", "https://b.example");
        assert_eq!(
            registry.resolve_value(&entity, &mapping),
            Some(json!("https://b.example"))
        );
    }

    #[test]
    fn test_full_name_resolver() {
        let registry = test_registry();
        let mapping = FieldMapping::new("Name", "full_name", WpSource::Computed, Kind::Text);

        let entity = WpEntity::user(1)
            .with_attribute("first_name", "A")
            .with_attribute("last_name", "B");
        assert_eq!(registry.resolve_value(&entity, &mapping), Some(json!("A B")));

        let nameless = WpEntity::user(2);
        assert_eq!(registry.resolve_value(&nameless, &mapping), None);
    }

    #[test]
    fn test_account_name_prefers_company() {
        let registry = test_registry();
        let mapping = FieldMapping::new("Name", "account_name", WpSource::Computed, Kind::Text);

        let entity = WpEntity::user(1)
            .with_attribute("first_name", "A")
            .with_attribute("last_name", "B")
            .with_meta("company_name", "Acme LLC");
        assert_eq!(
            registry.resolve_value(&entity, &mapping),
            Some(json!("Acme LLC"))
        );
    }

    #[tokio::test]
    async fn test_import_rejects_bad_document() {
        let registry = test_registry();

        // Unknown transformation kind
        let err = registry
            .import_json(r#"{"Lead": {"Email": {"wp_field": "user_email", "wp_source": "user", "transformation": "bogus"}}}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Mapping(_)));

        // Invalid field API name
        let err = registry
            .import_json(r#"{"Lead": {"Email; DROP": {"wp_field": "user_email", "wp_source": "user", "transformation": "email"}}}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Mapping(_)));
    }
}
