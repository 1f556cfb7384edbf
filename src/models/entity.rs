//! WordPress entity snapshot handed in by the host.
//!
//! The host builds one of these from its accessor capability
//! (`get_attribute` / `get_meta` / `get_acf_field`) before asking the
//! engine to sync. Values stay loosely typed (`serde_json::Value`) until
//! the transformer converts them per the field mapping.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Kind of WordPress entity being synced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WpEntityType {
    User,
    Post,
}

impl fmt::Display for WpEntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WpEntityType::User => write!(f, "user"),
            WpEntityType::Post => write!(f, "post"),
        }
    }
}

/// Snapshot of a WordPress user or post.
#[derive(Debug, Clone)]
pub struct WpEntity {
    id: u64,
    entity_type: WpEntityType,
    attributes: HashMap<String, Value>,
    meta: HashMap<String, Value>,
    acf: HashMap<String, Value>,
}

impl WpEntity {
    pub fn new(id: u64, entity_type: WpEntityType) -> Self {
        Self {
            id,
            entity_type,
            attributes: HashMap::new(),
            meta: HashMap::new(),
            acf: HashMap::new(),
        }
    }

    /// Shorthand for a user snapshot.
    pub fn user(id: u64) -> Self {
        Self::new(id, WpEntityType::User)
    }

    /// Shorthand for a post snapshot.
    pub fn post(id: u64) -> Self {
        Self::new(id, WpEntityType::Post)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn entity_type(&self) -> WpEntityType {
        self.entity_type
    }

    /// The value written into the external-id field on Salesforce.
    pub fn external_id(&self) -> String {
        self.id.to_string()
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<Value>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    pub fn set_meta(&mut self, key: &str, value: impl Into<Value>) {
        self.meta.insert(key.to_string(), value.into());
    }

    pub fn set_acf(&mut self, key: &str, value: impl Into<Value>) {
        self.acf.insert(key.to_string(), value.into());
    }

    /// Chainable form of [`set_attribute`](Self::set_attribute).
    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Chainable form of [`set_meta`](Self::set_meta).
    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set_meta(key, value);
        self
    }

    /// Chainable form of [`set_acf`](Self::set_acf).
    pub fn with_acf(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set_acf(key, value);
        self
    }

    /// Direct entity attribute (wp_users / wp_posts column).
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// User/post meta value.
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    /// ACF field value.
    pub fn acf(&self, key: &str) -> Option<&Value> {
        self.acf.get(key)
    }
}

/// Host notifications the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    UserRegistered,
    UserUpdated,
    /// Approval triggers the Lead→Contact/Account conversion.
    UserApproved,
    PostPublished,
    PostUpdated,
}
