// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence layer over the host's option storage.
//!
//! WordPress backs [`KeyValueStore`] with its options table; tests and
//! standalone tooling use [`MemoryStore`]. Typed stores wrap the raw
//! capability with serde round-trips for tokens, the mapping overlay,
//! and per-entity sync state.

pub mod mappings;
pub mod memory;
pub mod sync_state;
pub mod tokens;

pub use mappings::MappingStore;
pub use memory::MemoryStore;
pub use sync_state::SyncStateStore;
pub use tokens::TokenStore;

use async_trait::async_trait;

use crate::error::Result;

/// Storage keys as constants.
pub mod keys {
    pub const OAUTH_TOKEN: &str = "salesforce_oauth_token";
    pub const FIELD_MAPPINGS: &str = "salesforce_field_mappings";
    /// Prefix for per-entity sync records (`salesforce_sync:{type}:{id}:{object}`)
    pub const SYNC_RECORD_PREFIX: &str = "salesforce_sync";
}

/// Key-value storage capability supplied by the host.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}
