// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the sync core.

pub mod entity;
pub mod mapping;
pub mod sync_state;
pub mod token;

pub use entity::{SyncEvent, WpEntity, WpEntityType};
pub use mapping::{
    is_api_name, CheckboxStrategy, FieldMapping, MappingDocument, MappingEntry, TransformationKind,
    WpSource,
};
pub use sync_state::{SyncRecord, SyncStatus};
pub use token::StoredToken;
