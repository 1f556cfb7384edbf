// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod conversion;
pub mod duplicate;
pub mod oauth;
pub mod registry;
pub mod salesforce;
pub mod sync;
pub mod transform;

pub use conversion::ConversionReport;
pub use duplicate::{DuplicateGuard, ExistingRecord};
pub use oauth::{AccessToken, OAuthManager};
pub use registry::{ComputedResolver, MappingRegistry};
pub use salesforce::{QueryResponse, SalesforceApi, SalesforceClient};
pub use sync::{EventOutcome, SyncEngine, SyncOperation, SyncResult};
