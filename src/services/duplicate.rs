// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pre-create duplicate detection.
//!
//! A previously-replaced integration left records behind with the same
//! external-id convention; checking before every create keeps sync
//! idempotent under at-least-once retries and adopts those records
//! instead of duplicating them.

use serde_json::Value;

use crate::error::{Result, SyncError};
use crate::models::is_api_name;
use crate::services::salesforce::SalesforceApi;

/// A record matched by external id.
#[derive(Debug, Clone)]
pub struct ExistingRecord {
    pub id: String,
}

#[derive(Clone)]
pub struct DuplicateGuard {
    api: SalesforceApi,
}

impl DuplicateGuard {
    pub fn new(api: SalesforceApi) -> Self {
        Self { api }
    }

    /// Look up a record by external id. Returns at most one match.
    pub async fn find_existing(
        &self,
        object: &str,
        external_id_field: &str,
        value: &str,
    ) -> Result<Option<ExistingRecord>> {
        if !is_api_name(object) || !is_api_name(external_id_field) {
            return Err(SyncError::Mapping(format!(
                "Invalid SOQL identifier: {} / {}",
                object, external_id_field
            )));
        }

        let soql = format!(
            "SELECT Id, {field} FROM {object} WHERE {field} = '{value}' LIMIT 1",
            field = external_id_field,
            object = object,
            value = soql_quote(value),
        );

        let result = self.api.query(&soql).await?;
        let existing = result
            .records
            .first()
            .and_then(|record| record.get("Id"))
            .and_then(Value::as_str)
            .map(|id| ExistingRecord { id: id.to_string() });

        if let Some(record) = &existing {
            tracing::debug!(object, external_id = value, record_id = %record.id, "Existing record found");
        }
        Ok(existing)
    }
}

/// Escape a string literal for SOQL interpolation.
pub fn soql_quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
