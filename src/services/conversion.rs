// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lead→Contact/Account conversion, triggered by user approval.
//!
//! Steps, each independently fallible and logged:
//! 1. Create the Account (Name falls back to "first last" when the user
//!    has no company name)
//! 2. Create the Contact referencing the Account
//! 3. Reciprocal patches: Contact.AccountId and
//!    Account.Primary_Contact_ID__c
//! 4. Patch the original Lead: IsConverted, ConvertedContactId,
//!    ConvertedAccountId, Status="Converted"
//!
//! Successful steps are never rolled back — Salesforce offers no
//! transaction spanning these calls, so a partial conversion is an
//! accepted, logged state that an operator resolves.

use serde_json::{json, Map};

use crate::error::Result;
use crate::models::{SyncStatus, WpEntity, WpEntityType};
use crate::services::sync::{SyncEngine, USER_EXTERNAL_ID_FIELD};

/// Per-step outcome of a conversion attempt.
#[derive(Debug, Default)]
pub struct ConversionReport {
    pub account_id: Option<String>,
    pub contact_id: Option<String>,
    pub lead_id: Option<String>,
    /// Whether the Lead was patched IsConverted
    pub lead_converted: bool,
    /// Failure messages from individual steps, in order
    pub errors: Vec<String>,
}

impl ConversionReport {
    /// All four steps landed.
    pub fn is_complete(&self) -> bool {
        self.account_id.is_some()
            && self.contact_id.is_some()
            && self.lead_converted
            && self.errors.is_empty()
    }
}

impl SyncEngine {
    /// Convert an approved user's Lead into a Contact + Account pair.
    pub async fn sync_approval(&self, user: &WpEntity) -> Result<ConversionReport> {
        let mut report = ConversionReport::default();

        tracing::info!(user_id = user.id(), "Starting lead conversion");

        // ─── Step 1: Account ─────────────────────────────────────────
        match self.sync(user, "Account").await {
            Ok(result) => {
                tracing::info!(user_id = user.id(), account_id = %result.salesforce_id, "Conversion: account ready");
                report.account_id = Some(result.salesforce_id);
            }
            Err(e) => {
                tracing::warn!(user_id = user.id(), error = %e, "Conversion: account step failed");
                report.errors.push(format!("account: {}", e));
            }
        }

        // ─── Step 2: Contact (references the Account when we have one) ───
        let extra = report.account_id.as_ref().map(|account_id| {
            let mut extra = Map::new();
            extra.insert("AccountId".to_string(), json!(account_id));
            extra
        });
        match self.sync_object(user, "Contact", extra).await {
            Ok(result) => {
                tracing::info!(user_id = user.id(), contact_id = %result.salesforce_id, "Conversion: contact ready");
                report.contact_id = Some(result.salesforce_id);
            }
            Err(e) => {
                tracing::warn!(user_id = user.id(), error = %e, "Conversion: contact step failed");
                report.errors.push(format!("contact: {}", e));
            }
        }

        // ─── Step 3: Reciprocal relationship patches ─────────────────
        if let (Some(account_id), Some(contact_id)) = (&report.account_id, &report.contact_id) {
            let mut account_patch = Map::new();
            account_patch.insert("Primary_Contact_ID__c".to_string(), json!(contact_id));
            if let Err(e) = self.api.update("Account", account_id, &account_patch).await {
                tracing::warn!(user_id = user.id(), error = %e, "Conversion: account back-reference failed");
                report.errors.push(format!("account_link: {}", e));
            }

            let mut contact_patch = Map::new();
            contact_patch.insert("AccountId".to_string(), json!(account_id));
            if let Err(e) = self.api.update("Contact", contact_id, &contact_patch).await {
                tracing::warn!(user_id = user.id(), error = %e, "Conversion: contact back-reference failed");
                report.errors.push(format!("contact_link: {}", e));
            }
        }

        // ─── Step 4: Patch the original Lead ─────────────────────────
        report.lead_id = self.find_lead_id(user).await;
        match &report.lead_id {
            Some(lead_id) => {
                let mut lead_patch = Map::new();
                lead_patch.insert("IsConverted".to_string(), json!(true));
                lead_patch.insert("Status".to_string(), json!("Converted"));
                if let Some(contact_id) = &report.contact_id {
                    lead_patch.insert("ConvertedContactId".to_string(), json!(contact_id));
                }
                if let Some(account_id) = &report.account_id {
                    lead_patch.insert("ConvertedAccountId".to_string(), json!(account_id));
                }

                match self.api.update("Lead", lead_id, &lead_patch).await {
                    Ok(()) => {
                        tracing::info!(user_id = user.id(), lead_id = %lead_id, "Conversion: lead marked converted");
                        report.lead_converted = true;
                        if let Err(e) = self.mark_lead_converted(user, lead_id).await {
                            tracing::error!(error = %e, "Failed to record converted state");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(user_id = user.id(), error = %e, "Conversion: lead patch failed");
                        report.errors.push(format!("lead: {}", e));
                    }
                }
            }
            None => {
                tracing::warn!(user_id = user.id(), "Conversion: no lead record found, skipping lead patch");
                report.errors.push("lead: record not found".to_string());
            }
        }

        if report.is_complete() {
            tracing::info!(user_id = user.id(), "Lead conversion complete");
        } else {
            tracing::warn!(
                user_id = user.id(),
                errors = report.errors.len(),
                "Lead conversion incomplete; operator intervention may be required"
            );
        }

        Ok(report)
    }

    /// Lead record id from the side-store, falling back to an
    /// external-id lookup for users synced before state tracking.
    async fn find_lead_id(&self, user: &WpEntity) -> Option<String> {
        match self.state.get(WpEntityType::User, user.id(), "Lead").await {
            Ok(Some(record)) => {
                if record.salesforce_record_id.is_some() {
                    return record.salesforce_record_id;
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load lead sync record");
            }
        }
        match self
            .guard
            .find_existing("Lead", USER_EXTERNAL_ID_FIELD, &user.external_id())
            .await
        {
            Ok(existing) => existing.map(|record| record.id),
            Err(e) => {
                tracing::warn!(error = %e, "Lead lookup by external id failed");
                None
            }
        }
    }

    /// Move the Lead's sync record to converted.
    async fn mark_lead_converted(&self, user: &WpEntity, lead_id: &str) -> Result<()> {
        let mut record = match self.state.get(WpEntityType::User, user.id(), "Lead").await? {
            Some(record) => record,
            None => crate::models::SyncRecord {
                wp_entity_id: user.id(),
                entity_type: WpEntityType::User,
                salesforce_object: "Lead".to_string(),
                external_id_field: USER_EXTERNAL_ID_FIELD.to_string(),
                salesforce_record_id: Some(lead_id.to_string()),
                status: SyncStatus::LeadCreated,
                last_error: None,
                synced_at: None,
            },
        };
        record.salesforce_record_id = Some(lead_id.to_string());
        record.status = SyncStatus::Converted;
        record.last_error = None;
        record.synced_at = Some(chrono::Utc::now().to_rfc3339());
        self.state.put(&record).await
    }
}
