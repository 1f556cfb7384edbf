// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! WordPress → Salesforce sync core.
//!
//! Field-mapping and transformation engine plus the OAuth2 token
//! lifecycle manager behind a WordPress/Salesforce CRM integration.
//! The WordPress host supplies entity snapshots and a key-value store;
//! this crate owns token refresh, payload building, duplicate
//! detection, and the Lead→Contact/Account conversion flow.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{Result, SyncError};
