//! OAuth token model for storage.

use serde::{Deserialize, Serialize};

/// OAuth token triple persisted through the key-value store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    /// Current access token
    pub access_token: String,
    /// Long-lived refresh token
    pub refresh_token: String,
    /// Org instance base URL returned by the token endpoint
    pub instance_url: String,
    /// When the access token expires (ISO 8601)
    pub expires_at: String,
}
