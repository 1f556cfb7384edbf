// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Field mapping definitions.
//!
//! A [`FieldMapping`] declares how one Salesforce field is populated from
//! a WordPress source. Mappings are persisted as a JSON document keyed by
//! object name, each value an object keyed by Salesforce field name, so
//! field-name uniqueness within an object is structural.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Where a mapped value is read from on the WordPress side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WpSource {
    /// Direct wp_users column (user_email, user_url, ...)
    User,
    /// usermeta key
    UserMeta,
    /// Direct wp_posts column (post_title, post_status, ...)
    Post,
    /// ACF field
    Acf,
    /// Registered computed resolver; `wp_field` names the resolver
    Computed,
    /// Meta, then attribute, then ACF — legacy catch-all
    Custom,
}

/// How a multi-checkbox selection is flattened into a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckboxStrategy {
    SemicolonSeparated,
    CommaSeparated,
    PipeSeparated,
    Json,
    FirstValue,
    Count,
    Boolean,
    CustomDelimiter(String),
}

/// Conversion applied to a raw WordPress value before it is sent.
///
/// Serialized as a compact string (`"date"`, `"checkbox:count"`,
/// `"checkbox:delimiter=|"`); bare `"checkbox"` means semicolon-joined.
/// Parsing is strict, so a bad mapping document fails at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TransformationKind {
    Text,
    Email,
    Phone,
    Url,
    Textarea,
    Number,
    Boolean,
    Datetime,
    Date,
    ArrayToText,
    Currency,
    Json,
    Checkbox(CheckboxStrategy),
}

impl fmt::Display for TransformationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransformationKind::Text => "text",
            TransformationKind::Email => "email",
            TransformationKind::Phone => "phone",
            TransformationKind::Url => "url",
            TransformationKind::Textarea => "textarea",
            TransformationKind::Number => "number",
            TransformationKind::Boolean => "boolean",
            TransformationKind::Datetime => "datetime",
            TransformationKind::Date => "date",
            TransformationKind::ArrayToText => "array_to_text",
            TransformationKind::Currency => "currency",
            TransformationKind::Json => "json",
            TransformationKind::Checkbox(strategy) => {
                return match strategy {
                    CheckboxStrategy::SemicolonSeparated => write!(f, "checkbox"),
                    CheckboxStrategy::CommaSeparated => write!(f, "checkbox:comma_separated"),
                    CheckboxStrategy::PipeSeparated => write!(f, "checkbox:pipe_separated"),
                    CheckboxStrategy::Json => write!(f, "checkbox:json"),
                    CheckboxStrategy::FirstValue => write!(f, "checkbox:first_value"),
                    CheckboxStrategy::Count => write!(f, "checkbox:count"),
                    CheckboxStrategy::Boolean => write!(f, "checkbox:boolean"),
                    CheckboxStrategy::CustomDelimiter(d) => write!(f, "checkbox:delimiter={}", d),
                };
            }
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TransformationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "text" => TransformationKind::Text,
            "email" => TransformationKind::Email,
            "phone" => TransformationKind::Phone,
            "url" => TransformationKind::Url,
            "textarea" => TransformationKind::Textarea,
            "number" => TransformationKind::Number,
            "boolean" => TransformationKind::Boolean,
            "datetime" => TransformationKind::Datetime,
            "date" => TransformationKind::Date,
            "array_to_text" => TransformationKind::ArrayToText,
            "currency" => TransformationKind::Currency,
            "json" => TransformationKind::Json,
            "checkbox" => TransformationKind::Checkbox(CheckboxStrategy::SemicolonSeparated),
            other => {
                let Some(rest) = other.strip_prefix("checkbox:") else {
                    return Err(format!("unknown transformation kind: {}", other));
                };
                let strategy = match rest {
                    "semicolon_separated" => CheckboxStrategy::SemicolonSeparated,
                    "comma_separated" => CheckboxStrategy::CommaSeparated,
                    "pipe_separated" => CheckboxStrategy::PipeSeparated,
                    "json" => CheckboxStrategy::Json,
                    "first_value" => CheckboxStrategy::FirstValue,
                    "count" => CheckboxStrategy::Count,
                    "boolean" => CheckboxStrategy::Boolean,
                    _ => match rest.strip_prefix("delimiter=") {
                        Some(delim) if !delim.is_empty() => {
                            CheckboxStrategy::CustomDelimiter(delim.to_string())
                        }
                        _ => return Err(format!("unknown checkbox strategy: {}", rest)),
                    },
                };
                TransformationKind::Checkbox(strategy)
            }
        };
        Ok(kind)
    }
}

impl TryFrom<String> for TransformationKind {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TransformationKind> for String {
    fn from(kind: TransformationKind) -> String {
        kind.to_string()
    }
}

/// One Salesforce field and how it is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Salesforce API field name, e.g. `Email` or `WordPress_User_ID__c`
    pub salesforce_field: String,
    /// WordPress-side field, key, or computed-resolver name
    pub wp_field: String,
    pub wp_source: WpSource,
    /// A required mapping that resolves to nothing aborts the sync pre-flight.
    #[serde(default)]
    pub required: bool,
    /// Fallback used when the source lookup misses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub transformation: TransformationKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl FieldMapping {
    pub fn new(
        salesforce_field: &str,
        wp_field: &str,
        wp_source: WpSource,
        transformation: TransformationKind,
    ) -> Self {
        Self {
            salesforce_field: salesforce_field.to_string(),
            wp_field: wp_field.to_string(),
            wp_source,
            required: false,
            default: None,
            transformation,
            description: String::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Build from a persisted document entry.
    pub fn from_entry(salesforce_field: &str, entry: &MappingEntry) -> Self {
        Self {
            salesforce_field: salesforce_field.to_string(),
            wp_field: entry.wp_field.clone(),
            wp_source: entry.wp_source,
            required: entry.required,
            default: entry.default.clone(),
            transformation: entry.transformation.clone(),
            description: entry.description.clone(),
        }
    }

    /// Split into the persisted document representation.
    pub fn to_entry(&self) -> (String, MappingEntry) {
        (
            self.salesforce_field.clone(),
            MappingEntry {
                wp_field: self.wp_field.clone(),
                wp_source: self.wp_source,
                required: self.required,
                default: self.default.clone(),
                transformation: self.transformation.clone(),
                description: self.description.clone(),
            },
        )
    }
}

/// Document value for one Salesforce field (the field name is the key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub wp_field: String,
    pub wp_source: WpSource,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub transformation: TransformationKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Persisted mapping document: object name → Salesforce field → entry.
pub type MappingDocument = BTreeMap<String, BTreeMap<String, MappingEntry>>;

/// Whether a string is a bare Salesforce API name (object or field),
/// safe to interpolate into SOQL and URL paths.
pub fn is_api_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
