// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Field value transformation.
//!
//! Converts raw WordPress values into Salesforce-ready values. Every
//! transformation is pure and total: malformed input logs a warning and
//! yields `None` (field omitted from the payload) or an explicit empty
//! string, never an error. One bad field must not abort an otherwise
//! valid sync — required-field enforcement happens upstream, before any
//! value reaches this module.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use validator::ValidateEmail;

use crate::models::{CheckboxStrategy, TransformationKind};

/// Convert a raw value per the given transformation kind.
///
/// `None` means the field is omitted from the outbound payload.
pub fn transform(raw: &Value, kind: &TransformationKind) -> Option<Value> {
    if raw.is_null() {
        return None;
    }
    match kind {
        TransformationKind::Text | TransformationKind::Phone => {
            scalar_text(raw).map(|s| Value::String(clean_text(&s)))
        }
        TransformationKind::Textarea => scalar_text(raw).map(|s| Value::String(clean_textarea(&s))),
        TransformationKind::Email => Some(Value::String(email(raw))),
        TransformationKind::Url => Some(Value::String(url(raw))),
        TransformationKind::Number => parse_number(raw).map(|n| json!(n)),
        TransformationKind::Currency => parse_currency(raw).map(|n| json!(n)),
        TransformationKind::Boolean => Some(Value::Bool(truthy(raw))),
        TransformationKind::Date => date(raw).map(Value::String),
        TransformationKind::Datetime => datetime(raw).map(Value::String),
        TransformationKind::ArrayToText => array_to_text(raw).map(Value::String),
        TransformationKind::Json => serde_json::to_string(raw).ok().map(Value::String),
        TransformationKind::Checkbox(strategy) => checkbox(raw, strategy),
    }
}

/// Stringify a scalar; non-scalars are not representable as text.
fn scalar_text(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => {
            tracing::warn!("Non-scalar value for text transformation, field omitted");
            None
        }
    }
}

fn clean_text(s: &str) -> String {
    s.trim().chars().filter(|c| !c.is_control()).collect()
}

/// Like [`clean_text`] but newlines and tabs survive.
fn clean_textarea(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

/// Valid email grammar → the address; anything else → explicit empty
/// string, so a present-but-invalid email is distinguishable from an
/// absent one.
fn email(raw: &Value) -> String {
    let Value::String(s) = raw else {
        return String::new();
    };
    let s = s.trim();
    if s.validate_email() {
        s.to_string()
    } else {
        if !s.is_empty() {
            tracing::warn!(value = %s, "Invalid email, sending empty");
        }
        String::new()
    }
}

/// Absolute URL → the URL; anything else → explicit empty string.
fn url(raw: &Value) -> String {
    let Value::String(s) = raw else {
        return String::new();
    };
    let s = s.trim();
    if reqwest::Url::parse(s).is_ok() {
        s.to_string()
    } else {
        if !s.is_empty() {
            tracing::warn!(value = %s, "Invalid URL, sending empty");
        }
        String::new()
    }
}

fn parse_number(raw: &Value) -> Option<f64> {
    let n = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        // JSON cannot carry NaN/infinity
        Some(n) if n.is_finite() => Some(n),
        _ => {
            tracing::warn!("Non-numeric value for number transformation, field omitted");
            None
        }
    }
}

/// Numeric parse after stripping currency symbols and thousands separators.
fn parse_currency(raw: &Value) -> Option<f64> {
    match raw {
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | ' '))
                .collect();
            parse_number(&Value::String(cleaned))
        }
        _ => parse_number(raw),
    }
}

/// Strings: case-insensitive membership in {"1","true","yes","on"}.
/// Everything else uses truthiness.
fn truthy(raw: &Value) -> bool {
    match raw {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Null => false,
    }
}

fn date(raw: &Value) -> Option<String> {
    match parse_instant(raw) {
        Some(instant) => Some(instant.format("%Y-%m-%d").to_string()),
        None => {
            tracing::warn!("Unparsable date value, field omitted");
            None
        }
    }
}

fn datetime(raw: &Value) -> Option<String> {
    match parse_instant(raw) {
        Some(instant) => Some(instant.to_rfc3339_opts(SecondsFormat::Secs, true)),
        None => {
            tracing::warn!("Unparsable datetime value, field omitted");
            None
        }
    }
}

fn parse_instant(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::String(s) => parse_instant_str(s.trim()),
        Value::Number(n) => n.as_i64().and_then(|ts| DateTime::from_timestamp(ts, 0)),
        _ => None,
    }
}

fn parse_instant_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    // All-digit strings: 8 digits is ACF's Ymd date format, anything
    // else is a unix timestamp.
    if s.chars().all(|c| c.is_ascii_digit()) {
        if s.len() == 8 {
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y%m%d") {
                return d.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
            }
        }
        return s
            .parse::<i64>()
            .ok()
            .and_then(|ts| DateTime::from_timestamp(ts, 0));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // MySQL DATETIME, as wp_posts stores post_date
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
        }
    }
    None
}

fn array_to_text(raw: &Value) -> Option<String> {
    match raw {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(item_text)
                .collect::<Vec<_>>()
                .join(";"),
        ),
        // Already flat
        Value::String(s) => Some(s.clone()),
        _ => {
            tracing::warn!("Non-array value for array_to_text transformation, field omitted");
            None
        }
    }
}

fn item_text(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// The selected options of a checkbox/multi-select field.
fn selection_values(raw: &Value) -> Vec<String> {
    match raw {
        Value::Array(items) => items.iter().filter_map(item_text).collect(),
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn checkbox(raw: &Value, strategy: &CheckboxStrategy) -> Option<Value> {
    let values = selection_values(raw);
    match strategy {
        CheckboxStrategy::SemicolonSeparated => Some(Value::String(values.join(";"))),
        CheckboxStrategy::CommaSeparated => Some(Value::String(values.join(","))),
        CheckboxStrategy::PipeSeparated => Some(Value::String(values.join("|"))),
        CheckboxStrategy::CustomDelimiter(delim) => Some(Value::String(values.join(delim))),
        CheckboxStrategy::Json => serde_json::to_string(&values).ok().map(Value::String),
        CheckboxStrategy::FirstValue => values.into_iter().next().map(Value::String),
        CheckboxStrategy::Count => Some(json!(values.len())),
        CheckboxStrategy::Boolean => Some(Value::Bool(!values.is_empty())),
    }
}
