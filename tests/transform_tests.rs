// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transformation properties: purity, idempotence, and the documented
//! per-kind behaviors.

use serde_json::{json, Value};
use wp_salesforce_sync::models::TransformationKind;
use wp_salesforce_sync::services::transform::transform;

fn kind(s: &str) -> TransformationKind {
    s.parse().unwrap()
}

#[test]
fn test_stable_kinds_are_idempotent() {
    let cases = [
        (json!("  Hello World "), "text"),
        (json!("ada@example.com"), "email"),
        (json!("definitely not an email"), "email"),
        (json!("https://example.com/a?b=c"), "url"),
        (json!("nope"), "url"),
        (json!("  555-0100 "), "phone"),
    ];

    for (input, k) in cases {
        let kind = kind(k);
        let once = transform(&input, &kind).unwrap();
        let twice = transform(&once, &kind).unwrap();
        assert_eq!(once, twice, "{} not idempotent on {}", k, input);
    }
}

#[test]
fn test_boolean_keyword_set() {
    for yes in ["1", "true", "yes", "on", "YES", "True", "ON"] {
        assert_eq!(
            transform(&json!(yes), &kind("boolean")),
            Some(json!(true)),
            "{} should be true",
            yes
        );
    }
    for no in ["nah", "0", "false", "no", "off", ""] {
        assert_eq!(
            transform(&json!(no), &kind("boolean")),
            Some(json!(false)),
            "{} should be false",
            no
        );
    }
}

#[test]
fn test_array_to_text_joins_with_semicolons() {
    assert_eq!(
        transform(&json!(["a", "b"]), &kind("array_to_text")),
        Some(json!("a;b"))
    );
    assert_eq!(
        transform(&json!([]), &kind("array_to_text")),
        Some(json!(""))
    );
}

#[test]
fn test_checkbox_strategies() {
    let selection = json!(["a", "b", "c"]);

    assert_eq!(
        transform(&selection, &kind("checkbox")),
        Some(json!("a;b;c")),
        "default strategy is semicolon join"
    );
    assert_eq!(
        transform(&selection, &kind("checkbox:comma_separated")),
        Some(json!("a,b,c"))
    );
    assert_eq!(
        transform(&selection, &kind("checkbox:pipe_separated")),
        Some(json!("a|b|c"))
    );
    assert_eq!(transform(&selection, &kind("checkbox:count")), Some(json!(3)));
    assert_eq!(
        transform(&selection, &kind("checkbox:first_value")),
        Some(json!("a"))
    );
    assert_eq!(
        transform(&selection, &kind("checkbox:json")),
        Some(json!("[\"a\",\"b\",\"c\"]"))
    );
    assert_eq!(
        transform(&selection, &kind("checkbox:boolean")),
        Some(json!(true))
    );
    assert_eq!(
        transform(&json!([]), &kind("checkbox:boolean")),
        Some(json!(false))
    );
    assert_eq!(
        transform(&selection, &kind("checkbox:delimiter= / ")),
        Some(json!("a / b / c"))
    );
}

#[test]
fn test_number_and_currency() {
    assert_eq!(transform(&json!("42"), &kind("number")), Some(json!(42.0)));
    assert_eq!(transform(&json!(1.5), &kind("number")), Some(json!(1.5)));
    assert_eq!(transform(&json!("n/a"), &kind("number")), None);
    assert_eq!(
        transform(&json!("$1,200.50"), &kind("currency")),
        Some(json!(1200.5))
    );
    assert_eq!(transform(&json!("free"), &kind("currency")), None);
}

#[test]
fn test_date_and_datetime_never_panic_on_garbage() {
    for garbage in [
        json!("not a date"),
        json!("2024-13-45"),
        json!("////"),
        json!({"nested": "map"}),
        json!(["a"]),
        Value::Null,
    ] {
        assert_eq!(transform(&garbage, &kind("date")), None, "{}", garbage);
        assert_eq!(transform(&garbage, &kind("datetime")), None, "{}", garbage);
    }
}

#[test]
fn test_date_and_datetime_formats() {
    assert_eq!(
        transform(&json!("2024-03-15 08:30:00"), &kind("datetime")),
        Some(json!("2024-03-15T08:30:00Z"))
    );
    assert_eq!(
        transform(&json!("20240315"), &kind("date")),
        Some(json!("2024-03-15"))
    );
}

#[test]
fn test_json_kind_round_trips_through_serde() {
    let input = json!({"b": [1, 2], "a": "x"});
    let out = transform(&input, &kind("json")).unwrap();
    let back: Value = serde_json::from_str(out.as_str().unwrap()).unwrap();
    assert_eq!(back, input);
}
