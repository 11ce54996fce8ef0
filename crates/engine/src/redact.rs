// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret redaction for tool inputs before they reach the log.

use serde_json::Value;

const SENSITIVE_KEY_FRAGMENTS: &[&str] = &[
    "token",
    "password",
    "passwd",
    "secret",
    "authorization",
    "api_key",
    "apikey",
    "credential",
    "private_key",
    "passphrase",
];

const REDACTED: &str = "[REDACTED]";

fn is_sensitive(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_KEY_FRAGMENTS.iter().any(|f| lower.contains(f))
}

/// Replace values under sensitive keys, recursively, returning the redacted
/// copy. Arrays and nested objects are walked; everything else passes
/// through untouched.
pub fn redact_inputs(inputs: &Value) -> Value {
    match inputs {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                if is_sensitive(key) {
                    out.insert(key.clone(), Value::String(REDACTED.to_string()));
                } else {
                    out.insert(key.clone(), redact_inputs(value));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_inputs).collect()),
        other => other.clone(),
    }
}
