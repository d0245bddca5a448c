//! Typed wrappers over the upstream endpoints the storefront pages use.
//!
//! SYSTEM CONTEXT
//! ==============
//! The gateway returns bodies untouched; upstream wraps most payloads in a
//! `data` envelope. Unwrapping happens here, never in the gateway.

pub mod auth;
pub mod clients;
pub mod products;

use serde_json::Value;

/// Take the `data` envelope when present and non-null, else the whole body.
#[must_use]
pub fn unwrap_data(response: Value) -> Value {
    match response {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) if !data.is_null() => data,
            Some(_) | None => Value::Object(map),
        },
        other => other,
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
