//! # RFC 8785 JSON Canonicalization Scheme (JCS)
//!
//! Produces a deterministic byte serialization of a JSON value so that
//! semantically identical documents hash identically regardless of key
//! order or incidental whitespace.
//!
//! ## Threat Model
//!
//! Canonicalization defends against:
//!
//! - **Key Reordering Attacks**: JSON objects have no inherent key order, so
//!   without canonicalization an attacker could submit the same event with
//!   reordered keys to produce a different `event_hash`.
//! - **Whitespace Manipulation**: Insignificant whitespace must not affect
//!   the hash.
//! - **Number Representation**: `1.0`, `1.00`, and `1` are equivalent but
//!   bytewise different without normalization.
//! - **Unicode Escaping**: `"A"` and `"A"` are equivalent but bytewise
//!   different.
//!
//! ## RFC 8785 Summary
//!
//! 1. **Object Keys**: sorted by UTF-16 code unit.
//! 2. **Numbers**: minimal representation (no trailing zeros).
//! 3. **Strings**: minimal escaping.
//! 4. **Whitespace**: none insignificant.
//! 5. **Arrays**: original element order preserved.
//!
//! ## References
//!
//! - **RFC 8785** - "JSON Canonicalization Scheme (JCS)"
//!   <https://www.rfc-editor.org/rfc/rfc8785>
//! - **RFC 7493** - "I-JSON Message Format"
//!   <https://www.rfc-editor.org/rfc/rfc7493>
//!
//! ## Example
//!
//! ```rust
//! use talos_audit_core::canonicalize::canonicalize;
//! use serde_json::json;
//!
//! let obj1 = json!({"b": 1, "a": 2});
//! let obj2 = json!({"a": 2, "b": 1});
//!
//! assert_eq!(canonicalize(&obj1), canonicalize(&obj2));
//! assert_eq!(canonicalize(&obj1), r#"{"a":2,"b":1}"#);
//! ```

use crate::models::Hash;
use sha2::{Digest, Sha256};

/// Canonicalizes a JSON value according to RFC 8785.
///
/// # Example
///
/// ```rust
/// use talos_audit_core::canonicalize::canonicalize;
/// use serde_json::json;
///
/// let value = json!({"zulu": true, "alpha": [3, 2, 1], "bravo": "test"});
/// assert_eq!(canonicalize(&value), r#"{"alpha":[3,2,1],"bravo":"test","zulu":true}"#);
/// ```
pub fn canonicalize(value: &serde_json::Value) -> String {
    canonicalize_value(value)
}

/// Computes the SHA-256 hash of a canonicalized JSON value.
///
/// # Example
///
/// ```rust
/// use talos_audit_core::canonicalize::hash_canonical;
/// use serde_json::json;
///
/// let a = hash_canonical(&json!({"b": 1, "a": 2}));
/// let b = hash_canonical(&json!({"a": 2, "b": 1}));
/// assert_eq!(a, b);
/// ```
pub fn hash_canonical(value: &serde_json::Value) -> Hash {
    let canonical = canonicalize(value);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hasher.finalize().into()
}

fn canonicalize_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => {
            if *b {
                "true".to_string()
            } else {
                "false".to_string()
            }
        }
        serde_json::Value::Number(n) => canonicalize_number(n),
        serde_json::Value::String(s) => canonicalize_string(s),
        serde_json::Value::Array(arr) => canonicalize_array(arr),
        serde_json::Value::Object(obj) => canonicalize_object(obj),
    }
}

/// Canonicalizes a JSON number per RFC 8785's minimal representation.
fn canonicalize_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    if let Some(f) = n.as_f64() {
        if f.fract() == 0.0 && f.abs() < (i64::MAX as f64) {
            return (f as i64).to_string();
        }
        format_float(f)
    } else {
        n.to_string()
    }
}

/// Formats a float using ECMAScript-style minimal representation.
///
/// NaN and infinities never reach this function: the ingest path rejects
/// malformed numerics as `ValidationError` before canonicalization runs.
fn format_float(f: f64) -> String {
    debug_assert!(f.is_finite(), "non-finite float reached canonicalization");
    format!("{}", f)
}

/// Canonicalizes a JSON string with RFC 8785's minimal escaping.
fn canonicalize_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    result.push('"');

    for ch in s.chars() {
        match ch {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\x08' => result.push_str("\\b"),
            '\x0C' => result.push_str("\\f"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c < '\x20' => {
                result.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => result.push(c),
        }
    }

    result.push('"');
    result
}

fn canonicalize_array(arr: &[serde_json::Value]) -> String {
    let elements: Vec<String> = arr.iter().map(canonicalize_value).collect();
    format!("[{}]", elements.join(","))
}

/// Sorts object keys by UTF-16 code unit, per RFC 8785 §3.2.3.
fn canonicalize_object(obj: &serde_json::Map<String, serde_json::Value>) -> String {
    let mut entries: Vec<(&String, &serde_json::Value)> = obj.iter().collect();
    entries.sort_by(|(a, _), (b, _)| compare_utf16(a, b));

    let pairs: Vec<String> = entries
        .iter()
        .map(|(k, v)| format!("{}:{}", canonicalize_string(k), canonicalize_value(v)))
        .collect();

    format!("{{{}}}", pairs.join(","))
}

fn compare_utf16(a: &str, b: &str) -> std::cmp::Ordering {
    let a_utf16: Vec<u16> = a.encode_utf16().collect();
    let b_utf16: Vec<u16> = b.encode_utf16().collect();
    a_utf16.cmp(&b_utf16)
}
