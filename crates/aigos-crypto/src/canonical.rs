//! Deterministic canonical form and SHA-256 hashing.
//!
//! Canonical form: fields sorted by the UTF-8 byte order of their keys,
//! joined as `key=value` with `|` separators. Timestamp-tagged values are
//! normalized to UTC with a trailing `Z` and no sub-second fraction, so the
//! same instant always hashes identically regardless of how the source
//! recorded its offset.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use aigos_core::constants::HASH_PREFIX;
use aigos_core::GovernanceError;

/// A canonical field value: plain text, or a timestamp that must be
/// normalized before joining.
#[derive(Clone, Copy, Debug)]
pub enum Value<'a> {
    Text(&'a str),
    Timestamp(&'a str),
}

/// Build the canonical string form of a record.
///
/// Deterministic across runs and platforms: sorting is by raw UTF-8 bytes,
/// timestamps collapse to `%Y-%m-%dT%H:%M:%SZ`. Fails with `BadTimestamp`
/// when a timestamp-tagged value does not parse as RFC-3339.
pub fn canonical(fields: &[(&str, Value<'_>)]) -> Result<String, GovernanceError> {
    let mut parts: Vec<(&str, String)> = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        let rendered = match value {
            Value::Text(s) => (*s).to_string(),
            Value::Timestamp(s) => normalize_timestamp(s)?,
        };
        parts.push((key, rendered));
    }
    parts.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    Ok(parts
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("|"))
}

/// SHA-256 over the canonical form, rendered `sha256:<lowercase hex>`.
pub fn hash(fields: &[(&str, Value<'_>)]) -> Result<String, GovernanceError> {
    Ok(hash_bytes(canonical(fields)?.as_bytes()))
}

/// `sha256:` + lowercase hex of SHA-256 over raw bytes.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{HASH_PREFIX}{}", hex::encode(Sha256::digest(bytes)))
}

/// Parse an RFC-3339 timestamp and re-emit it as UTC seconds precision
/// with a trailing `Z`.
pub fn normalize_timestamp(value: &str) -> Result<String, GovernanceError> {
    let parsed: DateTime<Utc> = DateTime::parse_from_rfc3339(value)
        .map_err(|_| GovernanceError::BadTimestamp { value: value.to_string() })?
        .with_timezone(&Utc);
    Ok(parsed.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Whether `s` has the canonical hash shape `sha256:<64 lowercase hex>`.
pub fn is_canonical_hash(s: &str) -> bool {
    match s.strip_prefix(HASH_PREFIX) {
        Some(rest) => {
            rest.len() == 64 && rest.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        }
        None => false,
    }
}

/// Constant-time string equality. Folds XOR over all bytes so the compare
/// time does not depend on where the first difference sits.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Serialize any value to deterministic JSON: object keys sorted
/// lexicographically, no whitespace. Signing inputs for certificates and
/// tokens both go through here.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, GovernanceError> {
    // serde_json's Map is key-ordered, so round-tripping through Value
    // sorts every object.
    let v = serde_json::to_value(value).map_err(|e| GovernanceError::BadFormat {
        field: "json".to_string(),
        reason: e.to_string(),
    })?;
    serde_json::to_string(&v).map_err(|e| GovernanceError::BadFormat {
        field: "json".to_string(),
        reason: e.to_string(),
    })
}
