//! Bearer-token claims for agent-to-agent calls.
//!
//! Wire form is three unpadded base64url parts joined by `.`; the JSON
//! inside each part serializes with sorted keys and no whitespace (the
//! encoding lives in aigos-token). `exp`/`iat` are Unix epoch seconds per
//! the JWT convention; certificate expiry inside `cga` stays RFC-3339.

use serde::{Deserialize, Serialize};

use crate::certificate::GovernanceFlags;
use crate::types::{CgaLevel, RiskLevel, Timestamp};

/// Token header. `alg` is always `ES256`, `typ` always `JWT`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
    pub kid: String,
}

/// Audience claim: a single URN or a list of them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, urn: &str) -> bool {
        match self {
            Audience::One(a) => a == urn,
            Audience::Many(list) => list.iter().any(|a| a == urn),
        }
    }
}

/// The complete claim set of an A2A bearer token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: Audience,
    /// Expiry, Unix epoch seconds. A token with `exp == now` is expired.
    pub exp: i64,
    /// Issued-at, Unix epoch seconds.
    pub iat: i64,
    /// Time-based unique token id.
    pub jti: String,
    pub cga: CgaClaims,
    pub agent: AgentClaims,
}

/// The CGA attestation embedded in a token, copied from the compact
/// certificate at mint time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CgaClaims {
    pub certificate_id: String,
    pub level: CgaLevel,
    pub issuer: String,
    pub expires_at: Timestamp,
    pub governance_verified: GovernanceFlags,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compliance_frameworks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operational_health: Option<OperationalHealth>,
}

/// Rolling operational-health figures the trust evaluator gates on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationalHealth {
    pub uptime_30d: f64,
    pub violations_30d: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_health_check: Option<Timestamp>,
}

/// Identity of the live agent instance the token speaks for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentClaims {
    pub asset_id: String,
    pub golden_thread_hash: String,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audience_accepts_string_or_array() {
        let one: Audience = serde_json::from_str("\"urn:aigos:agent:a:b\"").unwrap();
        assert!(one.contains("urn:aigos:agent:a:b"));

        let many: Audience = serde_json::from_str("[\"urn:x\",\"urn:y\"]").unwrap();
        assert!(many.contains("urn:y"));
        assert!(!many.contains("urn:z"));
    }
}
