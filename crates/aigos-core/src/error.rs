use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::CgaLevel;

/// The protocol-wide error type.
///
/// Every public engine operation returns either a value or one of these.
/// Variants carry the offending values; [`GovernanceError::kind`] exposes the
/// machine-readable kind that the middleware maps to HTTP status codes.
/// Warnings (certificate expiring soon, uptime below floor, revocation
/// status unknown) are never errors — they travel alongside success values.
#[derive(Debug, Error)]
pub enum GovernanceError {
    // ── Parse ────────────────────────────────────────────────────────────────
    #[error("bad format in {field}: {reason}")]
    BadFormat { field: String, reason: String },

    #[error("bad timestamp: '{value}' is not RFC-3339")]
    BadTimestamp { value: String },

    #[error("schema violation at {path}: {message}")]
    SchemaViolation { path: String, message: String },

    // ── Identity ─────────────────────────────────────────────────────────────
    #[error("golden thread hash mismatch: expected {expected}, computed {computed}")]
    HashMismatch { expected: String, computed: String },

    #[error("no signer configured")]
    SignerUnavailable,

    // ── Temporal ─────────────────────────────────────────────────────────────
    #[error("computed expiry {expires_at} is not after now ({now})")]
    ClockSkew { expires_at: String, now: String },

    #[error("token expired at {expired_at}")]
    TokenExpired { expired_at: String },

    #[error("certificate expired at {expired_at}")]
    CertificateExpired { expired_at: String },

    // ── Trust ────────────────────────────────────────────────────────────────
    #[error("invalid signature")]
    InvalidSignature,

    #[error("untrusted CA: {0}")]
    UntrustedIssuer(String),

    #[error("certificate revoked: {certificate_id}")]
    CertificateRevoked { certificate_id: String },

    #[error("certificate status unknown: {certificate_id}")]
    CertificateStatusUnknown { certificate_id: String },

    // ── Authorization ────────────────────────────────────────────────────────
    #[error("CGA level {actual} below required {required}")]
    InsufficientLevel { required: CgaLevel, actual: CgaLevel },

    #[error("missing compliance requirements: {}", missing.join(", "))]
    MissingCompliance { missing: Vec<String> },

    #[error("policy violation ({rule}): {reason}")]
    PolicyViolation { rule: String, reason: String },

    #[error("health check failed: {reason}")]
    HealthCheckFailed { reason: String },

    // ── Spawn ────────────────────────────────────────────────────────────────
    #[error("privilege escalation: {detail}")]
    PrivilegeEscalation { detail: String },

    #[error("budget escalation: {detail}")]
    BudgetEscalation { detail: String },

    #[error("spawn depth exceeded: depth {depth}, max {max}")]
    DepthExceeded { depth: u32, max: u32 },

    // ── Policy graph ─────────────────────────────────────────────────────────
    #[error("circular policy inheritance: {}", chain.join(" -> "))]
    CircularInheritance { chain: Vec<String> },

    #[error("policy inheritance deeper than {max} levels")]
    MaxDepthExceeded { max: usize },

    #[error("policy not found: {0}")]
    PolicyNotFound(String),

    // ── Operational ──────────────────────────────────────────────────────────
    #[error("operation cancelled")]
    Cancelled,

    #[error("{operation} timed out after {after_ms} ms")]
    Timeout { operation: String, after_ms: u64 },

    #[error("no CA resolver configured; level {level} requires CA signing")]
    CaUnavailable { level: CgaLevel },

    #[error("agent {agent_id} achieved no level; not certifiable")]
    NotCertifiable { agent_id: String },
}

/// Machine-readable error kind, grouped by the protocol taxonomy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    BadFormat,
    BadTimestamp,
    SchemaViolation,
    HashMismatch,
    SignerUnavailable,
    ClockSkew,
    TokenExpired,
    CertificateExpired,
    InvalidSignature,
    UntrustedIssuer,
    CertificateRevoked,
    CertificateStatusUnknown,
    InsufficientLevel,
    MissingCompliance,
    PolicyViolation,
    HealthCheckFailed,
    PrivilegeEscalation,
    BudgetEscalation,
    DepthExceeded,
    CircularInheritance,
    MaxDepthExceeded,
    PolicyNotFound,
    Cancelled,
    Timeout,
    CaUnavailable,
    NotCertifiable,
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GovernanceError::BadFormat { .. } => ErrorKind::BadFormat,
            GovernanceError::BadTimestamp { .. } => ErrorKind::BadTimestamp,
            GovernanceError::SchemaViolation { .. } => ErrorKind::SchemaViolation,
            GovernanceError::HashMismatch { .. } => ErrorKind::HashMismatch,
            GovernanceError::SignerUnavailable => ErrorKind::SignerUnavailable,
            GovernanceError::ClockSkew { .. } => ErrorKind::ClockSkew,
            GovernanceError::TokenExpired { .. } => ErrorKind::TokenExpired,
            GovernanceError::CertificateExpired { .. } => ErrorKind::CertificateExpired,
            GovernanceError::InvalidSignature => ErrorKind::InvalidSignature,
            GovernanceError::UntrustedIssuer(_) => ErrorKind::UntrustedIssuer,
            GovernanceError::CertificateRevoked { .. } => ErrorKind::CertificateRevoked,
            GovernanceError::CertificateStatusUnknown { .. } => {
                ErrorKind::CertificateStatusUnknown
            }
            GovernanceError::InsufficientLevel { .. } => ErrorKind::InsufficientLevel,
            GovernanceError::MissingCompliance { .. } => ErrorKind::MissingCompliance,
            GovernanceError::PolicyViolation { .. } => ErrorKind::PolicyViolation,
            GovernanceError::HealthCheckFailed { .. } => ErrorKind::HealthCheckFailed,
            GovernanceError::PrivilegeEscalation { .. } => ErrorKind::PrivilegeEscalation,
            GovernanceError::BudgetEscalation { .. } => ErrorKind::BudgetEscalation,
            GovernanceError::DepthExceeded { .. } => ErrorKind::DepthExceeded,
            GovernanceError::CircularInheritance { .. } => ErrorKind::CircularInheritance,
            GovernanceError::MaxDepthExceeded { .. } => ErrorKind::MaxDepthExceeded,
            GovernanceError::PolicyNotFound(_) => ErrorKind::PolicyNotFound,
            GovernanceError::Cancelled => ErrorKind::Cancelled,
            GovernanceError::Timeout { .. } => ErrorKind::Timeout,
            GovernanceError::CaUnavailable { .. } => ErrorKind::CaUnavailable,
            GovernanceError::NotCertifiable { .. } => ErrorKind::NotCertifiable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_level_mentions_both_levels() {
        let err = GovernanceError::InsufficientLevel {
            required: CgaLevel::Gold,
            actual: CgaLevel::Silver,
        };
        let msg = err.to_string();
        assert!(msg.contains("SILVER"));
        assert!(msg.contains("GOLD"));
        assert_eq!(err.kind(), ErrorKind::InsufficientLevel);
    }

    #[test]
    fn circular_inheritance_renders_chain() {
        let err = GovernanceError::CircularInheritance {
            chain: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "circular policy inheritance: A -> B -> A");
    }
}
