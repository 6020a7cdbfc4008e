//! CGA certificate documents.
//!
//! The full certificate is the authoritative attestation record; the
//! compact certificate is a space-optimized projection of the embedding
//! fields, carried inside bearer tokens. Both are signed independently over
//! their deterministic serialization (sorted keys, no whitespace, signature
//! field absent).

use serde::{Deserialize, Serialize};

use crate::constants::{API_VERSION, KIND_CERTIFICATE_COMPACT};
use crate::types::{AttestationStatus, CgaLevel, Timestamp};

// ── Full certificate ─────────────────────────────────────────────────────────

/// A full `CGACertificate` document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Certificate {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CertificateMetadata,
    pub spec: CertificateSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<DocumentSignature>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CertificateMetadata {
    /// Synthesized id: `cga-YYYYMMDD-<agent_tail>-<level_lower>`.
    pub id: String,
    /// Certificate record version (bumped on renewal).
    pub version: u32,
    pub schema_version: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CertificateSpec {
    pub agent: AgentSpec,
    pub certification: CertificationSpec,
    pub governance: GovernanceAttestations,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance: Option<ComplianceSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<SecuritySpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operational: Option<OperationalSpec>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Agent URN, e.g. `urn:aigos:agent:acme:billing-bot`.
    pub id: String,
    pub version: String,
    pub organization: String,
    pub golden_thread: GoldenThreadRef,
}

/// Pointer from a certificate to the agent's Golden Thread.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GoldenThreadRef {
    /// `sha256:<64 hex>` binding hash.
    pub hash: String,
    pub algorithm: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CertificationSpec {
    pub level: CgaLevel,
    pub issuer: Issuer,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    pub renewal: RenewalPolicy,
}

/// Certificate issuer: the agent's own organization for Bronze
/// (self-signed), a CA for Silver and above.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Issuer {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub requires_ca: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RenewalPolicy {
    pub auto_renew: bool,
    pub grace_period_days: u32,
}

/// One governance attestation inside a certificate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Attestation {
    pub status: AttestationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Attestation {
    pub fn verified(at: Timestamp) -> Self {
        Self { status: AttestationStatus::Verified, verified_at: Some(at), details: None }
    }

    pub fn not_verified() -> Self {
        Self { status: AttestationStatus::NotVerified, verified_at: None, details: None }
    }

    pub fn not_applicable() -> Self {
        Self { status: AttestationStatus::NotApplicable, verified_at: None, details: None }
    }
}

/// The five governance attestations every certificate carries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernanceAttestations {
    pub kill_switch: Attestation,
    pub policy_engine: Attestation,
    pub golden_thread: Attestation,
    pub capability_bounds: Attestation,
    pub telemetry: Attestation,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ComplianceSpec {
    /// Framework tags, e.g. `"SOC2"`, `"EU-AI-Act:high-risk"`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frameworks: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SecuritySpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_audit: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scanners: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OperationalSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_30d: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations_30d: Option<u32>,
}

/// Detached signature over the deterministic document serialization.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentSignature {
    pub algorithm: String,
    pub key_id: String,
    /// Base64url-encoded raw signature bytes.
    pub value: String,
}

impl Certificate {
    pub fn level(&self) -> CgaLevel {
        self.spec.certification.level
    }

    pub fn agent_id(&self) -> &str {
        &self.spec.agent.id
    }

    /// `expires_at - issued_at` must equal the level's validity window.
    pub fn validity_invariant_holds(&self) -> bool {
        let span = self.spec.certification.expires_at - self.spec.certification.issued_at;
        span.num_seconds() == self.level().validity_days() * 86_400
    }

    /// The compact embedding projection. `NotVerified` and `NotApplicable`
    /// both fold to `false`. The compact form is signed separately; the
    /// returned value carries no signature.
    pub fn to_compact(&self) -> CompactCertificate {
        let gov = &self.spec.governance;
        CompactCertificate {
            api_version: API_VERSION.to_string(),
            kind: KIND_CERTIFICATE_COMPACT.to_string(),
            id: self.metadata.id.clone(),
            agent: self.spec.agent.id.clone(),
            level: self.level(),
            ca: self.spec.certification.issuer.id.clone(),
            issued_at: self.spec.certification.issued_at,
            expires_at: self.spec.certification.expires_at,
            golden_thread_hash: self.spec.agent.golden_thread.hash.clone(),
            gov: GovernanceFlags {
                ks: gov.kill_switch.status.as_flag(),
                pe: gov.policy_engine.status.as_flag(),
                gt: gov.golden_thread.status.as_flag(),
                cb: gov.capability_bounds.status.as_flag(),
                tm: gov.telemetry.status.as_flag(),
            },
            compliance: self
                .spec
                .compliance
                .as_ref()
                .map(|c| c.frameworks.clone())
                .unwrap_or_default(),
            sig: None,
        }
    }
}

// ── Compact certificate ──────────────────────────────────────────────────────

/// The five governance booleans of the compact form:
/// kill switch, policy engine, golden thread, capability bounds, telemetry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceFlags {
    pub ks: bool,
    pub pe: bool,
    pub gt: bool,
    pub cb: bool,
    pub tm: bool,
}

/// A `CGACertificateCompact` document, sized for token embedding.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompactCertificate {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub id: String,
    pub agent: String,
    pub level: CgaLevel,
    /// Issuer CA id (`self` prefix for Bronze).
    pub ca: String,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    pub golden_thread_hash: String,
    pub gov: GovernanceFlags,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compliance: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sig: Option<CompactSignature>,
}

/// Compact signature triple.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompactSignature {
    pub alg: String,
    pub kid: String,
    pub sig: String,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn attestations() -> GovernanceAttestations {
        let at = Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap();
        GovernanceAttestations {
            kill_switch: Attestation::verified(at),
            policy_engine: Attestation::verified(at),
            golden_thread: Attestation::verified(at),
            capability_bounds: Attestation::not_applicable(),
            telemetry: Attestation::not_verified(),
        }
    }

    pub(crate) fn certificate(level: CgaLevel) -> Certificate {
        let issued = Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap();
        Certificate {
            api_version: API_VERSION.to_string(),
            kind: crate::constants::KIND_CERTIFICATE.to_string(),
            metadata: CertificateMetadata {
                id: "cga-20250115-billing-bot-silver".to_string(),
                version: 1,
                schema_version: "1.0".to_string(),
            },
            spec: CertificateSpec {
                agent: AgentSpec {
                    id: "urn:aigos:agent:acme:billing-bot".to_string(),
                    version: "2.1.0".to_string(),
                    organization: "acme".to_string(),
                    golden_thread: GoldenThreadRef {
                        hash: format!("sha256:{}", "ab".repeat(32)),
                        algorithm: "sha256".to_string(),
                    },
                },
                certification: CertificationSpec {
                    level,
                    issuer: Issuer {
                        id: "ca:aigos:root".to_string(),
                        name: Some("AIGOS Root CA".to_string()),
                        requires_ca: level.requires_ca(),
                    },
                    issued_at: issued,
                    expires_at: issued + Duration::days(level.validity_days()),
                    renewal: RenewalPolicy { auto_renew: true, grace_period_days: 14 },
                },
                governance: attestations(),
                compliance: Some(ComplianceSpec { frameworks: vec!["SOC2".to_string()] }),
                security: None,
                operational: None,
            },
            signature: None,
        }
    }

    #[test]
    fn validity_invariant_holds_for_every_level() {
        for level in CgaLevel::all() {
            assert!(certificate(level).validity_invariant_holds());
        }
    }

    #[test]
    fn compact_projection_folds_attestations_to_booleans() {
        let compact = certificate(CgaLevel::Silver).to_compact();
        assert!(compact.gov.ks);
        assert!(compact.gov.pe);
        assert!(compact.gov.gt);
        // NotApplicable and NotVerified both project to false.
        assert!(!compact.gov.cb);
        assert!(!compact.gov.tm);
        assert_eq!(compact.kind, KIND_CERTIFICATE_COMPACT);
        assert_eq!(compact.compliance, vec!["SOC2".to_string()]);
        assert!(compact.sig.is_none());
    }
}
