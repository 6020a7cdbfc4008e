//! Certificate generation.
//!
//! A certificate is born from a verification report that achieved a level.
//! Bronze is self-signed by the agent's organization; Silver and above take
//! their issuer from a CA resolver. Both the full document and the compact
//! projection are signed over their deterministic serialization with the
//! `signature` field absent.

use std::sync::Arc;

use chrono::{Duration, Timelike};
use tracing::info;

use aigos_core::certificate::{
    AgentSpec, Attestation, Certificate, CertificateMetadata, CertificateSpec, CertificationSpec,
    CompactCertificate, CompactSignature, ComplianceSpec, DocumentSignature, GoldenThreadRef,
    GovernanceAttestations, Issuer, RenewalPolicy,
};
use aigos_core::constants::{
    API_VERSION, CERTIFICATE_SCHEMA_VERSION, KIND_CERTIFICATE, SIGNING_ALGORITHM,
};
use aigos_core::report::VerificationReport;
use aigos_core::types::{CgaLevel, CheckStatus, Timestamp};
use aigos_core::GovernanceError;
use aigos_crypto::{canonical_json, Es256KeyPair};

// ── CA resolution ────────────────────────────────────────────────────────────

/// Identity of a certificate authority.
#[derive(Clone, Debug)]
pub struct CaIdentity {
    pub id: String,
    pub name: String,
}

/// Resolves the issuing CA for levels that require one.
pub trait CaResolver: Send + Sync {
    fn resolve(&self, level: CgaLevel) -> Option<CaIdentity>;
}

/// Single-CA resolver: every CA-signed level gets the same issuer.
pub struct StaticCaResolver {
    identity: CaIdentity,
}

impl StaticCaResolver {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { identity: CaIdentity { id: id.into(), name: name.into() } }
    }
}

impl CaResolver for StaticCaResolver {
    fn resolve(&self, _level: CgaLevel) -> Option<CaIdentity> {
        Some(self.identity.clone())
    }
}

// ── Generator ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// Organization used as the self-signing issuer for Bronze.
    pub organization: String,
    pub auto_renew: bool,
    pub grace_period_days: u32,
}

impl GeneratorConfig {
    pub fn for_organization(organization: impl Into<String>) -> Self {
        Self { organization: organization.into(), auto_renew: true, grace_period_days: 14 }
    }
}

pub struct CertificateGenerator {
    config: GeneratorConfig,
    signer: Option<Arc<Es256KeyPair>>,
    ca_resolver: Option<Arc<dyn CaResolver>>,
}

impl CertificateGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config, signer: None, ca_resolver: None }
    }

    pub fn with_signer(mut self, signer: Arc<Es256KeyPair>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn with_ca_resolver(mut self, resolver: Arc<dyn CaResolver>) -> Self {
        self.ca_resolver = Some(resolver);
        self
    }

    /// Generate a signed certificate from a verification report.
    ///
    /// Fails with `NotCertifiable` when the report achieved no level, with
    /// `CAUnavailable` for a CA-signed level without a resolver, with
    /// `SignerUnavailable` without a signer, and with `ClockSkew` when the
    /// computed expiry is not in the future.
    pub fn generate(
        &self,
        report: &VerificationReport,
        agent_id: &str,
        agent_version: &str,
        golden_thread_hash: &str,
        now: Timestamp,
    ) -> Result<Certificate, GovernanceError> {
        let level = report.achieved_level.ok_or_else(|| GovernanceError::NotCertifiable {
            agent_id: agent_id.to_string(),
        })?;

        // Wire timestamps carry whole seconds only.
        let issued_at = now.with_nanosecond(0).unwrap_or(now);
        let expires_at = issued_at + Duration::days(level.validity_days());
        if expires_at <= now {
            return Err(GovernanceError::ClockSkew {
                expires_at: expires_at.to_rfc3339(),
                now: now.to_rfc3339(),
            });
        }

        let issuer = self.resolve_issuer(level)?;
        let id = certificate_id(agent_id, level, issued_at);

        let mut certificate = Certificate {
            api_version: API_VERSION.to_string(),
            kind: KIND_CERTIFICATE.to_string(),
            metadata: CertificateMetadata {
                id: id.clone(),
                version: 1,
                schema_version: CERTIFICATE_SCHEMA_VERSION.to_string(),
            },
            spec: CertificateSpec {
                agent: AgentSpec {
                    id: agent_id.to_string(),
                    version: agent_version.to_string(),
                    organization: self.config.organization.clone(),
                    golden_thread: GoldenThreadRef {
                        hash: golden_thread_hash.to_string(),
                        algorithm: "sha256".to_string(),
                    },
                },
                certification: CertificationSpec {
                    level,
                    issuer,
                    issued_at,
                    expires_at,
                    renewal: RenewalPolicy {
                        auto_renew: self.config.auto_renew,
                        grace_period_days: self.config.grace_period_days,
                    },
                },
                governance: translate_attestations(report, level, issued_at),
                compliance: compliance_from_report(report),
                security: None,
                operational: None,
            },
            signature: None,
        };

        certificate.signature = Some(self.sign_document(&certificate)?);
        info!(certificate_id = %id, level = %level, "certificate issued");
        Ok(certificate)
    }

    /// Project and sign the compact embedding form.
    pub fn generate_compact(
        &self,
        certificate: &Certificate,
    ) -> Result<CompactCertificate, GovernanceError> {
        let mut compact = certificate.to_compact();
        let signer = self.signer.as_ref().ok_or(GovernanceError::SignerUnavailable)?;
        let payload = canonical_json(&compact)?;
        compact.sig = Some(CompactSignature {
            alg: SIGNING_ALGORITHM.to_string(),
            kid: signer.key_id.clone(),
            sig: signer.sign_b64(payload.as_bytes()),
        });
        Ok(compact)
    }

    fn resolve_issuer(&self, level: CgaLevel) -> Result<Issuer, GovernanceError> {
        if !level.requires_ca() {
            return Ok(Issuer {
                id: format!("self:{}", self.config.organization),
                name: None,
                requires_ca: false,
            });
        }
        let resolver = self
            .ca_resolver
            .as_ref()
            .ok_or(GovernanceError::CaUnavailable { level })?;
        let ca = resolver
            .resolve(level)
            .ok_or(GovernanceError::CaUnavailable { level })?;
        Ok(Issuer { id: ca.id, name: Some(ca.name), requires_ca: true })
    }

    fn sign_document(&self, certificate: &Certificate) -> Result<DocumentSignature, GovernanceError> {
        let signer = self.signer.as_ref().ok_or(GovernanceError::SignerUnavailable)?;
        let payload = canonical_json(certificate)?;
        Ok(DocumentSignature {
            algorithm: SIGNING_ALGORITHM.to_string(),
            key_id: signer.key_id.clone(),
            value: signer.sign_b64(payload.as_bytes()),
        })
    }
}

/// `cga-YYYYMMDD-<agent_tail>-<level_lower>`, where the tail is the token
/// after the last `:` of the agent URN.
fn certificate_id(agent_id: &str, level: CgaLevel, issued_at: Timestamp) -> String {
    let tail = agent_id.rsplit(':').next().unwrap_or(agent_id);
    format!("cga-{}-{}-{}", issued_at.format("%Y%m%d"), tail, level.as_lower())
}

/// Map check results onto the five governance attestations.
///
/// A passing source check becomes `VERIFIED` stamped now. A failing or
/// missing check becomes `NOT_VERIFIED` when the achieved level requires
/// that check, `NOT_APPLICABLE` otherwise.
fn translate_attestations(
    report: &VerificationReport,
    achieved: CgaLevel,
    now: Timestamp,
) -> GovernanceAttestations {
    let translate = |names: &[&str], required_from: CgaLevel| -> Attestation {
        let hit = names.iter().find_map(|name| report.check(name));
        match hit {
            Some(check) if check.status == CheckStatus::Pass => Attestation::verified(now),
            _ if achieved >= required_from => Attestation::not_verified(),
            _ => Attestation::not_applicable(),
        }
    };

    GovernanceAttestations {
        // The live test is authoritative where it ran; Bronze proves only
        // the declaration.
        kill_switch: translate(
            &["kill_switch.live_test", "kill_switch.endpoint_declared"],
            CgaLevel::Bronze,
        ),
        policy_engine: translate(&["policy_engine.strict_mode"], CgaLevel::Silver),
        golden_thread: translate(&["identity.golden_thread_hash"], CgaLevel::Bronze),
        capability_bounds: translate(&["capability.bounds_declared"], CgaLevel::Gold),
        telemetry: translate(&["telemetry.configured"], CgaLevel::Silver),
    }
}

/// Lift the mapped frameworks out of the compliance check's evidence.
fn compliance_from_report(report: &VerificationReport) -> Option<ComplianceSpec> {
    let check = report.check("compliance.framework_mapped")?;
    if check.status != CheckStatus::Pass {
        return None;
    }
    let frameworks = check
        .evidence
        .as_ref()?
        .get("frameworks")?
        .as_array()?
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect::<Vec<_>>();
    Some(ComplianceSpec { frameworks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use aigos_core::report::{CheckResult, ReportSummary};
    use aigos_core::types::AttestationStatus;

    const AGENT: &str = "urn:aigos:agent:acme:billing-bot";
    const THREAD_HASH: &str =
        "sha256:bb085280036c278a6478b90f67d09cfcb6bcc7484d13229d7eba509bdb4685f7";

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap()
    }

    fn report(achieved: Option<CgaLevel>, checks: Vec<CheckResult>) -> VerificationReport {
        let summary = ReportSummary::tally(&checks);
        VerificationReport {
            agent_id: AGENT.to_string(),
            timestamp: now(),
            target_level: achieved.unwrap_or(CgaLevel::Bronze),
            achieved_level: achieved,
            checks,
            summary,
        }
    }

    fn bronze_checks() -> Vec<CheckResult> {
        vec![
            CheckResult::pass("identity.asset_card_valid", "ok"),
            CheckResult::pass("identity.golden_thread_hash", "ok"),
            CheckResult::pass("kill_switch.endpoint_declared", "ok"),
        ]
    }

    fn gold_checks() -> Vec<CheckResult> {
        let mut checks = bronze_checks();
        checks.push(CheckResult::pass("kill_switch.live_test", "ok"));
        checks.push(CheckResult::pass("policy_engine.strict_mode", "ok"));
        checks.push(
            CheckResult::pass("compliance.framework_mapped", "ok")
                .with_evidence(json!({ "frameworks": ["SOC2", "ISO-42001"] })),
        );
        checks.push(CheckResult::pass("capability.bounds_declared", "ok"));
        checks.push(CheckResult::pass("telemetry.configured", "ok"));
        checks
    }

    fn generator() -> CertificateGenerator {
        CertificateGenerator::new(GeneratorConfig::for_organization("acme"))
            .with_signer(Arc::new(Es256KeyPair::generate("ca-key-1")))
    }

    fn ca_generator() -> CertificateGenerator {
        generator().with_ca_resolver(Arc::new(StaticCaResolver::new(
            "ca:aigos:root",
            "AIGOS Root CA",
        )))
    }

    #[test]
    fn bronze_is_self_signed_with_level_validity() {
        let cert = generator()
            .generate(&report(Some(CgaLevel::Bronze), bronze_checks()), AGENT, "1.0.0", THREAD_HASH, now())
            .unwrap();

        assert_eq!(cert.metadata.id, "cga-20250115-billing-bot-bronze");
        assert_eq!(cert.spec.certification.issuer.id, "self:acme");
        assert!(!cert.spec.certification.issuer.requires_ca);
        assert!(cert.validity_invariant_holds());
        assert_eq!(
            cert.spec.certification.expires_at - cert.spec.certification.issued_at,
            Duration::days(30)
        );
    }

    #[test]
    fn silver_without_resolver_is_ca_unavailable() {
        let err = generator()
            .generate(&report(Some(CgaLevel::Silver), gold_checks()), AGENT, "1.0.0", THREAD_HASH, now())
            .unwrap_err();
        assert!(matches!(err, GovernanceError::CaUnavailable { level: CgaLevel::Silver }));
    }

    #[test]
    fn gold_takes_issuer_from_resolver() {
        let cert = ca_generator()
            .generate(&report(Some(CgaLevel::Gold), gold_checks()), AGENT, "1.0.0", THREAD_HASH, now())
            .unwrap();

        let issuer = &cert.spec.certification.issuer;
        assert_eq!(issuer.id, "ca:aigos:root");
        assert_eq!(issuer.name.as_deref(), Some("AIGOS Root CA"));
        assert!(issuer.requires_ca);
        assert!(cert.validity_invariant_holds());
        assert_eq!(
            cert.spec.compliance.as_ref().unwrap().frameworks,
            vec!["SOC2".to_string(), "ISO-42001".to_string()]
        );
    }

    #[test]
    fn unachieved_report_is_not_certifiable() {
        let err = generator()
            .generate(&report(None, vec![]), AGENT, "1.0.0", THREAD_HASH, now())
            .unwrap_err();
        assert!(matches!(err, GovernanceError::NotCertifiable { .. }));
    }

    #[test]
    fn missing_signer_is_unavailable() {
        let unsigned = CertificateGenerator::new(GeneratorConfig::for_organization("acme"));
        let err = unsigned
            .generate(&report(Some(CgaLevel::Bronze), bronze_checks()), AGENT, "1.0.0", THREAD_HASH, now())
            .unwrap_err();
        assert!(matches!(err, GovernanceError::SignerUnavailable));
    }

    #[test]
    fn bronze_attestations_mark_higher_surfaces_not_applicable() {
        let cert = generator()
            .generate(&report(Some(CgaLevel::Bronze), bronze_checks()), AGENT, "1.0.0", THREAD_HASH, now())
            .unwrap();

        let gov = &cert.spec.governance;
        assert_eq!(gov.kill_switch.status, AttestationStatus::Verified);
        assert_eq!(gov.golden_thread.status, AttestationStatus::Verified);
        assert_eq!(gov.policy_engine.status, AttestationStatus::NotApplicable);
        assert_eq!(gov.capability_bounds.status, AttestationStatus::NotApplicable);
        assert_eq!(gov.telemetry.status, AttestationStatus::NotApplicable);
    }

    #[test]
    fn failed_required_check_translates_to_not_verified() {
        let mut checks = gold_checks();
        checks.retain(|c| c.name != "telemetry.configured");
        checks.push(CheckResult::fail("telemetry.configured", "not configured"));
        let cert = ca_generator()
            .generate(&report(Some(CgaLevel::Silver), checks), AGENT, "1.0.0", THREAD_HASH, now())
            .unwrap();

        assert_eq!(cert.spec.governance.telemetry.status, AttestationStatus::NotVerified);
    }

    #[test]
    fn document_signature_verifies_over_unsigned_serialization() {
        let signer = Arc::new(Es256KeyPair::generate("ca-key-1"));
        let generator = CertificateGenerator::new(GeneratorConfig::for_organization("acme"))
            .with_signer(Arc::clone(&signer));
        let cert = generator
            .generate(&report(Some(CgaLevel::Bronze), bronze_checks()), AGENT, "1.0.0", THREAD_HASH, now())
            .unwrap();

        let signature = cert.signature.clone().unwrap();
        assert_eq!(signature.algorithm, "ES256");
        assert_eq!(signature.key_id, "ca-key-1");

        let mut unsigned = cert.clone();
        unsigned.signature = None;
        let payload = canonical_json(&unsigned).unwrap();
        assert!(signer.verifier().verify_b64(payload.as_bytes(), &signature.value).is_ok());
    }

    #[test]
    fn compact_projection_is_signed_separately() {
        let signer = Arc::new(Es256KeyPair::generate("ca-key-1"));
        let generator = CertificateGenerator::new(GeneratorConfig::for_organization("acme"))
            .with_signer(Arc::clone(&signer))
            .with_ca_resolver(Arc::new(StaticCaResolver::new("ca:aigos:root", "AIGOS Root CA")));
        let cert = generator
            .generate(&report(Some(CgaLevel::Gold), gold_checks()), AGENT, "1.0.0", THREAD_HASH, now())
            .unwrap();
        let compact = generator.generate_compact(&cert).unwrap();

        assert_eq!(compact.id, cert.metadata.id);
        assert_eq!(compact.level, CgaLevel::Gold);
        assert!(compact.gov.ks && compact.gov.pe && compact.gov.gt && compact.gov.cb && compact.gov.tm);

        let sig = compact.sig.clone().unwrap();
        let mut unsigned = compact.clone();
        unsigned.sig = None;
        let payload = canonical_json(&unsigned).unwrap();
        assert!(signer.verifier().verify_b64(payload.as_bytes(), &sig.sig).is_ok());
    }
}
