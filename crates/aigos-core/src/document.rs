//! Document envelope loading and validation.
//!
//! Certificates and trust policies travel as JSON or YAML with an
//! `apiVersion`/`kind` envelope. Validators are hand-written and return
//! every violation as a `{path, message}` pair so the error shape stays
//! uniform across document kinds.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::certificate::Certificate;
use crate::constants::{API_VERSION, KIND_CERTIFICATE, KIND_TRUST_POLICY};
use crate::error::GovernanceError;
use crate::policy::TrustPolicyDocument;

/// One schema violation found by a validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { path: path.into(), message: message.into() }
    }
}

/// Parse a document from JSON or YAML, detected by the leading character.
fn parse<T: DeserializeOwned>(text: &str) -> Result<T, GovernanceError> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') {
        serde_json::from_str(trimmed).map_err(|e| GovernanceError::BadFormat {
            field: "document".to_string(),
            reason: format!("invalid JSON: {e}"),
        })
    } else {
        serde_yaml::from_str(trimmed).map_err(|e| GovernanceError::BadFormat {
            field: "document".to_string(),
            reason: format!("invalid YAML: {e}"),
        })
    }
}

fn check_envelope(api_version: &str, kind: &str, expected_kind: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    if api_version != API_VERSION {
        violations.push(Violation::new(
            "apiVersion",
            format!("expected '{API_VERSION}', got '{api_version}'"),
        ));
    }
    if kind != expected_kind {
        violations.push(Violation::new("kind", format!("expected '{expected_kind}', got '{kind}'")));
    }
    violations
}

// ── Trust policy ─────────────────────────────────────────────────────────────

/// Load and validate a trust-policy document. The first violation is
/// surfaced as a `SchemaViolation`; use [`validate_trust_policy`] for the
/// full list.
pub fn load_trust_policy(text: &str) -> Result<TrustPolicyDocument, GovernanceError> {
    let doc: TrustPolicyDocument = parse(text)?;
    match validate_trust_policy(&doc).into_iter().next() {
        Some(v) => Err(GovernanceError::SchemaViolation { path: v.path, message: v.message }),
        None => Ok(doc),
    }
}

pub fn validate_trust_policy(doc: &TrustPolicyDocument) -> Vec<Violation> {
    let mut violations = check_envelope(&doc.api_version, &doc.kind, KIND_TRUST_POLICY);

    if doc.metadata.name.is_empty() {
        violations.push(Violation::new("metadata.name", "must not be empty"));
    }
    for (i, ca) in doc.spec.trusted_cas.iter().enumerate() {
        if ca.id.is_empty() {
            violations.push(Violation::new(format!("spec.trusted_cas[{i}].id"), "must not be empty"));
        }
    }
    for (i, rule) in doc.spec.actions.iter().enumerate() {
        if rule.pattern.is_empty() {
            violations.push(Violation::new(
                format!("spec.actions[{i}].pattern"),
                "must not be empty",
            ));
        }
    }
    for (i, org) in doc.spec.organizations.iter().enumerate() {
        if org.id.is_empty() {
            violations.push(Violation::new(
                format!("spec.organizations[{i}].id"),
                "must not be empty",
            ));
        }
    }
    if let Some(health) = &doc.spec.health {
        if !(0.0..=100.0).contains(&health.min_uptime_30d) {
            violations.push(Violation::new(
                "spec.health.min_uptime_30d",
                "must be a percentage in [0, 100]",
            ));
        }
        if health.max_health_check_age_hours <= 0 {
            violations.push(Violation::new(
                "spec.health.max_health_check_age_hours",
                "must be positive",
            ));
        }
    }
    violations
}

// ── Certificate ──────────────────────────────────────────────────────────────

/// Load and validate a full certificate document.
pub fn load_certificate(text: &str) -> Result<Certificate, GovernanceError> {
    let cert: Certificate = parse(text)?;
    match validate_certificate(&cert).into_iter().next() {
        Some(v) => Err(GovernanceError::SchemaViolation { path: v.path, message: v.message }),
        None => Ok(cert),
    }
}

pub fn validate_certificate(cert: &Certificate) -> Vec<Violation> {
    let mut violations = check_envelope(&cert.api_version, &cert.kind, KIND_CERTIFICATE);

    if cert.metadata.id.is_empty() {
        violations.push(Violation::new("metadata.id", "must not be empty"));
    }
    if cert.spec.agent.id.is_empty() {
        violations.push(Violation::new("spec.agent.id", "must not be empty"));
    }
    if !cert.spec.agent.golden_thread.hash.starts_with(crate::constants::HASH_PREFIX) {
        violations.push(Violation::new(
            "spec.agent.golden_thread.hash",
            "must be of the form sha256:<64 hex>",
        ));
    }
    if !cert.validity_invariant_holds() {
        violations.push(Violation::new(
            "spec.certification.expires_at",
            format!(
                "expires_at - issued_at must equal {} days for level {}",
                cert.level().validity_days(),
                cert.level()
            ),
        ));
    }
    if cert.level().requires_ca() && !cert.spec.certification.issuer.requires_ca {
        violations.push(Violation::new(
            "spec.certification.issuer.requires_ca",
            format!("level {} requires a CA-signed certificate", cert.level()),
        ));
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{PolicyMetadata, TrustPolicy};

    fn policy_doc() -> TrustPolicyDocument {
        TrustPolicyDocument {
            api_version: API_VERSION.to_string(),
            kind: KIND_TRUST_POLICY.to_string(),
            metadata: PolicyMetadata { name: "prod".to_string() },
            spec: TrustPolicy::permissive(),
        }
    }

    #[test]
    fn valid_policy_yields_no_violations() {
        assert!(validate_trust_policy(&policy_doc()).is_empty());
    }

    #[test]
    fn wrong_kind_is_reported_with_path() {
        let mut doc = policy_doc();
        doc.kind = "Certificate".to_string();
        let violations = validate_trust_policy(&doc);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "kind");
    }

    #[test]
    fn loads_yaml_and_json_faces() {
        let doc = policy_doc();
        let yaml = serde_yaml::to_string(&doc).unwrap();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(load_trust_policy(&yaml).is_ok());
        assert!(load_trust_policy(&json).is_ok());
    }

    #[test]
    fn certificate_validator_accepts_well_formed_documents() {
        use crate::certificate::tests::certificate;
        use crate::types::CgaLevel;

        let cert = certificate(CgaLevel::Silver);
        assert!(validate_certificate(&cert).is_empty());
        assert!(load_certificate(&serde_json::to_string(&cert).unwrap()).is_ok());

        let mut broken = certificate(CgaLevel::Silver);
        broken.spec.certification.issuer.requires_ca = false;
        let violations = validate_certificate(&broken);
        assert!(violations
            .iter()
            .any(|v| v.path == "spec.certification.issuer.requires_ca"));
    }

    #[test]
    fn bad_health_range_is_flagged() {
        let mut doc = policy_doc();
        doc.spec.health = Some(crate::policy::HealthPolicy {
            min_uptime_30d: 120.0,
            max_violations_30d: 3,
            max_health_check_age_hours: 24,
        });
        let violations = validate_trust_policy(&doc);
        assert!(violations.iter().any(|v| v.path == "spec.health.min_uptime_30d"));
    }
}
