//! The trust-policy evaluation pipeline.
//!
//! Decision order is fixed: CGA presence → trusted issuer → certificate
//! expiry → level threshold → compliance requirements → health floors.
//! The first failing gate ends the evaluation with a reason quoting the
//! responsible rule; warnings never change the verdict.

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

use aigos_core::policy::{ActionRule, TrustPolicy};
use aigos_core::token::TokenClaims;
use aigos_core::types::{CgaLevel, Timestamp};
use aigos_core::{ErrorKind, GovernanceError};
use aigos_crypto::is_canonical_hash;

use crate::pattern::ActionPattern;

/// One inbound action to be judged.
#[derive(Clone, Debug, Default)]
pub struct EvaluationRequest {
    /// Dot-separated action name, e.g. `"admin.users"`.
    pub action: String,
    pub source_organization: Option<String>,
}

/// The evaluator's verdict.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrustDecision {
    pub trusted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cga_level: Option<CgaLevel>,
    /// In `[0, 1]`; meaningful only alongside `trusted = true`.
    pub trust_score: f64,
    /// Machine-readable failure kind when `trusted = false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ErrorKind>,
}

impl TrustDecision {
    fn denied(failure: ErrorKind, reason: String, cga_level: Option<CgaLevel>) -> Self {
        Self { trusted: false, reason: Some(reason), warnings: Vec::new(), cga_level, trust_score: 0.0, failure: Some(failure) }
    }
}

/// Evaluates claims against one immutable trust policy. Patterns compile
/// once at construction; the evaluator itself is shareable and read-only.
pub struct TrustEvaluator {
    policy: Arc<TrustPolicy>,
    compiled: Vec<ActionPattern>,
}

impl TrustEvaluator {
    pub fn new(policy: TrustPolicy) -> Result<Self, GovernanceError> {
        let compiled = policy
            .actions
            .iter()
            .map(|rule| ActionPattern::compile(&rule.pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { policy: Arc::new(policy), compiled })
    }

    pub fn policy(&self) -> &TrustPolicy {
        &self.policy
    }

    /// First action rule matching `action`, in document order.
    fn matched_rule(&self, action: &str) -> Option<&ActionRule> {
        self.compiled
            .iter()
            .position(|pattern| pattern.matches(action))
            .map(|i| &self.policy.actions[i])
    }

    /// Judge one inbound action.
    pub fn evaluate(
        &self,
        claims: Option<&TokenClaims>,
        request: &EvaluationRequest,
        now: Timestamp,
    ) -> TrustDecision {
        let rule = self.matched_rule(&request.action);
        let decision = self.evaluate_inner(claims, request, rule, now);
        debug!(
            action = %request.action,
            trusted = decision.trusted,
            score = decision.trust_score,
            reason = decision.reason.as_deref().unwrap_or(""),
            "trust evaluation"
        );
        decision
    }

    fn evaluate_inner(
        &self,
        claims: Option<&TokenClaims>,
        request: &EvaluationRequest,
        rule: Option<&ActionRule>,
        now: Timestamp,
    ) -> TrustDecision {
        // ── 1. CGA-required gate ──────────────────────────────────────────────
        let require_cga = rule
            .and_then(|r| r.require_cga)
            .unwrap_or(self.policy.default.require_cga);
        let claims = match claims {
            Some(claims) => claims,
            None if require_cga => {
                return TrustDecision::denied(
                    ErrorKind::PolicyViolation,
                    "CGA attestation required but not present".to_string(),
                    None,
                );
            }
            None => {
                return TrustDecision {
                    trusted: true,
                    reason: None,
                    warnings: vec!["No CGA attestation present".to_string()],
                    cga_level: None,
                    trust_score: 0.5,
                    failure: None,
                };
            }
        };
        let level = claims.cga.level;

        // ── 2. Trusted issuer ─────────────────────────────────────────────────
        if !self.policy.trusted_cas.iter().any(|ca| ca.id == claims.cga.issuer) {
            return TrustDecision::denied(
                ErrorKind::UntrustedIssuer,
                format!("Untrusted CA: {}", claims.cga.issuer),
                Some(level),
            );
        }

        // ── 3. Certificate expiry ─────────────────────────────────────────────
        if claims.cga.expires_at <= now {
            return TrustDecision::denied(
                ErrorKind::CertificateExpired,
                format!("Certificate expired at {}", claims.cga.expires_at.to_rfc3339()),
                Some(level),
            );
        }

        // ── Golden-thread binding re-check ────────────────────────────────────
        if !is_canonical_hash(&claims.agent.golden_thread_hash) {
            return TrustDecision::denied(
                ErrorKind::PolicyViolation,
                "golden thread binding hash is malformed".to_string(),
                Some(level),
            );
        }

        // ── 4. Level threshold ────────────────────────────────────────────────
        let org_rule = request.source_organization.as_deref().and_then(|org| {
            self.policy.organizations.iter().find(|o| o.id == org)
        });
        if let Some(org) = org_rule {
            if !org.trusted {
                return TrustDecision::denied(
                    ErrorKind::PolicyViolation,
                    format!("Organization '{}' is not trusted", org.id),
                    Some(level),
                );
            }
        }
        let required = org_rule
            .and_then(|o| o.minimum_level)
            .or_else(|| rule.and_then(|r| r.minimum_level))
            .unwrap_or(self.policy.default.minimum_level);
        if level < required {
            return TrustDecision::denied(
                ErrorKind::InsufficientLevel,
                format!("CGA level {level} below required {required}"),
                Some(level),
            );
        }

        // ── 5. Compliance requirements ────────────────────────────────────────
        if let Some(required_compliance) = rule.and_then(|r| r.require_compliance.as_ref()) {
            let missing: Vec<String> = required_compliance
                .iter()
                .filter(|needed| {
                    !claims
                        .cga
                        .compliance_frameworks
                        .iter()
                        .any(|have| have.contains(needed.as_str()))
                })
                .cloned()
                .collect();
            if !missing.is_empty() {
                return TrustDecision::denied(
                    ErrorKind::MissingCompliance,
                    format!("Missing compliance: {}", missing.join(", ")),
                    Some(level),
                );
            }
        }

        // ── 6. Health floors ──────────────────────────────────────────────────
        let mut warnings = Vec::new();
        let health = claims.cga.operational_health.as_ref();
        if let (Some(floors), Some(health)) = (&self.policy.health, health) {
            if health.violations_30d > floors.max_violations_30d {
                return TrustDecision::denied(
                    ErrorKind::PolicyViolation,
                    format!(
                        "violations: {} in the last 30 days exceeds the allowed {}",
                        health.violations_30d, floors.max_violations_30d
                    ),
                    Some(level),
                );
            }
            if health.uptime_30d < floors.min_uptime_30d {
                warnings.push(format!(
                    "uptime {:.2}% below the {:.2}% floor",
                    health.uptime_30d, floors.min_uptime_30d
                ));
            }
            if let Some(last) = health.last_health_check {
                if now - last > Duration::hours(floors.max_health_check_age_hours) {
                    warnings.push(format!(
                        "last health check at {} is stale",
                        last.to_rfc3339()
                    ));
                }
            }
        }
        if let Some(ceiling) = rule.and_then(|r| r.max_violations_30d) {
            if let Some(health) = health {
                if health.violations_30d > ceiling {
                    return TrustDecision::denied(
                        ErrorKind::HealthCheckFailed,
                        format!(
                            "rule '{}' allows at most {} violations in 30 days, agent has {}",
                            rule.map(|r| r.pattern.as_str()).unwrap_or("?"),
                            ceiling,
                            health.violations_30d
                        ),
                        Some(level),
                    );
                }
            }
        }

        // ── Trust score ───────────────────────────────────────────────────────
        let mut score = level.level_score();
        if let Some(health) = health {
            if health.violations_30d > 0 {
                score -= 0.1;
            }
            if health.uptime_30d >= 99.9 {
                score += 0.05;
            }
        }
        let trust_score = score.clamp(0.0, 1.0);

        TrustDecision {
            trusted: true,
            reason: None,
            warnings,
            cga_level: Some(level),
            trust_score,
            failure: None,
        }
    }
}
