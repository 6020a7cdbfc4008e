//! Trust-policy documents, capability sets for spawn control, and the
//! layered governance-policy graph.
//!
//! All fields are governance-updatable data — policy changes never require
//! a code change. Documents are loaded once and treated as immutable;
//! hot-swaps replace the whole snapshot.

use serde::{Deserialize, Serialize};

use crate::constants::{DECAY_DAY, DECAY_MONTH, DECAY_SESSION, DECAY_TOKENS_PER_CALL};
use crate::types::{CgaLevel, RiskLevel};

// ── Trust policy ─────────────────────────────────────────────────────────────

/// An `A2ATrustPolicy` document envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrustPolicyDocument {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: PolicyMetadata,
    pub spec: TrustPolicy,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyMetadata {
    pub name: String,
}

/// The trust policy the evaluator runs against.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrustPolicy {
    pub default: DefaultRule,
    #[serde(default)]
    pub trusted_cas: Vec<TrustedCa>,
    /// Ordered: the first rule whose pattern matches the action wins.
    /// Authoring order is a contract visible to policy writers.
    #[serde(default)]
    pub actions: Vec<ActionRule>,
    #[serde(default)]
    pub organizations: Vec<OrganizationRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation: Option<RevocationPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthPolicy>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DefaultRule {
    pub require_cga: bool,
    pub minimum_level: CgaLevel,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrustedCa {
    pub id: String,
    pub trust_level: String,
}

/// A per-action override, matched by glob pattern (`*` and `?`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionRule {
    pub pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_cga: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_level: Option<CgaLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_compliance: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_violations_30d: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrganizationRule {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_level: Option<CgaLevel>,
    pub trusted: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RevocationPolicy {
    pub check_revocation: bool,
}

/// Operational-health floors. Breaching the violations ceiling fails the
/// evaluation; breaching the uptime floor or the staleness window only
/// warns.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthPolicy {
    pub min_uptime_30d: f64,
    pub max_violations_30d: u32,
    pub max_health_check_age_hours: i64,
}

impl TrustPolicy {
    /// Permissive single-org development posture: CGA required at Bronze,
    /// no CAs, no action or organization overrides.
    pub fn permissive() -> Self {
        Self {
            default: DefaultRule { require_cga: true, minimum_level: CgaLevel::Bronze },
            trusted_cas: Vec::new(),
            actions: Vec::new(),
            organizations: Vec::new(),
            revocation: None,
            health: None,
        }
    }
}

// ── Capability sets ──────────────────────────────────────────────────────────

/// The four optional spend/usage ceilings of a capability set.
/// A `None` budget means unbounded for that dimension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Budgets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cost_per_session: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cost_per_day: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cost_per_month: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens_per_call: Option<u64>,
}

/// Everything a live agent instance is allowed to do.
///
/// Subset invariants for a child `C` of parent `P`: tools ⊆ (with `*`
/// absorbing), every child domain covered by a parent pattern, parent
/// denials inherited, every budget ≤ parent's, risk not above parent's,
/// `C.generation_depth = P.generation_depth + 1` within the depth caps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySet {
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    #[serde(default)]
    pub denied_domains: Vec<String>,
    #[serde(default)]
    pub budgets: Budgets,
    pub may_spawn_children: bool,
    pub risk_level: RiskLevel,
    pub generation_depth: u32,
    pub max_child_depth: u32,
}

/// What a parent asks for when spawning a child agent.
/// Unspecified fields default to empty/none under explicit mode.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SpawnRequest {
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub budgets: Budgets,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub may_spawn_children: Option<bool>,
}

/// How a child capability set is derived from its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayMode {
    /// Parent set shrunk by the decay rules. The default.
    Decay,
    /// Intersection of the parent set and the explicit request.
    Explicit,
    /// Child equals parent (depth still advances). Use sparingly.
    Inherit,
}

/// Per-budget decay multipliers applied in decay mode.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetDecay {
    pub session: f64,
    pub day: f64,
    pub month: f64,
    pub tokens_per_call: f64,
}

impl Default for BudgetDecay {
    fn default() -> Self {
        Self {
            session: DECAY_SESSION,
            day: DECAY_DAY,
            month: DECAY_MONTH,
            tokens_per_call: DECAY_TOKENS_PER_CALL,
        }
    }
}

/// Organization-wide spawn-decay rules. Swapped copy-on-write; readers
/// always see a consistent snapshot.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DecayRules {
    /// Tools stripped from every child regardless of request.
    #[serde(default)]
    pub remove_from_children: Vec<String>,
    #[serde(default)]
    pub budget_decay: BudgetDecay,
    /// Tools no child may ever hold, even when the parent does.
    #[serde(default)]
    pub denied_child_tools: Vec<String>,
}

/// One spawn-policy violation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpawnViolation {
    pub kind: SpawnViolationKind,
    pub detail: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpawnViolationKind {
    DepthExceeded,
    PrivilegeEscalation,
    BudgetEscalation,
}

/// Outcome of validating a spawn request against a parent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpawnValidation {
    pub valid: bool,
    pub violations: Vec<SpawnViolation>,
    /// Populated when auto-adjust is on and violations were found: a
    /// policy-correct child capability set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjusted: Option<CapabilitySet>,
}

// ── Governance-policy graph ──────────────────────────────────────────────────

/// A node in the layered governance-policy graph.
///
/// `extends` names the parent policy; resolution walks the chain root-first
/// and merges per the documented rules. `applies_to` defaults to `["*"]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernancePolicy {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    /// Asset selectors: exact id, `*`, or prefix wildcard (`billing-*`).
    #[serde(default = "GovernancePolicy::default_applies_to")]
    pub applies_to: Vec<String>,
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Risk levels this policy is written for (selection condition).
    #[serde(default)]
    pub risk_levels: Vec<RiskLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

impl GovernancePolicy {
    pub fn default_applies_to() -> Vec<String> {
        vec!["*".to_string()]
    }

    /// Whether `applies_to` was changed from the catch-all default.
    pub fn has_explicit_applies_to(&self) -> bool {
        self.applies_to != Self::default_applies_to()
    }
}

/// One rule inside a governance policy. Rule arrays merge by concatenation
/// then sort by descending priority.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub id: String,
    pub priority: i32,
    pub action: String,
    pub effect: RuleEffect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleEffect {
    Allow,
    Deny,
}

/// Inputs to policy selection.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SelectionCriteria {
    pub asset_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

/// A resolved policy plus the root-first inheritance chain that produced it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolvedPolicy {
    pub policy: GovernancePolicy,
    /// Distinct policy ids, root first, requested id last.
    pub chain: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_decay_defaults_match_protocol() {
        let decay = BudgetDecay::default();
        assert_eq!(decay.session, 0.5);
        assert_eq!(decay.day, 0.5);
        assert_eq!(decay.month, 0.5);
        assert_eq!(decay.tokens_per_call, 0.75);
    }

    #[test]
    fn applies_to_defaults_to_catch_all() {
        let policy: GovernancePolicy =
            serde_json::from_str(r#"{"id": "base"}"#).unwrap();
        assert_eq!(policy.applies_to, vec!["*"]);
        assert!(!policy.has_explicit_applies_to());
    }

    #[test]
    fn trust_policy_document_round_trips_yaml() {
        let doc = TrustPolicyDocument {
            api_version: crate::constants::API_VERSION.to_string(),
            kind: crate::constants::KIND_TRUST_POLICY.to_string(),
            metadata: PolicyMetadata { name: "prod".to_string() },
            spec: TrustPolicy::permissive(),
        };
        let yaml = serde_yaml::to_string(&doc).unwrap();
        let back: TrustPolicyDocument = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.metadata.name, "prod");
        assert!(back.spec.default.require_cga);
    }
}
