//! The spawn enforcer: validates spawn requests against the parent's
//! capability set and holds the organization's decay rules.
//!
//! Rules are swapped copy-on-write — readers clone an `Arc` snapshot under
//! a short lock and never observe a half-written rule set.

use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use aigos_core::constants::GLOBAL_MAX_SPAWN_DEPTH;
use aigos_core::policy::{
    CapabilitySet, DecayMode, DecayRules, SpawnRequest, SpawnValidation, SpawnViolation,
    SpawnViolationKind,
};
use aigos_core::GovernanceError;

use crate::decay::{apply_decay, tool_allowed};
use crate::domain::domain_covered;

#[derive(Clone, Copy, Debug)]
pub struct EnforcerConfig {
    pub global_max_depth: u32,
    /// When on, a failed validation also carries a policy-correct child
    /// set (the decay-mode derivation) the caller may spawn instead.
    pub auto_adjust: bool,
}

impl Default for EnforcerConfig {
    fn default() -> Self {
        Self { global_max_depth: GLOBAL_MAX_SPAWN_DEPTH, auto_adjust: false }
    }
}

pub struct SpawnEnforcer {
    config: EnforcerConfig,
    rules: Mutex<Arc<DecayRules>>,
}

impl SpawnEnforcer {
    pub fn new(config: EnforcerConfig) -> Self {
        Self { config, rules: Mutex::new(Arc::new(DecayRules::default())) }
    }

    /// Replace the decay rules with a fresh snapshot.
    pub fn set_decay_rules(&self, rules: DecayRules) {
        if let Ok(mut slot) = self.rules.lock() {
            *slot = Arc::new(rules);
        }
        info!("spawn decay rules replaced");
    }

    /// The current rules snapshot.
    pub fn rules(&self) -> Arc<DecayRules> {
        self.rules
            .lock()
            .map(|slot| Arc::clone(&slot))
            .unwrap_or_default()
    }

    /// Derive a child capability set under `mode`.
    pub fn apply_decay(
        &self,
        parent: &CapabilitySet,
        mode: DecayMode,
        explicit: Option<&SpawnRequest>,
    ) -> Result<CapabilitySet, GovernanceError> {
        apply_decay(parent, mode, explicit, &self.rules(), self.config.global_max_depth)
    }

    /// Validate a spawn request against the parent.
    ///
    /// Collects every violation rather than stopping at the first, so the
    /// caller sees the full shape of the escalation attempt.
    pub fn validate(&self, parent: &CapabilitySet, request: &SpawnRequest) -> SpawnValidation {
        let rules = self.rules();
        let mut violations = Vec::new();

        // ── Depth ─────────────────────────────────────────────────────────────
        let depth_cap = parent.max_child_depth.min(self.config.global_max_depth);
        let depth_blocked = !parent.may_spawn_children || parent.generation_depth >= depth_cap;
        if depth_blocked {
            violations.push(SpawnViolation {
                kind: SpawnViolationKind::DepthExceeded,
                detail: if parent.may_spawn_children {
                    format!(
                        "parent at depth {} may not spawn past the cap of {}",
                        parent.generation_depth, depth_cap
                    )
                } else {
                    "parent may not spawn children".to_string()
                },
            });
        }

        // ── Privilege escalation ──────────────────────────────────────────────
        for tool in &request.tools {
            if !tool_allowed(parent, tool, &rules) || rules.remove_from_children.contains(tool) {
                violations.push(SpawnViolation {
                    kind: SpawnViolationKind::PrivilegeEscalation,
                    detail: format!("tool '{tool}' is not grantable to children"),
                });
            }
        }
        for domain in &request.domains {
            if !domain_covered(domain, &parent.allowed_domains) {
                violations.push(SpawnViolation {
                    kind: SpawnViolationKind::PrivilegeEscalation,
                    detail: format!("domain '{domain}' is not covered by the parent's patterns"),
                });
            }
        }
        if let Some(risk) = request.risk_level {
            if risk > parent.risk_level {
                violations.push(SpawnViolation {
                    kind: SpawnViolationKind::PrivilegeEscalation,
                    detail: format!(
                        "requested risk level {risk} exceeds the parent's {}",
                        parent.risk_level
                    ),
                });
            }
        }

        // ── Budget escalation ─────────────────────────────────────────────────
        let mut check_budget = |name: &str, requested: Option<f64>, parent: Option<f64>| {
            if let (Some(r), Some(p)) = (requested, parent) {
                if r > p {
                    violations.push(SpawnViolation {
                        kind: SpawnViolationKind::BudgetEscalation,
                        detail: format!("{name} of {r} exceeds the parent's {p}"),
                    });
                }
            }
        };
        check_budget(
            "max_cost_per_session",
            request.budgets.max_cost_per_session,
            parent.budgets.max_cost_per_session,
        );
        check_budget(
            "max_cost_per_day",
            request.budgets.max_cost_per_day,
            parent.budgets.max_cost_per_day,
        );
        check_budget(
            "max_cost_per_month",
            request.budgets.max_cost_per_month,
            parent.budgets.max_cost_per_month,
        );
        if let (Some(r), Some(p)) =
            (request.budgets.max_tokens_per_call, parent.budgets.max_tokens_per_call)
        {
            if r > p {
                violations.push(SpawnViolation {
                    kind: SpawnViolationKind::BudgetEscalation,
                    detail: format!("max_tokens_per_call of {r} exceeds the parent's {p}"),
                });
            }
        }

        let valid = violations.is_empty();
        let adjusted = if !valid && self.config.auto_adjust && !depth_blocked {
            apply_decay(parent, DecayMode::Decay, None, &rules, self.config.global_max_depth).ok()
        } else {
            None
        };
        if !valid {
            warn!(
                violations = violations.len(),
                adjusted = adjusted.is_some(),
                "spawn request rejected"
            );
        }

        SpawnValidation { valid, violations, adjusted }
    }
}

impl Default for SpawnEnforcer {
    fn default() -> Self {
        Self::new(EnforcerConfig::default())
    }
}
