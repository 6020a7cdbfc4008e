//! Child capability derivation under the three decay modes.

use aigos_core::policy::{Budgets, CapabilitySet, DecayMode, DecayRules, SpawnRequest};
use aigos_core::GovernanceError;

use crate::domain::domain_covered;

/// Derive a child capability set from `parent` under `mode`.
///
/// Always advances `generation_depth` by one and fails with
/// `DepthExceeded` when the parent may not spawn at all. `explicit` is
/// consulted only in explicit mode.
pub fn apply_decay(
    parent: &CapabilitySet,
    mode: DecayMode,
    explicit: Option<&SpawnRequest>,
    rules: &DecayRules,
    global_max_depth: u32,
) -> Result<CapabilitySet, GovernanceError> {
    let depth_cap = parent.max_child_depth.min(global_max_depth);
    if !parent.may_spawn_children || parent.generation_depth >= depth_cap {
        return Err(GovernanceError::DepthExceeded {
            depth: parent.generation_depth + 1,
            max: depth_cap,
        });
    }
    let child_depth = parent.generation_depth + 1;
    let child_may_spawn = child_depth < depth_cap;

    let child = match mode {
        // Child equals parent; only the depth bookkeeping changes.
        DecayMode::Inherit => CapabilitySet {
            generation_depth: child_depth,
            may_spawn_children: parent.may_spawn_children && child_may_spawn,
            ..parent.clone()
        },

        // Intersection of the parent set and the explicit request;
        // unrequested tools and domains default to none, spawning defaults
        // to off.
        DecayMode::Explicit => {
            let request = explicit.cloned().unwrap_or_default();
            let allowed_tools: Vec<String> = request
                .tools
                .iter()
                .filter(|tool| tool_allowed(parent, tool, rules))
                .cloned()
                .collect();
            let allowed_domains: Vec<String> = request
                .domains
                .iter()
                .filter(|d| domain_covered(d, &parent.allowed_domains))
                .cloned()
                .collect();
            CapabilitySet {
                allowed_tools,
                allowed_domains,
                denied_domains: parent.denied_domains.clone(),
                budgets: intersect_budgets(&request.budgets, &parent.budgets),
                may_spawn_children: request.may_spawn_children.unwrap_or(false)
                    && child_may_spawn,
                risk_level: request
                    .risk_level
                    .unwrap_or(parent.risk_level)
                    .min(parent.risk_level),
                generation_depth: child_depth,
                max_child_depth: parent.max_child_depth,
            }
        }

        // The default: parent set minus the rule-stripped tools, budgets
        // shrunk by the per-field factors, denials inherited.
        DecayMode::Decay => CapabilitySet {
            allowed_tools: parent
                .allowed_tools
                .iter()
                .filter(|tool| {
                    !rules.remove_from_children.contains(tool)
                        && !rules.denied_child_tools.contains(tool)
                })
                .cloned()
                .collect(),
            allowed_domains: parent.allowed_domains.clone(),
            denied_domains: parent.denied_domains.clone(),
            budgets: decayed_budgets(&parent.budgets, rules),
            may_spawn_children: child_may_spawn,
            risk_level: parent.risk_level,
            generation_depth: child_depth,
            max_child_depth: parent.max_child_depth,
        },
    };

    Ok(child)
}

/// Whether the parent may grant `tool` to a child at all.
pub(crate) fn tool_allowed(parent: &CapabilitySet, tool: &str, rules: &DecayRules) -> bool {
    if rules.denied_child_tools.iter().any(|t| t == tool) {
        return false;
    }
    parent.allowed_tools.iter().any(|t| t == "*" || t == tool)
}

/// Per-field intersection: the tighter of request and parent; an
/// unrequested budget inherits the parent's cap so the child never widens.
fn intersect_budgets(request: &Budgets, parent: &Budgets) -> Budgets {
    fn tighter<T: PartialOrd + Copy>(requested: Option<T>, parent: Option<T>) -> Option<T> {
        match (requested, parent) {
            (Some(r), Some(p)) => Some(if r < p { r } else { p }),
            (Some(r), None) => Some(r),
            (None, p) => p,
        }
    }
    Budgets {
        max_cost_per_session: tighter(request.max_cost_per_session, parent.max_cost_per_session),
        max_cost_per_day: tighter(request.max_cost_per_day, parent.max_cost_per_day),
        max_cost_per_month: tighter(request.max_cost_per_month, parent.max_cost_per_month),
        max_tokens_per_call: tighter(request.max_tokens_per_call, parent.max_tokens_per_call),
    }
}

fn decayed_budgets(parent: &Budgets, rules: &DecayRules) -> Budgets {
    let d = &rules.budget_decay;
    Budgets {
        max_cost_per_session: parent.max_cost_per_session.map(|v| v * d.session),
        max_cost_per_day: parent.max_cost_per_day.map(|v| v * d.day),
        max_cost_per_month: parent.max_cost_per_month.map(|v| v * d.month),
        max_tokens_per_call: parent
            .max_tokens_per_call
            .map(|v| (v as f64 * d.tokens_per_call) as u64),
    }
}
