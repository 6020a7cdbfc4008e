//! Policy inheritance resolution.
//!
//! Walks the `extends` chain root-first and merges node by node:
//! scalars child-wins, rule arrays concatenate then sort by descending
//! priority, tag/risk arrays union-dedup, `applies_to` is replaced only
//! when the child changed it from the catch-all default. Cycles and chains
//! deeper than the cap are errors.

use std::collections::HashMap;

use aigos_core::constants::MAX_INHERITANCE_DEPTH;
use aigos_core::policy::{GovernancePolicy, ResolvedPolicy};
use aigos_core::GovernanceError;

/// An in-memory, insertion-ordered policy store. Document order is part of
/// the selection contract, so the repository remembers it.
#[derive(Clone, Debug, Default)]
pub struct PolicyRepository {
    policies: HashMap<String, GovernancePolicy>,
    order: Vec<String>,
}

impl PolicyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a policy; replaces any previous one with the same id without
    /// changing its document position.
    pub fn insert(&mut self, policy: GovernancePolicy) {
        if !self.policies.contains_key(&policy.id) {
            self.order.push(policy.id.clone());
        }
        self.policies.insert(policy.id.clone(), policy);
    }

    pub fn get(&self, id: &str) -> Option<&GovernancePolicy> {
        self.policies.get(id)
    }

    /// Policies in document order.
    pub fn iter(&self) -> impl Iterator<Item = &GovernancePolicy> {
        self.order.iter().filter_map(|id| self.policies.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Resolve a policy through its inheritance chain.
///
/// The returned chain is root-first with the requested id last; every entry
/// is distinct. The merged policy keeps the originally-requested id.
pub fn resolve(id: &str, repo: &PolicyRepository) -> Result<ResolvedPolicy, GovernanceError> {
    // Leaf-to-root walk with cycle detection.
    let mut chain: Vec<&GovernancePolicy> = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    let mut cursor = Some(id.to_string());

    while let Some(current_id) = cursor {
        if seen.contains(&current_id) {
            let mut cycle = seen.clone();
            cycle.push(current_id);
            return Err(GovernanceError::CircularInheritance { chain: cycle });
        }
        if seen.len() >= MAX_INHERITANCE_DEPTH {
            return Err(GovernanceError::MaxDepthExceeded { max: MAX_INHERITANCE_DEPTH });
        }
        let policy = repo
            .get(&current_id)
            .ok_or_else(|| GovernanceError::PolicyNotFound(current_id.clone()))?;
        seen.push(current_id);
        chain.push(policy);
        cursor = policy.extends.clone();
    }

    // Merge root-first.
    chain.reverse();
    let mut merged = chain[0].clone();
    for child in &chain[1..] {
        merged = merge(merged, child);
    }
    merged.id = id.to_string();

    Ok(ResolvedPolicy {
        policy: merged,
        chain: chain.iter().map(|p| p.id.clone()).collect(),
    })
}

fn merge(parent: GovernancePolicy, child: &GovernancePolicy) -> GovernancePolicy {
    let mut rules = parent.rules;
    rules.extend(child.rules.iter().cloned());
    rules.sort_by(|a, b| b.priority.cmp(&a.priority));

    GovernancePolicy {
        id: child.id.clone(),
        name: child.name.clone().or(parent.name),
        extends: child.extends.clone(),
        applies_to: if child.has_explicit_applies_to() {
            child.applies_to.clone()
        } else {
            parent.applies_to
        },
        rules,
        tags: union(parent.tags, &child.tags),
        risk_levels: union(parent.risk_levels, &child.risk_levels),
        mode: child.mode.clone().or(parent.mode),
        environment: child.environment.clone().or(parent.environment),
        strict: child.strict.or(parent.strict),
    }
}

fn union<T: Clone + PartialEq>(mut base: Vec<T>, extra: &[T]) -> Vec<T> {
    for item in extra {
        if !base.contains(item) {
            base.push(item.clone());
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigos_core::policy::{PolicyRule, RuleEffect};
    use aigos_core::types::RiskLevel;

    fn policy(id: &str, extends: Option<&str>) -> GovernancePolicy {
        GovernancePolicy {
            id: id.to_string(),
            name: None,
            extends: extends.map(str::to_string),
            applies_to: GovernancePolicy::default_applies_to(),
            rules: vec![],
            tags: vec![],
            risk_levels: vec![],
            mode: None,
            environment: None,
            strict: None,
        }
    }

    fn rule(id: &str, priority: i32) -> PolicyRule {
        PolicyRule {
            id: id.to_string(),
            priority,
            action: "*".to_string(),
            effect: RuleEffect::Allow,
        }
    }

    #[test]
    fn chain_is_root_first_and_distinct() {
        let mut repo = PolicyRepository::new();
        repo.insert(policy("root", None));
        repo.insert(policy("mid", Some("root")));
        repo.insert(policy("leaf", Some("mid")));

        let resolved = resolve("leaf", &repo).unwrap();
        assert_eq!(resolved.chain, vec!["root", "mid", "leaf"]);
        assert_eq!(resolved.policy.id, "leaf");

        let unique: std::collections::HashSet<_> = resolved.chain.iter().collect();
        assert_eq!(unique.len(), resolved.chain.len());
    }

    #[test]
    fn cycle_is_detected() {
        let mut repo = PolicyRepository::new();
        let mut a = policy("A", Some("B"));
        a.tags = vec!["x".to_string()];
        repo.insert(a);
        repo.insert(policy("B", Some("A")));

        let err = resolve("A", &repo).unwrap_err();
        assert!(matches!(err, GovernanceError::CircularInheritance { .. }));
    }

    #[test]
    fn depth_past_cap_is_rejected() {
        let mut repo = PolicyRepository::new();
        repo.insert(policy("p0", None));
        for i in 1..=11 {
            repo.insert(policy(&format!("p{i}"), Some(&format!("p{}", i - 1))));
        }
        let err = resolve("p11", &repo).unwrap_err();
        assert!(matches!(err, GovernanceError::MaxDepthExceeded { max: 10 }));
    }

    #[test]
    fn missing_parent_is_policy_not_found() {
        let mut repo = PolicyRepository::new();
        repo.insert(policy("leaf", Some("ghost")));
        let err = resolve("leaf", &repo).unwrap_err();
        assert!(matches!(err, GovernanceError::PolicyNotFound(id) if id == "ghost"));
    }

    #[test]
    fn rules_concatenate_and_sort_by_descending_priority() {
        let mut repo = PolicyRepository::new();
        let mut root = policy("root", None);
        root.rules = vec![rule("low", 10), rule("high", 90)];
        repo.insert(root);
        let mut leaf = policy("leaf", Some("root"));
        leaf.rules = vec![rule("mid", 50)];
        repo.insert(leaf);

        let resolved = resolve("leaf", &repo).unwrap();
        let ids: Vec<&str> = resolved.policy.rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
    }

    #[test]
    fn scalars_child_wins_arrays_union() {
        let mut repo = PolicyRepository::new();
        let mut root = policy("root", None);
        root.mode = Some("enforcing".to_string());
        root.strict = Some(false);
        root.tags = vec!["base".to_string(), "shared".to_string()];
        root.risk_levels = vec![RiskLevel::Limited];
        repo.insert(root);

        let mut leaf = policy("leaf", Some("root"));
        leaf.strict = Some(true);
        leaf.tags = vec!["shared".to_string(), "leafy".to_string()];
        leaf.risk_levels = vec![RiskLevel::High];
        repo.insert(leaf);

        let merged = resolve("leaf", &repo).unwrap().policy;
        assert_eq!(merged.mode.as_deref(), Some("enforcing"));
        assert_eq!(merged.strict, Some(true));
        assert_eq!(merged.tags, vec!["base", "shared", "leafy"]);
        assert_eq!(merged.risk_levels, vec![RiskLevel::Limited, RiskLevel::High]);
    }

    #[test]
    fn applies_to_replaced_only_when_explicit() {
        let mut repo = PolicyRepository::new();
        let mut root = policy("root", None);
        root.applies_to = vec!["billing-*".to_string()];
        repo.insert(root);
        repo.insert(policy("default-leaf", Some("root")));
        let mut explicit = policy("explicit-leaf", Some("root"));
        explicit.applies_to = vec!["asset-007".to_string()];
        repo.insert(explicit);

        assert_eq!(
            resolve("default-leaf", &repo).unwrap().policy.applies_to,
            vec!["billing-*"]
        );
        assert_eq!(
            resolve("explicit-leaf", &repo).unwrap().policy.applies_to,
            vec!["asset-007"]
        );
    }
}
