//! Scored policy selection with an LRU cache.
//!
//! Every policy whose `applies_to` matches the asset is a candidate; the
//! score is `100·explicit_match + 50·risk_match + 10·|tags∩| + max rule
//! priority`. Highest total wins, ties break by document order, and a
//! configured default steps in when nothing matches. Selections cache under
//! `(asset, risk, mode, sorted tags, env)` behind one coarse mutex — writes
//! happen only on cache misses.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::debug;

use aigos_core::constants::SELECTION_CACHE_CAPACITY;
use aigos_core::policy::{GovernancePolicy, SelectionCriteria};

use crate::resolve::PolicyRepository;

/// The winning policy for a set of criteria.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub policy_id: String,
    pub score: i64,
    /// True when no candidate matched and the configured default was used.
    pub defaulted: bool,
}

pub struct PolicySelector {
    cache: Mutex<LruCache<String, Selection>>,
}

impl PolicySelector {
    pub fn new() -> Self {
        Self::with_capacity(SELECTION_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self { cache: Mutex::new(LruCache::new(capacity)) }
    }

    /// Select the best-scoring applicable policy, consulting the cache
    /// first. `default` names the policy to fall back to when nothing
    /// applies.
    pub fn select(
        &self,
        criteria: &SelectionCriteria,
        repo: &PolicyRepository,
        default: Option<&str>,
    ) -> Option<Selection> {
        let key = cache_key(criteria);
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(hit) = cache.get(&key) {
                return Some(hit.clone());
            }
        }

        let selection = pick(criteria, repo, default)?;
        debug!(
            asset_id = %criteria.asset_id,
            policy_id = %selection.policy_id,
            score = selection.score,
            "policy selected"
        );
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, selection.clone());
        }
        Some(selection)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl Default for PolicySelector {
    fn default() -> Self {
        Self::new()
    }
}

fn pick(
    criteria: &SelectionCriteria,
    repo: &PolicyRepository,
    default: Option<&str>,
) -> Option<Selection> {
    let mut best: Option<(i64, &GovernancePolicy)> = None;
    for policy in repo.iter() {
        if !applies(policy, &criteria.asset_id) {
            continue;
        }
        let score = score(policy, criteria);
        // Strictly greater keeps earlier documents on ties.
        if best.map(|(s, _)| score > s).unwrap_or(true) {
            best = Some((score, policy));
        }
    }

    match best {
        Some((score, policy)) => {
            Some(Selection { policy_id: policy.id.clone(), score, defaulted: false })
        }
        None => default.map(|id| Selection {
            policy_id: id.to_string(),
            score: 0,
            defaulted: true,
        }),
    }
}

/// Asset selector match: exact id, the `*` wildcard, or a `prefix-*` star.
fn applies(policy: &GovernancePolicy, asset_id: &str) -> bool {
    policy.applies_to.iter().any(|selector| {
        selector == "*"
            || selector == asset_id
            || selector
                .strip_suffix('*')
                .map(|prefix| asset_id.starts_with(prefix))
                .unwrap_or(false)
    })
}

fn score(policy: &GovernancePolicy, criteria: &SelectionCriteria) -> i64 {
    let explicit = policy.applies_to.iter().any(|s| s == &criteria.asset_id);
    let risk = criteria
        .risk_level
        .map(|r| policy.risk_levels.contains(&r))
        .unwrap_or(false);
    let tag_overlap =
        policy.tags.iter().filter(|t| criteria.tags.contains(t)).count() as i64;
    let max_priority =
        policy.rules.iter().map(|r| r.priority as i64).max().unwrap_or(0);

    100 * i64::from(explicit) + 50 * i64::from(risk) + 10 * tag_overlap + max_priority
}

fn cache_key(criteria: &SelectionCriteria) -> String {
    let mut tags = criteria.tags.clone();
    tags.sort();
    format!(
        "{}|{}|{}|{}|{}",
        criteria.asset_id,
        criteria.risk_level.map(|r| r.as_str()).unwrap_or("-"),
        criteria.mode.as_deref().unwrap_or("-"),
        tags.join(","),
        criteria.environment.as_deref().unwrap_or("-"),
    )
}
