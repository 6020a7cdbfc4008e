//! The verification run: execute every applicable check, synthesize
//! failures from check errors, and decide the achieved level.

use std::time::Instant;

use tracing::{info, warn};

use aigos_core::report::{CheckResult, ReportSummary, VerificationReport};
use aigos_core::types::{CgaLevel, CheckStatus, Timestamp};

use crate::checks::CheckRegistry;
use crate::context::VerificationContext;

/// Runs the check battery and produces verification reports.
pub struct Verifier {
    registry: CheckRegistry,
}

impl Verifier {
    pub fn new() -> Self {
        Self { registry: CheckRegistry::defaults() }
    }

    pub fn with_registry(registry: CheckRegistry) -> Self {
        Self { registry }
    }

    pub fn registry_mut(&mut self) -> &mut CheckRegistry {
        &mut self.registry
    }

    /// Run every check applicable to the context's target level.
    ///
    /// A check that returns an error is recorded as a `FAIL` carrying the
    /// error message; the run itself never aborts early, so the report
    /// always covers the full applicable battery.
    pub async fn verify(&self, ctx: &VerificationContext, now: Timestamp) -> VerificationReport {
        let target = ctx.target_level;
        let mut results: Vec<CheckResult> = Vec::new();

        for check in self.registry.applicable(target) {
            let started = Instant::now();
            let mut result = match check.run(ctx).await {
                Ok(result) => result,
                Err(err) => {
                    warn!(check = check.name(), error = %err, "check errored; recording as FAIL");
                    CheckResult::fail(check.name(), err.to_string())
                }
            };
            result.duration_ms = Some(started.elapsed().as_millis() as u64);
            results.push(result);
        }

        let achieved_level = self.achieved_level(target, &results);
        let summary = ReportSummary::tally(&results);
        info!(
            agent_id = %ctx.card.agent_id,
            target = %target,
            achieved = achieved_level.map(|l| l.as_str()).unwrap_or("none"),
            passed = summary.passed,
            failed = summary.failed,
            "verification run complete"
        );

        VerificationReport {
            agent_id: ctx.card.agent_id.clone(),
            timestamp: now,
            target_level: target,
            achieved_level,
            checks: results,
            summary,
        }
    }

    /// The highest level at or below `target` whose required checks contain
    /// no failure. A failing check blocks exactly the levels that require
    /// it, so a Gold-only failure still leaves Silver achievable; a failing
    /// all-level check collapses the result to `None`.
    fn achieved_level(&self, target: CgaLevel, results: &[CheckResult]) -> Option<CgaLevel> {
        let failed_minimums: Vec<CgaLevel> = results
            .iter()
            .filter(|r| r.status == CheckStatus::Fail)
            .filter_map(|r| self.registry.min_level_of(&r.name))
            .collect();

        CgaLevel::all()
            .into_iter()
            .filter(|level| *level <= target)
            .filter(|level| !failed_minimums.iter().any(|min| min <= level))
            .max()
    }
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}
