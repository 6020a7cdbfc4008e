//! The check registry and the default governance check battery.
//!
//! A check names the levels that require it; it is applicable to a
//! requested level `L` when the lowest of those levels is at or below `L`.
//! Custom checks register alongside the defaults — the registry is a plain
//! per-instance record, never a global.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use aigos_core::report::CheckResult;
use aigos_core::types::CgaLevel;
use aigos_core::GovernanceError;
use aigos_crypto::constant_time_eq;

use crate::context::VerificationContext;

pub const ALL_LEVELS: &[CgaLevel] =
    &[CgaLevel::Bronze, CgaLevel::Silver, CgaLevel::Gold, CgaLevel::Platinum];
pub const SILVER_AND_UP: &[CgaLevel] = &[CgaLevel::Silver, CgaLevel::Gold, CgaLevel::Platinum];
pub const GOLD_AND_UP: &[CgaLevel] = &[CgaLevel::Gold, CgaLevel::Platinum];

/// One registered verification check.
#[async_trait]
pub trait Check: Send + Sync {
    /// Registry name, e.g. `"kill_switch.live_test"`.
    fn name(&self) -> &'static str;

    /// The levels whose required set includes this check.
    fn levels(&self) -> &'static [CgaLevel];

    /// Run against the context. A returned error is synthesized into a
    /// `FAIL` result by the engine.
    async fn run(&self, ctx: &VerificationContext) -> Result<CheckResult, GovernanceError>;
}

/// The lowest level requiring a check; applicability and achieved-level
/// computation both key off this.
pub fn min_level(check: &dyn Check) -> CgaLevel {
    check.levels().iter().copied().min().unwrap_or(CgaLevel::Bronze)
}

/// An ordered collection of checks.
pub struct CheckRegistry {
    checks: Vec<Arc<dyn Check>>,
}

impl CheckRegistry {
    pub fn empty() -> Self {
        Self { checks: Vec::new() }
    }

    /// The default battery.
    pub fn defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(AssetCardValid));
        registry.register(Arc::new(GoldenThreadHash));
        registry.register(Arc::new(KillSwitchDeclared));
        registry.register(Arc::new(KillSwitchLiveTest));
        registry.register(Arc::new(PolicyStrictMode));
        registry.register(Arc::new(ComplianceMapped));
        registry.register(Arc::new(CapabilityBoundsDeclared));
        registry.register(Arc::new(TelemetryConfigured));
        registry
    }

    pub fn register(&mut self, check: Arc<dyn Check>) {
        self.checks.push(check);
    }

    /// Checks applicable to a run targeting `level`.
    pub fn applicable(&self, level: CgaLevel) -> Vec<Arc<dyn Check>> {
        self.checks
            .iter()
            .filter(|c| min_level(c.as_ref()) <= level)
            .cloned()
            .collect()
    }

    /// Lowest requiring level for a registered check name.
    pub fn min_level_of(&self, name: &str) -> Option<CgaLevel> {
        self.checks
            .iter()
            .find(|c| c.name() == name)
            .map(|c| min_level(c.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl Default for CheckRegistry {
    fn default() -> Self {
        Self::defaults()
    }
}

// ── Default checks ───────────────────────────────────────────────────────────

/// The asset card passes the injected schema validator.
struct AssetCardValid;

#[async_trait]
impl Check for AssetCardValid {
    fn name(&self) -> &'static str {
        "identity.asset_card_valid"
    }

    fn levels(&self) -> &'static [CgaLevel] {
        ALL_LEVELS
    }

    async fn run(&self, ctx: &VerificationContext) -> Result<CheckResult, GovernanceError> {
        let violations = ctx.validate_card();
        if violations.is_empty() {
            Ok(CheckResult::pass(self.name(), "asset card is schema-valid"))
        } else {
            let summary = violations
                .iter()
                .map(|v| format!("{}: {}", v.path, v.message))
                .collect::<Vec<_>>()
                .join("; ");
            Ok(CheckResult::fail(self.name(), format!("asset card invalid: {summary}"))
                .with_evidence(json!({ "violations": violations })))
        }
    }
}

/// The declared Golden-Thread hash matches the recomputed one.
struct GoldenThreadHash;

#[async_trait]
impl Check for GoldenThreadHash {
    fn name(&self) -> &'static str {
        "identity.golden_thread_hash"
    }

    fn levels(&self) -> &'static [CgaLevel] {
        ALL_LEVELS
    }

    async fn run(&self, ctx: &VerificationContext) -> Result<CheckResult, GovernanceError> {
        let computed = match ctx.compute_golden_thread_hash() {
            Some(result) => result?,
            None => {
                return Ok(CheckResult::fail(
                    self.name(),
                    "asset card carries no golden thread or ticket approvals",
                ))
            }
        };
        match ctx.declared_golden_thread_hash() {
            Some(declared) if constant_time_eq(declared, &computed) => {
                Ok(CheckResult::pass(self.name(), "golden thread hash verified")
                    .with_evidence(json!({ "hash": computed })))
            }
            Some(declared) => Ok(CheckResult::fail(
                self.name(),
                format!("declared hash {declared} does not match recomputed {computed}"),
            )),
            None => Ok(CheckResult::fail(
                self.name(),
                "golden thread present but carries no hash binding",
            )),
        }
    }
}

/// An emergency-stop endpoint is declared on the card.
struct KillSwitchDeclared;

#[async_trait]
impl Check for KillSwitchDeclared {
    fn name(&self) -> &'static str {
        "kill_switch.endpoint_declared"
    }

    fn levels(&self) -> &'static [CgaLevel] {
        ALL_LEVELS
    }

    async fn run(&self, ctx: &VerificationContext) -> Result<CheckResult, GovernanceError> {
        match &ctx.card.kill_switch {
            Some(decl) if !decl.endpoint.is_empty() && !decl.channels.is_empty() => {
                Ok(CheckResult::pass(
                    self.name(),
                    format!("{} channel(s) declared", decl.channels.len()),
                ))
            }
            Some(_) => Ok(CheckResult::fail(
                self.name(),
                "kill switch declared without endpoint or channels",
            )),
            None => Ok(CheckResult::fail(self.name(), "no kill switch declared")),
        }
    }
}

/// The declared kill switch answers a live signed test.
struct KillSwitchLiveTest;

#[async_trait]
impl Check for KillSwitchLiveTest {
    fn name(&self) -> &'static str {
        "kill_switch.live_test"
    }

    fn levels(&self) -> &'static [CgaLevel] {
        SILVER_AND_UP
    }

    async fn run(&self, ctx: &VerificationContext) -> Result<CheckResult, GovernanceError> {
        if !ctx.kill_switch_testable() {
            return Ok(CheckResult::fail(
                self.name(),
                "no live kill-switch channels wired for testing",
            ));
        }
        let report = ctx.send_kill_switch_test().await?;
        if report.success {
            let best = report
                .outcomes
                .iter()
                .filter_map(|o| o.latency_ms)
                .min()
                .unwrap_or_default();
            Ok(CheckResult::pass(self.name(), format!("acknowledged in {best} ms"))
                .with_evidence(json!({ "outcomes": report.outcomes })))
        } else {
            Ok(CheckResult::fail(self.name(), "no channel acknowledged the test command")
                .with_evidence(json!({ "outcomes": report.outcomes })))
        }
    }
}

/// The policy engine enforces strict mode.
struct PolicyStrictMode;

#[async_trait]
impl Check for PolicyStrictMode {
    fn name(&self) -> &'static str {
        "policy_engine.strict_mode"
    }

    fn levels(&self) -> &'static [CgaLevel] {
        SILVER_AND_UP
    }

    async fn run(&self, ctx: &VerificationContext) -> Result<CheckResult, GovernanceError> {
        if ctx.run_policy_check().await? {
            Ok(CheckResult::pass(self.name(), "policy engine enforces strict mode"))
        } else {
            Ok(CheckResult::fail(self.name(), "policy engine is not in strict mode"))
        }
    }
}

/// At least one compliance framework is mapped.
struct ComplianceMapped;

#[async_trait]
impl Check for ComplianceMapped {
    fn name(&self) -> &'static str {
        "compliance.framework_mapped"
    }

    fn levels(&self) -> &'static [CgaLevel] {
        GOLD_AND_UP
    }

    async fn run(&self, ctx: &VerificationContext) -> Result<CheckResult, GovernanceError> {
        if ctx.card.compliance_frameworks.is_empty() {
            Ok(CheckResult::fail(self.name(), "no compliance frameworks mapped"))
        } else {
            Ok(CheckResult::pass(
                self.name(),
                format!("mapped: {}", ctx.card.compliance_frameworks.join(", ")),
            )
            .with_evidence(json!({ "frameworks": ctx.card.compliance_frameworks })))
        }
    }
}

/// Capability bounds are declared for the agent.
struct CapabilityBoundsDeclared;

#[async_trait]
impl Check for CapabilityBoundsDeclared {
    fn name(&self) -> &'static str {
        "capability.bounds_declared"
    }

    fn levels(&self) -> &'static [CgaLevel] {
        GOLD_AND_UP
    }

    async fn run(&self, ctx: &VerificationContext) -> Result<CheckResult, GovernanceError> {
        match &ctx.card.capability_bounds {
            Some(bounds) => Ok(CheckResult::pass(
                self.name(),
                format!(
                    "{} tool(s), {} domain pattern(s) bounded",
                    bounds.allowed_tools.len(),
                    bounds.allowed_domains.len()
                ),
            )),
            None => Ok(CheckResult::fail(self.name(), "no capability bounds declared")),
        }
    }
}

/// Telemetry export is configured.
struct TelemetryConfigured;

#[async_trait]
impl Check for TelemetryConfigured {
    fn name(&self) -> &'static str {
        "telemetry.configured"
    }

    fn levels(&self) -> &'static [CgaLevel] {
        SILVER_AND_UP
    }

    async fn run(&self, ctx: &VerificationContext) -> Result<CheckResult, GovernanceError> {
        match &ctx.card.telemetry {
            Some(decl) if !decl.endpoint.is_empty() => {
                Ok(CheckResult::pass(self.name(), "telemetry endpoint configured"))
            }
            _ => Ok(CheckResult::fail(self.name(), "telemetry is not configured")),
        }
    }
}
