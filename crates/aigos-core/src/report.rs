//! Verification reports: the output of running the check battery against an
//! asset at a target level, and the input to certificate generation.

use serde::{Deserialize, Serialize};

use crate::types::{CgaLevel, CheckStatus, Timestamp};

/// Result of one named verification check.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckResult {
    /// Registry name, e.g. `"kill_switch.live_test"`.
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    /// Optional structured evidence attached by the check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(name, CheckStatus::Pass, message)
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(name, CheckStatus::Fail, message)
    }

    pub fn skip(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(name, CheckStatus::Skip, message)
    }

    pub fn warn(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(name, CheckStatus::Warn, message)
    }

    fn with_status(name: impl Into<String>, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
            evidence: None,
            duration_ms: None,
        }
    }

    pub fn with_evidence(mut self, evidence: serde_json::Value) -> Self {
        self.evidence = Some(evidence);
        self
    }
}

/// Tally of check outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub warnings: usize,
}

impl ReportSummary {
    pub fn tally(checks: &[CheckResult]) -> Self {
        let mut summary = ReportSummary { total: checks.len(), ..Default::default() };
        for check in checks {
            match check.status {
                CheckStatus::Pass => summary.passed += 1,
                CheckStatus::Fail => summary.failed += 1,
                CheckStatus::Skip => summary.skipped += 1,
                CheckStatus::Warn => summary.warnings += 1,
            }
        }
        summary
    }
}

/// The full output of a verification run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationReport {
    pub agent_id: String,
    pub timestamp: Timestamp,
    pub target_level: CgaLevel,
    /// Highest level with no failing required check; `None` when any
    /// required check failed.
    pub achieved_level: Option<CgaLevel>,
    pub checks: Vec<CheckResult>,
    pub summary: ReportSummary,
}

impl VerificationReport {
    /// Find a check result by registry name.
    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Whether the named check exists and passed.
    pub fn passed(&self, name: &str) -> bool {
        matches!(self.check(name), Some(c) if c.status == CheckStatus::Pass)
    }
}
