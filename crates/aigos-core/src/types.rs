use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GovernanceError;

/// UTC timestamp used throughout the protocol. All wire forms are RFC-3339
/// with a trailing `Z` and no sub-second fraction.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

// ── CgaLevel ─────────────────────────────────────────────────────────────────

/// Certified-Governed-Agent attestation tier.
///
/// Ordered: `Bronze < Silver < Gold < Platinum`. The discriminant reflects
/// the position in the hierarchy and is what level comparisons use.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CgaLevel {
    Bronze = 0,
    Silver = 1,
    Gold = 2,
    Platinum = 3,
}

impl CgaLevel {
    /// Certificate validity in days for this level.
    pub fn validity_days(self) -> i64 {
        match self {
            CgaLevel::Bronze => 30,
            CgaLevel::Silver => 90,
            CgaLevel::Gold => 180,
            CgaLevel::Platinum => 365,
        }
    }

    /// Whether certificates at this level must be signed by a CA
    /// (Bronze is self-signed).
    pub fn requires_ca(self) -> bool {
        !matches!(self, CgaLevel::Bronze)
    }

    /// Whether issuance at this level requires a manual review step.
    pub fn requires_manual_review(self) -> bool {
        matches!(self, CgaLevel::Platinum)
    }

    /// Base trust-score contribution of this level.
    pub fn level_score(self) -> f64 {
        match self {
            CgaLevel::Bronze => 0.25,
            CgaLevel::Silver => 0.5,
            CgaLevel::Gold => 0.75,
            CgaLevel::Platinum => 1.0,
        }
    }

    /// Wire name, e.g. `"GOLD"`.
    pub fn as_str(self) -> &'static str {
        match self {
            CgaLevel::Bronze => "BRONZE",
            CgaLevel::Silver => "SILVER",
            CgaLevel::Gold => "GOLD",
            CgaLevel::Platinum => "PLATINUM",
        }
    }

    /// Lowercase form used in synthesized identifiers, e.g. `cga-…-gold`.
    pub fn as_lower(self) -> &'static str {
        match self {
            CgaLevel::Bronze => "bronze",
            CgaLevel::Silver => "silver",
            CgaLevel::Gold => "gold",
            CgaLevel::Platinum => "platinum",
        }
    }

    pub fn all() -> [CgaLevel; 4] {
        [CgaLevel::Bronze, CgaLevel::Silver, CgaLevel::Gold, CgaLevel::Platinum]
    }
}

impl fmt::Display for CgaLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CgaLevel {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BRONZE" => Ok(CgaLevel::Bronze),
            "SILVER" => Ok(CgaLevel::Silver),
            "GOLD" => Ok(CgaLevel::Gold),
            "PLATINUM" => Ok(CgaLevel::Platinum),
            other => Err(GovernanceError::BadFormat {
                field: "level".to_string(),
                reason: format!("unknown CGA level '{other}'"),
            }),
        }
    }
}

// ── RiskLevel ────────────────────────────────────────────────────────────────

/// Agent risk classification carried in token claims and capability sets.
///
/// Ordered: a child agent may never carry a higher risk level than its
/// parent.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Minimal = 0,
    Limited = 1,
    High = 2,
    Critical = 3,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Minimal => "MINIMAL",
            RiskLevel::Limited => "LIMITED",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MINIMAL" => Ok(RiskLevel::Minimal),
            "LIMITED" => Ok(RiskLevel::Limited),
            "HIGH" => Ok(RiskLevel::High),
            "CRITICAL" => Ok(RiskLevel::Critical),
            other => Err(GovernanceError::BadFormat {
                field: "risk_level".to_string(),
                reason: format!("unknown risk level '{other}'"),
            }),
        }
    }
}

// ── AttestationStatus ────────────────────────────────────────────────────────

/// Outcome of a governance attestation inside a full certificate.
///
/// The compact projection folds both `NotVerified` and `NotApplicable` to
/// `false`; consumers of the compact form must not infer "applicable but
/// missing" from a `false` flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttestationStatus {
    Verified,
    NotVerified,
    NotApplicable,
}

impl AttestationStatus {
    /// Compact-form boolean projection.
    pub fn as_flag(self) -> bool {
        matches!(self, AttestationStatus::Verified)
    }
}

// ── CheckStatus ──────────────────────────────────────────────────────────────

/// Outcome of a single verification check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skip,
    Warn,
}
