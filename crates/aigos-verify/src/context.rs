//! The verification context: the asset under test plus the injected
//! collaborators checks are allowed to touch.
//!
//! Checks see only this context — pure data accessors and two test
//! affordances (kill-switch test, policy-engine probe). Global registries
//! and cache singletons have no place here; every collaborator is an
//! explicit per-instance record.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use aigos_core::document::Violation;
use aigos_core::policy::CapabilitySet;
use aigos_core::thread::AssetAuthorization;
use aigos_core::types::CgaLevel;
use aigos_core::GovernanceError;
use aigos_crypto::Es256KeyPair;

use crate::killswitch::{ChannelKind, ChannelReport, KillSwitchChannel, LiveTestConfig};

// ── Asset card ───────────────────────────────────────────────────────────────

/// The governance-relevant slice of an asset card.
///
/// Full schema validation is an opaque external collaborator
/// ([`CardValidator`]); this type names only the declarations the default
/// check battery reads.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetCard {
    pub asset_id: String,
    /// Agent URN, e.g. `urn:aigos:agent:acme:billing-bot`.
    pub agent_id: String,
    pub agent_version: String,
    pub organization: String,
    #[serde(default)]
    pub authorization: AssetAuthorization,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kill_switch: Option<KillSwitchDecl>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_engine: Option<PolicyEngineDecl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compliance_frameworks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability_bounds: Option<CapabilitySet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<TelemetryDecl>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KillSwitchDecl {
    pub endpoint: String,
    #[serde(default)]
    pub channels: Vec<ChannelKind>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyEngineDecl {
    pub engine: String,
    pub strict_mode: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TelemetryDecl {
    pub endpoint: String,
}

// ── Collaborators ────────────────────────────────────────────────────────────

/// Opaque asset-card schema validator. Returns every violation found;
/// an empty list means the card is valid.
pub trait CardValidator: Send + Sync {
    fn validate(&self, card: &AssetCard) -> Vec<Violation>;
}

/// Structural baseline validator used when no external validator is
/// injected: non-empty identifiers and a well-formed organization.
#[derive(Debug, Default)]
pub struct BasicCardValidator;

impl CardValidator for BasicCardValidator {
    fn validate(&self, card: &AssetCard) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut require = |path: &str, ok: bool| {
            if !ok {
                violations.push(Violation {
                    path: path.to_string(),
                    message: "must not be empty".to_string(),
                });
            }
        };
        require("asset_id", !card.asset_id.is_empty());
        require("agent_id", !card.agent_id.is_empty());
        require("agent_version", !card.agent_version.is_empty());
        require("organization", !card.organization.is_empty());
        violations
    }
}

/// Live probe of the agent's policy engine. Confirms whether strict mode
/// is actually enforced at runtime, not just declared on the card.
#[async_trait]
pub trait PolicyProbe: Send + Sync {
    async fn strict_mode_active(&self) -> Result<bool, GovernanceError>;
}

// ── Context ──────────────────────────────────────────────────────────────────

/// Everything a check may read or exercise during a verification run.
pub struct VerificationContext {
    pub card: AssetCard,
    pub target_level: CgaLevel,
    validator: Arc<dyn CardValidator>,
    kill_switch_channels: Vec<Arc<dyn KillSwitchChannel>>,
    kill_switch_timeout_ms: u64,
    signer: Option<Arc<Es256KeyPair>>,
    policy_probe: Option<Arc<dyn PolicyProbe>>,
}

impl VerificationContext {
    pub fn new(card: AssetCard, target_level: CgaLevel) -> Self {
        Self {
            card,
            target_level,
            validator: Arc::new(BasicCardValidator),
            kill_switch_channels: Vec::new(),
            kill_switch_timeout_ms: aigos_core::constants::KILL_SWITCH_TIMEOUT_MS,
            signer: None,
            policy_probe: None,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn CardValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_kill_switch_channels(
        mut self,
        channels: Vec<Arc<dyn KillSwitchChannel>>,
    ) -> Self {
        self.kill_switch_channels = channels;
        self
    }

    pub fn with_kill_switch_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.kill_switch_timeout_ms = timeout_ms;
        self
    }

    pub fn with_signer(mut self, signer: Arc<Es256KeyPair>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn with_policy_probe(mut self, probe: Arc<dyn PolicyProbe>) -> Self {
        self.policy_probe = Some(probe);
        self
    }

    // ── Data accessors ────────────────────────────────────────────────────────

    pub fn load_asset_card(&self) -> &AssetCard {
        &self.card
    }

    /// Run the injected schema validator against the card.
    pub fn validate_card(&self) -> Vec<Violation> {
        self.validator.validate(&self.card)
    }

    /// Recompute the Golden-Thread hash from the card's authorization data.
    /// `None` when the card carries no usable authorization.
    pub fn compute_golden_thread_hash(&self) -> Option<Result<String, GovernanceError>> {
        aigos_thread::extract(&self.card.authorization)
            .map(|components| aigos_thread::thread_hash(&components))
    }

    /// The hash the card itself declares, when an explicit block is present.
    pub fn declared_golden_thread_hash(&self) -> Option<&str> {
        self.card
            .authorization
            .golden_thread
            .as_ref()
            .and_then(|t| t.hash.as_deref())
    }

    // ── Test affordances ──────────────────────────────────────────────────────

    /// Whether a live kill-switch test can run (channels and signer wired).
    pub fn kill_switch_testable(&self) -> bool {
        !self.kill_switch_channels.is_empty() && self.signer.is_some()
    }

    /// Send the signed kill-switch test command over every configured
    /// channel. Errors with `SignerUnavailable` when no signer is wired.
    pub async fn send_kill_switch_test(&self) -> Result<ChannelReport, GovernanceError> {
        let signer = self.signer.as_ref().ok_or(GovernanceError::SignerUnavailable)?;
        let config = LiveTestConfig {
            channels: self.kill_switch_channels.clone(),
            timeout_ms: self.kill_switch_timeout_ms,
            signer: Arc::clone(signer),
        };
        crate::killswitch::execute(&config, &tokio_util::sync::CancellationToken::new()).await
    }

    /// Probe the policy engine for live strict-mode enforcement. Falls back
    /// to the card declaration when no probe is injected.
    pub async fn run_policy_check(&self) -> Result<bool, GovernanceError> {
        match &self.policy_probe {
            Some(probe) => probe.strict_mode_active().await,
            None => Ok(self.card.policy_engine.as_ref().map(|p| p.strict_mode).unwrap_or(false)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn minimal_card() -> AssetCard {
        AssetCard {
            asset_id: "asset-001".to_string(),
            agent_id: "urn:aigos:agent:acme:billing-bot".to_string(),
            agent_version: "1.0.0".to_string(),
            organization: "acme".to_string(),
            authorization: AssetAuthorization::default(),
            kill_switch: None,
            policy_engine: None,
            compliance_frameworks: Vec::new(),
            capability_bounds: None,
            telemetry: None,
        }
    }

    #[test]
    fn basic_validator_accepts_complete_card() {
        assert!(BasicCardValidator.validate(&minimal_card()).is_empty());
    }

    #[test]
    fn basic_validator_reports_empty_fields() {
        let mut card = minimal_card();
        card.agent_id.clear();
        let violations = BasicCardValidator.validate(&card);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "agent_id");
    }

    #[tokio::test]
    async fn policy_check_falls_back_to_declaration() {
        let mut card = minimal_card();
        card.policy_engine = Some(PolicyEngineDecl { engine: "opa".to_string(), strict_mode: true });
        let ctx = VerificationContext::new(card, CgaLevel::Silver);
        assert!(ctx.run_policy_check().await.unwrap());

        let ctx = VerificationContext::new(minimal_card(), CgaLevel::Silver);
        assert!(!ctx.run_policy_check().await.unwrap());
    }
}
