//! Token minting.
//!
//! Claims are assembled from the compact certificate and the live agent's
//! binding, stamped `iat = now` / `exp = now + validity`, and signed ES256
//! over `base64url(header).base64url(payload)`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Duration;
use tracing::debug;

use aigos_core::certificate::CompactCertificate;
use aigos_core::constants::{SIGNING_ALGORITHM, TOKEN_VALIDITY_SECS};
use aigos_core::token::{
    AgentClaims, Audience, CgaClaims, OperationalHealth, TokenClaims, TokenHeader,
};
use aigos_core::types::{RiskLevel, Timestamp};
use aigos_core::GovernanceError;
use aigos_crypto::Es256KeyPair;

use crate::encode::encode_part;

/// The live-instance identity folded into the `agent` claim block.
#[derive(Clone, Debug)]
pub struct AgentBinding {
    pub asset_id: String,
    pub golden_thread_hash: String,
    pub risk_level: RiskLevel,
    pub capabilities: Vec<String>,
    pub policy_version: Option<String>,
}

/// A freshly minted token with its decoded claims.
#[derive(Clone, Debug)]
pub struct MintedToken {
    pub token: String,
    pub claims: TokenClaims,
    pub expires_at: Timestamp,
}

pub struct TokenMinter {
    signer: Arc<Es256KeyPair>,
    validity_secs: i64,
}

static JTI_SEQ: AtomicU64 = AtomicU64::new(0);

impl TokenMinter {
    pub fn new(signer: Arc<Es256KeyPair>) -> Self {
        Self { signer, validity_secs: TOKEN_VALIDITY_SECS }
    }

    pub fn with_validity_secs(mut self, validity_secs: i64) -> Self {
        self.validity_secs = validity_secs;
        self
    }

    /// Mint a bearer token for an A2A call.
    ///
    /// `iss` and `sub` are both the certified agent URN; the CGA block is a
    /// field-for-field copy of the compact certificate.
    pub fn mint(
        &self,
        certificate: &CompactCertificate,
        audience: Audience,
        binding: AgentBinding,
        operational_health: Option<OperationalHealth>,
        now: Timestamp,
    ) -> Result<MintedToken, GovernanceError> {
        let iat = now.timestamp();
        let exp = iat + self.validity_secs;
        let expires_at = now + Duration::seconds(self.validity_secs);
        let jti = format!(
            "jti-{}-{}",
            now.timestamp_millis(),
            JTI_SEQ.fetch_add(1, Ordering::Relaxed)
        );

        let claims = TokenClaims {
            iss: certificate.agent.clone(),
            sub: certificate.agent.clone(),
            aud: audience,
            exp,
            iat,
            jti,
            cga: CgaClaims {
                certificate_id: certificate.id.clone(),
                level: certificate.level,
                issuer: certificate.ca.clone(),
                expires_at: certificate.expires_at,
                governance_verified: certificate.gov,
                compliance_frameworks: certificate.compliance.clone(),
                operational_health,
            },
            agent: AgentClaims {
                asset_id: binding.asset_id,
                golden_thread_hash: binding.golden_thread_hash,
                risk_level: binding.risk_level,
                capabilities: binding.capabilities,
                policy_version: binding.policy_version,
            },
        };

        let header = TokenHeader {
            alg: SIGNING_ALGORITHM.to_string(),
            typ: "JWT".to_string(),
            kid: self.signer.key_id.clone(),
        };

        let signing_input = format!("{}.{}", encode_part(&header)?, encode_part(&claims)?);
        let signature = self.signer.sign_b64(signing_input.as_bytes());
        let token = format!("{signing_input}.{signature}");

        debug!(jti = %claims.jti, sub = %claims.sub, exp, "token minted");
        Ok(MintedToken { token, claims, expires_at })
    }
}
