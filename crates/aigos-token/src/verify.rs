//! Ordered token verification: structure → token expiry → certificate
//! expiry → signature → revocation. The first failure wins; no later stage
//! runs once an earlier one has failed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use aigos_core::constants::{
    CERT_EXPIRY_WARNING_DAYS, KEY_RESOLVE_TIMEOUT_MS, REVOCATION_TIMEOUT_MS, SIGNING_ALGORITHM,
};
use aigos_core::token::{TokenClaims, TokenHeader};
use aigos_core::types::Timestamp;
use aigos_core::GovernanceError;
use aigos_crypto::{CaKeyRing, Es256Verifier};

use crate::encode::decode_part;

// ── Collaborators ────────────────────────────────────────────────────────────

/// Resolves a token `kid` to a verification key. Remote resolution (JWKS)
/// plugs in here; [`CaKeyRing`] is the resident in-memory case.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    async fn resolve(&self, kid: &str) -> Option<Es256Verifier>;
}

#[async_trait]
impl KeyResolver for CaKeyRing {
    async fn resolve(&self, kid: &str) -> Option<Es256Verifier> {
        self.get(kid).cloned()
    }
}

/// Certificate revocation state reported by the oracle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevocationStatus {
    Good,
    Revoked,
    Unknown,
}

/// An OCSP-equivalent revocation oracle.
#[async_trait]
pub trait RevocationOracle: Send + Sync {
    async fn status(&self, certificate_id: &str) -> Result<RevocationStatus, GovernanceError>;
}

/// In-memory revocation list: certificates on the list are `Revoked`,
/// everything else is `Good`. Distribution of the list itself is out of
/// scope — embedders load it however they like.
#[derive(Clone, Debug, Default)]
pub struct StaticRevocationList {
    revoked: std::collections::HashSet<String>,
}

impl StaticRevocationList {
    pub fn new<I: IntoIterator<Item = String>>(revoked: I) -> Self {
        Self { revoked: revoked.into_iter().collect() }
    }
}

#[async_trait]
impl RevocationOracle for StaticRevocationList {
    async fn status(&self, certificate_id: &str) -> Result<RevocationStatus, GovernanceError> {
        Ok(if self.revoked.contains(certificate_id) {
            RevocationStatus::Revoked
        } else {
            RevocationStatus::Good
        })
    }
}

// ── Results ──────────────────────────────────────────────────────────────────

/// Post-verification token state. `Unknown` marks a token whose revocation
/// state the oracle could not answer (a warning, not a failure).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenStatus {
    Valid,
    Unknown,
}

#[derive(Clone, Debug)]
pub struct TokenVerification {
    pub claims: TokenClaims,
    pub status: TokenStatus,
    pub warnings: Vec<String>,
}

// ── Verifier ─────────────────────────────────────────────────────────────────

pub struct TokenVerifier {
    keys: Arc<dyn KeyResolver>,
    check_revocation: bool,
    oracle: Option<Arc<dyn RevocationOracle>>,
}

impl TokenVerifier {
    pub fn new(keys: Arc<dyn KeyResolver>) -> Self {
        Self { keys, check_revocation: false, oracle: None }
    }

    pub fn with_revocation_oracle(mut self, oracle: Arc<dyn RevocationOracle>) -> Self {
        self.check_revocation = true;
        self.oracle = Some(oracle);
        self
    }

    /// Verify a token with a fresh (never-cancelled) handle.
    pub async fn verify(
        &self,
        token: &str,
        now: Timestamp,
    ) -> Result<TokenVerification, GovernanceError> {
        self.verify_with_cancellation(token, now, &CancellationToken::new()).await
    }

    /// Full ordered verification. Cancellation aborts at the suspension
    /// points (key resolution, revocation query) without touching shared
    /// state.
    pub async fn verify_with_cancellation(
        &self,
        token: &str,
        now: Timestamp,
        cancel: &CancellationToken,
    ) -> Result<TokenVerification, GovernanceError> {
        // 1. Structure and claim schema.
        let (header, claims, signing_input, signature) = parse(token)?;
        let mut warnings = Vec::new();

        // 2. Token expiry; `exp == now` is already expired.
        if claims.exp <= now.timestamp() {
            return Err(GovernanceError::TokenExpired { expired_at: claims.exp.to_string() });
        }

        // 3. Certificate expiry.
        if claims.cga.expires_at <= now {
            return Err(GovernanceError::CertificateExpired {
                expired_at: claims.cga.expires_at.to_rfc3339(),
            });
        }

        // 4. Expiring-soon warning (non-fatal).
        if claims.cga.expires_at - now <= Duration::days(CERT_EXPIRY_WARNING_DAYS) {
            warnings.push(format!(
                "certificate {} expires at {}",
                claims.cga.certificate_id,
                claims.cga.expires_at.to_rfc3339()
            ));
        }

        // 5. Signature under the key resolved from `kid`.
        let verifier = self.resolve_key(&header.kid, cancel).await?;
        verifier
            .verify_b64(signing_input.as_bytes(), &signature)
            .map_err(|_| GovernanceError::InvalidSignature)?;

        // 6. Optional revocation.
        let status = match self.revocation_status(&claims, cancel).await? {
            Some(RevocationStatus::Revoked) => {
                return Err(GovernanceError::CertificateRevoked {
                    certificate_id: claims.cga.certificate_id.clone(),
                })
            }
            Some(RevocationStatus::Unknown) => {
                warnings.push(format!(
                    "revocation status unknown for certificate {}",
                    claims.cga.certificate_id
                ));
                TokenStatus::Unknown
            }
            _ => TokenStatus::Valid,
        };

        debug!(jti = %claims.jti, ?status, "token verified");
        Ok(TokenVerification { claims, status, warnings })
    }

    async fn resolve_key(
        &self,
        kid: &str,
        cancel: &CancellationToken,
    ) -> Result<Es256Verifier, GovernanceError> {
        let resolution = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GovernanceError::Cancelled),
            resolved = timeout(
                std::time::Duration::from_millis(KEY_RESOLVE_TIMEOUT_MS),
                self.keys.resolve(kid),
            ) => resolved,
        };
        match resolution {
            Ok(Some(verifier)) => Ok(verifier),
            Ok(None) => Err(GovernanceError::UntrustedIssuer(kid.to_string())),
            Err(_) => Err(GovernanceError::Timeout {
                operation: "key resolution".to_string(),
                after_ms: KEY_RESOLVE_TIMEOUT_MS,
            }),
        }
    }

    async fn revocation_status(
        &self,
        claims: &TokenClaims,
        cancel: &CancellationToken,
    ) -> Result<Option<RevocationStatus>, GovernanceError> {
        let oracle = match (&self.oracle, self.check_revocation) {
            (Some(oracle), true) => oracle,
            _ => return Ok(None),
        };
        let query = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GovernanceError::Cancelled),
            status = timeout(
                std::time::Duration::from_millis(REVOCATION_TIMEOUT_MS),
                oracle.status(&claims.cga.certificate_id),
            ) => status,
        };
        match query {
            Ok(result) => result.map(Some),
            Err(_) => Err(GovernanceError::Timeout {
                operation: "revocation query".to_string(),
                after_ms: REVOCATION_TIMEOUT_MS,
            }),
        }
    }
}

/// Decode the claims without any signature check. Inspection only — never
/// a substitute for [`TokenVerifier::verify`].
pub fn extract(token: &str) -> Result<TokenClaims, GovernanceError> {
    let (_, claims, _, _) = parse(token)?;
    Ok(claims)
}

/// Structural parse: exactly three parts, JSON-decodable header and claims,
/// claims internally consistent.
fn parse(token: &str) -> Result<(TokenHeader, TokenClaims, String, String), GovernanceError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(GovernanceError::BadFormat {
            field: "token".to_string(),
            reason: format!("expected 3 dot-separated parts, got {}", parts.len()),
        });
    }
    let header: TokenHeader = decode_part(parts[0])?;
    let claims: TokenClaims = decode_part(parts[1])?;

    if header.typ != "JWT" || header.alg != SIGNING_ALGORITHM {
        return Err(GovernanceError::SchemaViolation {
            path: "header".to_string(),
            message: format!("unsupported header alg/typ: {}/{}", header.alg, header.typ),
        });
    }
    if claims.iat > claims.exp {
        return Err(GovernanceError::SchemaViolation {
            path: "claims.iat".to_string(),
            message: "iat must not exceed exp".to_string(),
        });
    }
    if claims.iss.is_empty() || claims.sub.is_empty() {
        return Err(GovernanceError::SchemaViolation {
            path: "claims.iss".to_string(),
            message: "issuer and subject must be present".to_string(),
        });
    }

    let signing_input = format!("{}.{}", parts[0], parts[1]);
    Ok((header, claims, signing_input, parts[2].to_string()))
}
