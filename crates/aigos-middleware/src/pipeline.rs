use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use aigos_core::constants::TOKEN_HEADER;
use aigos_core::token::TokenClaims;
use aigos_core::types::Timestamp;
use aigos_core::{ErrorKind, GovernanceError};
use aigos_token::{TokenVerification, TokenVerifier};
use aigos_trust::{EvaluationRequest, TrustDecision, TrustEvaluator};

// ── Request model ────────────────────────────────────────────────────────────

/// The framework-neutral view of an inbound request.
#[derive(Clone, Debug, Default)]
pub struct InboundRequest {
    pub method: String,
    pub path: String,
    pub source_organization: Option<String>,
}

/// Machine-readable failure codes, mapped onto HTTP status per the
/// protocol: 401 for token-class failures, 403 for trust-class, 503 for
/// internal/operational ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCode {
    MissingToken,
    InvalidToken,
    TokenExpired,
    CertificateExpired,
    CertificateRevoked,
    UntrustedIssuer,
    InsufficientLevel,
    MissingCompliance,
    PolicyViolation,
    HealthCheckFailed,
    Cancelled,
    Timeout,
}

impl FailureCode {
    pub fn status(self) -> u16 {
        match self {
            FailureCode::MissingToken
            | FailureCode::InvalidToken
            | FailureCode::TokenExpired
            | FailureCode::CertificateExpired
            | FailureCode::CertificateRevoked => 401,
            FailureCode::UntrustedIssuer
            | FailureCode::InsufficientLevel
            | FailureCode::MissingCompliance
            | FailureCode::PolicyViolation
            | FailureCode::HealthCheckFailed => 403,
            FailureCode::Cancelled | FailureCode::Timeout => 503,
        }
    }
}

/// A denied request with everything an HTTP adapter needs to answer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Failure {
    pub code: FailureCode,
    pub message: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// A verified request: decoded claims plus both stage results.
#[derive(Clone, Debug)]
pub struct VerifiedRequest {
    pub claims: TokenClaims,
    pub trust: TrustDecision,
    pub token: TokenVerification,
}

#[derive(Debug)]
pub enum Outcome {
    Success(Box<VerifiedRequest>),
    Failure(Failure),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Failure(f) => Some(f),
            Outcome::Success(_) => None,
        }
    }
}

/// The `{error, message, details?}` body adapters serialize on failure.
pub fn error_body(failure: &Failure) -> serde_json::Value {
    let mut body = json!({
        "error": failure.code,
        "message": failure.message,
    });
    if let Some(details) = &failure.details {
        body["details"] = details.clone();
    }
    body
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

type ActionFn = dyn Fn(&InboundRequest) -> String + Send + Sync;

pub struct A2aMiddleware {
    token_header: String,
    verifier: Arc<TokenVerifier>,
    evaluator: Arc<TrustEvaluator>,
    extract_action: Box<ActionFn>,
}

impl A2aMiddleware {
    pub fn new(verifier: Arc<TokenVerifier>, evaluator: Arc<TrustEvaluator>) -> Self {
        Self {
            token_header: TOKEN_HEADER.to_string(),
            verifier,
            evaluator,
            extract_action: Box::new(default_action),
        }
    }

    pub fn with_token_header(mut self, header: impl Into<String>) -> Self {
        self.token_header = header.into();
        self
    }

    /// Replace the action derivation (default: `<method>.<path-dots>`).
    pub fn with_action_extractor<F>(mut self, extract: F) -> Self
    where
        F: Fn(&InboundRequest) -> String + Send + Sync + 'static,
    {
        self.extract_action = Box::new(extract);
        self
    }

    /// Run the pipeline: extract token → verify → evaluate → outcome.
    pub async fn verify_request(
        &self,
        headers: &[(String, String)],
        request: &InboundRequest,
        now: Timestamp,
    ) -> Outcome {
        let token = match extract_token(headers, &self.token_header) {
            Some(token) => token,
            None => {
                return Outcome::Failure(Failure {
                    code: FailureCode::MissingToken,
                    message: format!("no bearer token in header '{}'", self.token_header),
                    status: FailureCode::MissingToken.status(),
                    details: None,
                });
            }
        };

        let verification = match self.verifier.verify(token, now).await {
            Ok(verification) => verification,
            Err(err) => {
                let code = token_failure_code(&err);
                warn!(code = ?code, error = %err, "token rejected");
                return Outcome::Failure(Failure {
                    code,
                    message: err.to_string(),
                    status: code.status(),
                    details: None,
                });
            }
        };

        let action = (self.extract_action)(request);
        let evaluation = EvaluationRequest {
            action: action.clone(),
            source_organization: request.source_organization.clone(),
        };
        let trust = self.evaluator.evaluate(Some(&verification.claims), &evaluation, now);

        if !trust.trusted {
            let code = trust_failure_code(trust.failure);
            let message = trust
                .reason
                .clone()
                .unwrap_or_else(|| "request not trusted".to_string());
            warn!(action = %action, code = ?code, %message, "request denied");
            return Outcome::Failure(Failure {
                code,
                message,
                status: code.status(),
                details: Some(json!({ "action": action, "cga_level": trust.cga_level })),
            });
        }

        debug!(action = %action, score = trust.trust_score, "request trusted");
        Outcome::Success(Box::new(VerifiedRequest {
            claims: verification.claims.clone(),
            trust,
            token: verification,
        }))
    }
}

/// Case-insensitive header lookup; empty values count as absent.
fn extract_token<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, value)| key.eq_ignore_ascii_case(name) && !value.is_empty())
        .map(|(_, value)| value.as_str())
}

/// Default action derivation: lowercased method, dot-separated path.
/// `POST /admin/users` becomes `post.admin.users`.
fn default_action(request: &InboundRequest) -> String {
    let path = request
        .path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(".");
    if path.is_empty() {
        request.method.to_lowercase()
    } else {
        format!("{}.{}", request.method.to_lowercase(), path)
    }
}

fn token_failure_code(err: &GovernanceError) -> FailureCode {
    match err.kind() {
        ErrorKind::TokenExpired => FailureCode::TokenExpired,
        ErrorKind::CertificateExpired => FailureCode::CertificateExpired,
        ErrorKind::CertificateRevoked => FailureCode::CertificateRevoked,
        ErrorKind::UntrustedIssuer => FailureCode::UntrustedIssuer,
        ErrorKind::Cancelled => FailureCode::Cancelled,
        ErrorKind::Timeout | ErrorKind::CaUnavailable => FailureCode::Timeout,
        _ => FailureCode::InvalidToken,
    }
}

fn trust_failure_code(kind: Option<ErrorKind>) -> FailureCode {
    match kind {
        Some(ErrorKind::UntrustedIssuer) => FailureCode::UntrustedIssuer,
        Some(ErrorKind::CertificateExpired) => FailureCode::CertificateExpired,
        Some(ErrorKind::InsufficientLevel) => FailureCode::InsufficientLevel,
        Some(ErrorKind::MissingCompliance) => FailureCode::MissingCompliance,
        Some(ErrorKind::HealthCheckFailed) => FailureCode::HealthCheckFailed,
        _ => FailureCode::PolicyViolation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_action_joins_method_and_path() {
        let request = InboundRequest {
            method: "POST".to_string(),
            path: "/admin/users".to_string(),
            source_organization: None,
        };
        assert_eq!(default_action(&request), "post.admin.users");

        let bare = InboundRequest { method: "GET".to_string(), path: "/".to_string(), ..Default::default() };
        assert_eq!(default_action(&bare), "get");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let headers = vec![("x-aigos-token".to_string(), "abc".to_string())];
        assert_eq!(extract_token(&headers, "X-AIGOS-Token"), Some("abc"));
        assert_eq!(extract_token(&headers, "Authorization"), None);

        let empty = vec![("X-AIGOS-Token".to_string(), String::new())];
        assert_eq!(extract_token(&empty, "X-AIGOS-Token"), None);
    }

    #[test]
    fn status_codes_follow_the_contract() {
        assert_eq!(FailureCode::MissingToken.status(), 401);
        assert_eq!(FailureCode::TokenExpired.status(), 401);
        assert_eq!(FailureCode::CertificateRevoked.status(), 401);
        assert_eq!(FailureCode::UntrustedIssuer.status(), 403);
        assert_eq!(FailureCode::InsufficientLevel.status(), 403);
        assert_eq!(FailureCode::MissingCompliance.status(), 403);
        assert_eq!(FailureCode::Cancelled.status(), 503);
    }

    #[test]
    fn error_body_has_wire_shape() {
        let failure = Failure {
            code: FailureCode::InsufficientLevel,
            message: "CGA level SILVER below required GOLD".to_string(),
            status: 403,
            details: Some(json!({ "action": "admin.users" })),
        };
        let body = error_body(&failure);
        assert_eq!(body["error"], "INSUFFICIENT_LEVEL");
        assert_eq!(body["message"], "CGA level SILVER below required GOLD");
        assert_eq!(body["details"]["action"], "admin.users");
    }
}
