//! End-to-end protocol scenarios: Golden Thread → verification →
//! certificate → token → middleware trust decision, plus the spawn-control
//! seed scenario.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};

use aigos_cert::{CertificateGenerator, GeneratorConfig};
use aigos_core::certificate::{CompactCertificate, GovernanceFlags};
use aigos_core::constants::{API_VERSION, KIND_CERTIFICATE_COMPACT};
use aigos_core::policy::{
    ActionRule, BudgetDecay, Budgets, DecayRules, DefaultRule, SpawnRequest, TrustPolicy,
    TrustedCa,
};
use aigos_core::thread::AssetAuthorization;
use aigos_core::types::{CgaLevel, RiskLevel, Timestamp};
use aigos_core::GovernanceError;
use aigos_crypto::{CaKeyRing, Es256KeyPair};
use aigos_middleware::{A2aMiddleware, FailureCode, InboundRequest, Outcome};
use aigos_spawn::{EnforcerConfig, SpawnEnforcer};
use aigos_token::{
    AgentBinding, RevocationOracle, RevocationStatus, TokenMinter, TokenVerifier,
};
use aigos_trust::TrustEvaluator;
use aigos_verify::{AssetCard, ChannelKind, VerificationContext, Verifier};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn headers(token: &str) -> Vec<(String, String)> {
    vec![("X-AIGOS-Token".to_string(), token.to_string())]
}

fn request(method: &str, path: &str) -> InboundRequest {
    InboundRequest {
        method: method.to_string(),
        path: path.to_string(),
        source_organization: None,
    }
}

/// Action derivation used by the action-scoped scenarios: path only,
/// dot-separated, no method prefix.
fn path_action(request: &InboundRequest) -> String {
    request
        .path
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

fn policy(trusted_ca: &str, minimum_level: CgaLevel) -> TrustPolicy {
    TrustPolicy {
        default: DefaultRule { require_cga: true, minimum_level },
        trusted_cas: vec![TrustedCa {
            id: trusted_ca.to_string(),
            trust_level: "high".to_string(),
        }],
        actions: vec![],
        organizations: vec![],
        revocation: None,
        health: None,
    }
}

/// A hand-built compact certificate for scenarios that start at the token
/// layer.
fn compact(level: CgaLevel, ca: &str, compliance: Vec<String>) -> CompactCertificate {
    CompactCertificate {
        api_version: API_VERSION.to_string(),
        kind: KIND_CERTIFICATE_COMPACT.to_string(),
        id: format!("cga-20250601-billing-bot-{}", level.as_lower()),
        agent: "urn:aigos:agent:corp:billing-bot".to_string(),
        level,
        ca: ca.to_string(),
        issued_at: t0() - Duration::days(1),
        expires_at: t0() + Duration::days(level.validity_days() - 1),
        golden_thread_hash:
            "sha256:bb085280036c278a6478b90f67d09cfcb6bcc7484d13229d7eba509bdb4685f7".to_string(),
        gov: GovernanceFlags { ks: true, pe: true, gt: true, cb: true, tm: true },
        compliance,
        sig: None,
    }
}

fn binding() -> AgentBinding {
    AgentBinding {
        asset_id: "asset-001".to_string(),
        golden_thread_hash:
            "sha256:bb085280036c278a6478b90f67d09cfcb6bcc7484d13229d7eba509bdb4685f7".to_string(),
        risk_level: RiskLevel::Limited,
        capabilities: vec!["read".to_string()],
        policy_version: None,
    }
}

fn middleware(
    keys: &Es256KeyPair,
    policy: TrustPolicy,
) -> A2aMiddleware {
    let ring = Arc::new(CaKeyRing::new().with_key(keys.key_id.clone(), keys.verifier()));
    A2aMiddleware::new(
        Arc::new(TokenVerifier::new(ring)),
        Arc::new(TrustEvaluator::new(policy).unwrap()),
    )
}

// ── Scenario 1: Bronze happy path ────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn bronze_happy_path_from_thread_to_trusted_request() {
    init_tracing();
    let now = t0();

    // Golden Thread bound at ticket approval.
    let thread = aigos_thread::build("FIN-1234", "ciso@corp.com", "2025-01-15T10:30:00Z").unwrap();
    let thread_hash = thread.hash.clone().unwrap();
    assert!(aigos_thread::verify(&thread.components(), &thread_hash).unwrap().verified);

    // Bronze verification with default passing checks.
    let card = AssetCard {
        asset_id: "asset-001".to_string(),
        agent_id: "urn:aigos:agent:corp:billing-bot".to_string(),
        agent_version: "1.0.0".to_string(),
        organization: "corp".to_string(),
        authorization: AssetAuthorization { golden_thread: Some(thread), tickets: vec![] },
        kill_switch: Some(aigos_verify::context::KillSwitchDecl {
            endpoint: "https://agents.corp.com/kill".to_string(),
            channels: vec![ChannelKind::Polling],
        }),
        policy_engine: None,
        compliance_frameworks: vec![],
        capability_bounds: None,
        telemetry: None,
    };
    let ctx = VerificationContext::new(card, CgaLevel::Bronze);
    let report = Verifier::new().verify(&ctx, now).await;
    assert_eq!(report.achieved_level, Some(CgaLevel::Bronze));

    // Certificate and compact projection, self-signed for Bronze.
    let signer = Arc::new(Es256KeyPair::generate("corp-signing-key"));
    let generator = CertificateGenerator::new(GeneratorConfig::for_organization("corp"))
        .with_signer(Arc::clone(&signer));
    let certificate = generator
        .generate(&report, "urn:aigos:agent:corp:billing-bot", "1.0.0", &thread_hash, now)
        .unwrap();
    assert!(certificate.validity_invariant_holds());
    let compact = generator.generate_compact(&certificate).unwrap();
    assert_eq!(compact.ca, "self:corp");

    // Token minting.
    let minted = TokenMinter::new(Arc::clone(&signer))
        .mint(
            &compact,
            aigos_core::token::Audience::One("urn:aigos:agent:org:target".to_string()),
            binding(),
            None,
            now,
        )
        .unwrap();

    // Inbound verification through the middleware.
    let middleware = middleware(&signer, policy("self:corp", CgaLevel::Bronze));
    let outcome = middleware
        .verify_request(&headers(&minted.token), &request("GET", "/data/read"), now)
        .await;

    match outcome {
        Outcome::Success(verified) => {
            assert_eq!(verified.trust.cga_level, Some(CgaLevel::Bronze));
            assert!((verified.trust.trust_score - 0.25).abs() < 1e-9);
            assert!(verified.trust.trusted);
            assert_eq!(verified.claims.agent.asset_id, "asset-001");
        }
        Outcome::Failure(failure) => panic!("expected success, got {failure:?}"),
    }
}

// ── Scenario 2: action-scoped escalation ─────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn silver_token_fails_gold_scoped_action() {
    init_tracing();
    let signer = Arc::new(Es256KeyPair::generate("ca-key"));
    let minted = TokenMinter::new(Arc::clone(&signer))
        .mint(
            &compact(CgaLevel::Silver, "ca:aigos:root", vec![]),
            aigos_core::token::Audience::One("urn:x".to_string()),
            binding(),
            None,
            t0(),
        )
        .unwrap();

    let mut policy = policy("ca:aigos:root", CgaLevel::Bronze);
    policy.actions.push(ActionRule {
        pattern: "admin.*".to_string(),
        require_cga: None,
        minimum_level: Some(CgaLevel::Gold),
        require_compliance: None,
        max_violations_30d: None,
    });

    let middleware = middleware(&signer, policy).with_action_extractor(path_action);
    let outcome = middleware
        .verify_request(&headers(&minted.token), &request("POST", "/admin/users"), t0())
        .await;

    let failure = outcome.failure().expect("gold-scoped action must deny silver");
    assert_eq!(failure.code, FailureCode::InsufficientLevel);
    assert_eq!(failure.status, 403);
    assert!(failure.message.contains("SILVER") && failure.message.contains("GOLD"));
}

// ── Scenario 3: compliance gate ──────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn gold_token_without_soc2_fails_payments_action() {
    init_tracing();
    let signer = Arc::new(Es256KeyPair::generate("ca-key"));
    let minted = TokenMinter::new(Arc::clone(&signer))
        .mint(
            &compact(CgaLevel::Gold, "ca:aigos:root", vec![]),
            aigos_core::token::Audience::One("urn:x".to_string()),
            binding(),
            None,
            t0(),
        )
        .unwrap();

    let mut policy = policy("ca:aigos:root", CgaLevel::Bronze);
    policy.actions.push(ActionRule {
        pattern: "payments.*".to_string(),
        require_cga: None,
        minimum_level: Some(CgaLevel::Gold),
        require_compliance: Some(vec!["SOC2".to_string()]),
        max_violations_30d: None,
    });

    let middleware = middleware(&signer, policy).with_action_extractor(path_action);
    let outcome = middleware
        .verify_request(&headers(&minted.token), &request("POST", "/payments/charge"), t0())
        .await;

    let failure = outcome.failure().expect("missing compliance must deny");
    assert_eq!(failure.code, FailureCode::MissingCompliance);
    assert_eq!(failure.status, 403);
    assert!(failure.message.contains("SOC2"));
}

// ── Scenario 4: capability-decay auto-adjust ─────────────────────────────────

#[test]
fn spawn_escalation_is_rejected_with_adjusted_child() {
    let enforcer = SpawnEnforcer::new(EnforcerConfig {
        global_max_depth: 5,
        auto_adjust: true,
    });
    enforcer.set_decay_rules(DecayRules {
        remove_from_children: vec!["send_email".to_string()],
        budget_decay: BudgetDecay::default(),
        denied_child_tools: vec![],
    });

    let parent = aigos_core::policy::CapabilitySet {
        allowed_tools: vec![
            "web_search".to_string(),
            "database_read".to_string(),
            "send_email".to_string(),
        ],
        allowed_domains: vec![],
        denied_domains: vec![],
        budgets: Budgets { max_cost_per_session: Some(100.0), ..Default::default() },
        may_spawn_children: true,
        risk_level: RiskLevel::High,
        generation_depth: 0,
        max_child_depth: 3,
    };
    let spawn_request = SpawnRequest {
        tools: vec!["send_email".to_string()],
        budgets: Budgets { max_cost_per_session: Some(200.0), ..Default::default() },
        ..Default::default()
    };

    let outcome = enforcer.validate(&parent, &spawn_request);
    assert!(!outcome.valid);
    let kinds: Vec<_> = outcome.violations.iter().map(|v| v.kind).collect();
    assert_eq!(
        kinds,
        vec![
            aigos_core::policy::SpawnViolationKind::PrivilegeEscalation,
            aigos_core::policy::SpawnViolationKind::BudgetEscalation,
        ]
    );
    let adjusted = outcome.adjusted.unwrap();
    assert_eq!(adjusted.allowed_tools, vec!["web_search", "database_read"]);
    assert_eq!(adjusted.budgets.max_cost_per_session, Some(50.0));
}

// ── Middleware failure modes ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn missing_and_malformed_tokens_are_401() {
    init_tracing();
    let signer = Arc::new(Es256KeyPair::generate("ca-key"));
    let middleware = middleware(&signer, policy("ca:aigos:root", CgaLevel::Bronze));

    let outcome = middleware.verify_request(&[], &request("GET", "/data"), t0()).await;
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.code, FailureCode::MissingToken);
    assert_eq!(failure.status, 401);

    let outcome = middleware
        .verify_request(&headers("not.a.token"), &request("GET", "/data"), t0())
        .await;
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.code, FailureCode::InvalidToken);
    assert_eq!(failure.status, 401);
}

struct RevokedOracle;

#[async_trait]
impl RevocationOracle for RevokedOracle {
    async fn status(&self, _certificate_id: &str) -> Result<RevocationStatus, GovernanceError> {
        Ok(RevocationStatus::Revoked)
    }
}

#[tokio::test(start_paused = true)]
async fn revoked_certificate_is_401_with_code() {
    init_tracing();
    let signer = Arc::new(Es256KeyPair::generate("ca-key"));
    let minted = TokenMinter::new(Arc::clone(&signer))
        .mint(
            &compact(CgaLevel::Gold, "ca:aigos:root", vec![]),
            aigos_core::token::Audience::One("urn:x".to_string()),
            binding(),
            None,
            t0(),
        )
        .unwrap();

    let ring = Arc::new(CaKeyRing::new().with_key(signer.key_id.clone(), signer.verifier()));
    let verifier = TokenVerifier::new(ring).with_revocation_oracle(Arc::new(RevokedOracle));
    let middleware = A2aMiddleware::new(
        Arc::new(verifier),
        Arc::new(TrustEvaluator::new(policy("ca:aigos:root", CgaLevel::Bronze)).unwrap()),
    );

    let outcome = middleware
        .verify_request(&headers(&minted.token), &request("GET", "/data"), t0())
        .await;
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.code, FailureCode::CertificateRevoked);
    assert_eq!(failure.status, 401);
}
