//! ─── AIGOS Protocol Constants ───────────────────────────────────────────────
//!
//! "Every running agent is bound to a signed business authorization."
//!
//! Certificate validity, token lifetime, spawn-tree depth, decay factors,
//! and collaborator timeouts. Level-specific values (validity days, CA
//! requirements) live on `CgaLevel` itself.

// ── Documents ────────────────────────────────────────────────────────────────

/// API group/version on every AIGOS document.
pub const API_VERSION: &str = "aigos.io/v1";

/// `kind` of the full certificate document.
pub const KIND_CERTIFICATE: &str = "CGACertificate";

/// `kind` of the compact certificate projection.
pub const KIND_CERTIFICATE_COMPACT: &str = "CGACertificateCompact";

/// `kind` of the trust-policy document.
pub const KIND_TRUST_POLICY: &str = "A2ATrustPolicy";

/// Certificate document schema version.
pub const CERTIFICATE_SCHEMA_VERSION: &str = "1.0";

// ── Tokens ───────────────────────────────────────────────────────────────────

/// Default bearer-token lifetime (seconds).
pub const TOKEN_VALIDITY_SECS: i64 = 3600;

/// Signing algorithm on every token and certificate signature.
pub const SIGNING_ALGORITHM: &str = "ES256";

/// A certificate closer than this to expiry triggers a non-fatal
/// "expiring soon" warning at token verification.
pub const CERT_EXPIRY_WARNING_DAYS: i64 = 7;

/// HTTP header carrying the bearer token (configurable per middleware).
pub const TOKEN_HEADER: &str = "X-AIGOS-Token";

// ── Golden Thread ────────────────────────────────────────────────────────────

/// Prefix of every Golden-Thread hash string.
pub const HASH_PREFIX: &str = "sha256:";

// ── Spawn / capability decay ─────────────────────────────────────────────────

/// Hard cap on spawn-tree depth regardless of per-agent `max_child_depth`.
pub const GLOBAL_MAX_SPAWN_DEPTH: u32 = 5;

/// Default per-budget decay factors applied in decay mode.
pub const DECAY_SESSION: f64 = 0.5;
pub const DECAY_DAY: f64 = 0.5;
pub const DECAY_MONTH: f64 = 0.5;
pub const DECAY_TOKENS_PER_CALL: f64 = 0.75;

// ── Policy graph ─────────────────────────────────────────────────────────────

/// Maximum `extends` chain length for policy inheritance.
pub const MAX_INHERITANCE_DEPTH: usize = 10;

/// Default capacity of the policy-selection LRU cache.
pub const SELECTION_CACHE_CAPACITY: usize = 100;

// ── Collaborator timeouts ────────────────────────────────────────────────────

/// Kill-switch live-test acknowledgement deadline (milliseconds).
pub const KILL_SWITCH_TIMEOUT_MS: u64 = 60_000;

/// Gap between serial kill-switch test iterations (milliseconds).
pub const KILL_SWITCH_ITERATION_GAP_MS: u64 = 100;

/// Key-resolution deadline when a key id is not resident (milliseconds).
pub const KEY_RESOLVE_TIMEOUT_MS: u64 = 5_000;

/// Revocation-oracle query deadline (milliseconds).
pub const REVOCATION_TIMEOUT_MS: u64 = 5_000;
