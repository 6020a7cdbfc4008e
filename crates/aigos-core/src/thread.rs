//! The Golden Thread: an immutable tuple (ticket, approver, approval time)
//! plus its SHA-256 canonical hash, binding an agent to business
//! authorization. Created once at ticket-approval time; a new thread is a
//! new identity.

use serde::{Deserialize, Serialize};

/// A business-authorization binding record.
///
/// Invariant: `hash`, when present, equals the SHA-256 canonical hash of
/// `{ticket_id, approved_by, approved_at}` (see aigos-crypto's canonical
/// form). The engine in aigos-thread enforces this at build and verify time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenThread {
    /// Business ticket that authorized the agent (e.g. "FIN-1234").
    pub ticket_id: String,
    /// Email of the approving party.
    pub approved_by: String,
    /// RFC-3339 UTC approval time, normalized to a trailing `Z`.
    pub approved_at: String,
    /// `sha256:<64 lowercase hex>` over the canonical component form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Optional detached signature of the form `<algorithm>:<base64>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// The three hashed components of a Golden Thread.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadComponents {
    pub ticket_id: String,
    pub approved_by: String,
    pub approved_at: String,
}

impl GoldenThread {
    pub fn components(&self) -> ThreadComponents {
        ThreadComponents {
            ticket_id: self.ticket_id.clone(),
            approved_by: self.approved_by.clone(),
            approved_at: self.approved_at.clone(),
        }
    }
}

/// Outcome of recomputing and comparing a Golden-Thread hash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThreadVerification {
    pub verified: bool,
    /// Hash recomputed from the presented components.
    pub computed: String,
    /// Present only on mismatch; names what differed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch_reason: Option<String>,
}

// ── Asset-card view ──────────────────────────────────────────────────────────

/// The slice of an asset card the Golden-Thread extractor reads.
///
/// Asset-card schema validation is an external collaborator; this type only
/// names the fields extraction needs. An explicit `golden_thread` block wins
/// over ticket approvals.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AssetAuthorization {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub golden_thread: Option<GoldenThread>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tickets: Vec<TicketRef>,
}

/// A ticket linked from an asset card.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TicketRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub approvals: Vec<TicketApproval>,
}

/// One recorded approval on a linked ticket.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TicketApproval {
    pub approver: String,
    /// RFC-3339 approval date; the most recent approval wins at extraction.
    pub date: String,
}
