use tracing::debug;

use aigos_core::thread::{AssetAuthorization, GoldenThread, ThreadComponents, ThreadVerification};
use aigos_core::GovernanceError;
use aigos_crypto::{constant_time_eq, is_canonical_hash, Value};

/// Compute the canonical hash of a set of thread components.
pub fn thread_hash(components: &ThreadComponents) -> Result<String, GovernanceError> {
    aigos_crypto::hash(&[
        ("ticket_id", Value::Text(&components.ticket_id)),
        ("approved_by", Value::Text(&components.approved_by)),
        ("approved_at", Value::Timestamp(&components.approved_at)),
    ])
}

/// Build a Golden Thread from a ticket approval.
///
/// Validates the ticket id, the approver email shape, and the approval
/// timestamp, then binds the record by setting its canonical hash. The
/// stored `approved_at` is the normalized UTC form so the record re-hashes
/// to the same value on every platform.
pub fn build(
    ticket_id: &str,
    approved_by: &str,
    approved_at: &str,
) -> Result<GoldenThread, GovernanceError> {
    if ticket_id.trim().is_empty() {
        return Err(GovernanceError::BadFormat {
            field: "ticket_id".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    validate_email(approved_by)?;
    let approved_at = aigos_crypto::canonical::normalize_timestamp(approved_at)?;

    let components = ThreadComponents {
        ticket_id: ticket_id.to_string(),
        approved_by: approved_by.to_string(),
        approved_at: approved_at.clone(),
    };
    let hash = thread_hash(&components)?;
    debug!(ticket_id, hash = %hash, "golden thread bound");

    Ok(GoldenThread {
        ticket_id: components.ticket_id,
        approved_by: components.approved_by,
        approved_at,
        hash: Some(hash),
        signature: None,
    })
}

/// Recompute the hash of `components` and compare it against
/// `expected_hash` in constant time.
///
/// Returns `BadFormat` when the presented hash does not have the canonical
/// `sha256:<64 hex>` shape; a well-formed mismatch is reported through the
/// returned [`ThreadVerification`], never a panic.
pub fn verify(
    components: &ThreadComponents,
    expected_hash: &str,
) -> Result<ThreadVerification, GovernanceError> {
    if !is_canonical_hash(expected_hash) {
        return Err(GovernanceError::BadFormat {
            field: "hash".to_string(),
            reason: format!("'{expected_hash}' is not of the form sha256:<64 hex>"),
        });
    }
    let computed = thread_hash(components)?;
    let verified = constant_time_eq(&computed, expected_hash);
    let mismatch_reason = (!verified)
        .then(|| format!("components hash to {computed}, not the presented {expected_hash}"));

    Ok(ThreadVerification { verified, computed, mismatch_reason })
}

/// Like [`verify`], but a mismatch is an error of kind `HashMismatch`.
/// Used where a broken binding must stop the pipeline (certificate
/// issuance, inbound-request re-checks).
pub fn ensure_bound(
    components: &ThreadComponents,
    expected_hash: &str,
) -> Result<(), GovernanceError> {
    let outcome = verify(components, expected_hash)?;
    if outcome.verified {
        Ok(())
    } else {
        Err(GovernanceError::HashMismatch {
            expected: expected_hash.to_string(),
            computed: outcome.computed,
        })
    }
}

/// Pull thread components out of asset-card authorization data.
///
/// An explicit `golden_thread` block wins. Otherwise the most recent
/// approval (by `date`) across the linked tickets is used; `None` when the
/// card carries no usable authorization.
pub fn extract(asset: &AssetAuthorization) -> Option<ThreadComponents> {
    if let Some(thread) = &asset.golden_thread {
        return Some(thread.components());
    }

    let mut latest: Option<(&str, &str, &str)> = None;
    for ticket in &asset.tickets {
        for approval in &ticket.approvals {
            let newer = match latest {
                Some((_, _, date)) => approval.date.as_str() > date,
                None => true,
            };
            if newer {
                latest = Some((&ticket.id, &approval.approver, &approval.date));
            }
        }
    }

    latest.map(|(ticket_id, approver, date)| ThreadComponents {
        ticket_id: ticket_id.to_string(),
        approved_by: approver.to_string(),
        approved_at: date.to_string(),
    })
}

/// Minimal email shape check: one `@`, a non-empty local part, and a
/// domain containing a dot. Directory-grade validation belongs to the
/// ticket system; this guards against obviously broken records.
fn validate_email(email: &str) -> Result<(), GovernanceError> {
    let bad = |reason: &str| GovernanceError::BadFormat {
        field: "approved_by".to_string(),
        reason: reason.to_string(),
    };
    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(bad("must contain exactly one '@'")),
    };
    if local.is_empty() {
        return Err(bad("local part must not be empty"));
    }
    if domain.len() < 3 || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.')
    {
        return Err(bad("domain must contain a dot-separated name"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(bad("must not contain whitespace"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigos_core::thread::{TicketApproval, TicketRef};

    const VECTOR_HASH: &str =
        "sha256:bb085280036c278a6478b90f67d09cfcb6bcc7484d13229d7eba509bdb4685f7";

    fn reference_thread() -> GoldenThread {
        build("FIN-1234", "ciso@corp.com", "2025-01-15T10:30:00Z").unwrap()
    }

    #[test]
    fn build_sets_published_vector_hash() {
        let thread = reference_thread();
        assert_eq!(thread.hash.as_deref(), Some(VECTOR_HASH));
    }

    #[test]
    fn verify_round_trips_own_hash() {
        let thread = reference_thread();
        let outcome = verify(&thread.components(), thread.hash.as_deref().unwrap()).unwrap();
        assert!(outcome.verified);
        assert!(outcome.mismatch_reason.is_none());
    }

    #[test]
    fn any_component_change_flips_verification() {
        let thread = reference_thread();
        let hash = thread.hash.as_deref().unwrap();

        let mut tampered = thread.components();
        tampered.ticket_id = "FIN-1235".to_string();
        assert!(!verify(&tampered, hash).unwrap().verified);

        let mut tampered = thread.components();
        tampered.approved_by = "cfo@corp.com".to_string();
        assert!(!verify(&tampered, hash).unwrap().verified);

        let mut tampered = thread.components();
        tampered.approved_at = "2025-01-15T10:30:01Z".to_string();
        assert!(!verify(&tampered, hash).unwrap().verified);
    }

    #[test]
    fn malformed_hash_is_bad_format() {
        let thread = reference_thread();
        assert!(matches!(
            verify(&thread.components(), "sha256:nothex"),
            Err(GovernanceError::BadFormat { .. })
        ));
    }

    #[test]
    fn ensure_bound_surfaces_hash_mismatch() {
        let thread = reference_thread();
        let mut tampered = thread.components();
        tampered.ticket_id = "FIN-9999".to_string();
        let err = ensure_bound(&tampered, thread.hash.as_deref().unwrap()).unwrap_err();
        assert!(matches!(err, GovernanceError::HashMismatch { .. }));
    }

    #[test]
    fn build_rejects_bad_email_and_timestamp() {
        assert!(build("FIN-1", "not-an-email", "2025-01-15T10:30:00Z").is_err());
        assert!(build("FIN-1", "a@b", "2025-01-15T10:30:00Z").is_err());
        assert!(build("FIN-1", "ciso@corp.com", "yesterday").is_err());
        assert!(build("", "ciso@corp.com", "2025-01-15T10:30:00Z").is_err());
    }

    #[test]
    fn build_normalizes_offset_timestamps() {
        let thread = build("FIN-1234", "ciso@corp.com", "2025-01-15T12:30:00+02:00").unwrap();
        assert_eq!(thread.approved_at, "2025-01-15T10:30:00Z");
        // Same instant, same identity.
        assert_eq!(thread.hash.as_deref(), Some(VECTOR_HASH));
    }

    #[test]
    fn extract_prefers_explicit_block() {
        let asset = AssetAuthorization {
            golden_thread: Some(reference_thread()),
            tickets: vec![TicketRef {
                id: "OPS-1".to_string(),
                approvals: vec![TicketApproval {
                    approver: "ops@corp.com".to_string(),
                    date: "2025-06-01T00:00:00Z".to_string(),
                }],
            }],
        };
        let components = extract(&asset).unwrap();
        assert_eq!(components.ticket_id, "FIN-1234");
    }

    #[test]
    fn extract_falls_back_to_latest_approval() {
        let asset = AssetAuthorization {
            golden_thread: None,
            tickets: vec![
                TicketRef {
                    id: "OPS-1".to_string(),
                    approvals: vec![TicketApproval {
                        approver: "early@corp.com".to_string(),
                        date: "2025-01-01T00:00:00Z".to_string(),
                    }],
                },
                TicketRef {
                    id: "OPS-2".to_string(),
                    approvals: vec![TicketApproval {
                        approver: "late@corp.com".to_string(),
                        date: "2025-03-01T00:00:00Z".to_string(),
                    }],
                },
            ],
        };
        let components = extract(&asset).unwrap();
        assert_eq!(components.ticket_id, "OPS-2");
        assert_eq!(components.approved_by, "late@corp.com");
    }

    #[test]
    fn extract_returns_none_without_authorization() {
        assert!(extract(&AssetAuthorization::default()).is_none());
    }
}
