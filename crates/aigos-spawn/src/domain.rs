//! Domain-pattern coverage for spawn requests.

/// Whether a child domain is covered by the parent's allowed patterns.
///
/// `d` is covered by the set `P` iff `*` is in `P`, `d` appears verbatim,
/// some `*.suffix` in `P` covers it (`d` ends in `.suffix` or equals the
/// bare `suffix`), or `d` is itself a wildcard that `P` carries verbatim
/// (or `P` has `*`).
pub fn domain_covered(domain: &str, parents: &[String]) -> bool {
    if parents.iter().any(|p| p == "*") {
        return true;
    }
    if parents.iter().any(|p| p == domain) {
        return true;
    }
    if domain.starts_with("*.") {
        // A wildcard request is only covered by the same wildcard (or `*`,
        // handled above) — a broader ask than any concrete parent domain.
        return false;
    }
    parents.iter().any(|p| {
        p.strip_prefix("*.")
            .map(|suffix| domain == suffix || domain.ends_with(&format!(".{suffix}")))
            .unwrap_or(false)
    })
}
