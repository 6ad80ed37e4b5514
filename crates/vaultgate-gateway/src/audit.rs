// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// VAULTGATE - AUDIT LOG
//
// One structured entry per gateway request: credential id, queried address,
// outcome. Internal failure detail goes HERE and only here; response bodies
// carry the generic code. Credential keys themselves are never logged.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Placeholder credential id for requests that failed authentication.
pub const UNAUTHENTICATED: &str = "-";

const MAX_ECHO_CHARS: usize = 48;

/// Truncated echo of untrusted input, safe to log. Control characters are
/// replaced so a hostile address field cannot forge log lines.
pub fn echo(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .take(MAX_ECHO_CHARS)
        .map(|c| if c.is_control() { '.' } else { c })
        .collect();
    if raw.chars().count() > MAX_ECHO_CHARS {
        format!("{}...", cleaned)
    } else {
        cleaned
    }
}

/// Emit one audit entry. `outcome` is the stable wire code of the result
/// ("ok", "unauthorized", "invalid_address", "rate_limited",
/// "internal_error").
pub fn record(credential: &str, address: &str, outcome: &str, detail: Option<&str>) {
    match detail {
        Some(detail) => tracing::info!(
            target: "audit",
            credential,
            address,
            outcome,
            detail,
            "balance request"
        ),
        None => tracing::info!(
            target: "audit",
            credential,
            address,
            outcome,
            "balance request"
        ),
    }
}
