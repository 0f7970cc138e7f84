//! Usage: Security-sensitive helpers (token masking for logs, constant-time equality).

use subtle::ConstantTimeEq;

const MASK_VISIBLE_PREFIX: usize = 4;
const MASK_VISIBLE_SUFFIX: usize = 4;

/// Shortens a bearer token to `abcd...wxyz` so diagnostics never carry a
/// usable credential. Values too short to mask safely are fully redacted.
pub(crate) fn mask_token(token: &str) -> String {
    let trimmed = token.trim();
    let len = trimmed.len();
    if len == 0 {
        return String::new();
    }
    if len <= MASK_VISIBLE_PREFIX + MASK_VISIBLE_SUFFIX {
        return "*".repeat(len);
    }
    format!(
        "{}...{}",
        &trimmed[..MASK_VISIBLE_PREFIX],
        &trimmed[len - MASK_VISIBLE_SUFFIX..]
    )
}

/// Timing-safe comparison for the oauth state nonce.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
