//! Unique identifiers for requests and batches.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Hint that selects the compact 12 hex character form.
pub const SHORT_ID_HINT: &str = "short";

const SHORT_MASK: u64 = (1 << 48) - 1;

static SHORT_BASE: OnceLock<u64> = OnceLock::new();
static SHORT_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A globally unique id (32 hex chars), or with the `"short"` hint a 12 hex
/// char id that does not repeat within this process.
pub fn new_unique_id(hint: Option<&str>) -> String {
    match hint {
        Some(h) if h.eq_ignore_ascii_case(SHORT_ID_HINT) => short_id(),
        _ => Uuid::new_v4().simple().to_string(),
    }
}

// Random 48-bit start + process-wide counter: unique for 2^48 calls.
fn short_id() -> String {
    let base = *SHORT_BASE.get_or_init(|| (Uuid::new_v4().as_u128() as u64) & SHORT_MASK);
    let n = SHORT_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:012x}", base.wrapping_add(n) & SHORT_MASK)
}
