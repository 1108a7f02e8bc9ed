//! Telemetry identifiers

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ACCOUNT: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique account id.
///
/// Account ids label scheduler instances in trace output so concurrent
/// pipelines can be told apart. They carry no other meaning.
pub fn next_account_id() -> u64 {
    NEXT_ACCOUNT.fetch_add(1, Ordering::Relaxed)
}
