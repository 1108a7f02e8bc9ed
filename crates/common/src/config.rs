//! Concurrency parameters for stream variables

/// Default number of buffered elements before producers park.
pub const DEFAULT_OUTPUT_BOUND: usize = 64;

/// Parameters for a single stream variable.
///
/// `bound` is the producer-side backpressure threshold: a worker that finds
/// the output buffer at the bound parks its continuation instead of
/// enqueueing. `limit` optionally caps how many workers may run at once;
/// branches beyond the limit stay queued until a worker exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SVarConfig {
    /// Maximum number of buffered output elements. Must be positive.
    pub bound: usize,
    /// Optional cap on concurrently running workers.
    pub limit: Option<usize>,
}

impl Default for SVarConfig {
    fn default() -> Self {
        Self {
            bound: DEFAULT_OUTPUT_BOUND,
            limit: None,
        }
    }
}

impl SVarConfig {
    /// Config with the given buffer bound and no worker cap.
    pub fn bounded(bound: usize) -> Self {
        Self {
            bound,
            limit: None,
        }
    }

    /// Cap the number of concurrently running workers.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
