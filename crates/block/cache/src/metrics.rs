//! Block cache metrics.

use metrics::Counter;

/// Block cache counters.
#[derive(Clone, Debug)]
pub(crate) struct CacheMetrics {
    /// Reads answered by the local store
    pub(crate) hits: Counter,
    /// Reads the local store could not answer
    pub(crate) misses: Counter,
    /// Verified fills from upstream
    pub(crate) fills: Counter,
    /// Upstream blocks rejected by digest verification
    pub(crate) wrong_hash: Counter,
    /// Verified fills the local store failed to keep
    pub(crate) population_failures: Counter,
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self {
            hits: metrics::counter!("cache.hits_total"),
            misses: metrics::counter!("cache.misses_total"),
            fills: metrics::counter!("cache.fills_total"),
            wrong_hash: metrics::counter!("cache.wrong_hash_total"),
            population_failures: metrics::counter!("cache.population_failures_total"),
        }
    }
}
