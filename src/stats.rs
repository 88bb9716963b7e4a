//! Statistics and timings exposed by the derivation core (spec.md §6:
//! "statistics (counts of nodes, facts, edges); timings of retain,
//! query-containment, and EDB checks").
//!
//! Query-containment based redundancy elimination is not implemented (it is
//! an alternative to `retain` the original engine supports behind a flag we
//! do not carry — see `SPEC_FULL.md` §3); the timing field for it is kept at
//! zero so hosts that read all three timings uniformly don't need a special
//! case, matching how the original `GBGraph` keeps `durationQueryContain`
//! fields even when that path is disabled.

use std::time::Duration;

/// Cumulative counters and timings for one [`crate::graph::GbGraph`].
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// Total number of permanent nodes ever added.
    pub nodes_created: u64,
    /// Total number of facts across all live (non-zeroed) nodes.
    pub facts_retained: u64,
    /// Total number of incoming edges recorded across all nodes.
    pub edges_recorded: u64,

    /// Time spent inside `retain` (both cached and uncached paths).
    pub retain_time: Duration,
    /// Time spent checking query containment. Always zero: not implemented.
    pub query_containment_time: Duration,
    /// Time spent in EDB-layer `check_new_in` calls.
    pub edb_check_time: Duration,

    /// Number of `retain` calls served entirely from the merged cache.
    pub retain_cache_hits: u64,
    /// Number of `retain` calls that rebuilt or extended the cache.
    pub retain_cache_misses: u64,
}

impl Statistics {
    pub fn record_node(&mut self, n_facts: u64, n_edges: u64) {
        self.nodes_created += 1;
        self.facts_retained += n_facts;
        self.edges_recorded += n_edges;
    }
}
