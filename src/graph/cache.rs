//! The retain cache (spec.md §4.4.2 "Cached" retain mode) and the Segment
//! Cache (spec.md §4.5), both keyed per predicate.

use std::collections::HashMap;

use crate::segment::{NodeId, Segment};
use crate::term::{PredId, Term};

use super::GbGraph;

/// `CacheRetainEntry` in `gbgraph.h`: the merged+sorted+dedup'd contents of
/// every node of one predicate seen so far, plus how many nodes contributed.
#[derive(Clone, Debug)]
pub(super) struct RetainCache {
    pub nnodes: usize,
    pub seg: Option<Segment>,
}

/// Segment Cache key (spec.md §4.5): "keyed by (sorted list of node ids,
/// sort-field list)". Node ids are sorted before insertion so the key is
/// independent of the order `node_ids` was passed in.
pub(super) type SegmentCacheKey = (Vec<NodeId>, Vec<usize>);
pub(super) type SegmentCacheMap = HashMap<PredId, HashMap<SegmentCacheKey, Segment>>;

impl GbGraph {
    /// Drops the cached merge for `pred` (spec.md §4.4.4 step 5, §4.4.6: must
    /// be invalidated whenever a node's `data` is mutated in place).
    pub(super) fn invalidate_cache(&mut self, pred: PredId) {
        self.cache.remove(&pred);
        self.segment_cache.lock().remove(&pred);
    }

    /// `sortedMergedSegment` (spec.md §4.5 "Segment Cache"): the merge of
    /// `node_ids`, sorted by `sort_fields`, memoized by the exact
    /// `(node ids, sort fields)` pair so a merge join over a stable node set
    /// (e.g. the same predicate read again within one step) does not
    /// re-merge and re-sort it every time. `filter_constants` bypasses the
    /// cache: a constant-filtered read's result depends on the filter too,
    /// and such reads are rarely repeated verbatim.
    #[must_use]
    pub fn sorted_merge_cached(
        &self,
        pred: PredId,
        node_ids: &[NodeId],
        filter_constants: Option<&[(usize, Term)]>,
        copy_var_pos: &[usize],
        sort_fields: &[usize],
    ) -> Segment {
        if filter_constants.is_some() {
            let merged = self.merge_nodes(node_ids, filter_constants, copy_var_pos, false, true);
            return merged.sort_by(sort_fields);
        }

        let mut key_ids = node_ids.to_vec();
        key_ids.sort_unstable();
        let key: SegmentCacheKey = (key_ids, sort_fields.to_vec());

        if let Some(hit) = self.segment_cache.lock().get(&pred).and_then(|m| m.get(&key)).cloned() {
            return hit;
        }

        let merged = self.merge_nodes(node_ids, None, copy_var_pos, false, true);
        let sorted = merged.sort_by(sort_fields);
        self.segment_cache.lock().entry(pred).or_default().insert(key, sorted.clone());
        sorted
    }
}
