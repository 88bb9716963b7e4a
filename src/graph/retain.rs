//! The retain protocol (spec.md §4.4.2).

use std::time::Instant;

use crate::column::Column;
use crate::segment::{antijoin_rows, ColumnarSegment, NodeId, Segment};
use crate::term::PredId;

use super::cache::RetainCache;
use super::GbGraph;

impl GbGraph {
    /// `retain(predId, newtuples)` (spec.md §4.4.2): returns the subset of
    /// `newtuples` not already present in any existing node of `predId`.
    #[tracing::instrument(skip(self, newtuples), fields(pred = %pred))]
    pub fn retain(&mut self, pred: PredId, newtuples: Segment) -> Segment {
        let start = Instant::now();
        if self.config.duplicates_allowed || newtuples.is_empty() {
            self.stats.retain_time += start.elapsed();
            return newtuples;
        }
        let node_ids = self.nodes_of(pred).to_vec();
        let result = if self.config.cache_retain_enabled && node_ids.len() > 1 {
            self.retain_cached(pred, &node_ids, newtuples)
        } else {
            self.retain_uncached(&node_ids, newtuples)
        };
        self.stats.retain_time += start.elapsed();
        result
    }

    /// `retain`'s uncached mode: `newtuples <- antijoin(N.data, newtuples)`
    /// for every existing node `N`, short-circuiting once empty.
    fn retain_uncached(&self, node_ids: &[NodeId], mut newtuples: Segment) -> Segment {
        for &id in node_ids {
            if newtuples.is_empty() {
                break;
            }
            let node = self.get_node(id).expect("pred2nodes entry must resolve to a live node");
            let (next, all_new) = antijoin_rows(&node.data, &newtuples);
            if !all_new {
                newtuples = next;
            }
        }
        newtuples
    }

    /// `retain`'s cached mode: extend the merged cache from the last seen
    /// node count forward, then antijoin once against the whole cache.
    fn retain_cached(&mut self, pred: PredId, node_ids: &[NodeId], newtuples: Segment) -> Segment {
        let edb_start = Instant::now();
        let needs_extend = {
            let entry = self.cache.entry(pred).or_insert(RetainCache { nnodes: 0, seg: None });
            entry.nnodes < node_ids.len()
        };
        if needs_extend {
            let entry_nnodes = self.cache.get(&pred).unwrap().nnodes;
            let mut parts: Vec<Segment> = self
                .cache
                .get(&pred)
                .and_then(|e| e.seg.clone())
                .into_iter()
                .collect();
            for &id in &node_ids[entry_nnodes..] {
                parts.push(self.get_node(id).unwrap().data.clone());
            }
            let merged = concat_and_dedup(&parts);
            let entry = self.cache.get_mut(&pred).unwrap();
            entry.seg = Some(merged);
            entry.nnodes = node_ids.len();
            self.stats.retain_cache_misses += 1;
        } else {
            self.stats.retain_cache_hits += 1;
        }
        self.stats.edb_check_time += edb_start.elapsed();
        let cached = self.cache.get(&pred).and_then(|e| e.seg.clone());
        match cached {
            None => newtuples,
            Some(cached) => {
                let (result, all_new) = antijoin_rows(&cached, &newtuples);
                if all_new {
                    newtuples
                } else {
                    result
                }
            }
        }
    }
}

fn concat_and_dedup(parts: &[Segment]) -> Segment {
    let arity = parts.iter().map(Segment::arity).find(|&a| a > 0).unwrap_or(0);
    let mut columns: Vec<Vec<crate::term::Term>> = vec![Vec::new(); arity];
    for p in parts {
        let c: ColumnarSegment = p.columnar();
        for (ci, out) in columns.iter_mut().enumerate() {
            out.extend(c.columns()[ci].reader());
        }
    }
    let seg = Segment::from_columns(columns.into_iter().map(Column::dense).collect());
    seg.sort().unique()
}
