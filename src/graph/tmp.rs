//! Temporary nodes and deferred retain (spec.md §4.4.5).
//!
//! Staged contributions are tracked directly (as a `Vec<StagedContribution>`
//! per predicate) rather than through the original's "encode the
//! contribution index into the high bits of a temporary node id" trick —
//! the index travels alongside each row as we merge contributions, which is
//! the same information the bit-packing recovers, without requiring a
//! reserved id subrange per contribution. See `DESIGN.md`.

use std::cmp::Ordering;

use crate::column::Column;
use crate::error::{ChaseError, ChaseResult};
use crate::segment::{NodeId, Segment};
use crate::term::{PredId, Term};

use super::GbGraph;

/// One rule's output staged for deferred retain (`GBGraph_TmpPredNode` in
/// `gbgraph.h`).
#[derive(Clone, Debug)]
pub struct StagedContribution {
    pub data: Segment,
    pub predecessors: Vec<NodeId>,
    pub rule_idx: Option<usize>,
    pub step: u64,
}

impl GbGraph {
    /// `addNodeToBeRetained(predId, data, predecessors, ruleIdx, step)`
    /// (spec.md §4.4.5). Capped at 2^24 staged contributions per predicate
    /// per step.
    pub fn add_node_to_be_retained(
        &mut self,
        pred: PredId,
        data: Segment,
        predecessors: Vec<NodeId>,
        rule_idx: Option<usize>,
        step: u64,
    ) -> ChaseResult<()> {
        let list = self.staged.entry(pred).or_default();
        if list.len() as u64 >= self.config.max_staged_contributions {
            return Err(ChaseError::TooManyStagedContributions(pred));
        }
        list.push(StagedContribution {
            data,
            predecessors,
            rule_idx,
            step,
        });
        Ok(())
    }

    /// `retainAndAddFromTmpNodes(predId)` (spec.md §4.4.5): concatenates all
    /// staged contributions, deduplicates against each other and against
    /// existing nodes, then creates one permanent node per original
    /// contribution whose rows survived.
    pub fn retain_and_add_from_tmp_nodes(&mut self, pred: PredId) -> ChaseResult<Vec<NodeId>> {
        let contributions = self.staged.remove(&pred).unwrap_or_default();
        if contributions.is_empty() {
            return Ok(Vec::new());
        }
        let arity = contributions[0].data.arity();

        let mut columns: Vec<Vec<Term>> = vec![Vec::new(); arity];
        let mut contrib_idx: Vec<u64> = Vec::new();
        for (ci, contribution) in contributions.iter().enumerate() {
            let seg = contribution.data.columnar();
            for i in 0..seg.nrows() {
                let row = seg.row(i);
                for (col, v) in columns.iter_mut().zip(row) {
                    col.push(v);
                }
                contrib_idx.push(ci as u64);
            }
        }

        let n = contrib_idx.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            for col in &columns {
                match col[a].cmp(&col[b]) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            Ordering::Equal
        });

        let mut kept: Vec<usize> = Vec::with_capacity(n);
        let mut last: Option<Vec<Term>> = None;
        for &i in &order {
            let row: Vec<Term> = columns.iter().map(|c| c[i]).collect();
            if last.as_ref() != Some(&row) {
                kept.push(i);
                last = Some(row);
            }
        }

        let dedup_columns: Vec<Column> = columns
            .iter()
            .map(|c| Column::dense(kept.iter().map(|&i| c[i]).collect()))
            .collect();
        let dedup_contrib: Vec<u64> = kept.iter().map(|&i| contrib_idx[i]).collect();
        let candidate = Segment::from_columns(dedup_columns);

        let retained = self.retain(pred, candidate.clone());
        let candidate_c = candidate.columnar();
        let retained_c = retained.columnar();

        // `retain`'s antijoin preserves relative row order, so `retained_c`
        // is a subsequence of `candidate_c`; a two-pointer merge recovers
        // which contribution each surviving row came from.
        let mut contrib_for_retained = Vec::with_capacity(retained_c.nrows());
        let mut j = 0;
        for i in 0..candidate_c.nrows() {
            if j >= retained_c.nrows() {
                break;
            }
            if candidate_c.row(i) == retained_c.row(j) {
                contrib_for_retained.push(dedup_contrib[i]);
                j += 1;
            }
        }

        let mut node_ids = Vec::new();
        for (ci, contribution) in contributions.iter().enumerate() {
            let idxs: Vec<usize> = (0..retained_c.nrows())
                .filter(|&k| contrib_for_retained[k] == ci as u64)
                .collect();
            if idxs.is_empty() {
                continue;
            }
            let seg = retained_c.select_rows(&idxs);
            let id = self.add_node_prov(
                pred,
                contribution.rule_idx,
                contribution.step,
                Segment::Columnar(seg),
                contribution.predecessors.clone(),
            )?;
            node_ids.push(id);
        }
        self.invalidate_cache(pred);
        Ok(node_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChaseConfig;

    fn seg1(vals: &[u64]) -> Segment {
        Segment::from_columns(vec![Column::dense(vals.iter().map(|&v| Term(v)).collect())])
    }

    #[test]
    fn staged_contributions_dedup_across_each_other_and_produce_one_node_each() {
        let mut g = GbGraph::new(ChaseConfig::default());
        let p = PredId(0);
        g.add_node_to_be_retained(p, seg1(&[1, 2]), vec![], None, 0).unwrap();
        g.add_node_to_be_retained(p, seg1(&[2, 3]), vec![], None, 0).unwrap();
        let ids = g.retain_and_add_from_tmp_nodes(p).unwrap();
        assert_eq!(ids.len(), 2);
        let total: usize = ids.iter().map(|&id| g.get_node(id).unwrap().size()).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn staged_cap_rejects_beyond_configured_limit() {
        let mut cfg = ChaseConfig::default();
        cfg.max_staged_contributions = 1;
        let mut g = GbGraph::new(cfg);
        let p = PredId(0);
        g.add_node_to_be_retained(p, seg1(&[1]), vec![], None, 0).unwrap();
        let err = g.add_node_to_be_retained(p, seg1(&[2]), vec![], None, 0).unwrap_err();
        assert!(matches!(err, ChaseError::TooManyStagedContributions(_)));
    }
}
