//! Term replacement for equality-generating dependencies (spec.md §4.4.4).

use std::collections::HashMap;

use crate::column::Column;
use crate::error::{ChaseError, ChaseResult};
use crate::segment::Segment;
use crate::term::{PredId, Term};

use super::GbGraph;

impl GbGraph {
    /// `replaceEqualTerms(ruleIdx, step, pairs)` (spec.md §4.4.4). `pairs` is
    /// a binary segment of `(a, b)` rows meaning "a equals b".
    #[tracing::instrument(skip(self, pairs), fields(rule_idx, step))]
    pub fn replace_equal_terms(
        &mut self,
        rule_idx: usize,
        step: u64,
        pairs: Segment,
    ) -> ChaseResult<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        let c = pairs.columnar();
        assert_eq!(c.arity(), 2, "replace_equal_terms expects a binary segment of (a, b) pairs");

        let threshold = self.config.null_threshold;
        let mut normalized: Vec<(u64, u64)> = Vec::with_capacity(c.nrows());
        for i in 0..c.nrows() {
            let row = c.row(i);
            let (a, b) = (row[0].0, row[1].0);
            if a == b {
                continue;
            }
            let (winner, loser) = if a < b { (a, b) } else { (b, a) };
            if loser < threshold {
                // Two non-null constants forced equal: "due to UNA, the
                // chase does not exist" (spec.md §4.4.4 step 4, scenario S3).
                return Err(ChaseError::UnaContradiction { a: winner, b: loser, pred: None });
            }
            normalized.push((winner, loser));
        }
        normalized.sort_unstable();
        normalized.dedup();

        let mut map: HashMap<u64, u64> = HashMap::new();
        for (winner, loser) in normalized {
            map.entry(loser).or_insert(winner);
        }
        // Rewrite transitively until a fixpoint: if a loser also maps to
        // another loser, follow the chain to its ultimate winner.
        let losers: Vec<u64> = map.keys().copied().collect();
        for loser in losers {
            let mut target = map[&loser];
            let mut steps = 0usize;
            while let Some(&next) = map.get(&target) {
                if next == target || steps > map.len() {
                    break;
                }
                target = next;
                steps += 1;
            }
            map.insert(loser, target);
        }

        let preds: Vec<PredId> = self.pred2nodes.keys().copied().collect();
        for pred in preds {
            let ids = self.nodes_of(pred).to_vec();
            let arity = ids.first().map(|&id| self.get_node(id).unwrap().arity()).unwrap_or(0);
            let mut rewritten_rows: Vec<Vec<Term>> = Vec::new();
            let mut changed_any = false;

            for &id in &ids {
                let seg = self.nodes[id.0 as usize].data.columnar();
                let mut kept_idx = Vec::with_capacity(seg.nrows());
                let mut local_changed = false;
                for i in 0..seg.nrows() {
                    let mut row = seg.row(i);
                    let mut row_changed = false;
                    for t in row.iter_mut() {
                        if let Some(&winner) = map.get(&t.0) {
                            t.0 = winner;
                            row_changed = true;
                        }
                    }
                    if row_changed {
                        rewritten_rows.push(row);
                        local_changed = true;
                    } else {
                        kept_idx.push(i);
                    }
                }
                if local_changed {
                    changed_any = true;
                    self.nodes[id.0 as usize].data = Segment::Columnar(seg.select_rows(&kept_idx));
                }
            }

            if changed_any {
                let columns: Vec<Column> = (0..arity)
                    .map(|ci| Column::dense(rewritten_rows.iter().map(|r| r[ci]).collect()))
                    .collect();
                let candidate = Segment::from_columns(columns).sort().unique();
                let retained = self.retain(pred, candidate);
                if !retained.is_empty() {
                    self.add_node_prov(pred, Some(rule_idx), step, retained, Vec::new())?;
                }
                self.invalidate_cache(pred);
            }
        }
        Ok(())
    }
}
