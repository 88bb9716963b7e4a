//! Merging and consolidating nodes (spec.md §4.4.3 `mergeNodes`, §4.4.6
//! `mergeNodesWithPredicateIntoOne`).

use crate::column::Column;
use crate::error::ChaseResult;
use crate::segment::{ColumnarSegment, CompositeSegment, NodeId, Provenance, Segment};
use crate::term::{PredId, Term};

use super::GbGraph;

impl GbGraph {
    /// `mergeNodes(nodeIds, filterConstants, copyVarPos, lazy,
    /// removeDuplicates)` (spec.md §4.4.3). `filter_constants` is a list of
    /// `(column position, required value)` pairs applied to every source
    /// node before projection.
    #[must_use]
    pub fn merge_nodes(
        &self,
        node_ids: &[NodeId],
        filter_constants: Option<&[(usize, Term)]>,
        copy_var_pos: &[usize],
        lazy: bool,
        remove_duplicates: bool,
    ) -> Segment {
        let parts: Vec<(NodeId, ColumnarSegment)> = node_ids
            .iter()
            .map(|&id| {
                let node = self.get_node(id).expect("merge_nodes: unknown node id");
                let seg = node.data.columnar();
                let filtered = match filter_constants {
                    Some(filters) => seg.filter_rows(|row| {
                        filters.iter().all(|&(pos, val)| row[pos] == val)
                    }),
                    None => seg,
                };
                (id, filtered.project_to(copy_var_pos))
            })
            .collect();

        if node_ids.len() == 1 && filter_constants.is_none() {
            let (id, projected) = &parts[0];
            let node_arity = self.get_node(*id).unwrap().arity();
            let is_identity = copy_var_pos.len() == node_arity
                && copy_var_pos.iter().enumerate().all(|(i, &p)| i == p);
            if is_identity {
                return self.get_node(*id).unwrap().data.clone();
            }
            if copy_var_pos.len() == 1 {
                let column = projected.columns()[0].clone();
                return Segment::with_provenance(vec![column], Provenance::SameNode(*id));
            }
        }

        if lazy {
            return Segment::Composite(CompositeSegment::new(parts));
        }

        let materialized = Segment::Composite(CompositeSegment::new(parts)).columnar();
        let result = Segment::Columnar(materialized);
        if remove_duplicates {
            result.sort().unique()
        } else {
            result
        }
    }

    /// `mergeNodesWithPredicateIntoOne(predId)` (spec.md §4.4.6): collapses
    /// every node of `predId` into a single sorted/deduplicated node at the
    /// highest existing step, zero-sizing all prior nodes.
    pub fn merge_nodes_with_predicate_into_one(&mut self, pred: PredId) -> ChaseResult<usize> {
        let ids = self.nodes_of(pred).to_vec();
        if ids.is_empty() {
            return Ok(0);
        }
        let arity = self.get_node(ids[0]).unwrap().arity();
        let copy_var_pos: Vec<usize> = (0..arity).collect();
        let merged = self.merge_nodes(&ids, None, &copy_var_pos, false, true);
        let n_rows = merged.nrows();
        let max_step = ids.iter().map(|&id| self.get_node(id).unwrap().step).max().unwrap_or(0);

        for &id in &ids {
            let empty = Segment::from_columns((0..arity).map(|_| Column::dense(Vec::new())).collect());
            self.nodes[id.0 as usize].data = empty;
        }
        self.invalidate_cache(pred);
        self.add_node_prov(pred, None, max_step, merged, Vec::new())?;
        Ok(n_rows)
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
    fn single_node_identity_projection_returns_node_segment_directly() {
        let mut g = GbGraph::new(ChaseConfig::default());
        let p = PredId(0);
        let id = g.add_node_prov(p, None, 0, seg1(&[1, 2]), vec![]).unwrap();
        let merged = g.merge_nodes(&[id], None, &[0], false, true);
        assert_eq!(merged.nrows(), 2);
    }

    #[test]
    fn merge_nodes_with_predicate_into_one_consolidates_and_zeroes(
    ) {
        let mut g = GbGraph::new(ChaseConfig::default());
        let p = PredId(0);
        let n1 = g.add_node_prov(p, None, 0, seg1(&[1, 2]), vec![]).unwrap();
        let n2 = g.add_node_prov(p, None, 1, seg1(&[2, 3]), vec![]).unwrap();
        let n3 = g.add_node_prov(p, None, 2, seg1(&[3, 4]), vec![]).unwrap();
        let count = g.merge_nodes_with_predicate_into_one(p).unwrap();
        assert_eq!(count, 4);
        assert_eq!(g.get_node(n1).unwrap().size(), 0);
        assert_eq!(g.get_node(n2).unwrap().size(), 0);
        assert_eq!(g.get_node(n3).unwrap().size(), 0);
        let ids = g.nodes_of(p).to_vec();
        let last = *ids.last().unwrap();
        let node = g.get_node(last).unwrap();
        assert_eq!(node.step, 2);
        let rows: Vec<u64> = (0..node.data.nrows()).map(|i| node.data.columnar().row(i)[0].0).collect();
        assert_eq!(rows, vec![1, 2, 3, 4]);
    }
}
