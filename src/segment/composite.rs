//! The lazy composite segment (spec.md §4.4.3 `mergeNodes(..., lazy=true)`,
//! §9 "Composite/lazy segments").
//!
//! Holds references to several nodes' already-projected columns without
//! concatenating them; [`Segment::columnar`](super::Segment::columnar) is the
//! only thing that forces materialization, matching spec.md's "concrete
//! materialization deferred until `iterator()` or `sort()` is called".

use crate::column::Column;
use crate::term::Term;

use super::{ColumnarSegment, NodeId, Provenance};

/// One source node's contribution: its projected data plus the node id every
/// one of its rows should report as predecessor once materialized.
#[derive(Clone, Debug)]
pub struct CompositeSegment {
    parts: Vec<(NodeId, ColumnarSegment)>,
    arity: usize,
}

impl CompositeSegment {
    /// `parts` must already be projected to the same column layout (the
    /// caller — `mergeNodes` — projects each source node before handing it
    /// here).
    #[must_use]
    pub fn new(parts: Vec<(NodeId, ColumnarSegment)>) -> Self {
        let arity = parts.first().map_or(0, |(_, s)| s.arity());
        CompositeSegment { parts, arity }
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity
    }

    #[must_use]
    pub fn nrows(&self) -> usize {
        self.parts.iter().map(|(_, s)| s.nrows()).sum()
    }

    #[must_use]
    pub fn materialize(&self) -> ColumnarSegment {
        let mut columns: Vec<Vec<Term>> = vec![Vec::new(); self.arity];
        let mut node_ids: Vec<Term> = Vec::with_capacity(self.nrows());
        for (nid, part) in &self.parts {
            for (ci, out) in columns.iter_mut().enumerate() {
                out.extend(part.columns()[ci].reader());
            }
            node_ids.extend(std::iter::repeat(Term(nid.0)).take(part.nrows()));
        }
        let columns = columns.into_iter().map(Column::dense).collect();
        ColumnarSegment::new(columns, Provenance::DiffNodes(Column::dense(node_ids)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Segment;

    #[test]
    fn materialize_concatenates_parts_with_diffnodes_provenance() {
        let part_a = ColumnarSegment::new(
            vec![Column::dense(vec![Term(1), Term(2)])],
            Provenance::NoProv,
        );
        let part_b = ColumnarSegment::new(vec![Column::dense(vec![Term(3)])], Provenance::NoProv);
        let composite = CompositeSegment::new(vec![(NodeId(10), part_a), (NodeId(11), part_b)]);
        let seg = Segment::Composite(composite);
        assert_eq!(seg.nrows(), 3);
        let materialized = seg.columnar();
        assert_eq!(materialized.row(0), vec![Term(1)]);
        assert_eq!(
            materialized.provenance().node_id_at(2),
            Some(NodeId(11))
        );
    }
}
