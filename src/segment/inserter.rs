//! `SegmentInserter`: a builder collecting rows into a new segment (spec.md
//! §2 "Segment Inserter: builder collecting rows into a new segment").
//!
//! Neither the join pipeline (`executor::mod`, row-major `Vec<Vec<Term>>`
//! accumulators) nor term replacement (`graph::egd`, which builds `Column`s
//! directly from a rewritten-row buffer) currently goes through this type —
//! it is kept because spec.md §2 lists it as a distinct component, available
//! to any collaborator that wants to accumulate rows one at a time rather
//! than building column vectors up front.

use crate::column::Column;
use crate::term::Term;

use super::{NodeId, Provenance, Segment};

/// Collects rows (and, optionally, one predecessor node id per row) before
/// sealing them into a [`Segment`].
pub struct SegmentInserter {
    arity: usize,
    columns: Vec<Vec<Term>>,
    node_ids: Option<Vec<Term>>,
}

impl SegmentInserter {
    #[must_use]
    pub fn new(arity: usize, track_provenance: bool) -> Self {
        SegmentInserter {
            arity,
            columns: vec![Vec::new(); arity],
            node_ids: track_provenance.then(Vec::new),
        }
    }

    /// Appends one row. `node_id` is required iff this inserter was built
    /// with `track_provenance = true`.
    pub fn push_row(&mut self, row: &[Term], node_id: Option<NodeId>) {
        debug_assert_eq!(row.len(), self.arity, "row arity mismatch in SegmentInserter");
        for (col, v) in self.columns.iter_mut().zip(row) {
            col.push(*v);
        }
        if let Some(ids) = &mut self.node_ids {
            ids.push(Term(node_id.expect("provenance-tracking inserter requires a node id").0));
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Seals the accumulated rows into a [`Segment`]. `DIFFNODES`
    /// provenance when node ids were tracked, `NOPROV` otherwise.
    #[must_use]
    pub fn finish(self) -> Segment {
        let columns: Vec<Column> = self.columns.into_iter().map(Column::dense).collect();
        match self.node_ids {
            Some(ids) => Segment::with_provenance(columns, Provenance::DiffNodes(Column::dense(ids))),
            None => Segment::from_columns(columns),
        }
    }
}
