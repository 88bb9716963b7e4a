//! Columnar tuple segments with optional provenance (spec.md §3 Segment,
//! §4.2 Segment contracts).
//!
//! spec.md §9 suggests a tagged union of specialized unary/binary/wide
//! shapes mirroring the original's template-inherited segment hierarchy. We
//! take the simpler half of that recommendation: one generic columnar
//! representation ([`ColumnarSegment`]) handles every arity (the original's
//! unary/binary specializations exist purely for C++ cache-line layout, which
//! a `Vec<Column>` of `Arc`-shared columns already gets for free in this
//! language), plus the [`CompositeSegment`] lazy façade spec.md explicitly
//! calls out as a distinct shape. This trade is recorded in `DESIGN.md`.

mod composite;
mod inserter;

pub use composite::CompositeSegment;
pub use inserter::SegmentInserter;

use std::cmp::Ordering;

use crate::column::Column;
use crate::term::Term;

/// The id of a node in the derivation graph. Defined here (rather than in
/// `crate::graph`) because provenance is a segment-level concept; the graph
/// module is the thing that interprets these ids against its node vector.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(pub u64);

/// Sentinel standing in for "derived from the EDB, no predecessor node"
/// (spec.md §3 "`~0`"). Deliberately outside the permanent-node id range
/// (`0..nodes.len()`) *and* the reserved temporary-node range
/// (`[START_COUNTER_TMP_NODES, ...)`) is not guaranteed by its numeric value
/// alone — callers that split rows by predecessor (`GbGraph::add_nodes_prov`)
/// must special-case this id rather than treat it as an ordinary node
/// reference.
pub const EDB_PREDECESSOR: NodeId = NodeId(u64::MAX);

/// One level of `FULLPROV` ancestry: the row offset within a predecessor
/// segment, paired with that predecessor's node id (spec.md §3: "alternating
/// row-offset and node-id" columns).
#[derive(Clone, Debug)]
pub struct ProvLevel {
    pub offsets: Column,
    pub node_ids: Column,
}

/// The four provenance modes of spec.md §3.
#[derive(Clone, Debug)]
pub enum Provenance {
    NoProv,
    SameNode(NodeId),
    DiffNodes(Column),
    FullProv(Vec<ProvLevel>),
}

impl Provenance {
    /// The predecessor node id for row `i`, or `None` for `NOPROV` (spec.md
    /// §4.2 `iterator()`: "the row's predecessor when `DIFFNODES`/`FULLPROV`,
    /// else the segment's constant node id").
    #[must_use]
    pub fn node_id_at(&self, row: usize) -> Option<NodeId> {
        match self {
            Provenance::NoProv => None,
            Provenance::SameNode(id) => Some(*id),
            Provenance::DiffNodes(col) => Some(NodeId(col.get(row).0)),
            Provenance::FullProv(levels) => levels.first().map(|l| NodeId(l.node_ids.get(row).0)),
        }
    }

    fn take(&self, idx: &[usize]) -> Provenance {
        match self {
            Provenance::NoProv => Provenance::NoProv,
            Provenance::SameNode(id) => Provenance::SameNode(*id),
            Provenance::DiffNodes(col) => Provenance::DiffNodes(gather(col, idx)),
            Provenance::FullProv(levels) => Provenance::FullProv(
                levels
                    .iter()
                    .map(|l| ProvLevel {
                        offsets: gather(&l.offsets, idx),
                        node_ids: gather(&l.node_ids, idx),
                    })
                    .collect(),
            ),
        }
    }

    fn slice(&self, lo: usize, hi: usize) -> Provenance {
        match self {
            Provenance::NoProv => Provenance::NoProv,
            Provenance::SameNode(id) => Provenance::SameNode(*id),
            Provenance::DiffNodes(col) => Provenance::DiffNodes(col.slice(lo, hi)),
            Provenance::FullProv(levels) => Provenance::FullProv(
                levels
                    .iter()
                    .map(|l| ProvLevel {
                        offsets: l.offsets.slice(lo, hi),
                        node_ids: l.node_ids.slice(lo, hi),
                    })
                    .collect(),
            ),
        }
    }
}

fn gather(col: &Column, idx: &[usize]) -> Column {
    Column::dense(idx.iter().map(|&i| col.get(i)).collect())
}

/// One arity-N block of tuples (spec.md §3 Segment).
#[derive(Clone, Debug)]
pub struct ColumnarSegment {
    columns: Vec<Column>,
    provenance: Provenance,
    /// `Some(field)` when known sorted by that single column position
    /// (spec.md §3: "sorted-by-field flag").
    sorted_by: Option<usize>,
}

impl ColumnarSegment {
    #[must_use]
    pub fn new(columns: Vec<Column>, provenance: Provenance) -> Self {
        ColumnarSegment {
            columns,
            provenance,
            sorted_by: None,
        }
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn nrows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nrows() == 0
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    #[must_use]
    pub fn sorted_by(&self) -> Option<usize> {
        self.sorted_by
    }

    #[must_use]
    pub fn row(&self, i: usize) -> Vec<Term> {
        self.columns.iter().map(|c| c.get(i)).collect()
    }

    fn take_rows(&self, idx: &[usize]) -> ColumnarSegment {
        let columns = self.columns.iter().map(|c| gather(c, idx)).collect();
        ColumnarSegment {
            columns,
            provenance: self.provenance.take(idx),
            sorted_by: None,
        }
    }

    /// `sortBy(fields)` (spec.md §4.2): lexicographic sort by the given
    /// column positions, carrying provenance along with each row.
    #[must_use]
    pub fn sort_by(&self, fields: &[usize]) -> ColumnarSegment {
        let mut idx: Vec<usize> = (0..self.nrows()).collect();
        idx.sort_by(|&a, &b| {
            for &f in fields {
                match self.columns[f].get(a).cmp(&self.columns[f].get(b)) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            Ordering::Equal
        });
        let mut out = self.take_rows(&idx);
        out.sorted_by = if fields.len() == 1 { Some(fields[0]) } else { None };
        out
    }

    #[must_use]
    pub fn sort(&self) -> ColumnarSegment {
        if self.columns.is_empty() {
            return self.clone();
        }
        self.sort_by(&[0])
    }

    /// `unique()` (spec.md §4.2): requires sorted input; compares data
    /// columns only, keeps the first occurrence's provenance.
    #[must_use]
    pub fn unique(&self) -> ColumnarSegment {
        let n = self.nrows();
        let mut keep = Vec::with_capacity(n);
        let mut last: Option<Vec<Term>> = None;
        for i in 0..n {
            let row = self.row(i);
            if last.as_ref() != Some(&row) {
                keep.push(i);
                last = Some(row);
            }
        }
        let mut out = self.take_rows(&keep);
        out.sorted_by = self.sorted_by;
        out
    }

    /// `sortByProv()` (spec.md §4.2): stable sort by predecessor node id.
    #[must_use]
    pub fn sort_by_prov(&self) -> ColumnarSegment {
        let mut idx: Vec<usize> = (0..self.nrows()).collect();
        idx.sort_by_key(|&i| self.provenance.node_id_at(i).map_or(0, |id| id.0));
        self.take_rows(&idx)
    }

    /// `sliceByNodes` (spec.md §4.2). Assumes the segment is already sorted
    /// by predecessor (the caller, per spec.md §4.4.1 step 1, always calls
    /// [`Self::sort_by_prov`] first); partitions into contiguous
    /// equal-predecessor runs and returns each run tagged with its original
    /// predecessor id.
    #[must_use]
    pub fn slice_by_nodes(&self) -> Vec<(NodeId, ColumnarSegment)> {
        let n = self.nrows();
        let mut out = Vec::new();
        let mut start = 0;
        while start < n {
            let pid = self.provenance.node_id_at(start).unwrap_or(NodeId(0));
            let mut end = start + 1;
            while end < n && self.provenance.node_id_at(end) == Some(pid) {
                end += 1;
            }
            out.push((pid, self.slice(start, end)));
            start = end;
        }
        out
    }

    #[must_use]
    pub fn slice(&self, lo: usize, hi: usize) -> ColumnarSegment {
        ColumnarSegment {
            columns: self.columns.iter().map(|c| c.slice(lo, hi)).collect(),
            provenance: self.provenance.slice(lo, hi),
            sorted_by: self.sorted_by,
        }
    }

    /// `swap()` (spec.md §4.2): exchange the two data columns of a binary segment.
    #[must_use]
    pub fn swap(&self) -> ColumnarSegment {
        assert_eq!(self.columns.len(), 2, "swap() requires a binary segment");
        ColumnarSegment {
            columns: vec![self.columns[1].clone(), self.columns[0].clone()],
            provenance: self.provenance.clone(),
            sorted_by: None,
        }
    }

    /// `projectTo(positions)` (spec.md §4.2): select a subset/permutation of
    /// data columns, provenance unchanged.
    #[must_use]
    pub fn project_to(&self, positions: &[usize]) -> ColumnarSegment {
        ColumnarSegment {
            columns: positions.iter().map(|&p| self.columns[p].clone()).collect(),
            provenance: self.provenance.clone(),
            sorted_by: None,
        }
    }

    /// `countHits(terms, col)` (spec.md §4.2): requires `col` sorted.
    #[must_use]
    pub fn count_hits(&self, terms: &[Term], col: usize) -> usize {
        self.columns[col].count_hits(terms)
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = (Vec<Term>, Option<NodeId>)> + '_ {
        (0..self.nrows()).map(move |i| (self.row(i), self.provenance.node_id_at(i)))
    }

    /// Selects an arbitrary (not necessarily contiguous) row subset,
    /// preserving order. Used by collaborators outside this module (the
    /// graph's EGD rewriting and deferred-retain machinery) that need to
    /// filter rows without re-deriving the whole index machinery themselves.
    #[must_use]
    pub fn select_rows(&self, idx: &[usize]) -> ColumnarSegment {
        self.take_rows(idx)
    }

    /// Keeps only rows matching `pred`, preserving order.
    #[must_use]
    pub fn filter_rows<F: Fn(&[Term]) -> bool>(&self, pred: F) -> ColumnarSegment {
        let keep: Vec<usize> = (0..self.nrows()).filter(|&i| pred(&self.row(i))).collect();
        self.take_rows(&keep)
    }
}

/// A segment, either a concrete columnar block or a lazily-concatenated
/// composite over several nodes (spec.md §4.4.3 `mergeNodes(lazy=true)`,
/// §9 "Composite/lazy segments"). Composite segments must never be added to
/// the permanent graph (spec.md §9, §7 `InvariantViolation`).
#[derive(Clone, Debug)]
pub enum Segment {
    Columnar(ColumnarSegment),
    Composite(CompositeSegment),
}

impl Segment {
    #[must_use]
    pub fn from_columns(columns: Vec<Column>) -> Segment {
        Segment::Columnar(ColumnarSegment::new(columns, Provenance::NoProv))
    }

    #[must_use]
    pub fn with_provenance(columns: Vec<Column>, provenance: Provenance) -> Segment {
        Segment::Columnar(ColumnarSegment::new(columns, provenance))
    }

    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(self, Segment::Composite(_))
    }

    #[must_use]
    pub fn nrows(&self) -> usize {
        match self {
            Segment::Columnar(c) => c.nrows(),
            Segment::Composite(c) => c.nrows(),
        }
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Segment::Columnar(c) => c.arity(),
            Segment::Composite(c) => c.arity(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nrows() == 0
    }

    /// Materializes a composite segment's columns; a no-op clone (cheap —
    /// columns are `Arc`-backed) for an already-columnar segment.
    #[must_use]
    pub fn columnar(&self) -> ColumnarSegment {
        match self {
            Segment::Columnar(c) => c.clone(),
            Segment::Composite(c) => c.materialize(),
        }
    }

    #[must_use]
    pub fn sort_by(&self, fields: &[usize]) -> Segment {
        Segment::Columnar(self.columnar().sort_by(fields))
    }

    #[must_use]
    pub fn sort(&self) -> Segment {
        Segment::Columnar(self.columnar().sort())
    }

    #[must_use]
    pub fn unique(&self) -> Segment {
        Segment::Columnar(self.columnar().unique())
    }

    #[must_use]
    pub fn sort_by_prov(&self) -> Segment {
        Segment::Columnar(self.columnar().sort_by_prov())
    }

    #[must_use]
    pub fn slice_by_nodes(&self) -> Vec<(NodeId, Segment)> {
        self.columnar()
            .slice_by_nodes()
            .into_iter()
            .map(|(id, seg)| (id, Segment::Columnar(seg)))
            .collect()
    }

    #[must_use]
    pub fn slice(&self, lo: usize, hi: usize) -> Segment {
        Segment::Columnar(self.columnar().slice(lo, hi))
    }

    #[must_use]
    pub fn swap(&self) -> Segment {
        Segment::Columnar(self.columnar().swap())
    }

    #[must_use]
    pub fn project_to(&self, positions: &[usize]) -> Segment {
        Segment::Columnar(self.columnar().project_to(positions))
    }

    #[must_use]
    pub fn count_hits(&self, terms: &[Term], col: usize) -> usize {
        match self {
            Segment::Columnar(c) => c.count_hits(terms, col),
            Segment::Composite(_) => self.columnar().count_hits(terms, col),
        }
    }

    /// The node id shared by every row of this segment, if it has one
    /// (spec.md §4.4.3 single-node / single-variable mergeNodes fast path).
    #[must_use]
    pub fn constant_node_id(&self) -> Option<NodeId> {
        match self {
            Segment::Columnar(c) => match &c.provenance {
                Provenance::SameNode(id) => Some(*id),
                _ => None,
            },
            Segment::Composite(_) => None,
        }
    }
}

/// Given two row-sorted segments (compared on their data columns only),
/// return the rows of `candidate` not present in `existing`, and whether
/// nothing at all was removed (spec.md §4.4.2 "generic" antijoin: "when no
/// duplicate was found, return the input segment unchanged").
#[must_use]
pub fn antijoin_rows(existing: &Segment, candidate: &Segment) -> (Segment, bool) {
    use std::collections::HashSet;
    let existing = existing.columnar();
    let candidate_c = candidate.columnar();
    let known: HashSet<Vec<Term>> = (0..existing.nrows()).map(|i| existing.row(i)).collect();
    let mut keep = Vec::with_capacity(candidate_c.nrows());
    let mut removed = false;
    for i in 0..candidate_c.nrows() {
        if known.contains(&candidate_c.row(i)) {
            removed = true;
        } else {
            keep.push(i);
        }
    }
    if !removed {
        return (candidate.clone(), true);
    }
    (Segment::Columnar(candidate_c.take_rows(&keep)), false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;

    fn seg2(a: &[u64], b: &[u64]) -> Segment {
        Segment::from_columns(vec![
            Column::dense(a.iter().map(|&v| Term(v)).collect()),
            Column::dense(b.iter().map(|&v| Term(v)).collect()),
        ])
    }

    #[test]
    fn sort_and_unique_dedupe_on_data_columns() {
        let s = seg2(&[2, 1, 1], &[20, 10, 10]);
        let sorted = s.sort_by(&[0, 1]);
        let c = sorted.columnar();
        assert_eq!(c.row(0), vec![Term(1), Term(10)]);
        let uniq = sorted.unique().columnar();
        assert_eq!(uniq.nrows(), 2);
    }

    #[test]
    fn slice_by_nodes_groups_contiguous_runs() {
        let columns = vec![Column::dense(vec![Term(1), Term(2), Term(3)])];
        let prov = Provenance::DiffNodes(Column::dense(vec![Term(5), Term(5), Term(9)]));
        let seg = Segment::with_provenance(columns, prov);
        let sorted = seg.sort_by_prov();
        let runs = sorted.slice_by_nodes();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].0, NodeId(5));
        assert_eq!(runs[0].1.nrows(), 2);
        assert_eq!(runs[1].0, NodeId(9));
    }

    #[test]
    fn antijoin_rows_returns_same_segment_when_all_new() {
        let existing = seg2(&[9], &[9]);
        let candidate = seg2(&[1, 2], &[1, 2]);
        let (result, all_new) = antijoin_rows(&existing, &candidate);
        assert!(all_new);
        assert_eq!(result.nrows(), 2);
    }

    #[test]
    fn antijoin_rows_removes_shared_rows() {
        let existing = seg2(&[1], &[1]);
        let candidate = seg2(&[1, 2], &[1, 2]);
        let (result, all_new) = antijoin_rows(&existing, &candidate);
        assert!(!all_new);
        let c = result.columnar();
        assert_eq!(c.nrows(), 1);
        assert_eq!(c.row(0), vec![Term(2), Term(2)]);
    }

    #[test]
    fn swap_exchanges_binary_columns() {
        let s = seg2(&[1, 2], &[10, 20]);
        let swapped = s.swap().columnar();
        assert_eq!(swapped.row(0), vec![Term(10), Term(1)]);
    }
}
