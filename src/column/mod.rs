//! Column primitives (spec.md §3 Column, §4.1 Column operations).
//!
//! A [`Column`] is an immutable, ordered sequence of [`Term`]s of known
//! length. Four variants, matching spec.md §3 exactly: a contiguous `Dense`
//! vector, a `Constant` repeated N times, a `Compressed` run-length
//! encoding of (start, delta, length) blocks, and an `EdbView` that
//! symbolically references one argument position of one EDB literal and
//! materializes lazily.

mod compressed;
mod edb_view;

pub use compressed::{CompressedBlocks, RunBlock};
pub use edb_view::{EdbColumnSource, EdbSourceKey};

use std::sync::Arc;

use crate::term::Term;

/// An immutable typed value sequence (spec.md §3 Column).
#[derive(Clone, Debug)]
pub enum Column {
    Dense(Arc<Vec<Term>>),
    Constant { value: Term, len: usize },
    Compressed(Arc<CompressedBlocks>),
    EdbView(Arc<dyn EdbColumnSource>),
}

impl Column {
    #[must_use]
    pub fn dense(values: Vec<Term>) -> Self {
        Column::Dense(Arc::new(values))
    }

    #[must_use]
    pub fn constant(value: Term, len: usize) -> Self {
        Column::Constant { value, len }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Column::Dense(v) => v.len(),
            Column::Constant { len, .. } => *len,
            Column::Compressed(c) => c.len(),
            Column::EdbView(e) => e.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn get(&self, i: usize) -> Term {
        match self {
            Column::Dense(v) => v[i],
            Column::Constant { value, .. } => *value,
            Column::Compressed(c) => c.get(i),
            Column::EdbView(e) => e.get(i),
        }
    }

    /// Whether this column is a symbolic view over an EDB table rather than
    /// materialized data (spec.md §3 "an `isEDB` discriminator").
    #[must_use]
    pub fn is_edb(&self) -> bool {
        matches!(self, Column::EdbView(_))
    }

    /// The identity of the EDB source this column views, if any — used by
    /// the retain fast paths to decide whether two columns reference
    /// "the same kind" of literal/position (spec.md §4.4.2).
    #[must_use]
    pub fn edb_source_key(&self) -> Option<EdbSourceKey> {
        match self {
            Column::EdbView(e) => Some(e.source_key()),
            _ => None,
        }
    }

    /// Forward iterator over materialized values (spec.md §4.2 `iterator()`).
    pub fn reader(&self) -> Box<dyn Iterator<Item = Term> + '_> {
        match self {
            Column::Dense(v) => Box::new(v.iter().copied()),
            Column::Constant { value, len } => Box::new(std::iter::repeat(*value).take(*len)),
            Column::Compressed(c) => Box::new((0..c.len()).map(move |i| c.get(i))),
            Column::EdbView(e) => Box::new((0..e.len()).map(move |i| e.get(i))),
        }
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Term> {
        self.reader().collect()
    }

    /// Sort ascending by unsigned 64-bit value (spec.md §4.2 numeric semantics).
    #[must_use]
    pub fn sort(&self) -> Column {
        let mut v = self.to_vec();
        v.sort_unstable();
        Column::dense(v)
    }

    /// Deduplicate. Requires sorted input (spec.md §4.2 `unique()`).
    #[must_use]
    pub fn unique(&self) -> Column {
        let mut v = self.to_vec();
        v.dedup();
        Column::dense(v)
    }

    #[must_use]
    pub fn slice(&self, lo: usize, hi: usize) -> Column {
        match self {
            Column::Dense(v) => Column::dense(v[lo..hi].to_vec()),
            Column::Constant { value, .. } => Column::constant(*value, hi - lo),
            _ => Column::dense(self.reader().skip(lo).take(hi - lo).collect()),
        }
    }

    /// Equality-check against another column: same length and same values in
    /// order (spec.md §4.2).
    #[must_use]
    pub fn equals(&self, other: &Column) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.reader().eq(other.reader())
    }

    /// Count how many values in `terms` appear in this (sorted) column
    /// (spec.md §4.2 `countHits`).
    #[must_use]
    pub fn count_hits(&self, terms: &[Term]) -> usize {
        let mut count = 0;
        for t in terms {
            if self.binary_search(*t).is_some() {
                count += 1;
            }
        }
        count
    }

    fn binary_search(&self, target: Term) -> Option<usize> {
        let mut lo = 0usize;
        let mut hi = self.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.get(mid).cmp(&target) {
                std::cmp::Ordering::Equal => return Some(mid),
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        None
    }

    /// `antijoin(a, b, out)`: append to `out` the values of `a` not present
    /// in `b`, preserving `a`'s order (spec.md §4.1). Both columns must be
    /// sorted on the relevant key for the binary-search probe below to be
    /// correct when `b` is large; for the general case we build a hash set.
    ///
    /// Returns `(result, all_new)` where `all_new` is true when nothing was
    /// removed, letting the caller reuse `a` by reference (spec.md §4.1).
    #[must_use]
    pub fn antijoin(a: &Column, b: &Column) -> (Column, bool) {
        use std::collections::HashSet;
        let bset: HashSet<Term> = b.reader().collect();
        let mut out = Vec::with_capacity(a.len());
        let mut removed = false;
        for v in a.reader() {
            if bset.contains(&v) {
                removed = true;
            } else {
                out.push(v);
            }
        }
        (Column::dense(out), !removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_basic() {
        let c = Column::dense(vec![Term(3), Term(1), Term(2)]);
        assert_eq!(c.len(), 3);
        assert_eq!(c.get(1), Term(1));
        assert!(!c.is_edb());
    }

    #[test]
    fn constant_basic() {
        let c = Column::constant(Term(7), 4);
        assert_eq!(c.to_vec(), vec![Term(7); 4]);
    }

    #[test]
    fn sort_and_unique() {
        let c = Column::dense(vec![Term(3), Term(1), Term(1), Term(2)]);
        let sorted = c.sort();
        assert_eq!(sorted.to_vec(), vec![Term(1), Term(1), Term(2), Term(3)]);
        assert_eq!(sorted.unique().to_vec(), vec![Term(1), Term(2), Term(3)]);
    }

    #[test]
    fn antijoin_removes_shared_values() {
        let a = Column::dense(vec![Term(1), Term(2), Term(3)]);
        let b = Column::dense(vec![Term(2)]);
        let (res, all_new) = Column::antijoin(&a, &b);
        assert_eq!(res.to_vec(), vec![Term(1), Term(3)]);
        assert!(!all_new);
    }

    #[test]
    fn antijoin_all_new_when_disjoint() {
        let a = Column::dense(vec![Term(1), Term(2)]);
        let b = Column::dense(vec![Term(9)]);
        let (res, all_new) = Column::antijoin(&a, &b);
        assert_eq!(res.to_vec(), a.to_vec());
        assert!(all_new);
    }

    #[test]
    fn count_hits_on_sorted_column() {
        let c = Column::dense(vec![Term(1), Term(2), Term(4)]).sort();
        assert_eq!(c.count_hits(&[Term(2), Term(3), Term(4)]), 2);
    }

    #[test]
    fn equals_checks_order_and_length() {
        let a = Column::dense(vec![Term(1), Term(2)]);
        let b = Column::dense(vec![Term(1), Term(2)]);
        let c = Column::dense(vec![Term(2), Term(1)]);
        assert!(a.equals(&b));
        assert!(!a.equals(&c));
    }
}
