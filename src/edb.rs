//! The EDB collaborator interface (spec.md §6 "EDB collaborator").
//!
//! The core never opens a triple store or runs SQL itself; it consumes
//! whatever implements [`EdbLayer`]. A small in-memory implementation is
//! provided for tests and as a reference adapter, the way the teacher crate's
//! `hash_index.rs` doubled as both a real index and a test fixture.

use std::collections::HashMap;
use std::sync::Arc;

use crate::column::{EdbColumnSource, EdbSourceKey};
use crate::rule::{BodyLiteral, RuleTerm};
use crate::segment::Segment;
use crate::term::{PredId, Term};

/// Per spec.md §6: the set of operations the derivation core needs from an
/// extensional-database adapter.
pub trait EdbLayer: Send + Sync {
    /// Full-table segment for a predicate, `NOPROV` (all rows from the EDB).
    fn get_segment(&self, pred: PredId) -> Segment;

    /// Whether scanning under the literal's constant/repeated-variable
    /// bindings is supported by this adapter.
    fn is_query_allowed(&self, literal: &BodyLiteral) -> bool;

    /// Rows matching the literal's bindings, projected to `positions`.
    fn get_iterator(&self, literal: &BodyLiteral, positions: &[usize]) -> Vec<Vec<Term>>;

    /// Like [`EdbLayer::get_iterator`] but pre-sorted by `sort_fields`.
    fn get_sorted_iterator(
        &self,
        literal: &BodyLiteral,
        positions: &[usize],
        sort_fields: &[usize],
    ) -> Vec<Vec<Term>> {
        let mut rows = self.get_iterator(literal, positions);
        rows.sort_by(|a, b| {
            for &f in sort_fields {
                match a[f].cmp(&b[f]) {
                    std::cmp::Ordering::Equal => continue,
                    other => return other,
                }
            }
            std::cmp::Ordering::Equal
        });
        rows
    }

    fn get_cardinality(&self, literal: &BodyLiteral) -> usize;

    /// Set difference of tuples at `pos1` of `lit1` against `pos2` of `lit2`,
    /// without materializing either side (spec.md §4.1 `checkNewIn`).
    fn check_new_in(
        &self,
        lit1: &BodyLiteral,
        pos1: &[usize],
        lit2: &BodyLiteral,
        pos2: &[usize],
    ) -> Vec<Vec<Term>>;

    fn get_or_add_dict_number(&self, text: &str) -> Term;
    fn get_dict_text(&self, id: Term) -> Option<String>;
}

/// A reference in-memory [`EdbLayer`], backed by `Vec<Vec<Term>>` per
/// predicate. Not meant for production use; exists so tests (and the
/// executor's doctest-style examples) don't need a real store.
#[derive(Debug, Default)]
pub struct InMemoryEdb {
    tables: HashMap<PredId, Vec<Vec<Term>>>,
    dict: parking_lot::Mutex<(HashMap<String, Term>, HashMap<u64, String>)>,
}

impl InMemoryEdb {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pred: PredId, rows: Vec<Vec<Term>>) {
        self.tables.entry(pred).or_default().extend(rows);
    }

    fn rows_for(&self, pred: PredId) -> &[Vec<Term>] {
        self.tables.get(&pred).map(Vec::as_slice).unwrap_or(&[])
    }

    fn matches(row: &[Term], args: &[RuleTerm]) -> bool {
        row.iter().zip(args).all(|(v, a)| match a {
            RuleTerm::Const(c) => v == c,
            RuleTerm::Var(_) => true,
        })
    }
}

impl EdbLayer for InMemoryEdb {
    fn get_segment(&self, pred: PredId) -> Segment {
        let rows = self.rows_for(pred);
        let arity = rows.first().map_or(0, Vec::len);
        let mut cols = vec![Vec::with_capacity(rows.len()); arity];
        for row in rows {
            for (c, v) in cols.iter_mut().zip(row) {
                c.push(*v);
            }
        }
        Segment::from_columns(cols.into_iter().map(crate::column::Column::dense).collect())
    }

    fn is_query_allowed(&self, _literal: &BodyLiteral) -> bool {
        true
    }

    fn get_iterator(&self, literal: &BodyLiteral, positions: &[usize]) -> Vec<Vec<Term>> {
        self.rows_for(literal.pred_id)
            .iter()
            .filter(|row| Self::matches(row, &literal.args))
            .map(|row| positions.iter().map(|&p| row[p]).collect())
            .collect()
    }

    fn get_cardinality(&self, literal: &BodyLiteral) -> usize {
        self.rows_for(literal.pred_id)
            .iter()
            .filter(|row| Self::matches(row, &literal.args))
            .count()
    }

    fn check_new_in(
        &self,
        lit1: &BodyLiteral,
        pos1: &[usize],
        lit2: &BodyLiteral,
        pos2: &[usize],
    ) -> Vec<Vec<Term>> {
        use std::collections::HashSet;
        let rhs: HashSet<Vec<Term>> = self
            .rows_for(lit2.pred_id)
            .iter()
            .filter(|row| Self::matches(row, &lit2.args))
            .map(|row| pos2.iter().map(|&p| row[p]).collect())
            .collect();
        self.rows_for(lit1.pred_id)
            .iter()
            .filter(|row| Self::matches(row, &lit1.args))
            .map(|row| pos1.iter().map(|&p| row[p]).collect::<Vec<_>>())
            .filter(|key| !rhs.contains(key))
            .collect()
    }

    fn get_or_add_dict_number(&self, text: &str) -> Term {
        let mut guard = self.dict.lock();
        if let Some(t) = guard.0.get(text) {
            return *t;
        }
        let id = Term(guard.0.len() as u64);
        guard.0.insert(text.to_string(), id);
        guard.1.insert(id.0, text.to_string());
        id
    }

    fn get_dict_text(&self, id: Term) -> Option<String> {
        self.dict.lock().1.get(&id.0).cloned()
    }
}

/// A `Column::EdbView` that reads one argument position out of a literal
/// scan against an [`EdbLayer`], materializing on first read and caching
/// after that (spec.md §3 "materializes lazily").
#[derive(Debug)]
pub struct EdbColumn {
    key: EdbSourceKey,
    values: Vec<Term>,
}

impl EdbColumn {
    #[must_use]
    pub fn build(edb: &dyn EdbLayer, literal: &BodyLiteral, position: usize, binding_tag: u64) -> Arc<dyn EdbColumnSource> {
        let values = edb
            .get_iterator(literal, &[position])
            .into_iter()
            .map(|row| row[0])
            .collect();
        Arc::new(EdbColumn {
            key: EdbSourceKey {
                pred: literal.pred_id,
                position,
                binding_tag,
            },
            values,
        })
    }
}

impl EdbColumnSource for EdbColumn {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn get(&self, i: usize) -> Term {
        self.values[i]
    }

    fn source_key(&self) -> EdbSourceKey {
        self.key.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(pred: PredId, args: Vec<RuleTerm>) -> BodyLiteral {
        BodyLiteral {
            pred_id: pred,
            args,
            negated: false,
        }
    }

    #[test]
    fn in_memory_edb_filters_by_constant_binding() {
        let mut edb = InMemoryEdb::new();
        edb.insert(
            PredId(0),
            vec![
                vec![Term(1), Term(2)],
                vec![Term(1), Term(3)],
                vec![Term(9), Term(9)],
            ],
        );
        let literal = lit(PredId(0), vec![RuleTerm::Const(Term(1)), RuleTerm::Var(0)]);
        let rows = edb.get_iterator(&literal, &[1]);
        assert_eq!(rows, vec![vec![Term(2)], vec![Term(3)]]);
    }

    #[test]
    fn check_new_in_computes_set_difference() {
        let mut edb = InMemoryEdb::new();
        edb.insert(PredId(0), vec![vec![Term(1)], vec![Term(2)], vec![Term(3)]]);
        edb.insert(PredId(1), vec![vec![Term(2)]]);
        let l1 = lit(PredId(0), vec![RuleTerm::Var(0)]);
        let l2 = lit(PredId(1), vec![RuleTerm::Var(0)]);
        let mut diff = edb.check_new_in(&l1, &[0], &l2, &[0]);
        diff.sort();
        assert_eq!(diff, vec![vec![Term(1)], vec![Term(3)]]);
    }

    #[test]
    fn dict_round_trips_text() {
        let edb = InMemoryEdb::new();
        let id = edb.get_or_add_dict_number("hello");
        assert_eq!(edb.get_or_add_dict_number("hello"), id);
        assert_eq!(edb.get_dict_text(id).as_deref(), Some("hello"));
    }
}
