//! Two of the three join strategies of spec.md §4.3: negated anti-join and
//! sorted merge join. The third (nested-loop join with per-key EDB lookup)
//! lives in `executor::GbRuleExecutor::nested_loop_edb_rows` — it needs the
//! `EdbLayer` collaborator and rule-term substitution, neither of which this
//! module depends on.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::term::Term;

/// A sorted merge join over composite keys, emitting every matching
/// `(left_row_index, right_row_index)` pair (ties form a cross product).
#[must_use]
pub fn merge_join(left_keys: &[Vec<Term>], right_keys: &[Vec<Term>]) -> Vec<(usize, usize)> {
    let mut left_order: Vec<usize> = (0..left_keys.len()).collect();
    left_order.sort_by(|&a, &b| left_keys[a].cmp(&left_keys[b]));
    let mut right_order: Vec<usize> = (0..right_keys.len()).collect();
    right_order.sort_by(|&a, &b| right_keys[a].cmp(&right_keys[b]));

    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < left_order.len() && j < right_order.len() {
        let lk = &left_keys[left_order[i]];
        let rk = &right_keys[right_order[j]];
        match lk.cmp(rk) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                let mut i_end = i;
                while i_end < left_order.len() && &left_keys[left_order[i_end]] == lk {
                    i_end += 1;
                }
                let mut j_end = j;
                while j_end < right_order.len() && &right_keys[right_order[j_end]] == rk {
                    j_end += 1;
                }
                for &li in &left_order[i..i_end] {
                    for &rj in &right_order[j..j_end] {
                        pairs.push((li, rj));
                    }
                }
                i = i_end;
                j = j_end;
            }
        }
    }
    pairs
}

/// Left anti-join (spec.md §4.3 strategy 1): indices of `left_keys` whose
/// key does not appear anywhere in `right_keys`.
#[must_use]
pub fn anti_join(left_keys: &[Vec<Term>], right_keys: &[Vec<Term>]) -> Vec<usize> {
    let right_set: HashSet<&Vec<Term>> = right_keys.iter().collect();
    (0..left_keys.len())
        .filter(|&i| !right_set.contains(&left_keys[i]))
        .collect()
}
