//! Property-based checks for the invariants listed in spec.md §8.

use proptest::prelude::*;

use chase_core::column::Column;
use chase_core::config::ChaseConfig;
use chase_core::graph::GbGraph;
use chase_core::segment::{Provenance, Segment};
use chase_core::term::{PredId, Term};

fn seg_from(vals: &[u64]) -> Segment {
    Segment::from_columns(vec![Column::dense(vals.iter().map(|&v| Term(v)).collect())])
}

fn prov_seg(vals: &[(u64, u64)]) -> Segment {
    let data = Column::dense(vals.iter().map(|&(v, _)| Term(v)).collect());
    let prov = Column::dense(vals.iter().map(|&(_, n)| Term(n)).collect());
    Segment::with_provenance(vec![data], Provenance::DiffNodes(prov))
}

proptest! {
    /// Retain idempotence (spec.md §8 property 3): `retain(p, retain(p, s)) = retain(p, s)`.
    #[test]
    fn retain_is_idempotent(existing in prop::collection::vec(0u64..50, 0..20), incoming in prop::collection::vec(0u64..50, 0..20)) {
        let mut graph = GbGraph::new(ChaseConfig::default());
        if !existing.is_empty() {
            graph.add_node_prov(PredId(0), None, 0, seg_from(&existing), vec![]).unwrap();
        }
        let once = graph.retain(PredId(0), seg_from(&incoming));
        let once_rows: Vec<u64> = (0..once.nrows()).map(|i| once.columnar().row(i)[0].0).collect();
        let twice = graph.retain(PredId(0), once.clone());
        let twice_rows: Vec<u64> = (0..twice.nrows()).map(|i| twice.columnar().row(i)[0].0).collect();
        prop_assert_eq!(once_rows, twice_rows);
    }

    /// Dedup totality (spec.md §8 property 1): nodes of the same predicate
    /// never share a row after each batch is retained before being added.
    #[test]
    fn dedup_totality_across_sequential_retains(batches in prop::collection::vec(prop::collection::vec(0u64..30, 0..10), 1..6)) {
        let mut graph = GbGraph::new(ChaseConfig::default());
        for batch in batches {
            let retained = graph.retain(PredId(0), seg_from(&batch));
            if !retained.is_empty() {
                graph.add_node_prov(PredId(0), None, 0, retained, vec![]).unwrap();
            }
        }
        let ids = graph.nodes_of(PredId(0)).to_vec();
        let mut seen = std::collections::HashSet::new();
        for &id in &ids {
            let seg = graph.get_node(id).unwrap().data.columnar();
            for i in 0..seg.nrows() {
                let row = seg.row(i);
                prop_assert!(seen.insert(row), "duplicate row found across nodes");
            }
        }
    }

    /// Sort stability for provenance (spec.md §8 property 5): rows sharing a
    /// predecessor keep their original relative order after `sortByProv`.
    #[test]
    fn sort_by_prov_is_stable(rows in prop::collection::vec((0u64..10, 0u64..4), 0..30)) {
        let seg = prov_seg(&rows);
        let sorted = seg.sort_by_prov();
        let c = sorted.columnar();

        let mut seen_per_node: std::collections::HashMap<u64, Vec<u64>> = std::collections::HashMap::new();
        for &(v, n) in &rows {
            seen_per_node.entry(n).or_default().push(v);
        }
        let mut got_per_node: std::collections::HashMap<u64, Vec<u64>> = std::collections::HashMap::new();
        for i in 0..c.nrows() {
            let node = c.provenance().node_id_at(i).unwrap().0;
            got_per_node.entry(node).or_default().push(c.row(i)[0].0);
        }
        prop_assert_eq!(seen_per_node, got_per_node);
    }

    /// Slice correctness (spec.md §8 property 6): `sliceByNodes` concatenated
    /// back equals the input sorted by predecessor.
    #[test]
    fn slice_by_nodes_reconstructs_the_sorted_input(rows in prop::collection::vec((0u64..10, 0u64..4), 0..30)) {
        let seg = prov_seg(&rows);
        let sorted = seg.sort_by_prov();
        let runs = sorted.slice_by_nodes();

        let mut reconstructed: Vec<u64> = Vec::new();
        for (_, part) in &runs {
            let c = part.columnar();
            for i in 0..c.nrows() {
                reconstructed.push(c.row(i)[0].0);
            }
        }
        let expected: Vec<u64> = (0..sorted.nrows()).map(|i| sorted.columnar().row(i)[0].0).collect();
        prop_assert_eq!(reconstructed, expected);
    }

    /// Merge-sort-unique commutativity (spec.md §8 property 4):
    /// `mergeNodes(ids).sort().unique() == mergeNodes(ids, removeDuplicates=true).sort()`.
    #[test]
    fn merge_sort_unique_commutes(a in prop::collection::vec(0u64..20, 0..10), b in prop::collection::vec(0u64..20, 0..10)) {
        let mut graph = GbGraph::new(ChaseConfig::default());
        let n1 = graph.add_node_prov(PredId(0), None, 0, seg_from(&a), vec![]).unwrap();
        let n2 = graph.add_node_prov(PredId(0), None, 1, seg_from(&b), vec![]).unwrap();

        let lazy_then_dedup = graph
            .merge_nodes(&[n1, n2], None, &[0], false, false)
            .sort()
            .unique();
        let eager_dedup = graph.merge_nodes(&[n1, n2], None, &[0], false, true).sort();

        let left: Vec<u64> = (0..lazy_then_dedup.nrows()).map(|i| lazy_then_dedup.columnar().row(i)[0].0).collect();
        let right: Vec<u64> = (0..eager_dedup.nrows()).map(|i| eager_dedup.columnar().row(i)[0].0).collect();
        prop_assert_eq!(left, right);
    }
}
