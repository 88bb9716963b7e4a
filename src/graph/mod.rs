//! The derivation graph (spec.md §3 "Derivation graph", §4.4 "Derivation
//! Graph").
//!
//! `GbGraph` owns every permanent node ever derived, indexed by id, plus a
//! per-predicate index, a staging area for deferred retain, and the segment
//! cache. Mirrors `GBGraph` in
//! `examples/original_source/include/glog/gbgraph.h`, generalized from its
//! C++ field layout to the types this crate already has (`Segment`,
//! `ChaseConfig`, `Statistics`).

mod cache;
mod egd;
mod merge;
mod retain;
mod tmp;

pub use tmp::StagedContribution;

use std::collections::HashMap;

use tracing::instrument;

use crate::config::ChaseConfig;
use crate::error::{ChaseError, ChaseResult};
use crate::segment::{NodeId, Segment, EDB_PREDECESSOR};
use crate::stats::Statistics;
use crate::term::PredId;

use cache::RetainCache;

/// The reserved id range for temporary nodes (spec.md §3: "a reserved high
/// range `[startCounterTmpNodes, ∞)`"). Matches the original's
/// `counterTmpNodes = 1ul << 40`.
pub const START_COUNTER_TMP_NODES: u64 = 1 << 40;

/// An immutable block of derived facts sharing a head predicate and rule
/// derivation (spec.md §3 "Node").
#[derive(Clone, Debug)]
pub struct Node {
    pub pred_id: PredId,
    /// `None` for merge/term-replacement results (spec.md: "`~0` for
    /// merge/term-replacement results").
    pub rule_idx: Option<usize>,
    pub step: u64,
    pub data: Segment,
    /// Ids of permanent nodes used as body inputs; empty when the body was
    /// purely EDB (spec.md §3 invariant: "every id refers to a permanent
    /// node").
    pub incoming_edges: Vec<NodeId>,
}

impl Node {
    #[must_use]
    pub fn arity(&self) -> usize {
        self.data.arity()
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.data.nrows()
    }
}

/// The derivation graph (spec.md §3 "Derivation graph").
pub struct GbGraph {
    nodes: Vec<Node>,
    pred2nodes: HashMap<PredId, Vec<NodeId>>,
    tmp_nodes: HashMap<NodeId, Node>,
    next_tmp_id: u64,
    next_null_value: u64,
    config: ChaseConfig,
    cache: HashMap<PredId, RetainCache>,
    /// The §4.5 Segment Cache. Behind a `Mutex` (the teacher's `edb.rs`
    /// dictionary cache does the same) so `merge_nodes`'s read-only callers
    /// in the rule executor can populate it without needing `&mut GbGraph`.
    segment_cache: parking_lot::Mutex<cache::SegmentCacheMap>,
    staged: HashMap<PredId, Vec<StagedContribution>>,
    stats: Statistics,
}

impl GbGraph {
    #[must_use]
    pub fn new(config: ChaseConfig) -> Self {
        let next_null_value = config.null_threshold;
        GbGraph {
            nodes: Vec::new(),
            pred2nodes: HashMap::new(),
            tmp_nodes: HashMap::new(),
            next_tmp_id: START_COUNTER_TMP_NODES,
            next_null_value,
            config,
            cache: HashMap::new(),
            segment_cache: parking_lot::Mutex::new(HashMap::new()),
            staged: HashMap::new(),
            stats: Statistics::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ChaseConfig {
        &self.config
    }

    #[must_use]
    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    /// `id >= startCounterTmpNodes` (spec.md §9 "model as a separate map
    /// keyed in a reserved high-id range").
    #[must_use]
    pub fn is_tmp_node(id: NodeId) -> bool {
        id.0 >= START_COUNTER_TMP_NODES
    }

    /// Dispatches by id range (spec.md §9 "`getNode(id)` dispatches by id range").
    #[must_use]
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        if Self::is_tmp_node(id) {
            self.tmp_nodes.get(&id)
        } else {
            self.nodes.get(id.0 as usize)
        }
    }

    #[must_use]
    pub fn nodes_of(&self, pred: PredId) -> &[NodeId] {
        self.pred2nodes.get(&pred).map_or(&[], Vec::as_slice)
    }

    /// Fresh reserved-null value above `null_threshold`, minted for
    /// existential rules (spec.md §3; `SPEC_FULL.md` §3 "Fresh-null
    /// counter"). Minting the actual substitution is the rule collaborator's
    /// job; the graph only owns the monotonic counter.
    pub fn allocate_null(&mut self) -> crate::term::Term {
        let v = self.next_null_value;
        self.next_null_value += 1;
        crate::term::Term(v)
    }

    /// `addNodeProv` (spec.md §4.4.1). Precondition: `data.nodeId == new
    /// node's id` when provenance is `SAMENODE`; every `incoming_edges` id
    /// must be a permanent node.
    #[instrument(skip(self, data), fields(pred = %pred_id, step))]
    pub fn add_node_prov(
        &mut self,
        pred_id: PredId,
        rule_idx: Option<usize>,
        step: u64,
        data: Segment,
        incoming_edges: Vec<NodeId>,
    ) -> ChaseResult<NodeId> {
        if data.is_composite() {
            return Err(ChaseError::InvariantViolation(
                "composite segment cannot be added to the permanent graph".into(),
            ));
        }
        for &edge in &incoming_edges {
            if Self::is_tmp_node(edge) {
                return Err(ChaseError::InvariantViolation(format!(
                    "temporary node {edge:?} used as an incoming edge"
                )));
            }
        }
        if let Some(expected) = data.constant_node_id() {
            let new_id = NodeId(self.nodes.len() as u64);
            if expected != new_id {
                return Err(ChaseError::InvariantViolation(format!(
                    "SAMENODE segment carries node id {expected:?}, expected new id {new_id:?}"
                )));
            }
        }
        let id = NodeId(self.nodes.len() as u64);
        let n_rows = data.nrows() as u64;
        let n_edges = incoming_edges.len() as u64;
        self.nodes.push(Node {
            pred_id,
            rule_idx,
            step,
            data,
            incoming_edges,
        });
        self.pred2nodes.entry(pred_id).or_default().push(id);
        self.stats.record_node(n_rows, n_edges);
        tracing::debug!(node = id.0, rows = n_rows, "node added");
        Ok(id)
    }

    /// `addTmpNode` (spec.md §3 "Temporary node", §9): stages a node in the
    /// reserved high-id range, outside the permanent node vector. Used by
    /// the rule executor to carry intermediate join results across
    /// sub-steps before they are merged and retained into permanent nodes.
    pub fn add_tmp_node(
        &mut self,
        pred_id: PredId,
        rule_idx: Option<usize>,
        step: u64,
        data: Segment,
        incoming_edges: Vec<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.next_tmp_id);
        self.next_tmp_id += 1;
        self.tmp_nodes.insert(
            id,
            Node {
                pred_id,
                rule_idx,
                step,
                data,
                incoming_edges,
            },
        );
        id
    }

    /// Clears every temporary node (spec.md §3: "Cleared between steps").
    pub fn clear_tmp_nodes(&mut self) {
        self.tmp_nodes.clear();
        self.next_tmp_id = START_COUNTER_TMP_NODES;
    }

    /// `addNodesProv` (spec.md §4.4.1): splits a multi-predecessor segment
    /// into single-predecessor-chunk nodes before adding each separately.
    ///
    /// The original splits on the full predecessor tuple when `provColumns`
    /// is non-empty (multi-level `FULLPROV`); this crate's `Provenance`
    /// groups by the immediate-predecessor level only (see `DESIGN.md` re:
    /// the `FULLPROV` depth simplification), so both cases reduce to the
    /// same sort-by-predecessor-then-slice here.
    ///
    /// A run tagged [`EDB_PREDECESSOR`] means every row in it came straight
    /// from the EDB with no IDB predecessor at all (spec.md §3:
    /// "`incomingEdges` ... empty when the body is purely EDB"); such a run
    /// is added with *no* incoming edges rather than with the sentinel
    /// itself, which is not a permanent node id and would otherwise trip
    /// [`Self::add_node_prov`]'s incoming-edge guard.
    pub fn add_nodes_prov(
        &mut self,
        pred_id: PredId,
        rule_idx: Option<usize>,
        step: u64,
        seg: Segment,
    ) -> ChaseResult<Vec<NodeId>> {
        let runs: Vec<(NodeId, Segment)> = seg.sort_by_prov().slice_by_nodes();
        let mut out = Vec::with_capacity(runs.len());
        for (predecessor, chunk) in runs {
            let incoming_edges = if predecessor == EDB_PREDECESSOR { Vec::new() } else { vec![predecessor] };
            let id = self.add_node_prov(pred_id, rule_idx, step, chunk, incoming_edges)?;
            out.push(id);
        }
        Ok(out)
    }
}
