//! The rule executor (spec.md §4.3 "GBRuleExecutor"): compiles a rule body
//! into a join pipeline over EDB and IDB sources and produces the segment of
//! derived head tuples, carrying provenance through every join step.

mod join;
mod plan;

pub use plan::{plan_literals, LiteralPlan};

use crate::column::Column;
use crate::edb::EdbLayer;
use crate::error::{ChaseError, ChaseResult};
use crate::graph::GbGraph;
use crate::rule::{BodyLiteral, RuleDef, RuleTerm, VarId};
use crate::segment::{NodeId, ProvLevel, Provenance, Segment};
use crate::term::Term;

/// Re-exported so existing callers of `executor::EDB_PREDECESSOR` keep
/// working; the sentinel itself lives in `segment` since `GbGraph` (not just
/// the executor) needs to recognize it — see
/// [`crate::graph::GbGraph::add_nodes_prov`].
pub use crate::segment::EDB_PREDECESSOR;

/// Tells the executor whether a body literal's predicate is extensional or
/// intensional (`BodyLiteral` alone carries only the predicate id, not which
/// side of the EDB/IDB split it lives on — the rule/program collaborator
/// supplies this per spec.md §6).
#[derive(Clone, Debug)]
pub enum LiteralSource {
    Edb,
    Idb(Vec<NodeId>),
}

/// Compiles and runs one rule body against the sources given for each of its
/// literals (`GBRuleExecutor::run` in spec.md §4.3).
pub struct GbRuleExecutor<'a> {
    edb: &'a dyn EdbLayer,
}

impl<'a> GbRuleExecutor<'a> {
    #[must_use]
    pub fn new(edb: &'a dyn EdbLayer) -> Self {
        GbRuleExecutor { edb }
    }

    /// Runs `rule` at `step`, returning the derived (not yet deduplicated
    /// against the graph) head segment, or `Ok(None)` when any join stage
    /// produces an empty intermediate (spec.md §4.3 "an empty intermediate at
    /// any step ends the rule firing with no result").
    pub fn execute_rule(
        &self,
        graph: &GbGraph,
        rule: &RuleDef,
        sources: &[LiteralSource],
    ) -> ChaseResult<Option<Segment>> {
        if rule.head.arity() == 0 {
            return Err(ChaseError::UnsupportedShape("arity-0 head literal".into()));
        }
        if rule.body.is_empty() {
            return Err(ChaseError::UnsupportedShape("rule with an empty body".into()));
        }
        if sources.len() != rule.body.len() {
            return Err(ChaseError::UnsupportedShape(
                "one source must be supplied per body literal".into(),
            ));
        }
        for lit in &rule.body {
            if lit.arity() == 0 {
                return Err(ChaseError::UnsupportedShape("arity-0 body literal".into()));
            }
            if lit.has_repeated_vars() {
                return Err(ChaseError::UnsupportedShape(
                    "literal with a repeated variable must be rewritten by the caller".into(),
                ));
            }
        }
        if rule.body[0].negated {
            return Err(ChaseError::UnsupportedShape(
                "the first body literal cannot be negated".into(),
            ));
        }

        let plans = plan_literals(rule);

        let (mut acc_vars, mut acc_rows, first_node_ids) =
            self.literal_rows(graph, &rule.body[0], &sources[0])?;
        let mut acc_prov: Vec<Vec<NodeId>> = first_node_ids.into_iter().map(|id| vec![id]).collect();

        if acc_rows.is_empty() {
            return Ok(None);
        }

        for i in 1..rule.body.len() {
            let lit = &rule.body[i];
            let plan = &plans[i];

            if lit.negated {
                if !plan.copy_vars_right.is_empty() {
                    return Err(ChaseError::UnsupportedShape(
                        "a negated literal cannot introduce new variables".into(),
                    ));
                }
                let (right_vars, right_rows, _) = self.literal_rows(graph, lit, &sources[i])?;
                let left_key_pos: Vec<usize> =
                    plan.join_vars.iter().map(|&v| pos_of(&acc_vars, v)).collect();
                let right_key_pos: Vec<usize> =
                    plan.join_vars.iter().map(|&v| pos_of(&right_vars, v)).collect();
                let left_keys: Vec<Vec<Term>> = acc_rows
                    .iter()
                    .map(|r| left_key_pos.iter().map(|&p| r[p]).collect())
                    .collect();
                let right_keys: Vec<Vec<Term>> = right_rows
                    .iter()
                    .map(|r| right_key_pos.iter().map(|&p| r[p]).collect())
                    .collect();
                let keep = join::anti_join(&left_keys, &right_keys);

                let copy_left_pos: Vec<usize> =
                    plan.copy_vars_left.iter().map(|&v| pos_of(&acc_vars, v)).collect();
                let new_rows: Vec<Vec<Term>> = keep
                    .iter()
                    .map(|&k| copy_left_pos.iter().map(|&p| acc_rows[k][p]).collect())
                    .collect();
                let new_prov: Vec<Vec<NodeId>> = keep.iter().map(|&k| acc_prov[k].clone()).collect();

                acc_vars = plan.copy_vars_left.clone();
                acc_rows = new_rows;
                acc_prov = new_prov;
            } else if matches!(sources[i], LiteralSource::Edb) && !self.edb.is_query_allowed(lit) {
                // Join strategy 3 (spec.md §4.3): the right side is an EDB
                // literal whose unbound shape `isQueryAllowed` rejects.
                // Bind the join variables to each distinct left key and
                // scan the EDB per key instead (spec.md §7 `EDBUnavailable`
                // policy: "caller falls back to nested-loop join").
                let left_key_pos: Vec<usize> =
                    plan.join_vars.iter().map(|&v| pos_of(&acc_vars, v)).collect();
                let (right_vars, pairs) =
                    self.nested_loop_edb_rows(lit, &plan.join_vars, &left_key_pos, &acc_rows)?;

                let copy_left_pos: Vec<usize> =
                    plan.copy_vars_left.iter().map(|&v| pos_of(&acc_vars, v)).collect();
                let copy_right_pos: Vec<usize> =
                    plan.copy_vars_right.iter().map(|&v| pos_of(&right_vars, v)).collect();

                let mut new_rows = Vec::with_capacity(pairs.len());
                let mut new_prov = Vec::with_capacity(pairs.len());
                for (li, right_row) in &pairs {
                    let mut row: Vec<Term> = copy_left_pos.iter().map(|&p| acc_rows[*li][p]).collect();
                    row.extend(copy_right_pos.iter().map(|&p| right_row[p]));
                    new_rows.push(row);
                    let mut prov = acc_prov[*li].clone();
                    prov.push(EDB_PREDECESSOR);
                    new_prov.push(prov);
                }

                acc_vars = plan
                    .copy_vars_left
                    .iter()
                    .chain(plan.copy_vars_right.iter())
                    .copied()
                    .collect();
                acc_rows = new_rows;
                acc_prov = new_prov;
            } else {
                let (right_vars, right_rows, right_node_ids) =
                    self.literal_rows(graph, lit, &sources[i])?;
                let left_key_pos: Vec<usize> =
                    plan.join_vars.iter().map(|&v| pos_of(&acc_vars, v)).collect();
                let right_key_pos: Vec<usize> =
                    plan.join_vars.iter().map(|&v| pos_of(&right_vars, v)).collect();
                let left_keys: Vec<Vec<Term>> = acc_rows
                    .iter()
                    .map(|r| left_key_pos.iter().map(|&p| r[p]).collect())
                    .collect();
                let right_keys: Vec<Vec<Term>> = right_rows
                    .iter()
                    .map(|r| right_key_pos.iter().map(|&p| r[p]).collect())
                    .collect();
                let pairs = join::merge_join(&left_keys, &right_keys);

                let copy_left_pos: Vec<usize> =
                    plan.copy_vars_left.iter().map(|&v| pos_of(&acc_vars, v)).collect();
                let copy_right_pos: Vec<usize> =
                    plan.copy_vars_right.iter().map(|&v| pos_of(&right_vars, v)).collect();

                let mut new_rows = Vec::with_capacity(pairs.len());
                let mut new_prov = Vec::with_capacity(pairs.len());
                for &(li, ri) in &pairs {
                    let mut row: Vec<Term> = copy_left_pos.iter().map(|&p| acc_rows[li][p]).collect();
                    row.extend(copy_right_pos.iter().map(|&p| right_rows[ri][p]));
                    new_rows.push(row);
                    let mut prov = acc_prov[li].clone();
                    prov.push(right_node_ids[ri]);
                    new_prov.push(prov);
                }

                acc_vars = plan
                    .copy_vars_left
                    .iter()
                    .chain(plan.copy_vars_right.iter())
                    .copied()
                    .collect();
                acc_rows = new_rows;
                acc_prov = new_prov;
            }

            if acc_rows.is_empty() {
                return Ok(None);
            }
        }

        let n = acc_rows.len();
        let depth = rule.body.len();
        let provenance = if depth == 1 {
            Provenance::DiffNodes(Column::dense(acc_prov.iter().map(|p| Term(p[0].0)).collect()))
        } else {
            let levels = (0..depth)
                .map(|level| ProvLevel {
                    offsets: Column::dense((0..n as u64).map(Term).collect()),
                    node_ids: Column::dense(acc_prov.iter().map(|p| Term(p[level].0)).collect()),
                })
                .collect();
            Provenance::FullProv(levels)
        };

        let mut head_columns = Vec::with_capacity(rule.head.args.len());
        for arg in &rule.head.args {
            let col = match arg {
                RuleTerm::Const(c) => Column::constant(*c, n),
                RuleTerm::Var(v) => {
                    let p = acc_vars.iter().position(|&x| x == *v).ok_or_else(|| {
                        ChaseError::UnsupportedShape(format!(
                            "head variable {v} is not bound by the rule body"
                        ))
                    })?;
                    Column::dense(acc_rows.iter().map(|r| r[p]).collect())
                }
            };
            head_columns.push(col);
        }

        let result = Segment::with_provenance(head_columns, provenance);

        let identity_projection = rule.body.len() == 1
            && rule.head.args.len() == rule.body[0].args.len()
            && rule.head.args == rule.body[0].args;

        if identity_projection {
            Ok(Some(result))
        } else {
            Ok(Some(result.sort().unique()))
        }
    }

    /// Resolves one body literal's source into `(vars, rows, node_id_per_row)`,
    /// where `vars` lists the literal's distinct variables in first-occurrence
    /// order and `rows` holds the corresponding bound values.
    fn literal_rows(
        &self,
        graph: &GbGraph,
        lit: &BodyLiteral,
        source: &LiteralSource,
    ) -> ChaseResult<(Vec<VarId>, Vec<Vec<Term>>, Vec<NodeId>)> {
        let full_positions: Vec<usize> = (0..lit.arity()).collect();

        let (rows, node_ids): (Vec<Vec<Term>>, Vec<NodeId>) = match source {
            LiteralSource::Edb => {
                if !self.edb.is_query_allowed(lit) {
                    return Err(ChaseError::UnsupportedShape(format!(
                        "EDB adapter does not support this literal's binding shape: {:?}",
                        lit.pred_id
                    )));
                }
                let rows = self.edb.get_iterator(lit, &full_positions);
                let node_ids = vec![EDB_PREDECESSOR; rows.len()];
                (rows, node_ids)
            }
            LiteralSource::Idb(node_ids) => {
                let filter_constants: Vec<(usize, Term)> = lit
                    .args
                    .iter()
                    .enumerate()
                    .filter_map(|(i, a)| match a {
                        RuleTerm::Const(c) => Some((i, *c)),
                        RuleTerm::Var(_) => None,
                    })
                    .collect();
                let filters = if filter_constants.is_empty() {
                    None
                } else {
                    Some(filter_constants.as_slice())
                };
                // No filters: go through the segment cache (spec.md §4.5) so
                // a stable node set isn't re-merged and re-sorted on every
                // rule firing that reads it.
                let seg = if filters.is_none() {
                    graph.sorted_merge_cached(lit.pred_id, node_ids, None, &full_positions, &full_positions)
                } else {
                    graph.merge_nodes(node_ids, filters, &full_positions, false, false)
                };
                let c = seg.columnar();
                let rows: Vec<Vec<Term>> = (0..c.nrows()).map(|i| c.row(i)).collect();
                let row_node_ids: Vec<NodeId> = (0..c.nrows())
                    .map(|i| c.provenance().node_id_at(i).unwrap_or(EDB_PREDECESSOR))
                    .collect();
                (rows, row_node_ids)
            }
        };

        let mut vars = Vec::new();
        let mut var_pos = Vec::new();
        for (i, a) in lit.args.iter().enumerate() {
            if let RuleTerm::Var(v) = a {
                vars.push(*v);
                var_pos.push(i);
            }
        }
        let projected: Vec<Vec<Term>> = rows
            .iter()
            .map(|r| var_pos.iter().map(|&p| r[p]).collect())
            .collect();
        Ok((vars, projected, node_ids))
    }

    /// Join strategy 3 (spec.md §4.3): for each distinct key on the left,
    /// build a constant-bound version of `lit` (substituting every join
    /// variable with that row's value) and scan the EDB, emitting matches.
    /// Used when `lit`'s unbound shape fails `isQueryAllowed` — most EDB
    /// adapters can answer "rows where column 2 equals 7" even when they
    /// can't answer "rows where column 2 equals column 0", so binding the
    /// join columns down to constants first turns an unsupported scan into
    /// a supported one.
    fn nested_loop_edb_rows(
        &self,
        lit: &BodyLiteral,
        join_vars: &[VarId],
        left_key_pos: &[usize],
        acc_rows: &[Vec<Term>],
    ) -> ChaseResult<(Vec<VarId>, Vec<(usize, Vec<Term>)>)> {
        let mut right_vars = Vec::new();
        for a in &lit.args {
            if let RuleTerm::Var(v) = a {
                if !right_vars.contains(v) {
                    right_vars.push(*v);
                }
            }
        }

        let mut pairs = Vec::new();
        for (li, row) in acc_rows.iter().enumerate() {
            let bound_args: Vec<RuleTerm> = lit
                .args
                .iter()
                .map(|a| match a {
                    RuleTerm::Var(v) => match join_vars.iter().position(|x| x == v) {
                        Some(jv_idx) => RuleTerm::Const(row[left_key_pos[jv_idx]]),
                        None => *a,
                    },
                    RuleTerm::Const(_) => *a,
                })
                .collect();
            let bound_lit = BodyLiteral {
                pred_id: lit.pred_id,
                args: bound_args,
                negated: lit.negated,
            };
            if !self.edb.is_query_allowed(&bound_lit) {
                return Err(ChaseError::UnsupportedShape(format!(
                    "EDB adapter rejects even the constant-bound literal for predicate {:?}",
                    lit.pred_id
                )));
            }
            let positions: Vec<usize> = right_vars
                .iter()
                .map(|v| {
                    bound_lit
                        .args
                        .iter()
                        .position(|a| matches!(a, RuleTerm::Var(x) if x == v))
                        .expect("right_vars was built from lit's own variables")
                })
                .collect();
            for row in self.edb.get_iterator(&bound_lit, &positions) {
                pairs.push((li, row));
            }
        }
        Ok((right_vars, pairs))
    }
}

fn pos_of(vars: &[VarId], v: VarId) -> usize {
    vars.iter().position(|&x| x == v).expect("variable must appear in its own accumulator")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChaseConfig;
    use crate::edb::InMemoryEdb;
    use crate::rule::HeadLiteral;
    use crate::term::PredId;

    fn v(n: VarId) -> RuleTerm {
        RuleTerm::Var(n)
    }

    fn lit(pred: PredId, args: Vec<RuleTerm>, negated: bool) -> BodyLiteral {
        BodyLiteral { pred_id: pred, args, negated }
    }

    #[test]
    fn transitive_closure_join_propagates_provenance() {
        // T(x,z) :- E(x,y), T(y,z).
        const E: PredId = PredId(0);
        const T: PredId = PredId(1);

        let mut edb = InMemoryEdb::new();
        edb.insert(E, vec![vec![Term(1), Term(2)], vec![Term(2), Term(3)]]);

        let mut graph = GbGraph::new(ChaseConfig::default());
        let t0 = graph
            .add_node_prov(T, None, 0, Segment::from_columns(vec![
                Column::dense(vec![Term(2)]),
                Column::dense(vec![Term(3)]),
            ]), vec![])
            .unwrap();

        let rule = RuleDef {
            body: vec![
                lit(E, vec![v(0), v(1)], false),
                lit(T, vec![v(1), v(2)], false),
            ],
            head: HeadLiteral { pred_id: T, args: vec![v(0), v(2)] },
        };
        let sources = vec![LiteralSource::Edb, LiteralSource::Idb(vec![t0])];

        let executor = GbRuleExecutor::new(&edb);
        let result = executor.execute_rule(&graph, &rule, &sources).unwrap().unwrap();
        let c = result.columnar();
        assert_eq!(c.nrows(), 1);
        assert_eq!(c.row(0), vec![Term(1), Term(3)]);
        assert!(matches!(c.provenance(), Provenance::FullProv(levels) if levels.len() == 2));
    }

    #[test]
    fn negated_literal_filters_out_matching_rows() {
        // Head(x) :- A(x), not B(x).
        const A: PredId = PredId(0);
        const B: PredId = PredId(1);
        const HEAD: PredId = PredId(2);

        let mut edb = InMemoryEdb::new();
        edb.insert(A, vec![vec![Term(1)], vec![Term(2)], vec![Term(3)]]);
        edb.insert(B, vec![vec![Term(2)]]);

        let graph = GbGraph::new(ChaseConfig::default());
        let rule = RuleDef {
            body: vec![
                lit(A, vec![v(0)], false),
                lit(B, vec![v(0)], true),
            ],
            head: HeadLiteral { pred_id: HEAD, args: vec![v(0)] },
        };
        let sources = vec![LiteralSource::Edb, LiteralSource::Edb];

        let executor = GbRuleExecutor::new(&edb);
        let result = executor.execute_rule(&graph, &rule, &sources).unwrap().unwrap();
        let c = result.columnar();
        let mut rows: Vec<u64> = (0..c.nrows()).map(|i| c.row(i)[0].0).collect();
        rows.sort_unstable();
        assert_eq!(rows, vec![1, 3]);
    }

    #[test]
    fn non_injective_projection_is_deduplicated() {
        // Head(x) :- A(x,y).
        const A: PredId = PredId(0);
        const HEAD: PredId = PredId(1);

        let mut edb = InMemoryEdb::new();
        edb.insert(A, vec![vec![Term(1), Term(10)], vec![Term(1), Term(20)]]);

        let graph = GbGraph::new(ChaseConfig::default());
        let rule = RuleDef {
            body: vec![lit(A, vec![v(0), v(1)], false)],
            head: HeadLiteral { pred_id: HEAD, args: vec![v(0)] },
        };
        let sources = vec![LiteralSource::Edb];

        let executor = GbRuleExecutor::new(&edb);
        let result = executor.execute_rule(&graph, &rule, &sources).unwrap().unwrap();
        let c = result.columnar();
        assert_eq!(c.nrows(), 1);
        assert_eq!(c.row(0), vec![Term(1)]);
    }

    #[test]
    fn empty_join_short_circuits_to_none() {
        const A: PredId = PredId(0);
        const B: PredId = PredId(1);
        const HEAD: PredId = PredId(2);

        let mut edb = InMemoryEdb::new();
        edb.insert(A, vec![vec![Term(1)]]);
        edb.insert(B, vec![vec![Term(9)]]);

        let graph = GbGraph::new(ChaseConfig::default());
        let rule = RuleDef {
            body: vec![
                lit(A, vec![v(0)], false),
                lit(B, vec![v(0)], false),
            ],
            head: HeadLiteral { pred_id: HEAD, args: vec![v(0)] },
        };
        let sources = vec![LiteralSource::Edb, LiteralSource::Edb];

        let executor = GbRuleExecutor::new(&edb);
        let result = executor.execute_rule(&graph, &rule, &sources).unwrap();
        assert!(result.is_none());
    }

    /// An EDB adapter that only supports scanning `restricted` under a
    /// fully-constant binding, forcing joins against it through strategy 3
    /// while leaving every other predicate free to scan unbound (as `L1`
    /// always must be able to).
    struct ConstantOnlyEdb {
        inner: InMemoryEdb,
        restricted: PredId,
    }

    impl EdbLayer for ConstantOnlyEdb {
        fn get_segment(&self, pred: PredId) -> Segment {
            self.inner.get_segment(pred)
        }

        fn is_query_allowed(&self, literal: &BodyLiteral) -> bool {
            if literal.pred_id != self.restricted {
                return true;
            }
            // Simulates an index that requires the leading column bound.
            matches!(literal.args.first(), Some(RuleTerm::Const(_)))
        }

        fn get_iterator(&self, literal: &BodyLiteral, positions: &[usize]) -> Vec<Vec<Term>> {
            self.inner.get_iterator(literal, positions)
        }

        fn get_cardinality(&self, literal: &BodyLiteral) -> usize {
            self.inner.get_cardinality(literal)
        }

        fn check_new_in(
            &self,
            lit1: &BodyLiteral,
            pos1: &[usize],
            lit2: &BodyLiteral,
            pos2: &[usize],
        ) -> Vec<Vec<Term>> {
            self.inner.check_new_in(lit1, pos1, lit2, pos2)
        }

        fn get_or_add_dict_number(&self, text: &str) -> Term {
            self.inner.get_or_add_dict_number(text)
        }

        fn get_dict_text(&self, id: Term) -> Option<String> {
            self.inner.get_dict_text(id)
        }
    }

    #[test]
    fn nested_loop_strategy_used_when_edb_rejects_unbound_scan() {
        // Head(x,z) :- A(x,y), B(y,z). B only answers constant-bound scans.
        const A: PredId = PredId(0);
        const B: PredId = PredId(1);
        const HEAD: PredId = PredId(2);

        let mut inner = InMemoryEdb::new();
        inner.insert(A, vec![vec![Term(1), Term(10)], vec![Term(2), Term(20)]]);
        inner.insert(B, vec![vec![Term(10), Term(100)], vec![Term(99), Term(999)]]);
        let edb = ConstantOnlyEdb { inner, restricted: B };

        assert!(!edb.is_query_allowed(&lit(B, vec![v(0), v(1)], false)));

        let graph = GbGraph::new(ChaseConfig::default());
        let rule = RuleDef {
            body: vec![lit(A, vec![v(0), v(1)], false), lit(B, vec![v(1), v(2)], false)],
            head: HeadLiteral { pred_id: HEAD, args: vec![v(0), v(2)] },
        };
        let sources = vec![LiteralSource::Edb, LiteralSource::Edb];

        let executor = GbRuleExecutor::new(&edb);
        let result = executor.execute_rule(&graph, &rule, &sources).unwrap().unwrap();
        let c = result.columnar();
        assert_eq!(c.nrows(), 1);
        assert_eq!(c.row(0), vec![Term(1), Term(100)]);
    }
}
