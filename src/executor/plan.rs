//! Variable planning (spec.md §4.3 "Variable planning").

use crate::rule::{RuleDef, VarId};

/// For one body position: which variables join against the accumulator,
/// which accumulator variables must be carried forward, and which new
/// variables from this literal must be carried forward.
#[derive(Debug, Clone, Default)]
pub struct LiteralPlan {
    pub join_vars: Vec<VarId>,
    pub copy_vars_left: Vec<VarId>,
    pub copy_vars_right: Vec<VarId>,
}

/// Computes a [`LiteralPlan`] per body literal. "Needed later" is the
/// union of the head's free variables and every variable in subsequent body
/// literals (spec.md §4.3).
#[must_use]
pub fn plan_literals(rule: &RuleDef) -> Vec<LiteralPlan> {
    let n = rule.body.len();
    let mut suffix_vars: Vec<Vec<VarId>> = vec![Vec::new(); n + 1];
    for i in (0..n).rev() {
        let mut vars = rule.body[i].vars();
        for v in &suffix_vars[i + 1] {
            if !vars.contains(v) {
                vars.push(*v);
            }
        }
        suffix_vars[i] = vars;
    }
    let head_vars = rule.head.vars();

    let mut left_vars: Vec<VarId> = Vec::new();
    let mut plans = Vec::with_capacity(n);
    for i in 0..n {
        let mut needed_later = head_vars.clone();
        for v in &suffix_vars[i + 1] {
            if !needed_later.contains(v) {
                needed_later.push(*v);
            }
        }
        let lit_vars = rule.body[i].vars();
        let join_vars: Vec<VarId> = left_vars.iter().copied().filter(|v| lit_vars.contains(v)).collect();
        let copy_vars_left: Vec<VarId> = left_vars
            .iter()
            .copied()
            .filter(|v| needed_later.contains(v))
            .collect();
        let copy_vars_right: Vec<VarId> = lit_vars
            .iter()
            .copied()
            .filter(|v| !left_vars.contains(v) && needed_later.contains(v))
            .collect();
        plans.push(LiteralPlan {
            join_vars,
            copy_vars_left,
            copy_vars_right,
        });
        for v in lit_vars {
            if !left_vars.contains(&v) {
                left_vars.push(v);
            }
        }
    }
    plans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{BodyLiteral, HeadLiteral, RuleTerm};
    use crate::term::PredId;

    fn v(n: VarId) -> RuleTerm {
        RuleTerm::Var(n)
    }

    #[test]
    fn transitive_closure_plan_matches_spec_example() {
        // T(x,z) :- E(x,y), T(y,z).
        let rule = RuleDef {
            body: vec![
                BodyLiteral { pred_id: PredId(0), args: vec![v(0), v(1)], negated: false },
                BodyLiteral { pred_id: PredId(1), args: vec![v(1), v(2)], negated: false },
            ],
            head: HeadLiteral { pred_id: PredId(1), args: vec![v(0), v(2)] },
        };
        let plans = plan_literals(&rule);
        assert_eq!(plans[0].join_vars, Vec::<VarId>::new());
        assert_eq!(plans[0].copy_vars_right, vec![0, 1]);
        assert_eq!(plans[1].join_vars, vec![1]);
        assert_eq!(plans[1].copy_vars_left, vec![0]);
        assert_eq!(plans[1].copy_vars_right, vec![2]);
    }
}
