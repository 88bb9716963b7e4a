//! Rule and program collaborator types (spec.md §6).
//!
//! Rule parsing, program stratification, and the top-level fixed-point
//! driver are explicitly out of scope (spec.md §1); this module only defines
//! the shapes the core needs from those external layers so
//! [`crate::executor::GbRuleExecutor`] can compile a rule body into a join
//! pipeline.

use crate::term::{PredId, Term};

/// A variable identifier scoped to one rule. Distinct from [`Term`]: a
/// variable exists only in rule syntax and is resolved to a column position
/// by the time a literal is matched against a segment.
pub type VarId = u32;

/// One argument of a rule literal: either a variable to be bound, or a
/// constant that must match exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuleTerm {
    Var(VarId),
    Const(Term),
}

impl RuleTerm {
    #[must_use]
    pub fn as_var(self) -> Option<VarId> {
        match self {
            RuleTerm::Var(v) => Some(v),
            RuleTerm::Const(_) => None,
        }
    }
}

/// One literal in a rule body.
#[derive(Clone, Debug)]
pub struct BodyLiteral {
    pub pred_id: PredId,
    pub args: Vec<RuleTerm>,
    pub negated: bool,
}

impl BodyLiteral {
    #[must_use]
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Distinct variables referenced by this literal, in first-occurrence order.
    #[must_use]
    pub fn vars(&self) -> Vec<VarId> {
        let mut seen = Vec::new();
        for a in &self.args {
            if let RuleTerm::Var(v) = a {
                if !seen.contains(v) {
                    seen.push(*v);
                }
            }
        }
        seen
    }

    /// True when the same variable occurs twice in this literal's tuple
    /// (spec.md §4.3: "A literal with repeated variables in the rightmost
    /// position is rejected (caller must rewrite)" — the EDB layer is
    /// expected to handle repeated variables for literals it scans directly;
    /// this helper flags the rejected case for the join pipeline).
    #[must_use]
    pub fn has_repeated_vars(&self) -> bool {
        let mut seen = Vec::new();
        for a in &self.args {
            if let RuleTerm::Var(v) = a {
                if seen.contains(v) {
                    return true;
                }
                seen.push(*v);
            }
        }
        false
    }
}

/// The single head literal of a rule.
#[derive(Clone, Debug)]
pub struct HeadLiteral {
    pub pred_id: PredId,
    pub args: Vec<RuleTerm>,
}

impl HeadLiteral {
    #[must_use]
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    #[must_use]
    pub fn vars(&self) -> Vec<VarId> {
        let mut out = Vec::new();
        for a in &self.args {
            if let RuleTerm::Var(v) = a {
                out.push(*v);
            }
        }
        out
    }
}

/// A rule: `head :- body_1, ..., body_n.`
#[derive(Clone, Debug)]
pub struct RuleDef {
    pub body: Vec<BodyLiteral>,
    pub head: HeadLiteral,
}

/// Provided by the rule-parsing layer for query-containment checks (spec.md
/// §6). The derivation core calls this only when asked to decide redundancy
/// via query containment, which is out of scope here (see `SPEC_FULL.md`
/// §3) — kept as a trait so a host that does implement it can still satisfy
/// the interface without the core needing to know how fresh variables are
/// minted.
pub trait RuleSource {
    fn rewrite_with_fresh_vars(&self, counter: &mut VarId) -> RuleDef;
}

/// Provided by the program/stratification layer (spec.md §6 "Program
/// collaborator").
pub trait ProgramSource {
    fn predicate_arity(&self, pred: PredId) -> usize;
    fn rule(&self, idx: usize) -> &RuleDef;
}
