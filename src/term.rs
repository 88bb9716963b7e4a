//! The term and predicate-id domain.
//!
//! Per spec.md §3: a `Term` is a 64-bit unsigned integer. Dictionary encoding
//! of actual literal text happens above this core (spec.md §1 Non-goals); by
//! the time a fact reaches a `Segment` it is already a vector of `Term`s.

use std::fmt;

/// A single 64-bit value inside a fact. Already dictionary-encoded by the
/// host; the core never looks inside it except to compare, sort, and — for
/// existential rules — mint fresh values above [`ChaseConfig::null_threshold`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Term(pub u64);

impl Term {
    /// The sentinel denoting "absent/any" (spec.md §3: `~0`).
    pub const ANY: Term = Term(u64::MAX);

    #[must_use]
    pub fn is_any(self) -> bool {
        self == Self::ANY
    }

    #[must_use]
    pub fn is_null(self, threshold: u64) -> bool {
        self.0 >= threshold
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ANY {
            write!(f, "Term(ANY)")
        } else {
            write!(f, "Term({})", self.0)
        }
    }
}

impl From<u64> for Term {
    fn from(v: u64) -> Self {
        Term(v)
    }
}

/// A predicate identifier. Small integer; each predicate has a fixed arity
/// tracked by the program collaborator (spec.md §6).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct PredId(pub u32);

impl fmt::Display for PredId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}
