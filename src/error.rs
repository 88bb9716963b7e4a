//! Error taxonomy for the derivation core.
//!
//! Fatal kinds (`UnsupportedShape`, `InvariantViolation`, `UNAContradiction`)
//! abort the current rule execution and propagate with `?`; they are never
//! recovered locally. `EDBUnavailable` and `EmptyIntermediate` are ordinary
//! control flow at the call site (see `crate::executor`), not exceptions, and
//! so are not represented here as error variants a caller is expected to
//! retry past — they show up as `Option`/enum returns instead.

use thiserror::Error;

use crate::term::PredId;

/// Fatal errors the derivation core can raise.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChaseError {
    /// A literal or segment shape the core does not support.
    #[error("unsupported shape: {0}")]
    UnsupportedShape(String),

    /// An internal invariant was violated (e.g. a temporary node used as an
    /// incoming edge, or a composite segment inserted into the permanent
    /// graph).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Term replacement tried to identify two non-null constants.
    ///
    /// "due to UNA, the chase does not exist" (spec.md §4.4.4, scenario S3).
    #[error(
        "due to UNA, the chase does not exist: cannot identify constants {a} and {b} for predicate {pred:?}"
    )]
    UnaContradiction { a: u64, b: u64, pred: Option<PredId> },

    /// A predicate received more staged contributions in one step than the
    /// reserved id space can encode (spec.md §4.4.5: capped at 2^24 per
    /// predicate per step).
    #[error("too many staged contributions for predicate {0:?} in one step (cap is 2^24)")]
    TooManyStagedContributions(PredId),
}

/// Result alias used throughout the crate for fatal-error propagation.
pub type ChaseResult<T> = Result<T, ChaseError>;
