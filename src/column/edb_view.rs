//! The symbolic EDB-backed column variant (spec.md §3 Column "EDB-view").
//!
//! A `Column::EdbView` never owns data; it is a handle back to whatever the
//! EDB collaborator (spec.md §6) can produce for one argument position of
//! one literal. The concrete adapter lives with the `EdbLayer` trait in
//! [`crate::edb`], which keeps this module free of a dependency on rule/EDB
//! types.

use std::fmt;

use crate::term::{PredId, Term};

/// Identifies "the same kind" of EDB reference for the retain fast paths
/// (spec.md §4.4.2: "both sides are EDB views of the same kind"). Two
/// `EdbColumnSource`s that return equal keys may be compared via the EDB
/// layer's `checkNewIn` without materializing either side.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EdbSourceKey {
    pub pred: PredId,
    /// Argument position within the literal this column views.
    pub position: usize,
    /// Opaque tag distinguishing literals with different constant/repeated
    /// variable bindings over the same predicate (two literals over the same
    /// predicate but different bindings are not interchangeable for
    /// `checkNewIn`).
    pub binding_tag: u64,
}

/// What a `Column::EdbView` defers to.
pub trait EdbColumnSource: fmt::Debug + Send + Sync {
    fn len(&self) -> usize;
    fn get(&self, i: usize) -> Term;
    fn source_key(&self) -> EdbSourceKey;
}
