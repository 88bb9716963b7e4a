//! # chase-core
//!
//! The derivation-graph core of a forward-chaining existential-rule
//! ("chase") reasoning engine: columnar segments with provenance tracking, a
//! derivation graph of permanent nodes, and a rule executor that compiles a
//! rule body into a join pipeline.
//!
//! ## Scope
//!
//! This crate is deliberately narrow. Rule parsing, program stratification,
//! the top-level semi-naive fixpoint driver, and the EDB storage backend all
//! live above it — this crate only defines the collaborator traits
//! ([`rule::ProgramSource`], [`edb::EdbLayer`]) those layers must implement.
//! A host wires the pieces together roughly like this:
//!
//! ```rust,ignore
//! use chase_core::config::ChaseConfig;
//! use chase_core::edb::InMemoryEdb;
//! use chase_core::executor::{GbRuleExecutor, LiteralSource};
//! use chase_core::graph::GbGraph;
//!
//! let mut graph = GbGraph::new(ChaseConfig::default());
//! let edb = InMemoryEdb::new();
//! let executor = GbRuleExecutor::new(&edb);
//!
//! // For each stratum, for each rule, for each fixpoint round: resolve
//! // sources for the rule's body literals, run the rule, and retain the
//! // result into the graph. The driver that loops this to a fixpoint is
//! // the host's job, not this crate's.
//! if let Some(derived) = executor.execute_rule(&graph, rule, &sources)? {
//!     graph.add_nodes_prov(head_pred, Some(rule_idx), step, derived)?;
//! }
//! ```
//!
//! ## Module map
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`term`] | The `Term`/`PredId` value domain |
//! | [`column`] | Immutable typed value sequences (dense/constant/compressed/EDB-view) |
//! | [`segment`] | Columnar tuple blocks with provenance, composite/lazy segments |
//! | [`edb`] | The EDB collaborator interface and an in-memory reference adapter |
//! | [`rule`] | Rule/literal shapes the executor compiles against |
//! | [`graph`] | The derivation graph: nodes, retain, merge, EGD term replacement |
//! | [`executor`] | Variable planning and the join pipeline (`GbRuleExecutor`) |
//! | [`config`] | Layered runtime configuration |
//! | [`stats`] | Cumulative counters and timings |
//! | [`error`] | The fatal-error taxonomy (`ChaseError`) |

pub mod column;
pub mod config;
pub mod edb;
pub mod error;
pub mod executor;
pub mod graph;
pub mod rule;
pub mod segment;
pub mod stats;
pub mod term;

pub use config::ChaseConfig;
pub use error::{ChaseError, ChaseResult};
pub use executor::{GbRuleExecutor, LiteralSource};
pub use graph::GbGraph;
pub use segment::{NodeId, Provenance, Segment};
pub use term::{PredId, Term};
