//! Dependency Graph
//!
//! Bookkeeping behind the reactive runtime: which subscriber read which
//! source, and which subscribers are waiting for a batch to close.
//!
//! # Overview
//!
//! - Edges go from a source (signal) to the subscribers (effects, memos)
//!   that read it during their most recent run.
//! - Both directions are stored, so that a subscriber can drop all of its
//!   edges in one step before re-running (dynamic dependency tracking).
//! - Per-source subscriber sets are insertion ordered; notification order is
//!   first-registration order.

mod edges;
mod scheduler;

pub use edges::DependencyGraph;
pub use scheduler::BatchScheduler;
