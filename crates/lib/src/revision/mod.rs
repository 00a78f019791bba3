//! Revision histories.
//!
//! A package's revisions form an append-only, numbered history. Branching
//! value-copies a revision into the next number; releasing one (giving it a
//! version name) freezes it against structural edits. Edges to library
//! revisions live on the revision that declares them.

mod deps;
mod graph;
mod store;
mod types;

pub use deps::ResolvedModule;
pub use graph::RevisionGraph;
pub use store::RevisionStore;
pub use types::*;
