//! Snapshot engine split into submodules:
//! - leaf.rs: Snapshot (one component, cached fragment, weak reference).
//! - set.rs: SnapshotSet (all components of one kind, rebuilt per update).
//! - collection.rs: SnapshotCollection (parts + part-sets, profile variant).
//!
//! Every layer cascades `init` / `update` / `restore` to the layer below and
//! prefixes errors with its own name.

mod collection;
mod leaf;
mod set;

pub use collection::{SnapshotCollection, GEOMETRY_ID, GEOMETRY_KEYS};
pub use leaf::Snapshot;
pub use set::{Predicate, SnapshotSet};
