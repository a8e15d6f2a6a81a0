//! Host collaborator contract.
//!
//! The live graph belongs to the host; the engine never holds a handle across
//! calls. It keeps a [`ComponentKey`] and re-resolves it through [`Host`] on
//! every use, so the host may rebuild or recreate components in between.
//!
//! Submodules:
//! - memory.rs: MemoryHost, an in-memory graph (tests, CLI).
//! - scene.rs: JSON scene format loaded into MemoryHost.
//! - task.rs: CreateTask, cooperative entity creation with timeout.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fragment::Fragment;
use crate::kind::ComponentKind;

pub mod memory;
pub mod scene;
pub mod task;

pub use memory::MemoryHost;
pub use task::{CreateTask, EntityHandle};

/// Identity of a node (entity root or any descendant) in the host graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Re-resolvable reference to one live component.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComponentKey {
    pub kind: ComponentKind,
    pub name: String,
    pub store_id: String,
    /// Node the component is attached to.
    pub node: NodeId,
}

impl ComponentKey {
    /// `"<componentName> <storeId>"`, the key used inside a set.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.name, self.store_id)
    }
}

/// What enumeration/lookup reports about a live component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentInfo {
    pub key: ComponentKey,
    /// Appearance locked for editing.
    pub locked: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupScope {
    /// Attached directly to the node.
    Direct,
    /// Anywhere below the node (node itself excluded).
    Descendants,
}

/// Mirrors the host's own `GetJSON(includePhysical, includeAppearance, forceStore)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    pub include_physical: bool,
    pub include_appearance: bool,
    pub force_store: bool,
}

impl ExportOptions {
    pub const APPEARANCE: ExportOptions = ExportOptions {
        include_physical: false,
        include_appearance: true,
        force_store: false,
    };
}

/// Mirrors the host's own `RestoreFromJSON(restorePhysical, restoreAppearance, .., setMissingToDefault)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestoreOptions {
    pub restore_physical: bool,
    pub restore_appearance: bool,
    /// Keys absent from the fragment are reset to their default on the target.
    pub set_missing_to_default: bool,
}

impl RestoreOptions {
    pub const APPEARANCE: RestoreOptions = RestoreOptions {
        restore_physical: false,
        restore_appearance: true,
        set_missing_to_default: false,
    };
}

/// Operations the engine consumes from the host. All synchronous except
/// entity creation, which is split into `begin_create` + `resolve_entity` and
/// driven by [`CreateTask`].
pub trait Host {
    /// Whether the node still exists in the graph.
    fn contains_node(&self, node: NodeId) -> bool;

    /// First component of `kind` at `node` (or below it, per `scope`).
    fn lookup_component(
        &self,
        node: NodeId,
        kind: ComponentKind,
        scope: LookupScope,
    ) -> Option<ComponentInfo>;

    /// Attach a fresh component of `kind` to `node`.
    fn ensure_component(&mut self, node: NodeId, kind: ComponentKind) -> Result<ComponentInfo>;

    /// Re-resolve a weak reference; `None` once the component is gone.
    fn component(&self, key: &ComponentKey) -> Option<ComponentInfo>;

    /// Every component of `kind` in the subtree rooted at `node` (node
    /// included), in graph discovery order.
    fn enumerate_descendants(&self, node: NodeId, kind: ComponentKind) -> Vec<ComponentInfo>;

    fn export_state(&self, key: &ComponentKey, opts: ExportOptions) -> Result<Fragment>;

    fn apply_state(&mut self, key: &ComponentKey, fragment: &Fragment, opts: RestoreOptions)
        -> Result<()>;

    /// Host restore-from-tree entry point: accepts a single storable fragment
    /// (`{"id": ..}`) or a composite tree (`{"storables": [..]}`).
    fn apply_state_to_root(&mut self, root: NodeId, fragment: &Fragment, opts: RestoreOptions)
        -> Result<()>;

    /// Reset hook run before a whole-tree restore.
    fn pre_restore(&mut self, _root: NodeId) -> Result<()> {
        Ok(())
    }

    /// Start creating an entity of host type `kind` with identifier `id`.
    fn begin_create(&mut self, kind: &str, id: &str) -> Result<()>;

    fn resolve_entity(&self, id: &str) -> Option<NodeId>;
}
