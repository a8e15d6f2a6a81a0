//! In-memory host graph.
//!
//! Nodes form a forest (one tree per entity). Each node carries an ordered list
//! of components; a component's state is a fragment without its "id", which
//! export prepends. Discovery order is depth-first pre-order, components of a
//! node in attach order before its children.
//!
//! Failure injection (export/apply per store id, refused entity types) and a
//! frame-based creation delay let tests drive every error path.

use anyhow::{anyhow, Context, Result};
use log::debug;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use crate::fragment::{self, Fragment, ID};
use crate::kind::ComponentKind;

use super::scene::{Scene, SceneComponent, SceneNode};
use super::{
    ComponentInfo, ComponentKey, ExportOptions, Host, LookupScope, NodeId, RestoreOptions,
};

#[derive(Debug, Clone)]
struct MemComponent {
    kind: ComponentKind,
    name: String,
    store_id: String,
    locked: bool,
    state: Fragment,
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    type_name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    components: Vec<MemComponent>,
}

#[derive(Debug, Clone)]
struct PendingEntity {
    type_name: String,
    uid: String,
    frames_left: u32,
}

#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: BTreeMap<NodeId, Node>,
    next_id: u64,
    pending: Vec<PendingEntity>,
    create_delay_frames: u32,
    refused_types: HashSet<String>,
    fail_export: HashSet<String>,
    fail_apply: HashSet<String>,
    pre_restore_calls: usize,
    root_restores: usize,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(id, node);
        id
    }

    /// Add a top-level entity (its own root).
    pub fn add_entity(&mut self, uid: &str, type_name: &str) -> NodeId {
        self.alloc(Node {
            name: uid.to_string(),
            type_name: type_name.to_string(),
            parent: None,
            children: Vec::new(),
            components: Vec::new(),
        })
    }

    pub fn add_child(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        if !self.nodes.contains_key(&parent) {
            return Err(anyhow!("parent node {} does not exist", parent));
        }
        let id = self.alloc(Node {
            name: name.to_string(),
            type_name: String::new(),
            parent: Some(parent),
            children: Vec::new(),
            components: Vec::new(),
        });
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        Ok(id)
    }

    /// Attach a component; `state` must be a JSON object (its "id" is ignored).
    pub fn attach(
        &mut self,
        node: NodeId,
        kind: ComponentKind,
        name: &str,
        store_id: &str,
        state: Value,
    ) -> Result<ComponentKey> {
        let mut state = fragment::from_value(state)
            .with_context(|| format!("state of component {}", store_id))?;
        state.shift_remove(ID);
        let n = self
            .nodes
            .get_mut(&node)
            .ok_or_else(|| anyhow!("node {} does not exist", node))?;
        n.components.push(MemComponent {
            kind,
            name: name.to_string(),
            store_id: store_id.to_string(),
            locked: false,
            state,
        });
        Ok(ComponentKey {
            kind,
            name: name.to_string(),
            store_id: store_id.to_string(),
            node,
        })
    }

    pub fn set_locked(&mut self, key: &ComponentKey, locked: bool) -> Result<()> {
        self.component_mut(key)?.locked = locked;
        Ok(())
    }

    /// Remove a component, simulating the host dropping it.
    pub fn detach(&mut self, key: &ComponentKey) -> Result<()> {
        let n = self
            .nodes
            .get_mut(&key.node)
            .ok_or_else(|| anyhow!("node {} does not exist", key.node))?;
        let before = n.components.len();
        n.components
            .retain(|c| !(c.kind == key.kind && c.store_id == key.store_id));
        if n.components.len() == before {
            return Err(anyhow!("component {} not attached to {}", key.store_id, key.node));
        }
        Ok(())
    }

    /// Remove a node and its whole subtree.
    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        let parent = self
            .nodes
            .get(&node)
            .ok_or_else(|| anyhow!("node {} does not exist", node))?
            .parent;
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            p.children.retain(|c| *c != node);
        }
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(n) = self.nodes.remove(&id) {
                stack.extend(n.children);
            }
        }
        Ok(())
    }

    /// Current state of a component, without its id.
    pub fn state(&self, key: &ComponentKey) -> Option<&Fragment> {
        self.find(key).map(|c| &c.state)
    }

    /// Key of the first component with `store_id` in the subtree of `root`.
    pub fn find_by_store_id(&self, root: NodeId, store_id: &str) -> Option<ComponentKey> {
        let mut found = None;
        self.walk(root, &mut |node, c| {
            if found.is_none() && c.store_id == store_id {
                found = Some(key_of(node, c));
            }
        });
        found
    }

    pub fn set_field(&mut self, key: &ComponentKey, field: &str, value: Value) -> Result<()> {
        self.component_mut(key)?.state.insert(field.to_string(), value);
        Ok(())
    }

    pub fn fail_export_for(&mut self, store_id: &str) {
        self.fail_export.insert(store_id.to_string());
    }

    pub fn fail_apply_for(&mut self, store_id: &str) {
        self.fail_apply.insert(store_id.to_string());
    }

    pub fn clear_failures(&mut self) {
        self.fail_export.clear();
        self.fail_apply.clear();
    }

    /// Frames an entity creation stays pending before it materializes.
    pub fn set_create_delay(&mut self, frames: u32) {
        self.create_delay_frames = frames;
    }

    /// Entities of this type are accepted but never materialize.
    pub fn refuse_type(&mut self, type_name: &str) {
        self.refused_types.insert(type_name.to_string());
    }

    /// Advance one host frame: pending creations whose delay ran out appear.
    pub fn tick(&mut self) {
        let mut ready = Vec::new();
        for p in self.pending.iter_mut() {
            if p.frames_left == 0 {
                ready.push(p.clone());
            } else {
                p.frames_left -= 1;
            }
        }
        self.pending.retain(|p| !ready.iter().any(|r| r.uid == p.uid));
        for p in ready {
            if self.refused_types.contains(&p.type_name) {
                continue;
            }
            let id = self.add_entity(&p.uid, &p.type_name);
            debug!("created entity {} ({}) as {}", p.uid, p.type_name, id);
        }
    }

    pub fn pre_restore_calls(&self) -> usize {
        self.pre_restore_calls
    }

    pub fn root_restores(&self) -> usize {
        self.root_restores
    }

    pub fn entity_name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|n| n.name.as_str())
    }

    // ---------- scene I/O ----------

    pub fn from_scene(scene: &Scene) -> Result<Self> {
        let mut host = MemoryHost::new();
        for entity in &scene.entities {
            let root = host.add_entity(&entity.id, &entity.type_name);
            host.load_node(root, entity)
                .with_context(|| format!("load entity {}", entity.id))?;
        }
        Ok(host)
    }

    fn load_node(&mut self, node: NodeId, entry: &SceneNode) -> Result<()> {
        for c in &entry.components {
            let key = self.attach(node, c.kind, &c.name, &c.store_id, Value::Object(c.state.clone()))?;
            if c.locked {
                self.set_locked(&key, true)?;
            }
        }
        for child in &entry.children {
            let id = self.add_child(node, &child.id)?;
            self.load_node(id, child)?;
        }
        Ok(())
    }

    pub fn to_scene(&self) -> Scene {
        let entities = self
            .nodes
            .iter()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(id, _)| self.scene_node(*id))
            .collect();
        Scene { entities }
    }

    fn scene_node(&self, id: NodeId) -> SceneNode {
        let n = &self.nodes[&id];
        SceneNode {
            id: n.name.clone(),
            type_name: n.type_name.clone(),
            components: n
                .components
                .iter()
                .map(|c| SceneComponent {
                    kind: c.kind,
                    name: c.name.clone(),
                    store_id: c.store_id.clone(),
                    locked: c.locked,
                    state: c.state.clone(),
                })
                .collect(),
            children: n.children.iter().map(|c| self.scene_node(*c)).collect(),
        }
    }

    // ---------- internals ----------

    fn find(&self, key: &ComponentKey) -> Option<&MemComponent> {
        self.nodes
            .get(&key.node)?
            .components
            .iter()
            .find(|c| c.kind == key.kind && c.store_id == key.store_id)
    }

    fn component_mut(&mut self, key: &ComponentKey) -> Result<&mut MemComponent> {
        self.nodes
            .get_mut(&key.node)
            .and_then(|n| {
                n.components
                    .iter_mut()
                    .find(|c| c.kind == key.kind && c.store_id == key.store_id)
            })
            .ok_or_else(|| anyhow!("component {} on {} not found", key.store_id, key.node))
    }

    fn walk<'a>(&'a self, root: NodeId, f: &mut dyn FnMut(NodeId, &'a MemComponent)) {
        let Some(n) = self.nodes.get(&root) else {
            return;
        };
        for c in &n.components {
            f(root, c);
        }
        for child in &n.children {
            self.walk(*child, f);
        }
    }

    fn apply_to(&mut self, key: &ComponentKey, patch: &Fragment, opts: RestoreOptions) -> Result<()> {
        if self.fail_apply.contains(&key.store_id) {
            return Err(anyhow!("apply rejected by host for {}", key.store_id));
        }
        let c = self.component_mut(key)?;
        if opts.set_missing_to_default {
            c.state.retain(|k, _| patch.contains_key(k));
        }
        for (k, v) in patch.iter().filter(|(k, _)| k.as_str() != ID) {
            c.state.insert(k.clone(), v.clone());
        }
        Ok(())
    }
}

fn key_of(node: NodeId, c: &MemComponent) -> ComponentKey {
    ComponentKey {
        kind: c.kind,
        name: c.name.clone(),
        store_id: c.store_id.clone(),
        node,
    }
}

fn info_of(node: NodeId, c: &MemComponent) -> ComponentInfo {
    ComponentInfo {
        key: key_of(node, c),
        locked: c.locked,
    }
}

impl Host for MemoryHost {
    fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn lookup_component(
        &self,
        node: NodeId,
        kind: ComponentKind,
        scope: LookupScope,
    ) -> Option<ComponentInfo> {
        let n = self.nodes.get(&node)?;
        match scope {
            LookupScope::Direct => n
                .components
                .iter()
                .find(|c| c.kind == kind)
                .map(|c| info_of(node, c)),
            LookupScope::Descendants => n
                .children
                .iter()
                .find_map(|child| self.enumerate_descendants(*child, kind).into_iter().next()),
        }
    }

    fn ensure_component(&mut self, node: NodeId, kind: ComponentKind) -> Result<ComponentInfo> {
        let id = kind.ops().default_store_id;
        let key = self.attach(node, kind, id, id, Value::Object(Fragment::new()))?;
        Ok(ComponentInfo { key, locked: false })
    }

    fn component(&self, key: &ComponentKey) -> Option<ComponentInfo> {
        self.find(key).map(|c| info_of(key.node, c))
    }

    fn enumerate_descendants(&self, node: NodeId, kind: ComponentKind) -> Vec<ComponentInfo> {
        let mut out = Vec::new();
        self.walk(node, &mut |n, c| {
            if c.kind == kind {
                out.push(info_of(n, c));
            }
        });
        out
    }

    fn export_state(&self, key: &ComponentKey, _opts: ExportOptions) -> Result<Fragment> {
        if self.fail_export.contains(&key.store_id) {
            return Err(anyhow!("export rejected by host for {}", key.store_id));
        }
        let c = self
            .find(key)
            .ok_or_else(|| anyhow!("component {} on {} not found", key.store_id, key.node))?;
        let mut out = Fragment::new();
        out.insert(ID.to_string(), Value::String(c.store_id.clone()));
        for (k, v) in &c.state {
            out.insert(k.clone(), v.clone());
        }
        Ok(out)
    }

    fn apply_state(
        &mut self,
        key: &ComponentKey,
        patch: &Fragment,
        opts: RestoreOptions,
    ) -> Result<()> {
        self.apply_to(key, patch, opts)
    }

    fn apply_state_to_root(
        &mut self,
        root: NodeId,
        tree: &Fragment,
        opts: RestoreOptions,
    ) -> Result<()> {
        if !self.contains_node(root) {
            return Err(anyhow!("root {} does not exist", root));
        }
        self.root_restores += 1;

        let entries: Vec<&Fragment> = if tree.contains_key(fragment::STORABLES) {
            fragment::storables(tree)
                .iter()
                .filter_map(Value::as_object)
                .collect()
        } else if tree.contains_key(ID) {
            vec![tree]
        } else {
            return Err(anyhow!("fragment has neither \"id\" nor \"storables\""));
        };

        for entry in entries {
            let Some(id) = fragment::storable_id(entry) else {
                debug!("restore on {}: skipping storable without id", root);
                continue;
            };
            match self.find_by_store_id(root, id) {
                Some(key) => self.apply_to(&key, entry, opts)?,
                None => debug!("restore on {}: no storable '{}', skipped", root, id),
            }
        }
        Ok(())
    }

    fn pre_restore(&mut self, _root: NodeId) -> Result<()> {
        self.pre_restore_calls += 1;
        Ok(())
    }

    fn begin_create(&mut self, type_name: &str, uid: &str) -> Result<()> {
        if self.resolve_entity(uid).is_some() {
            return Err(anyhow!("entity '{}' already exists", uid));
        }
        if self.pending.iter().any(|p| p.uid == uid) {
            return Ok(());
        }
        self.pending.push(PendingEntity {
            type_name: type_name.to_string(),
            uid: uid.to_string(),
            frames_left: self.create_delay_frames,
        });
        Ok(())
    }

    fn resolve_entity(&self, uid: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, n)| n.parent.is_none() && n.name == uid)
            .map(|(id, _)| *id)
    }
}
