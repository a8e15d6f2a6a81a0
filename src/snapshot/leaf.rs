//! Snapshot: one live component and its cached fragment.
//!
//! The leaf never keeps a handle to the component. It remembers a
//! [`ComponentKey`] and resolves it again on every update/restore:
//! - standalone leaves run the kind's lookup chain on the root
//!   (direct → descendants → create);
//! - set members re-resolve their key, or rebind by name and store id when
//!   the host rebuilt the node or a different root is given.

use log::debug;
use serde_json::Value;

use crate::error::{SwapError, SwapResult};
use crate::fragment::{self, Fragment, ID};
use crate::host::{ComponentInfo, ComponentKey, Host, NodeId};
use crate::kind::ComponentKind;
use crate::metrics::{record_snapshot_capture, record_snapshot_guard_reset, record_snapshot_restore};

#[derive(Debug, Clone)]
pub struct Snapshot {
    kind: ComponentKind,
    owner: NodeId,
    standalone: bool,
    name: String,
    cached: Option<Fragment>,
    bound: Option<ComponentKey>,
}

impl Snapshot {
    /// Leaf that resolves its component from `owner` by itself.
    pub fn standalone(kind: ComponentKind, owner: NodeId) -> Self {
        Self {
            kind,
            owner,
            standalone: true,
            name: kind.type_name().to_string(),
            cached: None,
            bound: None,
        }
    }

    /// Leaf bound to a component discovered by a set.
    pub fn member(owner: NodeId, info: &ComponentInfo) -> Self {
        Self {
            kind: info.key.kind,
            owner,
            standalone: false,
            name: info.key.display_name(),
            cached: None,
            bound: Some(info.key.clone()),
        }
    }

    /// Standalone leaf, initialized and captured.
    pub fn attach(host: &mut dyn Host, kind: ComponentKind, owner: NodeId) -> SwapResult<Self> {
        let mut s = Self::standalone(kind, owner);
        s.init(host)?;
        s.update(host, None)?;
        Ok(s)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn is_standalone(&self) -> bool {
        self.standalone
    }

    /// Last captured fragment.
    pub fn fragment(&self) -> Option<&Fragment> {
        self.cached.as_ref()
    }

    /// Weak reference to the component this leaf last resolved.
    pub fn key(&self) -> Option<&ComponentKey> {
        self.bound.as_ref()
    }

    /// Resolve the backing component, bind it, drop the cache.
    pub fn init(&mut self, host: &mut dyn Host) -> SwapResult<()> {
        let key = self.resolve(host, self.owner).map_err(|e| e.within(&self.name))?;
        self.name = key.display_name();
        self.bound = Some(key);
        self.cached = None;
        Ok(())
    }

    /// Overwrite the cache with the live component's export.
    pub fn update(&mut self, host: &mut dyn Host, root: Option<NodeId>) -> SwapResult<&Fragment> {
        let captured = self.capture(host, root)?;
        Ok(self.commit(captured))
    }

    /// Resolve and export without touching the cache; pair with [`commit`].
    ///
    /// [`commit`]: Snapshot::commit
    pub fn capture(
        &self,
        host: &mut dyn Host,
        root: Option<NodeId>,
    ) -> SwapResult<(ComponentKey, Fragment)> {
        let root = root.unwrap_or(self.owner);
        let key = self
            .resolve(host, root)
            .map_err(|e| SwapError::capture(self.name.clone(), e))?;
        let captured = (self.kind.ops().export)(host, &key)
            .map_err(|e| SwapError::capture(key.display_name(), e))?;
        Ok((key, captured))
    }

    pub fn commit(&mut self, (key, captured): (ComponentKey, Fragment)) -> &Fragment {
        record_snapshot_capture();
        self.name = key.display_name();
        self.bound = Some(key);
        self.cached.insert(captured)
    }

    pub fn restore(&self, host: &mut dyn Host, root: Option<NodeId>) -> SwapResult<()> {
        self.restore_with(host, root, &[])
    }

    /// Push the cached fragment onto the live component. Fields listed in
    /// `preserve` are neither reset nor overwritten on the target.
    pub fn restore_with(
        &self,
        host: &mut dyn Host,
        root: Option<NodeId>,
        preserve: &[&str],
    ) -> SwapResult<()> {
        let root = root.unwrap_or(self.owner);
        let key = self
            .resolve(host, root)
            .map_err(|e| SwapError::restore(self.name.clone(), e))?;
        let Some(cached) = self.cached.as_ref() else {
            debug!("{}: nothing captured, live state kept", self.name);
            return Ok(());
        };
        let ops = self.kind.ops();

        let reset: Vec<&str> = ops
            .reference_fields
            .iter()
            .copied()
            .filter(|f| !preserve.contains(f))
            .collect();
        if !reset.is_empty() {
            let mut blank = Fragment::new();
            blank.insert(ID.to_string(), Value::String(key.store_id.clone()));
            for f in reset {
                blank.insert(f.to_string(), Value::Array(Vec::new()));
            }
            (ops.apply)(host, &key, &blank).map_err(|e| SwapError::restore(self.name.clone(), e))?;
            record_snapshot_guard_reset();
        }

        let outgoing = if preserve.is_empty() {
            cached.clone()
        } else {
            fragment::without_keys(cached, preserve)
        };
        (ops.apply)(host, &key, &outgoing).map_err(|e| SwapError::restore(self.name.clone(), e))?;
        record_snapshot_restore();
        Ok(())
    }

    fn resolve(&self, host: &mut dyn Host, root: NodeId) -> SwapResult<ComponentKey> {
        if self.standalone {
            return (self.kind.ops().lookup)(host, root, self.kind).map(|info| info.key);
        }
        let lost = |reason: &str| SwapError::Lookup {
            part: String::new(),
            kind: self.kind,
            root,
            reason: reason.to_string(),
        };
        let bound = self
            .bound
            .as_ref()
            .ok_or_else(|| lost("member snapshot was never bound"))?;
        if !host.contains_node(root) {
            return Err(lost("root is absent"));
        }
        if root == self.owner && host.component(bound).is_some() {
            return Ok(bound.clone());
        }
        host.enumerate_descendants(root, self.kind)
            .into_iter()
            .map(|info| info.key)
            .find(|k| k.store_id == bound.store_id && k.name == bound.name)
            .ok_or_else(|| lost("reference to component in set was lost"))
    }
}
