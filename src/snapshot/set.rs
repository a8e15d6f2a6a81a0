//! SnapshotSet: every live component of one kind under a root.
//!
//! The keyed map is rebuilt from scratch on every update; it is never patched.
//! Members are ordered by descending component-name length, ties kept in
//! discovery order, so that longer (more specific) names come before the names
//! they start with ("LeftUpperLeg" before "Leg") for downstream fuzzy matching.

use anyhow::anyhow;
use indexmap::IndexMap;
use log::warn;
use serde_json::Value;
use std::fmt;

use crate::error::{SwapError, SwapResult};
use crate::fragment::{self, Fragment};
use crate::host::{ComponentInfo, Host, NodeId};
use crate::kind::ComponentKind;
use crate::metrics::record_set_rebuild;

use super::leaf::Snapshot;

pub type Predicate = Box<dyn Fn(&ComponentInfo) -> bool>;

pub struct SnapshotSet {
    kind: ComponentKind,
    owner: NodeId,
    name: String,
    predicate: Option<Predicate>,
    entries: IndexMap<String, Snapshot>,
    cached: Option<Fragment>,
}

impl fmt::Debug for SnapshotSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotSet")
            .field("name", &self.name)
            .field("custom_predicate", &self.predicate.is_some())
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SnapshotSet {
    pub fn new(kind: ComponentKind, owner: NodeId) -> Self {
        Self {
            kind,
            owner,
            name: format!("{}:{}", kind.type_name(), owner),
            predicate: None,
            entries: IndexMap::new(),
            cached: None,
        }
    }

    /// Replace the default filter.
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ComponentInfo) -> bool + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Members must not be locked for appearance editing.
    pub fn default_predicate(info: &ComponentInfo) -> bool {
        !info.locked
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

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Snapshot> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Snapshot)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn init(&mut self) {
        self.entries.clear();
        self.cached = None;
    }

    /// Requery the live graph and rebuild every member. On failure the
    /// previous members and tree are kept.
    pub fn update(&mut self, host: &mut dyn Host, root: Option<NodeId>) -> SwapResult<&Fragment> {
        let members = self.rebuild(host, root)?;
        Ok(self.commit(members))
    }

    /// Fresh member map from the live graph; the set itself is not touched.
    pub fn rebuild(
        &self,
        host: &mut dyn Host,
        root: Option<NodeId>,
    ) -> SwapResult<IndexMap<String, Snapshot>> {
        let root = root.unwrap_or(self.owner);
        if !host.contains_node(root) {
            return Err(SwapError::Lookup {
                part: self.name.clone(),
                kind: self.kind,
                root,
                reason: "root is absent".into(),
            });
        }

        let mut found = (self.kind.ops().discover)(&*host, root, self.kind);
        match &self.predicate {
            Some(p) => found.retain(|info| p(info)),
            None => found.retain(Self::default_predicate),
        }
        // stable: equal lengths keep discovery order
        found.sort_by(|a, b| b.key.name.len().cmp(&a.key.name.len()));

        let mut members = IndexMap::with_capacity(found.len());
        for info in &found {
            let key = info.key.display_name();
            if members.contains_key(&key) {
                return Err(SwapError::capture(key, anyhow!("duplicate key in set")).within(&self.name));
            }
            let mut member = Snapshot::member(root, info);
            member.update(host, None).map_err(|e| e.within(&self.name))?;
            members.insert(key, member);
        }
        Ok(members)
    }

    /// Replace the members with a map from [`rebuild`](SnapshotSet::rebuild).
    pub fn commit(&mut self, members: IndexMap<String, Snapshot>) -> &Fragment {
        self.entries = members;
        record_set_rebuild(self.entries.len());
        let assembled = self.assemble();
        self.cached.insert(assembled)
    }

    /// Restore members in order; the first failure aborts.
    pub fn restore(&self, host: &mut dyn Host, root: Option<NodeId>) -> SwapResult<()> {
        for member in self.entries.values() {
            member.restore(host, root).map_err(|e| e.within(&self.name))?;
        }
        Ok(())
    }

    /// `{"storables": [member fragments..]}` as of the last update.
    pub fn fragment(&self) -> Fragment {
        match &self.cached {
            Some(f) => f.clone(),
            None => self.assemble(),
        }
    }

    /// Not supported at set level: schema assembly belongs to the collection.
    pub fn export_json(&self) -> Fragment {
        warn!("{}: export_json is owned by the collection, returning cached state", self.name);
        self.fragment()
    }

    /// Not supported at set level; the set is left untouched.
    pub fn import_json(&mut self, _tree: &Fragment) -> Fragment {
        warn!("{}: import_json is owned by the collection, ignoring input", self.name);
        self.fragment()
    }

    fn assemble(&self) -> Fragment {
        fragment::tree(
            self.entries
                .values()
                .filter_map(|m| m.fragment().cloned().map(Value::Object))
                .collect(),
        )
    }
}
