//! SnapshotCollection: ordered parts (leaves) and part-sets, one JSON tree.
//!
//! Generic tree: `{"storables": [parts.., part-set members..]}` in registration
//! order.
//!
//! Profile variant: a geometry leaf and a materials set held outside the
//! generic lists, and a fixed schema for the host's restore-from-tree:
//!
//! {"on": "true", "type": "<entity type>",
//!  "storables": [{"id": "geometry", "character"?, "clothing"?, "hair"?, "morphs"?},
//!                materials.., parts.., part-set members..]}
//!
//! Geometry keys absent from the capture are omitted, never emitted as null.

use log::{debug, warn};
use serde_json::Value;

use crate::error::{SwapError, SwapResult};
use crate::fragment::{self, Fragment, ID};
use crate::host::{Host, NodeId};

use super::leaf::Snapshot;
use super::set::SnapshotSet;

/// Geometry keys in required schema order: structure, clothing, hair, shape.
pub const GEOMETRY_KEYS: [&str; 4] = ["character", "clothing", "hair", "morphs"];

pub const GEOMETRY_ID: &str = "geometry";

#[derive(Debug)]
struct Profile {
    entity_type: String,
    geometry: Option<Snapshot>,
    materials: Option<SnapshotSet>,
}

#[derive(Debug)]
pub struct SnapshotCollection {
    owner: NodeId,
    name: String,
    parts: Vec<Snapshot>,
    part_sets: Vec<SnapshotSet>,
    profile: Option<Profile>,
    cached: Option<Fragment>,
}

impl SnapshotCollection {
    pub fn new(owner: NodeId) -> Self {
        Self {
            owner,
            name: format!("collection {}", owner),
            parts: Vec::new(),
            part_sets: Vec::new(),
            profile: None,
            cached: None,
        }
    }

    /// Profile variant; `entity_type` becomes the top-level "type".
    pub fn profile<S: Into<String>>(owner: NodeId, entity_type: S) -> Self {
        let mut c = Self::new(owner);
        c.name = format!("profile {}", owner);
        c.profile = Some(Profile {
            entity_type: entity_type.into(),
            geometry: None,
            materials: None,
        });
        c
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn is_profile(&self) -> bool {
        self.profile.is_some()
    }

    pub fn parts(&self) -> &[Snapshot] {
        &self.parts
    }

    pub fn part_sets(&self) -> &[SnapshotSet] {
        &self.part_sets
    }

    pub fn geometry(&self) -> Option<&Snapshot> {
        self.profile.as_ref().and_then(|p| p.geometry.as_ref())
    }

    pub fn materials(&self) -> Option<&SnapshotSet> {
        self.profile.as_ref().and_then(|p| p.materials.as_ref())
    }

    /// Parts + members of every part-set; the profile adds its materials and
    /// one for the geometry leaf.
    pub fn count(&self) -> usize {
        let generic = self.parts.len() + self.part_sets.iter().map(SnapshotSet::count).sum::<usize>();
        match &self.profile {
            Some(p) => generic + p.materials.as_ref().map_or(0, SnapshotSet::count) + 1,
            None => generic,
        }
    }

    // ---------- build ----------

    pub fn add_part(&mut self, host: &mut dyn Host, mut part: Snapshot) -> SwapResult<()> {
        part.init(host).map_err(|e| e.within(&self.name))?;
        part.update(host, None).map_err(|e| e.within(&self.name))?;
        self.parts.push(part);
        self.cached = None;
        Ok(())
    }

    pub fn add_part_set(&mut self, host: &mut dyn Host, mut set: SnapshotSet) -> SwapResult<()> {
        set.update(host, None).map_err(|e| e.within(&self.name))?;
        self.part_sets.push(set);
        self.cached = None;
        Ok(())
    }

    pub fn set_geometry(&mut self, host: &mut dyn Host, mut geometry: Snapshot) -> SwapResult<()> {
        geometry.init(host).map_err(|e| e.within(&self.name))?;
        geometry.update(host, None).map_err(|e| e.within(&self.name))?;
        self.profile_mut()?.geometry = Some(geometry);
        self.cached = None;
        Ok(())
    }

    pub fn set_materials(&mut self, host: &mut dyn Host, mut materials: SnapshotSet) -> SwapResult<()> {
        materials.update(host, None).map_err(|e| e.within(&self.name))?;
        self.profile_mut()?.materials = Some(materials);
        self.cached = None;
        Ok(())
    }

    fn profile_mut(&mut self) -> SwapResult<&mut Profile> {
        let name = &self.name;
        self.profile
            .as_mut()
            .ok_or_else(|| SwapError::Configuration(format!("{} is not a profile collection", name)))
    }

    // ---------- cascade ----------

    /// Re-resolve every leaf and clear every set.
    pub fn init(&mut self, host: &mut dyn Host) -> SwapResult<()> {
        let name = self.name.clone();
        if let Some(p) = self.profile.as_mut() {
            if let Some(g) = p.geometry.as_mut() {
                g.init(host).map_err(|e| e.within(&name))?;
            }
            if let Some(m) = p.materials.as_mut() {
                m.init();
            }
        }
        for part in self.parts.iter_mut() {
            part.init(host).map_err(|e| e.within(&name))?;
        }
        for set in self.part_sets.iter_mut() {
            set.init();
        }
        self.cached = None;
        Ok(())
    }

    /// Capture everything from the live graph and return the merged tree.
    ///
    /// Every part is captured before any is stored: a failure leaves the
    /// previous capture of the whole collection in place.
    pub fn update(&mut self, host: &mut dyn Host) -> SwapResult<&Fragment> {
        let name = self.name.clone();
        let geometry = match self.geometry() {
            Some(g) => Some(g.capture(host, None).map_err(|e| e.within(&name))?),
            None => None,
        };
        let materials = match self.materials() {
            Some(m) => Some(m.rebuild(host, None).map_err(|e| e.within(&name))?),
            None => None,
        };
        let parts = self
            .parts
            .iter()
            .map(|part| part.capture(host, None))
            .collect::<SwapResult<Vec<_>>>()
            .map_err(|e| e.within(&name))?;
        let sets = self
            .part_sets
            .iter()
            .map(|set| set.rebuild(host, None))
            .collect::<SwapResult<Vec<_>>>()
            .map_err(|e| e.within(&name))?;

        if let Some(p) = self.profile.as_mut() {
            if let (Some(g), Some(captured)) = (p.geometry.as_mut(), geometry) {
                g.commit(captured);
            }
            if let (Some(m), Some(members)) = (p.materials.as_mut(), materials) {
                m.commit(members);
            }
        }
        for (part, captured) in self.parts.iter_mut().zip(parts) {
            part.commit(captured);
        }
        for (set, members) in self.part_sets.iter_mut().zip(sets) {
            set.commit(members);
        }
        let assembled = self.assemble();
        Ok(self.cached.insert(assembled))
    }

    pub fn restore(&self, host: &mut dyn Host, root: Option<NodeId>) -> SwapResult<()> {
        self.restore_with(host, root, &[])
    }

    /// Push every cached fragment onto `root`. No root is a logged no-op.
    pub fn restore_with(
        &self,
        host: &mut dyn Host,
        root: Option<NodeId>,
        preserve: &[&str],
    ) -> SwapResult<()> {
        let Some(root) = root else {
            warn!("{}: no root provided for restoration, skipped", self.name);
            return Ok(());
        };

        if let Some(p) = &self.profile {
            if let Some(g) = &p.geometry {
                g.restore_with(host, Some(root), preserve)
                    .map_err(|e| e.within(&self.name))?;
            }
            if let Some(m) = &p.materials {
                if self.geometry_captured() {
                    m.restore(host, Some(root)).map_err(|e| e.within(&self.name))?;
                }
            }
        }
        for part in &self.parts {
            part.restore_with(host, Some(root), preserve)
                .map_err(|e| e.within(&self.name))?;
        }
        for set in &self.part_sets {
            set.restore(host, Some(root)).map_err(|e| e.within(&self.name))?;
        }
        debug!("{}: restoration complete", self.name);
        Ok(())
    }

    /// Merged tree as of the last update.
    pub fn fragment(&self) -> Fragment {
        match &self.cached {
            Some(f) => f.clone(),
            None => self.assemble(),
        }
    }

    /// Tree for a single restore-from-tree call. Same layout as [`fragment`],
    /// with the rules the cascade applies part by part:
    /// - the geometry entry drops `preserve` fields and carries every other
    ///   reference field, absent ones as `[]`;
    /// - materials are left out unless a geometry key was captured.
    ///
    /// [`fragment`]: SnapshotCollection::fragment
    pub fn restore_tree(&self, preserve: &[&str]) -> Fragment {
        let mut tree = self.fragment();
        let Some(p) = &self.profile else {
            return tree;
        };
        let Some(Value::Array(entries)) = tree.get_mut(fragment::STORABLES) else {
            return tree;
        };

        if let Some(Value::Object(geometry)) = entries.first_mut() {
            let captured = p.geometry.as_ref().and_then(Snapshot::fragment);
            let reset = p.geometry.as_ref().map_or(&[][..], |g| g.kind().ops().reference_fields);
            let mut guarded = Fragment::new();
            if let Some(id) = geometry.get(ID) {
                guarded.insert(ID.to_string(), id.clone());
            }
            for key in GEOMETRY_KEYS {
                if preserve.contains(&key) {
                    continue;
                }
                match geometry.get(key) {
                    Some(v) => {
                        guarded.insert(key.to_string(), v.clone());
                    }
                    None if captured.is_some() && reset.contains(&key) => {
                        guarded.insert(key.to_string(), Value::Array(Vec::new()));
                    }
                    None => {}
                }
            }
            *geometry = guarded;
        }

        if !self.geometry_captured() {
            if let Some(m) = &p.materials {
                let skipped = fragment::storables(&m.fragment()).len();
                if skipped > 0 {
                    debug!("{}: no geometry captured, {} materials left out", self.name, skipped);
                }
                // materials follow the geometry entry
                let end = (1 + skipped).min(entries.len());
                if end > 1 {
                    entries.drain(1..end);
                }
            }
        }
        tree
    }

    // ---------- JSON ----------

    fn geometry_captured(&self) -> bool {
        self.geometry()
            .and_then(Snapshot::fragment)
            .map_or(false, |g| GEOMETRY_KEYS.iter().any(|k| g.contains_key(*k)))
    }

    fn assemble(&self) -> Fragment {
        let mut entries: Vec<Value> = Vec::new();

        if let Some(p) = &self.profile {
            let mut geometry = Fragment::new();
            let captured = p.geometry.as_ref().and_then(Snapshot::fragment);
            let id = captured
                .and_then(fragment::storable_id)
                .unwrap_or(GEOMETRY_ID)
                .to_string();
            geometry.insert(ID.to_string(), Value::String(id));
            if let Some(g) = captured {
                for key in GEOMETRY_KEYS {
                    match g.get(key) {
                        Some(Value::Null) | None => {}
                        Some(v) => {
                            geometry.insert(key.to_string(), v.clone());
                        }
                    }
                }
            }
            entries.push(Value::Object(geometry));

            if let Some(m) = &p.materials {
                entries.extend(fragment::storables(&m.fragment()).iter().cloned());
            }
        }

        for part in &self.parts {
            if let Some(f) = part.fragment() {
                entries.push(Value::Object(f.clone()));
            }
        }
        for set in &self.part_sets {
            entries.extend(fragment::storables(&set.fragment()).iter().cloned());
        }

        match &self.profile {
            Some(p) => {
                let mut out = Fragment::new();
                out.insert("on".to_string(), Value::String("true".to_string()));
                out.insert("type".to_string(), Value::String(p.entity_type.clone()));
                out.insert(fragment::STORABLES.to_string(), Value::Array(entries));
                out
            }
            None => fragment::tree(entries),
        }
    }
}
