//! SwapManager: circular list of slots over one managed root.
//!
//! Transition (`advance`):
//!   1) capture the outgoing slot from the live root (full re-walk, stored
//!      only if every part succeeds);
//!   2) current = (current + 1) mod N;
//!   3) restore the incoming slot onto the root.
//! Step 1 is never skipped; if it fails the index does not move.
//! When step 3 fails the index follows `AdvanceFailurePolicy`.

use log::debug;

use crate::config::{AdvanceFailurePolicy, RestoreMode, SwapBuilder, SwapConfig};
use crate::error::{SwapError, SwapResult};
use crate::fragment;
use crate::host::{Host, NodeId, RestoreOptions};
use crate::kind::ComponentKind;
use crate::logger::SwapLog;
use crate::metrics::{record_advance, record_advance_restore_failure, record_slot_added, record_slot_capture};
use crate::snapshot::{Snapshot, SnapshotCollection, SnapshotSet};

use super::busy::BusyFlag;
use super::controls::SwapOptions;

pub struct SwapManager {
    root: NodeId,
    slots: Vec<SnapshotCollection>,
    current: usize,
    config: SwapConfig,
    log: SwapLog,
    busy: BusyFlag,
}

impl SwapManager {
    pub fn new(root: NodeId, config: SwapConfig, log: SwapLog) -> Self {
        log.message(&format!("swap manager on {}", root));
        Self {
            root,
            slots: Vec::new(),
            current: 0,
            config,
            log,
            busy: BusyFlag::new(),
        }
    }

    /// Logger enabled per `config.logging_enabled`.
    pub fn with_config(root: NodeId, config: SwapConfig) -> Self {
        let log = SwapLog::new(config.logging_enabled);
        Self::new(root, config, log)
    }

    pub fn builder() -> SwapBuilder {
        SwapBuilder::new()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    pub fn log(&self) -> &SwapLog {
        &self.log
    }

    pub fn set_logging(&mut self, on: bool) {
        self.log.set_enabled(on);
    }

    /// Shared view of the re-entrancy flag.
    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    // ---------- index ----------

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn next_index(&self) -> usize {
        match self.slots.len() {
            0 => 0,
            n => (self.current + 1) % n,
        }
    }

    pub fn prev_index(&self) -> usize {
        if self.current == 0 {
            self.slots.len().saturating_sub(1)
        } else {
            self.current - 1
        }
    }

    pub fn slot(&self, index: usize) -> Option<&SnapshotCollection> {
        self.slots.get(index)
    }

    pub fn current_slot(&self) -> Option<&SnapshotCollection> {
        self.slots.get(self.current)
    }

    /// 1-based external index → 0-based, through the "previous" rule:
    /// 0 maps to the last slot, values above N wrap.
    pub fn set_current_from_external_index(&mut self, index: u32) -> SwapResult<()> {
        let _guard = self.busy.try_enter("select")?;
        let n = self.slots.len();
        if n == 0 {
            return Err(SwapError::Configuration("no slots to select".into()));
        }
        if index as usize > n {
            self.log.warning(&format!("slot {} out of range ({} slots), wrapping", index, n));
        }
        self.current = index as usize % n;
        self.current = self.prev_index();
        self.log.detail(&format!("current slot set to {} (external {})", self.current, index));
        Ok(())
    }

    // ---------- slots ----------

    /// Profile collection with the standard parts: geometry, skin textures,
    /// character materials, skin-wrap materials and hair sims.
    pub fn default_collection(&self, host: &mut dyn Host) -> SwapResult<SnapshotCollection> {
        let root = self.root;
        let mut c = SnapshotCollection::profile(root, self.config.entity_type.clone());
        c.set_geometry(host, Snapshot::standalone(ComponentKind::Geometry, root))?;
        c.add_part(host, Snapshot::standalone(ComponentKind::SkinTextures, root))?;
        c.set_materials(host, SnapshotSet::new(ComponentKind::CharacterMaterials, root))?;
        c.add_part_set(host, SnapshotSet::new(ComponentKind::SkinWrapMaterials, root))?;
        c.add_part_set(host, SnapshotSet::new(ComponentKind::HairSim, root))?;
        Ok(c)
    }

    /// Initialize, capture and append a collection; returns its index.
    pub fn add_collection(
        &mut self,
        host: &mut dyn Host,
        collection: SnapshotCollection,
    ) -> SwapResult<usize> {
        let _guard = self.busy.try_enter("add slot")?;
        self.push_slot(host, collection)
    }

    /// Append a default collection captured from the root's current state.
    pub fn add_slot(&mut self, host: &mut dyn Host) -> SwapResult<usize> {
        let _guard = self.busy.try_enter("add slot")?;
        let collection = self
            .default_collection(host)
            .map_err(|e| e.within(&slot_label(self.slots.len())))?;
        self.push_slot(host, collection)
    }

    fn push_slot(
        &mut self,
        host: &mut dyn Host,
        mut collection: SnapshotCollection,
    ) -> SwapResult<usize> {
        let index = self.slots.len();
        let label = slot_label(index);
        collection.init(host).map_err(|e| e.within(&label))?;
        collection.update(host).map_err(|e| e.within(&label))?;
        self.slots.push(collection);
        record_slot_added();
        self.log.message(&format!("slots: {}", self.slots.len()));
        Ok(index)
    }

    // ---------- transitions ----------

    /// Re-capture the current slot from the live root.
    pub fn capture(&mut self, host: &mut dyn Host) -> SwapResult<()> {
        let _guard = self.busy.try_enter("capture")?;
        self.capture_current(host)
    }

    pub fn advance(&mut self, host: &mut dyn Host) -> SwapResult<()> {
        let options = SwapOptions::from_config(&self.config);
        self.advance_with(host, &options)
    }

    /// Capture current, move forward, apply the incoming slot. Failures are
    /// logged here and returned.
    pub fn advance_with(&mut self, host: &mut dyn Host, options: &SwapOptions) -> SwapResult<()> {
        let _guard = self.busy.try_enter("advance")?;
        if self.slots.is_empty() {
            let e = SwapError::Configuration("advance with no slots".into());
            self.log.error(&e.to_string());
            return Err(e);
        }

        if let Err(e) = self.capture_current(host) {
            self.log.error(&format!("{} (staying on slot {})", e, self.current));
            return Err(e);
        }

        let from = self.current;
        self.current = self.next_index();
        record_advance();
        self.log.message(&format!("restoring slot {} (from {})", self.current, from));

        match self.apply_current(host, options) {
            Ok(()) => Ok(()),
            Err(e) => {
                let e = e.within(&slot_label(self.current));
                let rolled_back = self.config.advance_failure == AdvanceFailurePolicy::RollBack;
                if rolled_back {
                    self.current = from;
                }
                record_advance_restore_failure(rolled_back);
                self.log.error(&format!("{} (now on slot {})", e, self.current));
                Err(e)
            }
        }
    }

    fn capture_current(&mut self, host: &mut dyn Host) -> SwapResult<()> {
        let index = self.current;
        let label = slot_label(index);
        let slot = self
            .slots
            .get_mut(index)
            .ok_or_else(|| SwapError::Configuration(format!("no {}", label)))?;
        self.log.detail(&format!("updating {}", label));
        slot.update(host).map_err(|e| e.within(&label))?;
        record_slot_capture();
        Ok(())
    }

    fn apply_current(&self, host: &mut dyn Host, options: &SwapOptions) -> SwapResult<()> {
        let slot = self
            .slots
            .get(self.current)
            .ok_or_else(|| SwapError::Configuration(format!("no {}", slot_label(self.current))))?;
        let preserve = options.preserved_fields();

        match self.config.restore_mode {
            RestoreMode::Cascade => slot.restore_with(host, Some(self.root), &preserve),
            RestoreMode::Composite => {
                host.pre_restore(self.root)
                    .map_err(|e| SwapError::restore("pre-restore", e))?;
                let tree = slot.restore_tree(&preserve);
                if fragment::storables(&tree).is_empty() {
                    debug!("{}: empty tree, nothing to restore", slot.name());
                    return Ok(());
                }
                host.apply_state_to_root(self.root, &tree, RestoreOptions::APPEARANCE)
                    .map_err(|e| SwapError::restore(slot.name(), e))
            }
        }
    }
}

fn slot_label(index: usize) -> String {
    format!("slot {}", index)
}
