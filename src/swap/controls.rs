//! UI-facing controls: a 1-based slot number, three toggles and the events a
//! front end raises against the manager.
//!
//! Every event is a single-shot transition. `SwapManager::dispatch` runs it
//! under the busy guard and collapses any failure into one logged diagnostic
//! plus a `false` return, so a UI never sees a raw error.

use crate::config::SwapConfig;
use crate::host::Host;

use super::manager::SwapManager;

/// Fields of the geometry entry kept as-is across a restore.
pub const CLOTHING_FIELD: &str = "clothing";
pub const HAIR_FIELD: &str = "hair";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapOptions {
    pub preserve_clothing: bool,
    pub preserve_hair: bool,
    pub logging: bool,
}

impl Default for SwapOptions {
    fn default() -> Self {
        Self {
            preserve_clothing: false,
            preserve_hair: false,
            logging: true,
        }
    }
}

impl SwapOptions {
    pub fn from_config(cfg: &SwapConfig) -> Self {
        Self {
            preserve_clothing: cfg.preserve_clothing,
            preserve_hair: cfg.preserve_hair,
            logging: cfg.logging_enabled,
        }
    }

    pub fn preserved_fields(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.preserve_clothing {
            out.push(CLOTHING_FIELD);
        }
        if self.preserve_hair {
            out.push(HAIR_FIELD);
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlEvent {
    Advance,
    AddSlot,
    Capture,
    /// External (1-based) slot number.
    SelectSlot(u32),
}

#[derive(Clone, Debug)]
pub struct SwapControls {
    current_slot: u32,
    slot_count: usize,
    options: SwapOptions,
}

impl Default for SwapControls {
    fn default() -> Self {
        Self::new(SwapOptions::default())
    }
}

impl SwapControls {
    pub fn new(options: SwapOptions) -> Self {
        Self {
            current_slot: 1,
            slot_count: 0,
            options,
        }
    }

    pub fn from_config(cfg: &SwapConfig) -> Self {
        Self::new(SwapOptions::from_config(cfg))
    }

    pub fn current_slot(&self) -> u32 {
        self.current_slot
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn options(&self) -> &SwapOptions {
        &self.options
    }

    /// User edited the slot number; returns the event to dispatch.
    pub fn set_current_slot(&mut self, slot: u32) -> ControlEvent {
        self.current_slot = slot;
        ControlEvent::SelectSlot(slot)
    }

    pub fn set_preserve_clothing(&mut self, on: bool) {
        self.options.preserve_clothing = on;
    }

    pub fn set_preserve_hair(&mut self, on: bool) {
        self.options.preserve_hair = on;
    }

    pub fn set_logging(&mut self, on: bool) {
        self.options.logging = on;
    }

    /// Mirror the manager's index back into the displayed (1-based) number.
    pub fn sync(&mut self, manager: &SwapManager) {
        self.current_slot = manager.current_index() as u32 + 1;
        self.slot_count = manager.slot_count();
    }
}

impl SwapManager {
    /// Run one control event. Returns whether it succeeded; failures are
    /// logged once and never propagate.
    pub fn dispatch(
        &mut self,
        host: &mut dyn Host,
        controls: &SwapControls,
        event: ControlEvent,
    ) -> bool {
        self.set_logging(controls.options().logging);
        let result = match event {
            // advance_with logs its own failures
            ControlEvent::Advance => return self.advance_with(host, controls.options()).is_ok(),
            ControlEvent::AddSlot => self.add_slot(host).map(|_| ()),
            ControlEvent::Capture => self.capture(host),
            ControlEvent::SelectSlot(n) => self.set_current_from_external_index(n),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                self.log().error(&format!("{:?} failed: {}", event, e));
                false
            }
        }
    }
}
