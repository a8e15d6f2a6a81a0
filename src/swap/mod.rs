//! Slot cycling over one managed root.
//! - manager.rs: SwapManager (slots, index arithmetic, capture/advance).
//! - controls.rs: UI controls and event dispatch.
//! - busy.rs: single-flight guard shared by both.

mod busy;
mod controls;
mod manager;

pub use busy::{BusyFlag, BusyGuard};
pub use controls::{ControlEvent, SwapControls, SwapOptions, CLOTHING_FIELD, HAIR_FIELD};
pub use manager::SwapManager;
