//! Re-entrancy guard for the manager's transition entry points.
//!
//! Single-threaded by design: an `Rc<Cell<bool>>` shared between the manager
//! and any UI-side handle. Whoever holds a [`BusyGuard`] blocks every other
//! transition until the guard drops.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::{SwapError, SwapResult};
use crate::metrics::record_busy_rejection;

#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Rc<Cell<bool>>);

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.0.get()
    }

    /// Claim the flag for `op`; fails if anyone already holds it.
    pub fn try_enter(&self, op: &'static str) -> SwapResult<BusyGuard> {
        if self.0.get() {
            record_busy_rejection();
            return Err(SwapError::Busy(op));
        }
        self.0.set(true);
        Ok(BusyGuard(Rc::clone(&self.0)))
    }
}

#[derive(Debug)]
pub struct BusyGuard(Rc<Cell<bool>>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
