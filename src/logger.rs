//! Explicit logging collaborator for the swap manager.
//!
//! Diagnostics go through the `log` facade under one target; the enable flag
//! comes from [`SwapConfig`](crate::config::SwapConfig) and can be flipped by
//! the UI toggle. Disabled means silent, errors included.

use log::{debug, error, info, warn};

pub const DEFAULT_TARGET: &str = "slotswap";

#[derive(Debug, Clone)]
pub struct SwapLog {
    enabled: bool,
    target: String,
}

impl Default for SwapLog {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SwapLog {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            target: DEFAULT_TARGET.to_string(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, on: bool) {
        self.enabled = on;
    }

    pub fn message(&self, msg: &str) {
        if self.enabled {
            info!(target: self.target.as_str(), "{}", msg);
        }
    }

    pub fn detail(&self, msg: &str) {
        if self.enabled {
            debug!(target: self.target.as_str(), "{}", msg);
        }
    }

    pub fn warning(&self, msg: &str) {
        if self.enabled {
            warn!(target: self.target.as_str(), "{}", msg);
        }
    }

    pub fn error(&self, msg: &str) {
        if self.enabled {
            error!(target: self.target.as_str(), "{}", msg);
        }
    }
}
