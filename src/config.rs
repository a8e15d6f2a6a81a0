//! Centralized configuration and builder for SlotSwap.
//!
//! Goals:
//! - Single place for tunables instead of scattered flags on the manager.
//! - SwapConfig::from_env() reads SLOTSWAP_* variables; fluent setters override.
//! - SwapBuilder returns a SwapConfig that SwapManager consumes.
//!
//! Defaults follow the interactive plugin behavior:
//! - advance keeps forward progress when the incoming restore fails
//! - the incoming slot is applied as one tree through the host's root restore
//! - nothing preserved, logging on, 10 s entity-creation timeout

use std::fmt;
use std::time::Duration;

/// What `advance` does with the index when restoring the incoming slot fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdvanceFailurePolicy {
    /// Stay on the new (unapplied) slot.
    KeepForward,
    /// Return to the slot that was just captured.
    RollBack,
}

/// How a slot is pushed onto the root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreMode {
    /// Host pre-restore hook, then the slot's whole tree via `apply_state_to_root`.
    Composite,
    /// Per-part restore through the collection cascade.
    Cascade,
}

impl RestoreMode {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "composite" | "tree" => Some(RestoreMode::Composite),
            "cascade" | "parts" => Some(RestoreMode::Cascade),
            _ => None,
        }
    }
}

impl fmt::Display for RestoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RestoreMode::Composite => "composite",
            RestoreMode::Cascade => "cascade",
        })
    }
}

fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| {
        let s = v.trim().to_ascii_lowercase();
        s == "1" || s == "true" || s == "yes" || s == "on"
    })
}

#[derive(Clone, Debug)]
pub struct SwapConfig {
    /// Manager diagnostics on/off.
    /// Env: SLOTSWAP_LOGGING = 0|1 (default 1)
    pub logging_enabled: bool,

    /// Env: SLOTSWAP_ROLLBACK_ON_FAILURE = 0|1 (default 0 => KeepForward)
    pub advance_failure: AdvanceFailurePolicy,

    /// Env: SLOTSWAP_RESTORE_MODE = composite|cascade (default composite)
    pub restore_mode: RestoreMode,

    /// Keep the live clothing when a slot is applied.
    /// Env: SLOTSWAP_PRESERVE_CLOTHING = 0|1 (default 0)
    pub preserve_clothing: bool,

    /// Keep the live hair when a slot is applied.
    /// Env: SLOTSWAP_PRESERVE_HAIR = 0|1 (default 0)
    pub preserve_hair: bool,

    /// Value of the profile's top-level "type".
    /// Env: SLOTSWAP_ENTITY_TYPE (default "Person")
    pub entity_type: String,

    /// Timeout for cooperative entity creation, in milliseconds.
    /// Env: SLOTSWAP_CREATE_TIMEOUT_MS (default 10000)
    pub create_timeout_ms: u64,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            logging_enabled: true,
            advance_failure: AdvanceFailurePolicy::KeepForward,
            restore_mode: RestoreMode::Composite,
            preserve_clothing: false,
            preserve_hair: false,
            entity_type: "Person".to_string(),
            create_timeout_ms: 10_000,
        }
    }
}

impl SwapConfig {
    /// Load configuration from environment variables on top of the defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(on) = env_bool("SLOTSWAP_LOGGING") {
            cfg.logging_enabled = on;
        }

        if let Some(on) = env_bool("SLOTSWAP_ROLLBACK_ON_FAILURE") {
            cfg.advance_failure = if on {
                AdvanceFailurePolicy::RollBack
            } else {
                AdvanceFailurePolicy::KeepForward
            };
        }

        if let Ok(v) = std::env::var("SLOTSWAP_RESTORE_MODE") {
            if let Some(mode) = RestoreMode::parse(&v) {
                cfg.restore_mode = mode;
            }
        }

        if let Some(on) = env_bool("SLOTSWAP_PRESERVE_CLOTHING") {
            cfg.preserve_clothing = on;
        }
        if let Some(on) = env_bool("SLOTSWAP_PRESERVE_HAIR") {
            cfg.preserve_hair = on;
        }

        if let Ok(v) = std::env::var("SLOTSWAP_ENTITY_TYPE") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.entity_type = s.to_string();
            }
        }

        if let Ok(v) = std::env::var("SLOTSWAP_CREATE_TIMEOUT_MS") {
            if let Ok(n) = v.trim().parse::<u64>() {
                cfg.create_timeout_ms = n;
            }
        }

        cfg
    }

    pub fn with_logging(mut self, on: bool) -> Self {
        self.logging_enabled = on;
        self
    }

    pub fn with_advance_failure(mut self, policy: AdvanceFailurePolicy) -> Self {
        self.advance_failure = policy;
        self
    }

    pub fn with_restore_mode(mut self, mode: RestoreMode) -> Self {
        self.restore_mode = mode;
        self
    }

    pub fn with_preserve_clothing(mut self, on: bool) -> Self {
        self.preserve_clothing = on;
        self
    }

    pub fn with_preserve_hair(mut self, on: bool) -> Self {
        self.preserve_hair = on;
        self
    }

    pub fn with_entity_type<S: Into<String>>(mut self, t: S) -> Self {
        self.entity_type = t.into();
        self
    }

    pub fn with_create_timeout_ms(mut self, ms: u64) -> Self {
        self.create_timeout_ms = ms;
        self
    }

    pub fn create_timeout(&self) -> Duration {
        Duration::from_millis(self.create_timeout_ms)
    }
}

impl fmt::Display for SwapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SwapConfig {{ \
             logging_enabled: {}, \
             advance_failure: {}, \
             restore_mode: {}, \
             preserve_clothing: {}, \
             preserve_hair: {}, \
             entity_type: {}, \
             create_timeout_ms: {} \
             }}",
            self.logging_enabled,
            match self.advance_failure {
                AdvanceFailurePolicy::KeepForward => "keep-forward",
                AdvanceFailurePolicy::RollBack => "roll-back",
            },
            self.restore_mode,
            self.preserve_clothing,
            self.preserve_hair,
            self.entity_type,
            self.create_timeout_ms,
        )
    }
}

/// Builder that produces a SwapConfig.
/// `SwapManager::builder()` returns this.
#[derive(Clone, Debug)]
pub struct SwapBuilder {
    cfg: SwapConfig,
}

impl Default for SwapBuilder {
    fn default() -> Self {
        // Start from env, then allow overrides.
        Self {
            cfg: SwapConfig::from_env(),
        }
    }
}

impl SwapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a clean default (without reading env).
    pub fn from_default() -> Self {
        Self {
            cfg: SwapConfig::default(),
        }
    }

    pub fn logging(mut self, on: bool) -> Self {
        self.cfg.logging_enabled = on;
        self
    }

    pub fn rollback_on_failure(mut self, on: bool) -> Self {
        self.cfg.advance_failure = if on {
            AdvanceFailurePolicy::RollBack
        } else {
            AdvanceFailurePolicy::KeepForward
        };
        self
    }

    pub fn restore_mode(mut self, mode: RestoreMode) -> Self {
        self.cfg.restore_mode = mode;
        self
    }

    pub fn preserve_clothing(mut self, on: bool) -> Self {
        self.cfg.preserve_clothing = on;
        self
    }

    pub fn preserve_hair(mut self, on: bool) -> Self {
        self.cfg.preserve_hair = on;
        self
    }

    pub fn entity_type<S: Into<String>>(mut self, t: S) -> Self {
        self.cfg.entity_type = t.into();
        self
    }

    pub fn create_timeout_ms(mut self, ms: u64) -> Self {
        self.cfg.create_timeout_ms = ms;
        self
    }

    /// Finish the builder and obtain the configuration.
    pub fn build(self) -> SwapConfig {
        self.cfg
    }
}
