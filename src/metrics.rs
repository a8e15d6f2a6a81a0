//! Lightweight global metrics for SlotSwap.
//!
//! Atomic counters per layer:
//! - Snapshots (leaf capture/restore)
//! - Sets (rebuilds, discovered members)
//! - Swap manager (slots, captures, advances, failures)

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Snapshots -----
static SNAPSHOT_CAPTURES: AtomicU64 = AtomicU64::new(0);
static SNAPSHOT_RESTORES: AtomicU64 = AtomicU64::new(0);
static SNAPSHOT_GUARD_RESETS: AtomicU64 = AtomicU64::new(0);

// ----- Sets -----
static SET_REBUILDS: AtomicU64 = AtomicU64::new(0);
static SET_MEMBERS_DISCOVERED: AtomicU64 = AtomicU64::new(0);

// ----- Swap manager -----
static SLOTS_ADDED: AtomicU64 = AtomicU64::new(0);
static SLOT_CAPTURES: AtomicU64 = AtomicU64::new(0);
static ADVANCES: AtomicU64 = AtomicU64::new(0);
static ADVANCE_RESTORE_FAILURES: AtomicU64 = AtomicU64::new(0);
static ADVANCE_ROLLBACKS: AtomicU64 = AtomicU64::new(0);
static BUSY_REJECTIONS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    // Snapshots
    pub snapshot_captures: u64,
    pub snapshot_restores: u64,
    pub snapshot_guard_resets: u64,

    // Sets
    pub set_rebuilds: u64,
    pub set_members_discovered: u64,

    // Swap manager
    pub slots_added: u64,
    pub slot_captures: u64,
    pub advances: u64,
    pub advance_restore_failures: u64,
    pub advance_rollbacks: u64,
    pub busy_rejections: u64,
}

impl MetricsSnapshot {
    pub fn avg_set_size(&self) -> f64 {
        if self.set_rebuilds == 0 {
            0.0
        } else {
            self.set_members_discovered as f64 / self.set_rebuilds as f64
        }
    }

    pub fn advance_failure_ratio(&self) -> f64 {
        if self.advances == 0 {
            0.0
        } else {
            self.advance_restore_failures as f64 / self.advances as f64
        }
    }
}

// ----- Recorders (Snapshots) -----
pub fn record_snapshot_capture() {
    SNAPSHOT_CAPTURES.fetch_add(1, Ordering::Relaxed);
}
pub fn record_snapshot_restore() {
    SNAPSHOT_RESTORES.fetch_add(1, Ordering::Relaxed);
}
pub fn record_snapshot_guard_reset() {
    SNAPSHOT_GUARD_RESETS.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Sets) -----
pub fn record_set_rebuild(members: usize) {
    SET_REBUILDS.fetch_add(1, Ordering::Relaxed);
    SET_MEMBERS_DISCOVERED.fetch_add(members as u64, Ordering::Relaxed);
}

// ----- Recorders (Swap manager) -----
pub fn record_slot_added() {
    SLOTS_ADDED.fetch_add(1, Ordering::Relaxed);
}
pub fn record_slot_capture() {
    SLOT_CAPTURES.fetch_add(1, Ordering::Relaxed);
}
pub fn record_advance() {
    ADVANCES.fetch_add(1, Ordering::Relaxed);
}
pub fn record_advance_restore_failure(rolled_back: bool) {
    ADVANCE_RESTORE_FAILURES.fetch_add(1, Ordering::Relaxed);
    if rolled_back {
        ADVANCE_ROLLBACKS.fetch_add(1, Ordering::Relaxed);
    }
}
pub fn record_busy_rejection() {
    BUSY_REJECTIONS.fetch_add(1, Ordering::Relaxed);
}

/// Read all counters.
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        snapshot_captures: SNAPSHOT_CAPTURES.load(Ordering::Relaxed),
        snapshot_restores: SNAPSHOT_RESTORES.load(Ordering::Relaxed),
        snapshot_guard_resets: SNAPSHOT_GUARD_RESETS.load(Ordering::Relaxed),

        set_rebuilds: SET_REBUILDS.load(Ordering::Relaxed),
        set_members_discovered: SET_MEMBERS_DISCOVERED.load(Ordering::Relaxed),

        slots_added: SLOTS_ADDED.load(Ordering::Relaxed),
        slot_captures: SLOT_CAPTURES.load(Ordering::Relaxed),
        advances: ADVANCES.load(Ordering::Relaxed),
        advance_restore_failures: ADVANCE_RESTORE_FAILURES.load(Ordering::Relaxed),
        advance_rollbacks: ADVANCE_ROLLBACKS.load(Ordering::Relaxed),
        busy_rejections: BUSY_REJECTIONS.load(Ordering::Relaxed),
    }
}

/// Reset all counters (tests).
pub fn reset() {
    for c in [
        &SNAPSHOT_CAPTURES,
        &SNAPSHOT_RESTORES,
        &SNAPSHOT_GUARD_RESETS,
        &SET_REBUILDS,
        &SET_MEMBERS_DISCOVERED,
        &SLOTS_ADDED,
        &SLOT_CAPTURES,
        &ADVANCES,
        &ADVANCE_RESTORE_FAILURES,
        &ADVANCE_ROLLBACKS,
        &BUSY_REJECTIONS,
    ] {
        c.store(0, Ordering::Relaxed);
    }
}
