//! Sync engine configuration
//!
//! All tolerance and rate constants for divergence detection and
//! correction live here. Rates are per tick; one tick is a microsecond
//! (`astra_world::TICKS_PER_SECOND`), so a per-second rate divides by
//! `1_000_000`.

use astra_world::TICKS_PER_SECOND;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Configuration for the state syncer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum positional drift, units per tick, that is never a violation
    ///
    /// Default: 10 units per second.
    pub max_drift_per_tick: f64,

    /// Positional divergence below this absolute distance is imperceptible
    /// and never flagged, whatever the elapsed interval
    pub min_visible_jump: f64,

    /// Maximum rotational drift, radians per tick, that is never a violation
    pub max_rotation_drift_per_tick: f64,

    /// Rotational divergence below this absolute angle is never flagged
    pub min_visible_rotation_jump: f64,

    /// Positional correction budget, units per tick
    pub correction_rate_per_tick: f64,

    /// Rotational correction budget, radians per tick
    pub rotation_correction_rate_per_tick: f64,

    /// Positional divergence beyond this is treated as a teleport and the
    /// correction budget scales super-linearly
    pub teleport_threshold: f64,

    /// Rotational divergence beyond this scales the budget super-linearly
    pub rotation_teleport_threshold: f64,

    /// Exponent applied to the relative divergence past the teleport
    /// threshold; must be greater than 1
    pub teleport_exponent: f64,

    /// A pending action pack older than this is evicted and the predicted
    /// state fully resynced
    pub max_pending_lifetime_ticks: u64,

    /// Elapsed intervals above this force a single-jump step with relaxed
    /// determinism instead of iterative slicing
    pub max_iterative_elapsed_ticks: u64,

    /// Expose the authoritative copy of the local ship as a diagnostic
    /// shadow overlay
    pub shadow_enabled: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_drift_per_tick: 10.0 / TICKS_PER_SECOND as f64,
            min_visible_jump: 5.0,
            max_rotation_drift_per_tick: (PI / 4.0) / TICKS_PER_SECOND as f64,
            min_visible_rotation_jump: 0.05,
            correction_rate_per_tick: 20.0 / TICKS_PER_SECOND as f64,
            rotation_correction_rate_per_tick: (PI / 2.0) / TICKS_PER_SECOND as f64,
            teleport_threshold: 100.0,
            rotation_teleport_threshold: PI / 2.0,
            teleport_exponent: 1.5,
            max_pending_lifetime_ticks: 3 * TICKS_PER_SECOND,
            max_iterative_elapsed_ticks: 2 * TICKS_PER_SECOND,
            shadow_enabled: true,
        }
    }
}

impl SyncConfig {
    /// Positional drift allowance for an elapsed interval
    pub fn drift_allowance(&self, elapsed_ticks: u64) -> f64 {
        self.max_drift_per_tick * elapsed_ticks as f64
    }

    /// Rotational drift allowance for an elapsed interval
    pub fn rotation_drift_allowance(&self, elapsed_ticks: u64) -> f64 {
        self.max_rotation_drift_per_tick * elapsed_ticks as f64
    }
}
