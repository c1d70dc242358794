//! The deterministic world step contract
//!
//! The real simulation lives outside this workspace; the sync engine only
//! depends on the `WorldStep` trait. `KinematicStep` is a small reference
//! implementation so the engine can be exercised end to end.

use crate::{AreaBounds, Snapshot, Vec2};
use thiserror::Error;

/// Ticks per real second (one tick is a microsecond)
pub const TICKS_PER_SECOND: u64 = 1_000_000;

/// How a step call should advance the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    /// Advance in bounded internal slices; preferred for determinism
    Iterative,
    /// Integrate the whole interval in one pass; bounds worst-case latency
    /// for oversized intervals at the cost of relaxed determinism
    SingleJump,
}

/// World step failure
#[derive(Debug, Error)]
pub enum StepError {
    #[error("world step failed: {0}")]
    Failed(String),
}

/// Advances a snapshot by an elapsed tick count
///
/// Implementations must be pure: identical inputs give identical outputs
/// and the input snapshot is never mutated. They must tolerate snapshots
/// whose ephemeral fields (event and processed-action logs) were cleared
/// before the call.
pub trait WorldStep {
    fn step(
        &self,
        snapshot: &Snapshot,
        elapsed_ticks: u64,
        area: &AreaBounds,
        mode: StepMode,
    ) -> Result<Snapshot, StepError>;
}

/// Straight-line reference stepper
///
/// Ships fly toward their navigation target at a fixed speed and dock on
/// arrival; ships without a target drift ballistically; projectiles advance
/// and expire; wrecks decay. Paused snapshots pass through unchanged.
#[derive(Debug, Clone)]
pub struct KinematicStep {
    /// Ship speed in units per second
    pub ship_speed: f64,
    /// Slice size for iterative stepping, in ticks
    pub slice_ticks: u64,
}

impl Default for KinematicStep {
    fn default() -> Self {
        Self {
            ship_speed: 20.0,
            slice_ticks: 100_000,
        }
    }
}

impl KinematicStep {
    fn advance(&self, snapshot: &mut Snapshot, ticks: u64) {
        snapshot.ticks += ticks;
        snapshot.millis += ticks / 1_000;
        let dt = ticks as f64 / TICKS_PER_SECOND as f64;

        for location in &mut snapshot.locations {
            for ship in &mut location.ships {
                if ship.is_docked() {
                    continue;
                }
                match ship.navigate_target {
                    Some(target) => {
                        let to_target = target - ship.spatial.position;
                        let distance = to_target.length();
                        let travel = self.ship_speed * dt;
                        if travel >= distance {
                            ship.spatial.position = target;
                            ship.spatial.velocity = Vec2::ZERO;
                            ship.navigate_target = None;
                            if let Some(dock) = ship.dock_target.take() {
                                ship.docked_at = Some(dock);
                            }
                        } else {
                            let dir = to_target.normalized();
                            ship.spatial.position =
                                ship.spatial.position + dir.scaled(travel);
                            ship.spatial.velocity = dir.scaled(self.ship_speed);
                            ship.spatial.rotation = dir.y.atan2(dir.x);
                        }
                    }
                    None => {
                        ship.spatial.position =
                            ship.spatial.position + ship.spatial.velocity.scaled(dt);
                    }
                }
            }

            for projectile in &mut location.projectiles {
                projectile.spatial.position =
                    projectile.spatial.position + projectile.spatial.velocity.scaled(dt);
                projectile.lifetime_ticks = projectile.lifetime_ticks.saturating_sub(ticks);
            }
            location.projectiles.retain(|p| p.lifetime_ticks > 0);

            for wreck in &mut location.wrecks {
                wreck.decay_ticks = wreck.decay_ticks.saturating_sub(ticks);
            }
            location.wrecks.retain(|w| w.decay_ticks > 0);
        }
    }
}

impl WorldStep for KinematicStep {
    fn step(
        &self,
        snapshot: &Snapshot,
        elapsed_ticks: u64,
        _area: &AreaBounds,
        mode: StepMode,
    ) -> Result<Snapshot, StepError> {
        let mut next = snapshot.clone();
        if next.paused {
            return Ok(next);
        }
        match mode {
            StepMode::SingleJump => self.advance(&mut next, elapsed_ticks),
            StepMode::Iterative => {
                let mut remaining = elapsed_ticks;
                while remaining > 0 {
                    let slice = remaining.min(self.slice_ticks);
                    self.advance(&mut next, slice);
                    remaining -= slice;
                }
            }
        }
        Ok(next)
    }
}
