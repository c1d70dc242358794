//! Player actions and their optimistic local effect
//!
//! The concrete action set is project configuration; the sync machinery
//! only requires a closed enum with an `apply` producing the local effect.

use crate::{ObjectId, Snapshot, Vec2};
use serde::{Deserialize, Serialize};

/// A player-initiated action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Start flying toward a point
    Navigate { ship_id: ObjectId, target: Vec2 },
    /// Start flying toward a planet and dock on arrival
    DockNavigate { ship_id: ObjectId, to: ObjectId },
    /// Dock immediately at a planet
    Dock { ship_id: ObjectId, to: ObjectId },
    /// Leave the current dock
    Undock { ship_id: ObjectId },
}

impl Action {
    /// The ship this action drives
    pub fn ship_id(&self) -> &ObjectId {
        match self {
            Action::Navigate { ship_id, .. }
            | Action::DockNavigate { ship_id, .. }
            | Action::Dock { ship_id, .. }
            | Action::Undock { ship_id } => ship_id,
        }
    }

    /// Apply the action's optimistic effect to a snapshot
    ///
    /// A missing ship or planet makes the action a no-op; the action may
    /// refer to state the other timeline no longer contains.
    pub fn apply(&self, snapshot: &mut Snapshot) {
        match self {
            Action::Navigate { ship_id, target } => {
                if let Some(ship) = snapshot.find_ship_mut(ship_id) {
                    ship.docked_at = None;
                    ship.dock_target = None;
                    ship.navigate_target = Some(*target);
                }
            }
            Action::DockNavigate { ship_id, to } => {
                let target = snapshot.planet_position(to);
                if let (Some(target), Some(ship)) = (target, snapshot.find_ship_mut(ship_id)) {
                    ship.docked_at = None;
                    ship.navigate_target = Some(target);
                    ship.dock_target = Some(to.clone());
                }
            }
            Action::Dock { ship_id, to } => {
                let position = snapshot.planet_position(to);
                if let (Some(position), Some(ship)) = (position, snapshot.find_ship_mut(ship_id)) {
                    ship.spatial.position = position;
                    ship.spatial.velocity = Vec2::ZERO;
                    ship.navigate_target = None;
                    ship.dock_target = None;
                    ship.docked_at = Some(to.clone());
                }
            }
            Action::Undock { ship_id } => {
                if let Some(ship) = snapshot.find_ship_mut(ship_id) {
                    ship.docked_at = None;
                }
            }
        }
    }
}
