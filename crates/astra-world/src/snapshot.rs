//! The world snapshot - the whole shared world at one instant

use crate::{
    EntityKind, Location, ObjectId, ObjectSpecifier, PlayerId, Ship, Spatial, Vec2, WorldId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The mode a world is running in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WorldMode {
    #[default]
    Unknown,
    /// Single-player, locally simulated
    Solo,
    /// Shared multiplayer world
    Shared,
    /// Scripted tutorial world
    Tutorial,
    /// Free-build sandbox
    Sandbox,
}

/// A connected player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// The ship this player controls, if any
    pub ship_id: Option<ObjectId>,
}

impl Player {
    /// Create a player without a ship
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ship_id: None,
        }
    }
}

/// The whole world at one instant
///
/// Created wholesale on session init or on receipt of an authoritative
/// snapshot; mutated in place by the deterministic step and by divergence
/// corrections; superseded (never merged) when the engine fully adopts a
/// new authoritative snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// World/session identity
    pub id: WorldId,
    pub mode: WorldMode,
    /// Simulation time in ticks (one tick is a microsecond)
    pub ticks: u64,
    /// Elapsed real time in milliseconds
    pub millis: u64,
    pub paused: bool,
    /// The player this client controls
    pub my_id: PlayerId,
    pub players: Vec<Player>,
    pub locations: Vec<Location>,
    /// Correlation tags of player actions the producing side has applied
    pub processed_actions: Vec<String>,
    /// Human-readable event log entries (ephemeral)
    pub events: Vec<String>,
}

impl Snapshot {
    /// Create an empty snapshot for a world
    pub fn new(id: impl Into<WorldId>, my_id: impl Into<PlayerId>) -> Self {
        Self {
            id: id.into(),
            mode: WorldMode::default(),
            ticks: 0,
            millis: 0,
            paused: false,
            my_id: my_id.into(),
            players: Vec::new(),
            locations: Vec::new(),
            processed_actions: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Find a ship anywhere in the world
    pub fn find_ship(&self, id: &ObjectId) -> Option<&Ship> {
        self.locations
            .iter()
            .flat_map(|loc| loc.ships.iter())
            .find(|ship| &ship.id == id)
    }

    /// Find a ship anywhere in the world, mutably
    pub fn find_ship_mut(&mut self, id: &ObjectId) -> Option<&mut Ship> {
        self.locations
            .iter_mut()
            .flat_map(|loc| loc.ships.iter_mut())
            .find(|ship| &ship.id == id)
    }

    /// The ship controlled by the local player, if any
    pub fn find_my_ship(&self) -> Option<&Ship> {
        let player = self.players.iter().find(|p| p.id == self.my_id)?;
        let ship_id = player.ship_id.as_ref()?;
        self.find_ship(ship_id)
    }

    /// The location that contains a given ship
    pub fn location_of_ship(&self, id: &ObjectId) -> Option<&Location> {
        self.locations
            .iter()
            .find(|loc| loc.ships.iter().any(|ship| &ship.id == id))
    }

    /// Position of a planet anywhere in the world
    pub fn planet_position(&self, id: &ObjectId) -> Option<Vec2> {
        self.locations
            .iter()
            .flat_map(|loc| loc.planets.iter())
            .find(|planet| &planet.id == id)
            .map(|planet| planet.spatial.position)
    }

    /// Resolve a specifier to the object's spatial
    ///
    /// Returns `None` for kinds without a spatial of their own
    /// (locations, unknown).
    pub fn spatial_of(&self, spec: &ObjectSpecifier) -> Option<&Spatial> {
        for loc in &self.locations {
            let found = match spec.kind {
                EntityKind::Ship => loc
                    .ships
                    .iter()
                    .find(|s| s.id == spec.id)
                    .map(|s| &s.spatial),
                EntityKind::Planet => loc
                    .planets
                    .iter()
                    .find(|p| p.id == spec.id)
                    .map(|p| &p.spatial),
                EntityKind::Star => loc
                    .star
                    .as_ref()
                    .filter(|s| s.id == spec.id)
                    .map(|s| &s.spatial),
                EntityKind::Asteroid => loc
                    .asteroids
                    .iter()
                    .find(|a| a.id == spec.id)
                    .map(|a| &a.spatial),
                EntityKind::AsteroidBelt => loc
                    .asteroid_belts
                    .iter()
                    .find(|b| b.id == spec.id)
                    .map(|b| &b.spatial),
                EntityKind::Mineral => loc
                    .minerals
                    .iter()
                    .find(|m| m.id == spec.id)
                    .map(|m| &m.spatial),
                EntityKind::Container => loc
                    .containers
                    .iter()
                    .find(|c| c.id == spec.id)
                    .map(|c| &c.spatial),
                EntityKind::Wreck => loc
                    .wrecks
                    .iter()
                    .find(|w| w.id == spec.id)
                    .map(|w| &w.spatial),
                EntityKind::Location | EntityKind::Unknown => None,
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// Resolve a specifier to the object's spatial, mutably
    pub fn spatial_of_mut(&mut self, spec: &ObjectSpecifier) -> Option<&mut Spatial> {
        for loc in &mut self.locations {
            let found = match spec.kind {
                EntityKind::Ship => loc
                    .ships
                    .iter_mut()
                    .find(|s| s.id == spec.id)
                    .map(|s| &mut s.spatial),
                EntityKind::Planet => loc
                    .planets
                    .iter_mut()
                    .find(|p| p.id == spec.id)
                    .map(|p| &mut p.spatial),
                EntityKind::Star => loc
                    .star
                    .as_mut()
                    .filter(|s| s.id == spec.id)
                    .map(|s| &mut s.spatial),
                EntityKind::Asteroid => loc
                    .asteroids
                    .iter_mut()
                    .find(|a| a.id == spec.id)
                    .map(|a| &mut a.spatial),
                EntityKind::AsteroidBelt => loc
                    .asteroid_belts
                    .iter_mut()
                    .find(|b| b.id == spec.id)
                    .map(|b| &mut b.spatial),
                EntityKind::Mineral => loc
                    .minerals
                    .iter_mut()
                    .find(|m| m.id == spec.id)
                    .map(|m| &mut m.spatial),
                EntityKind::Container => loc
                    .containers
                    .iter_mut()
                    .find(|c| c.id == spec.id)
                    .map(|c| &mut c.spatial),
                EntityKind::Wreck => loc
                    .wrecks
                    .iter_mut()
                    .find(|w| w.id == spec.id)
                    .map(|w| &mut w.spatial),
                EntityKind::Location | EntityKind::Unknown => None,
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// Correlation tags the producing side reports as already applied
    pub fn processed_action_tags(&self) -> HashSet<String> {
        self.processed_actions.iter().cloned().collect()
    }

    /// Strip ephemeral-only fields before handing the snapshot to a step
    ///
    /// The deterministic step contract requires tolerating a snapshot with
    /// event and processed-action logs cleared.
    pub fn clear_ephemeral(&mut self) {
        self.events.clear();
        self.processed_actions.clear();
    }
}
