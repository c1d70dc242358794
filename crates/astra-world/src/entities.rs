//! Entity types for in-world objects
//!
//! Every element of an identified collection carries a globally-unique
//! (within its collection) `ObjectId`. Duplicate ids are a data integrity
//! problem upstream; `Location::duplicate_ids` detects them without trying
//! to repair anything.

use crate::{EntityKind, ObjectId, ObjectSpecifier, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An object that can be addressed by an `ObjectSpecifier`
pub trait Identified {
    /// The object's id within its collection
    fn object_id(&self) -> &ObjectId;

    /// The object's kind
    fn kind(&self) -> EntityKind;

    /// Build a specifier for this object
    fn specifier(&self) -> ObjectSpecifier {
        ObjectSpecifier::new(self.kind(), self.object_id().clone())
    }
}

/// Position, orientation, and motion of an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Spatial {
    /// Position within the location
    pub position: Vec2,
    /// Current velocity in units per second
    pub velocity: Vec2,
    /// Heading in radians
    pub rotation: f64,
    /// Collision/render radius
    pub radius: f64,
}

impl Spatial {
    /// Create a stationary spatial at a position
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

/// A player- or NPC-controlled ship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    pub id: ObjectId,
    pub spatial: Spatial,
    pub name: Option<String>,
    /// Hit points remaining
    pub health: f64,
    /// Set while the ship is docked at a planet
    pub docked_at: Option<ObjectId>,
    /// Point the ship is currently navigating toward
    pub navigate_target: Option<Vec2>,
    /// Planet the ship will dock at when it arrives
    pub dock_target: Option<ObjectId>,
}

impl Ship {
    /// Create a ship at a position
    pub fn new(id: impl Into<ObjectId>, position: Vec2) -> Self {
        Self {
            id: id.into(),
            spatial: Spatial::at(position),
            name: None,
            health: 100.0,
            docked_at: None,
            navigate_target: None,
            dock_target: None,
        }
    }

    /// Check whether the ship is docked
    pub fn is_docked(&self) -> bool {
        self.docked_at.is_some()
    }
}

impl Identified for Ship {
    fn object_id(&self) -> &ObjectId {
        &self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Ship
    }
}

/// A planet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    pub id: ObjectId,
    pub spatial: Spatial,
    pub name: String,
}

impl Identified for Planet {
    fn object_id(&self) -> &ObjectId {
        &self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Planet
    }
}

/// The central star of a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Star {
    pub id: ObjectId,
    pub spatial: Spatial,
    pub name: String,
    /// Display color, e.g. "#ffaa00"
    pub color: String,
}

impl Identified for Star {
    fn object_id(&self) -> &ObjectId {
        &self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Star
    }
}

/// A lone asteroid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asteroid {
    pub id: ObjectId,
    pub spatial: Spatial,
}

impl Identified for Asteroid {
    fn object_id(&self) -> &ObjectId {
        &self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Asteroid
    }
}

/// A ring of asteroids rendered and collided as one object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsteroidBelt {
    pub id: ObjectId,
    pub spatial: Spatial,
    /// Radial width of the belt
    pub width: f64,
    /// Number of rendered rocks
    pub count: u32,
}

impl Identified for AsteroidBelt {
    fn object_id(&self) -> &ObjectId {
        &self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::AsteroidBelt
    }
}

/// A floating mineral pickup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mineral {
    pub id: ObjectId,
    pub spatial: Spatial,
    pub value: i64,
    pub rarity: u8,
}

impl Identified for Mineral {
    fn object_id(&self) -> &ObjectId {
        &self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Mineral
    }
}

/// A lootable container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: ObjectId,
    pub spatial: Spatial,
    /// Item ids held by the container
    pub items: Vec<ObjectId>,
}

impl Identified for Container {
    fn object_id(&self) -> &ObjectId {
        &self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Container
    }
}

/// Remains of a destroyed ship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wreck {
    pub id: ObjectId,
    pub spatial: Spatial,
    /// Ticks until the wreck disappears
    pub decay_ticks: u64,
}

impl Identified for Wreck {
    fn object_id(&self) -> &ObjectId {
        &self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Wreck
    }
}

/// An in-flight projectile
///
/// Projectiles are ephemeral and client-simulated; they have no
/// `EntityKind` of their own and are never addressed by specifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub id: ObjectId,
    pub spatial: Spatial,
    pub damage: f64,
    /// Ticks until the projectile expires
    pub lifetime_ticks: u64,
}

impl Identified for Projectile {
    fn object_id(&self) -> &ObjectId {
        &self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Unknown
    }
}

/// One star system and everything inside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: ObjectId,
    /// Generation seed for this location
    pub seed: String,
    /// Position of the location on the system map
    pub position: Vec2,
    pub star: Option<Star>,
    pub planets: Vec<Planet>,
    pub asteroids: Vec<Asteroid>,
    pub asteroid_belts: Vec<AsteroidBelt>,
    pub minerals: Vec<Mineral>,
    pub containers: Vec<Container>,
    pub wrecks: Vec<Wreck>,
    pub ships: Vec<Ship>,
    pub projectiles: Vec<Projectile>,
}

impl Location {
    /// Create an empty location
    pub fn new(id: impl Into<ObjectId>) -> Self {
        Self {
            id: id.into(),
            seed: String::new(),
            position: Vec2::ZERO,
            star: None,
            planets: Vec::new(),
            asteroids: Vec::new(),
            asteroid_belts: Vec::new(),
            minerals: Vec::new(),
            containers: Vec::new(),
            wrecks: Vec::new(),
            ships: Vec::new(),
            projectiles: Vec::new(),
        }
    }

    /// Find ids that appear more than once in any identified collection
    ///
    /// A non-empty result is a data integrity problem upstream; callers
    /// log it and carry on, nothing here attempts a repair.
    pub fn duplicate_ids(&self) -> Vec<ObjectSpecifier> {
        let mut duplicates = Vec::new();
        collect_duplicates(&self.planets, &mut duplicates);
        collect_duplicates(&self.asteroids, &mut duplicates);
        collect_duplicates(&self.asteroid_belts, &mut duplicates);
        collect_duplicates(&self.minerals, &mut duplicates);
        collect_duplicates(&self.containers, &mut duplicates);
        collect_duplicates(&self.wrecks, &mut duplicates);
        collect_duplicates(&self.ships, &mut duplicates);
        collect_duplicates(&self.projectiles, &mut duplicates);
        duplicates
    }
}

impl Identified for Location {
    fn object_id(&self) -> &ObjectId {
        &self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Location
    }
}

fn collect_duplicates<T: Identified>(items: &[T], out: &mut Vec<ObjectSpecifier>) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for item in items {
        let id = item.object_id();
        if !seen.insert(id) && reported.insert(id) {
            out.push(item.specifier());
        }
    }
}
