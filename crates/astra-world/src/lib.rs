//! Astra World - shared world state model
//!
//! This crate provides the state substrate the sync engine operates on:
//! - World snapshots and the entity tree (`Snapshot`, `Location`, `Ship`, ...)
//! - Identity and addressing (`ObjectId`, `EntityKind`, `ObjectSpecifier`)
//! - Planar geometry and visible-area bounds (`Vec2`, `AreaBounds`)
//! - Player actions and their optimistic local effect (`Action`)
//! - The deterministic step contract (`WorldStep`) plus a reference
//!   implementation (`KinematicStep`)
//!
//! The real simulation, transport, and rendering are external; everything
//! here is plain serde-ready data plus lookup helpers.

mod action;
mod entities;
mod geometry;
mod identity;
mod snapshot;
mod specifier;
mod step;

pub use action::Action;
pub use entities::{
    Asteroid, AsteroidBelt, Container, Identified, Location, Mineral, Planet, Projectile, Ship,
    Spatial, Star, Wreck,
};
pub use geometry::{angular_distance, wrap_angle, AreaBounds, Vec2};
pub use identity::{ObjectId, PlayerId, WorldId};
pub use snapshot::{Player, Snapshot, WorldMode};
pub use specifier::{EntityKind, ObjectSpecifier};
pub use step::{KinematicStep, StepError, StepMode, WorldStep, TICKS_PER_SECOND};
