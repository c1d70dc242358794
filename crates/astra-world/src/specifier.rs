//! Object specifiers - references that survive snapshot replacement

use crate::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of an in-world object
///
/// A closed set: adding a new kind forces every exhaustive match over it
/// (lookup, merge, diagnostics) to be updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EntityKind {
    Ship,
    Planet,
    Star,
    Asteroid,
    AsteroidBelt,
    Mineral,
    Container,
    Wreck,
    Location,
    /// Kind could not be determined (e.g., a foreign or ephemeral object)
    #[default]
    Unknown,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Ship => "ship",
            EntityKind::Planet => "planet",
            EntityKind::Star => "star",
            EntityKind::Asteroid => "asteroid",
            EntityKind::AsteroidBelt => "asteroid_belt",
            EntityKind::Mineral => "mineral",
            EntityKind::Container => "container",
            EntityKind::Wreck => "wreck",
            EntityKind::Location => "location",
            EntityKind::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// A tagged reference addressing one object inside a snapshot
///
/// Never stored as an owning reference: resolution is always "look up the
/// id inside the current snapshot", so a specifier stays valid across
/// snapshot replacement, relocation, and merging.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectSpecifier {
    /// What kind of object this refers to
    pub kind: EntityKind,
    /// The object's id within its collection
    pub id: ObjectId,
}

impl ObjectSpecifier {
    /// Create a new specifier
    pub fn new(kind: EntityKind, id: impl Into<ObjectId>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Shorthand for a ship specifier
    pub fn ship(id: impl Into<ObjectId>) -> Self {
        Self::new(EntityKind::Ship, id)
    }
}

impl fmt::Display for ObjectSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specifier_display() {
        let spec = ObjectSpecifier::ship("s1");
        assert_eq!(format!("{}", spec), "ship:s1");
    }

    #[test]
    fn test_specifier_equality() {
        let a = ObjectSpecifier::new(EntityKind::Planet, "p1");
        let b = ObjectSpecifier::new(EntityKind::Planet, "p1");
        let c = ObjectSpecifier::new(EntityKind::Star, "p1");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
