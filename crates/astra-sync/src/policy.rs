//! Reconciliation policy table
//!
//! Every policy-relevant path in the snapshot schema is one variant of the
//! closed `SnapshotField` enum, so the merge consults the table through an
//! exhaustive match instead of runtime string wildcards. Adding a schema
//! field means adding a variant, and the compiler then points at every
//! merge site that must handle it.

use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A policy-relevant path in the snapshot schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapshotField {
    Ticks,
    Millis,
    Paused,
    Mode,
    Players,
    ProcessedActions,
    Events,
    Locations,
    LocationSeed,
    LocationPosition,
    LocationStar,
    LocationPlanets,
    LocationAsteroids,
    LocationAsteroidBelts,
    LocationMinerals,
    LocationContainers,
    LocationWrecks,
    LocationShips,
    LocationProjectiles,
    ShipSpatial,
    ShipNavigation,
    ShipDocking,
    ShipHealth,
    ShipName,
    PlanetSpatial,
    PlanetName,
}

impl fmt::Display for SnapshotField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// How a field is reconciled against the authoritative snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Leave the predicted value untouched; the field is locally derivable
    /// or visually sensitive to server jitter
    Client,
    /// Overwrite with the authoritative value unconditionally
    Server,
    /// Overwrite only when the identity of the value changed
    ServerIfIdChanged,
    /// Recurse: scalars field by field, identified collections by id
    Merge,
}

/// Classification of every snapshot field into a reconciliation strategy
///
/// Built from four field sets mirroring the strategies. A field must not
/// appear in more than one set; `validate` reports offenders without
/// failing, and lookup falls back to server authority for anything left
/// unclassified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyTable {
    pub client: Vec<SnapshotField>,
    pub server: Vec<SnapshotField>,
    pub merge: Vec<SnapshotField>,
    pub server_if_id_changed: Vec<SnapshotField>,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            client: vec![
                // Time runs ahead of the server on purpose
                SnapshotField::Ticks,
                SnapshotField::Millis,
                // Motion is predicted locally; violations heal divergence
                SnapshotField::ShipSpatial,
                SnapshotField::ShipNavigation,
                // Smooth deterministic orbits; server echo would jitter
                SnapshotField::PlanetSpatial,
                // Fully client-simulated ephemera
                SnapshotField::LocationProjectiles,
            ],
            server: vec![
                SnapshotField::Paused,
                SnapshotField::Mode,
                SnapshotField::Players,
                SnapshotField::ProcessedActions,
                SnapshotField::Events,
                SnapshotField::LocationSeed,
                SnapshotField::LocationPosition,
                SnapshotField::LocationAsteroids,
                SnapshotField::LocationAsteroidBelts,
                SnapshotField::LocationMinerals,
                SnapshotField::LocationContainers,
                SnapshotField::LocationWrecks,
                SnapshotField::ShipDocking,
                SnapshotField::ShipHealth,
                SnapshotField::ShipName,
                SnapshotField::PlanetName,
            ],
            merge: vec![
                SnapshotField::Locations,
                SnapshotField::LocationShips,
                SnapshotField::LocationPlanets,
            ],
            server_if_id_changed: vec![SnapshotField::LocationStar],
        }
    }
}

impl PolicyTable {
    /// Report fields present in more than one strategy set
    ///
    /// Misconfiguration is logged, not fatal; the first matching set wins
    /// at lookup time.
    pub fn validate(&self) -> Vec<SnapshotField> {
        let sets = [
            &self.client,
            &self.server,
            &self.merge,
            &self.server_if_id_changed,
        ];
        let mut offenders = Vec::new();
        for (i, set) in sets.iter().enumerate() {
            for field in set.iter() {
                let elsewhere = sets[i + 1..].iter().any(|other| other.contains(field));
                if elsewhere && !offenders.contains(field) {
                    warn!("policy table: {} is classified by more than one strategy", field);
                    offenders.push(*field);
                }
            }
        }
        offenders
    }

    /// The strategy for a field
    ///
    /// Unclassified fields fail safe toward server authority with a logged
    /// warning; that is a detectable configuration gap, not a silent bug.
    pub fn strategy_for(&self, field: SnapshotField) -> Strategy {
        if self.client.contains(&field) {
            Strategy::Client
        } else if self.server.contains(&field) {
            Strategy::Server
        } else if self.merge.contains(&field) {
            Strategy::Merge
        } else if self.server_if_id_changed.contains(&field) {
            Strategy::ServerIfIdChanged
        } else {
            warn!(
                "policy table: no strategy registered for {}, defaulting to server authority",
                field
            );
            Strategy::Server
        }
    }
}
