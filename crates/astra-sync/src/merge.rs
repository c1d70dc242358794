//! Policy-driven merge of the authoritative snapshot into the predicted one
//!
//! A hand-written visitor over the static snapshot schema. Scalar fields
//! consult the policy table directly; identified collections merge by id:
//! authoritative-only elements are appended, predicted-only elements are
//! dropped, and elements present on both sides recurse field by field.
//! After any merge a collection holds exactly the authoritative id set.

use crate::{PolicyTable, SnapshotField, Strategy};
use astra_world::{Identified, Location, ObjectId, Planet, Ship, Snapshot};
use indexmap::IndexMap;
use log::{debug, warn};

/// Reconcile the predicted snapshot against the authoritative one
///
/// Only fields the table assigns to the client survive untouched;
/// everything else converges to the authoritative view, structurally for
/// collections and wholesale for scalars.
pub fn reconcile(predicted: &mut Snapshot, authoritative: &Snapshot, table: &PolicyTable) {
    scalar(table, SnapshotField::Ticks, &mut predicted.ticks, &authoritative.ticks);
    scalar(table, SnapshotField::Millis, &mut predicted.millis, &authoritative.millis);
    scalar(table, SnapshotField::Paused, &mut predicted.paused, &authoritative.paused);
    scalar(table, SnapshotField::Mode, &mut predicted.mode, &authoritative.mode);
    scalar(table, SnapshotField::Players, &mut predicted.players, &authoritative.players);
    scalar(
        table,
        SnapshotField::ProcessedActions,
        &mut predicted.processed_actions,
        &authoritative.processed_actions,
    );
    scalar(table, SnapshotField::Events, &mut predicted.events, &authoritative.events);

    collection(
        table,
        SnapshotField::Locations,
        &mut predicted.locations,
        &authoritative.locations,
        |pred, auth| merge_location(pred, auth, table),
    );
}

fn merge_location(predicted: &mut Location, authoritative: &Location, table: &PolicyTable) {
    scalar(table, SnapshotField::LocationSeed, &mut predicted.seed, &authoritative.seed);
    scalar(
        table,
        SnapshotField::LocationPosition,
        &mut predicted.position,
        &authoritative.position,
    );

    merge_star(predicted, authoritative, table);

    collection(
        table,
        SnapshotField::LocationPlanets,
        &mut predicted.planets,
        &authoritative.planets,
        |pred, auth| merge_planet(pred, auth, table),
    );
    collection(
        table,
        SnapshotField::LocationAsteroids,
        &mut predicted.asteroids,
        &authoritative.asteroids,
        |pred, auth| *pred = auth.clone(),
    );
    collection(
        table,
        SnapshotField::LocationAsteroidBelts,
        &mut predicted.asteroid_belts,
        &authoritative.asteroid_belts,
        |pred, auth| *pred = auth.clone(),
    );
    collection(
        table,
        SnapshotField::LocationMinerals,
        &mut predicted.minerals,
        &authoritative.minerals,
        |pred, auth| *pred = auth.clone(),
    );
    collection(
        table,
        SnapshotField::LocationContainers,
        &mut predicted.containers,
        &authoritative.containers,
        |pred, auth| *pred = auth.clone(),
    );
    collection(
        table,
        SnapshotField::LocationWrecks,
        &mut predicted.wrecks,
        &authoritative.wrecks,
        |pred, auth| *pred = auth.clone(),
    );
    collection(
        table,
        SnapshotField::LocationShips,
        &mut predicted.ships,
        &authoritative.ships,
        |pred, auth| merge_ship(pred, auth, table),
    );
    collection(
        table,
        SnapshotField::LocationProjectiles,
        &mut predicted.projectiles,
        &authoritative.projectiles,
        |pred, auth| *pred = auth.clone(),
    );
}

fn merge_star(predicted: &mut Location, authoritative: &Location, table: &PolicyTable) {
    match table.strategy_for(SnapshotField::LocationStar) {
        Strategy::Client => {}
        Strategy::Server => predicted.star = authoritative.star.clone(),
        Strategy::ServerIfIdChanged => {
            let changed = match (&predicted.star, &authoritative.star) {
                (Some(pred), Some(auth)) => pred.id != auth.id,
                (None, None) => false,
                // Presence flips resolve toward the authoritative side
                _ => true,
            };
            if changed {
                debug!("star identity changed, adopting authoritative value");
                predicted.star = authoritative.star.clone();
            }
        }
        Strategy::Merge => {
            warn!(
                "policy table: cannot merge {} structurally, preferring authoritative value",
                SnapshotField::LocationStar
            );
            predicted.star = authoritative.star.clone();
        }
    }
}

fn merge_ship(predicted: &mut Ship, authoritative: &Ship, table: &PolicyTable) {
    scalar(
        table,
        SnapshotField::ShipSpatial,
        &mut predicted.spatial,
        &authoritative.spatial,
    );
    if table.strategy_for(SnapshotField::ShipNavigation) != Strategy::Client {
        predicted.navigate_target = authoritative.navigate_target;
        predicted.dock_target = authoritative.dock_target.clone();
    }
    scalar(
        table,
        SnapshotField::ShipDocking,
        &mut predicted.docked_at,
        &authoritative.docked_at,
    );
    scalar(table, SnapshotField::ShipHealth, &mut predicted.health, &authoritative.health);
    scalar(table, SnapshotField::ShipName, &mut predicted.name, &authoritative.name);
}

fn merge_planet(predicted: &mut Planet, authoritative: &Planet, table: &PolicyTable) {
    scalar(
        table,
        SnapshotField::PlanetSpatial,
        &mut predicted.spatial,
        &authoritative.spatial,
    );
    scalar(table, SnapshotField::PlanetName, &mut predicted.name, &authoritative.name);
}

/// Reconcile one scalar (or wholesale-replaced) field
///
/// Merge and identity strategies have no structural meaning for a scalar;
/// that is a table misconfiguration, recovered by preferring the
/// authoritative value with a warning.
fn scalar<T: Clone>(table: &PolicyTable, field: SnapshotField, predicted: &mut T, authoritative: &T) {
    match table.strategy_for(field) {
        Strategy::Client => {}
        Strategy::Server => *predicted = authoritative.clone(),
        Strategy::Merge | Strategy::ServerIfIdChanged => {
            warn!(
                "policy table: {} cannot be merged structurally, preferring authoritative value",
                field
            );
            *predicted = authoritative.clone();
        }
    }
}

/// Reconcile one identified collection according to its strategy
fn collection<T: Identified + Clone>(
    table: &PolicyTable,
    field: SnapshotField,
    predicted: &mut Vec<T>,
    authoritative: &[T],
    merge_one: impl FnMut(&mut T, &T),
) {
    match table.strategy_for(field) {
        Strategy::Client => {}
        Strategy::Server | Strategy::ServerIfIdChanged => *predicted = authoritative.to_vec(),
        Strategy::Merge => merge_by_id(predicted, authoritative, merge_one),
    }
}

/// Merge a collection by element identity
///
/// The result contains exactly the authoritative id set, in authoritative
/// order: new elements are appended as-is, elements on both sides are
/// merged in place, and predicted-only leftovers are dropped.
pub fn merge_by_id<T: Identified + Clone>(
    predicted: &mut Vec<T>,
    authoritative: &[T],
    mut merge_one: impl FnMut(&mut T, &T),
) {
    let mut by_id: IndexMap<ObjectId, T> = predicted
        .drain(..)
        .map(|item| (item.object_id().clone(), item))
        .collect();

    let mut merged = Vec::with_capacity(authoritative.len());
    for auth in authoritative {
        match by_id.shift_remove(auth.object_id()) {
            Some(mut pred) => {
                merge_one(&mut pred, auth);
                merged.push(pred);
            }
            None => merged.push(auth.clone()),
        }
    }

    for (id, item) in by_id {
        debug!("dropping predicted-only {} {}", item.kind(), id);
    }

    *predicted = merged;
}
