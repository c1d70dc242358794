//! Bounded correction of flagged divergence
//!
//! Visible violations are healed at a rate-limited pace so the player sees
//! drift, not snapping; far past the teleport threshold the budget scales
//! super-linearly so implausible desyncs still close quickly. Invisible
//! violations snap directly. Time rollbacks are diagnostics only.

use crate::{SyncConfig, Violation};
use astra_world::{angular_distance, wrap_angle, Snapshot};

/// Apply corrections for one tick's violations to the predicted snapshot
pub fn apply(
    predicted: &mut Snapshot,
    violations: &[Violation],
    elapsed_ticks: u64,
    config: &SyncConfig,
) {
    for violation in violations {
        match violation {
            Violation::ObjectJump {
                spec,
                to,
                divergence,
                ..
            } => {
                let Some(spatial) = predicted.spatial_of_mut(spec) else {
                    continue;
                };
                let allowed = correction_budget(
                    config.correction_rate_per_tick,
                    config.teleport_threshold,
                    config.teleport_exponent,
                    *divergence,
                    elapsed_ticks,
                );
                // Leave one interval's worth of drift for the simulation to
                // converge on its own; never overshoot the target.
                let natural = config.drift_allowance(elapsed_ticks);
                let shift = allowed.min((divergence - natural).max(0.0));
                let direction = (*to - spatial.position).normalized();
                spatial.position = spatial.position + direction.scaled(shift);
            }
            Violation::InvisibleObjectJump { spec, to, .. } => {
                if let Some(spatial) = predicted.spatial_of_mut(spec) {
                    spatial.position = *to;
                }
            }
            Violation::ObjectRotationJump {
                spec,
                to,
                divergence,
                ..
            } => {
                let Some(spatial) = predicted.spatial_of_mut(spec) else {
                    continue;
                };
                let allowed = correction_budget(
                    config.rotation_correction_rate_per_tick,
                    config.rotation_teleport_threshold,
                    config.teleport_exponent,
                    *divergence,
                    elapsed_ticks,
                );
                let natural = config.rotation_drift_allowance(elapsed_ticks);
                let shift = allowed.min((divergence - natural).max(0.0));
                let delta = angular_distance(spatial.rotation, *to);
                spatial.rotation = wrap_angle(spatial.rotation + shift.copysign(delta));
            }
            Violation::InvisibleObjectRotationJump { spec, to, .. } => {
                if let Some(spatial) = predicted.spatial_of_mut(spec) {
                    spatial.rotation = wrap_angle(*to);
                }
            }
            Violation::TimeRollback { .. } => {}
        }
    }
}

/// The maximum correction magnitude for one interval
///
/// `rate * elapsed`, scaled by `(divergence / threshold) ^ exponent` once
/// the divergence crosses the teleport threshold.
fn correction_budget(
    rate_per_tick: f64,
    teleport_threshold: f64,
    exponent: f64,
    divergence: f64,
    elapsed_ticks: u64,
) -> f64 {
    let base = rate_per_tick * elapsed_ticks as f64;
    if divergence > teleport_threshold {
        base * (divergence / teleport_threshold).powf(exponent)
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::violation::detect;
    use astra_world::{AreaBounds, Location, ObjectSpecifier, Ship, Vec2, TICKS_PER_SECOND};

    fn snapshot_with_ship(pos: Vec2) -> Snapshot {
        let mut snap = Snapshot::new("w1", "p1");
        let mut loc = Location::new("l1");
        loc.ships.push(Ship::new("s1", pos));
        snap.locations.push(loc);
        snap
    }

    #[test]
    fn test_spec_example_bounded_correction() {
        // Divergence 12 with a 10 unit/sec allowance: the correction moves
        // the ship to within 10 units of the target, not onto it.
        let mut predicted = snapshot_with_ship(Vec2::new(100.0, 0.0));
        let authoritative = snapshot_with_ship(Vec2::new(100.0, 12.0));
        let config = SyncConfig::default();

        let violations = detect(
            &predicted,
            &authoritative,
            TICKS_PER_SECOND,
            &AreaBounds::everything(),
            &config,
        );
        apply(&mut predicted, &violations, TICKS_PER_SECOND, &config);

        let ship = predicted.find_ship(&"s1".into()).unwrap();
        let remaining = ship.spatial.position.distance_to(Vec2::new(100.0, 12.0));
        assert!(remaining <= 10.0 + 1e-9);
        assert!(remaining > 0.0);
    }

    #[test]
    fn test_correction_is_bounded_and_nonzero() {
        let mut predicted = snapshot_with_ship(Vec2::new(0.0, 0.0));
        let authoritative = snapshot_with_ship(Vec2::new(0.0, 50.0));
        let config = SyncConfig::default();
        let elapsed = TICKS_PER_SECOND;

        let violations = detect(
            &predicted,
            &authoritative,
            elapsed,
            &AreaBounds::everything(),
            &config,
        );
        let before = predicted.find_ship(&"s1".into()).unwrap().spatial.position;
        apply(&mut predicted, &violations, elapsed, &config);
        let after = predicted.find_ship(&"s1".into()).unwrap().spatial.position;

        let moved = before.distance_to(after);
        assert!(moved > 0.0);
        // Below the teleport threshold the budget is rate * elapsed
        assert!(moved <= config.correction_rate_per_tick * elapsed as f64 + 1e-9);
    }

    #[test]
    fn test_teleport_scale_is_superlinear() {
        let config = SyncConfig::default();
        let elapsed = TICKS_PER_SECOND;
        let base = correction_budget(
            config.correction_rate_per_tick,
            config.teleport_threshold,
            config.teleport_exponent,
            config.teleport_threshold / 2.0,
            elapsed,
        );
        let scaled = correction_budget(
            config.correction_rate_per_tick,
            config.teleport_threshold,
            config.teleport_exponent,
            config.teleport_threshold * 4.0,
            elapsed,
        );
        assert!(scaled > base * 4.0);
    }

    #[test]
    fn test_invisible_violation_snaps() {
        let mut predicted = snapshot_with_ship(Vec2::new(1000.0, 0.0));
        let authoritative = snapshot_with_ship(Vec2::new(1000.0, 40.0));
        let config = SyncConfig::default();
        let area = AreaBounds::new(Vec2::ZERO, 100.0);

        let violations = detect(&predicted, &authoritative, TICKS_PER_SECOND, &area, &config);
        apply(&mut predicted, &violations, TICKS_PER_SECOND, &config);

        let ship = predicted.find_ship(&"s1".into()).unwrap();
        assert_eq!(ship.spatial.position, Vec2::new(1000.0, 40.0));
    }

    #[test]
    fn test_rotation_correction_moves_toward_target() {
        let mut predicted = snapshot_with_ship(Vec2::ZERO);
        predicted.locations[0].ships[0].spatial.rotation = 2.0;
        let authoritative = snapshot_with_ship(Vec2::ZERO);
        let config = SyncConfig::default();

        let violations = detect(
            &predicted,
            &authoritative,
            TICKS_PER_SECOND,
            &AreaBounds::everything(),
            &config,
        );
        apply(&mut predicted, &violations, TICKS_PER_SECOND, &config);

        let rotation = predicted.find_ship(&"s1".into()).unwrap().spatial.rotation;
        assert!(rotation < 2.0);
        assert!(rotation > 0.0);
    }

    #[test]
    fn test_missing_object_is_skipped() {
        let mut predicted = snapshot_with_ship(Vec2::ZERO);
        let config = SyncConfig::default();
        let violations = vec![Violation::ObjectJump {
            spec: ObjectSpecifier::ship("ghost"),
            from: Vec2::ZERO,
            to: Vec2::new(10.0, 0.0),
            divergence: 10.0,
        }];

        // Must not panic; the object may have left the world since detection
        apply(&mut predicted, &violations, TICKS_PER_SECOND, &config);
    }
}
