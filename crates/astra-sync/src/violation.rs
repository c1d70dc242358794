//! Divergence detection between the predicted and authoritative views
//!
//! Violations are ephemeral: computed fresh on every time update, consumed
//! by the correction pass, and drainable for diagnostics.

use crate::SyncConfig;
use astra_world::{angular_distance, AreaBounds, Identified, ObjectSpecifier, Snapshot, Vec2};

/// A detected divergence beyond tolerance for one object
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// Positional jump of an on-screen object
    ObjectJump {
        spec: ObjectSpecifier,
        from: Vec2,
        to: Vec2,
        divergence: f64,
    },
    /// Positional jump of an object outside the visible area; corrected by
    /// snapping, since off-screen popping is imperceptible
    InvisibleObjectJump {
        spec: ObjectSpecifier,
        from: Vec2,
        to: Vec2,
        divergence: f64,
    },
    /// Rotational jump of an on-screen object
    ObjectRotationJump {
        spec: ObjectSpecifier,
        from: f64,
        to: f64,
        divergence: f64,
    },
    /// Rotational jump outside the visible area
    InvisibleObjectRotationJump {
        spec: ObjectSpecifier,
        from: f64,
        to: f64,
        divergence: f64,
    },
    /// The authoritative clock is behind the predicted one; surfaced for
    /// diagnostics, never corrected
    TimeRollback {
        predicted_tick: u64,
        authoritative_tick: u64,
    },
}

impl Violation {
    /// The object this violation concerns, if any
    pub fn specifier(&self) -> Option<&ObjectSpecifier> {
        match self {
            Violation::ObjectJump { spec, .. }
            | Violation::InvisibleObjectJump { spec, .. }
            | Violation::ObjectRotationJump { spec, .. }
            | Violation::InvisibleObjectRotationJump { spec, .. } => Some(spec),
            Violation::TimeRollback { .. } => None,
        }
    }

    /// Whether the divergence happened outside the visible area
    pub fn is_invisible(&self) -> bool {
        matches!(
            self,
            Violation::InvisibleObjectJump { .. } | Violation::InvisibleObjectRotationJump { .. }
        )
    }
}

/// Compare same-identity objects between the two views and flag jumps
///
/// The checkable subset is every undocked ship present in the
/// authoritative snapshot. Divergence is flagged only when it exceeds both
/// the per-tick drift allowance scaled by the elapsed interval and the
/// absolute perceptible threshold.
pub fn detect(
    predicted: &Snapshot,
    authoritative: &Snapshot,
    elapsed_ticks: u64,
    area: &AreaBounds,
    config: &SyncConfig,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    if authoritative.ticks < predicted.ticks {
        violations.push(Violation::TimeRollback {
            predicted_tick: predicted.ticks,
            authoritative_tick: authoritative.ticks,
        });
    }

    let drift_allowance = config.drift_allowance(elapsed_ticks);
    let rotation_allowance = config.rotation_drift_allowance(elapsed_ticks);

    for location in &authoritative.locations {
        for auth_ship in &location.ships {
            if auth_ship.is_docked() {
                continue;
            }
            let Some(pred_ship) = predicted.find_ship(&auth_ship.id) else {
                continue;
            };
            let spec = auth_ship.specifier();
            let from = pred_ship.spatial.position;
            let to = auth_ship.spatial.position;
            let visible = area.contains(from);

            let divergence = from.distance_to(to);
            if divergence > drift_allowance && divergence > config.min_visible_jump {
                violations.push(if visible {
                    Violation::ObjectJump {
                        spec: spec.clone(),
                        from,
                        to,
                        divergence,
                    }
                } else {
                    Violation::InvisibleObjectJump {
                        spec: spec.clone(),
                        from,
                        to,
                        divergence,
                    }
                });
            }

            let from_rot = pred_ship.spatial.rotation;
            let to_rot = auth_ship.spatial.rotation;
            let rotation_divergence = angular_distance(from_rot, to_rot).abs();
            if rotation_divergence > rotation_allowance
                && rotation_divergence > config.min_visible_rotation_jump
            {
                violations.push(if visible {
                    Violation::ObjectRotationJump {
                        spec,
                        from: from_rot,
                        to: to_rot,
                        divergence: rotation_divergence,
                    }
                } else {
                    Violation::InvisibleObjectRotationJump {
                        spec,
                        from: from_rot,
                        to: to_rot,
                        divergence: rotation_divergence,
                    }
                });
            }
        }
    }

    violations
}
