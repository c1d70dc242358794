//! The state syncer - orchestrates prediction and reconciliation
//!
//! One engine instance is constructed per session and owned by the driving
//! loop; there is no ambient global. All four event kinds are handled
//! synchronously and run to completion, and the predicted snapshot is
//! mutated only between calls through this type.

use crate::{
    correction, merge, violation, ActionLedger, PolicyTable, Result, SyncConfig, SyncError,
    Violation,
};
use astra_world::{Action, AreaBounds, Ship, Snapshot, StepMode, WorldStep};
use log::{debug, warn};
use std::collections::HashSet;

/// An event driving the syncer
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Adopt a snapshot wholesale and start a fresh session
    Init(Snapshot),
    /// Advance the predicted world by an elapsed tick count
    TimeUpdate { elapsed_ticks: u64, area: AreaBounds },
    /// An authoritative snapshot arrived from the server
    ServerState { snapshot: Snapshot, area: AreaBounds },
    /// The local player acted; apply optimistically and track for replay
    PlayerAction {
        actions: Vec<Action>,
        area: AreaBounds,
        tag: Option<String>,
    },
}

/// The result of handling one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Predicted and authoritative views agree
    Synced,
    /// The views have diverged; `ticks` is the clock gap to the
    /// authoritative snapshot when it arrived
    Desynced { ticks: u64 },
    /// A pending action outlived its maximum lifetime and the predicted
    /// view was discarded for the authoritative one
    FullResync,
}

/// The two timelines the engine maintains
#[derive(Debug)]
struct SyncState {
    /// The locally-predicted world, exposed to rendering
    predicted: Snapshot,
    /// The authoritative world, advanced in parallel while the views
    /// diverge; `None` once they are collapsed into one
    server: Option<Snapshot>,
}

/// Predictive state reconciliation engine
///
/// Keeps a locally-predicted snapshot converging toward the periodically
/// received authoritative one: advances both through the deterministic
/// step, rebases unconfirmed player actions onto the authoritative
/// timeline, merges by the policy table, and heals flagged divergence at a
/// bounded rate.
pub struct StateSyncer<S: WorldStep> {
    step: S,
    config: SyncConfig,
    policy: PolicyTable,
    state: Option<SyncState>,
    ledger: ActionLedger,
    /// Accumulated violations, drainable for diagnostics
    violations: Vec<Violation>,
    /// Authoritative copy of the local ship, for diagnostic overlay only
    shadow: Option<Ship>,
}

impl<S: WorldStep> StateSyncer<S> {
    /// Create a syncer with default configuration and policy
    pub fn new(step: S) -> Self {
        Self::with_config(step, SyncConfig::default(), PolicyTable::default())
    }

    /// Create a syncer with explicit configuration and policy
    pub fn with_config(step: S, config: SyncConfig, policy: PolicyTable) -> Self {
        // Overlaps are logged here once instead of failing startup
        policy.validate();
        Self {
            step,
            config,
            policy,
            state: None,
            ledger: ActionLedger::new(),
            violations: Vec::new(),
            shadow: None,
        }
    }

    /// Handle one driving event
    pub fn handle(&mut self, event: SyncEvent) -> Result<SyncOutcome> {
        // The previous call's overlay must never outlive its tick
        self.shadow = None;
        let outcome = match event {
            SyncEvent::Init(snapshot) => Ok(self.on_init(snapshot)),
            SyncEvent::TimeUpdate { elapsed_ticks, area } => {
                self.on_time_update(elapsed_ticks, area)
            }
            SyncEvent::ServerState { snapshot, area } => self.on_server_state(snapshot, area),
            SyncEvent::PlayerAction { actions, area, tag } => {
                self.on_player_action(actions, area, tag)
            }
        };
        self.refresh_shadow();
        outcome
    }

    /// The current predicted snapshot, if initialized
    pub fn view(&self) -> Option<&Snapshot> {
        self.state.as_ref().map(|state| &state.predicted)
    }

    /// The authoritative snapshot, while the views are diverged
    pub fn authoritative(&self) -> Option<&Snapshot> {
        self.state.as_ref().and_then(|state| state.server.as_ref())
    }

    /// Authoritative copy of the local player's ship, for diagnostic
    /// overlay rendering only; never part of the snapshot itself
    pub fn shadow(&self) -> Option<&Ship> {
        self.shadow.as_ref()
    }

    /// Whether the two views are currently collapsed into one
    pub fn is_converged(&self) -> bool {
        self.state
            .as_ref()
            .map(|state| state.server.is_none())
            .unwrap_or(false)
    }

    /// Number of pending, unacknowledged action packs
    pub fn pending_actions(&self) -> usize {
        self.ledger.len()
    }

    /// Take all violations accumulated since the last drain
    pub fn drain_violations(&mut self) -> Vec<Violation> {
        std::mem::take(&mut self.violations)
    }

    fn on_init(&mut self, snapshot: Snapshot) -> SyncOutcome {
        log_duplicate_ids(&snapshot);
        self.ledger.clear();
        self.violations.clear();
        self.state = Some(SyncState {
            predicted: snapshot,
            server: None,
        });
        SyncOutcome::Synced
    }

    fn on_time_update(&mut self, elapsed_ticks: u64, area: AreaBounds) -> Result<SyncOutcome> {
        let state = self.state.as_mut().ok_or(SyncError::NoState)?;

        let oversized = elapsed_ticks > self.config.max_iterative_elapsed_ticks;
        if oversized {
            warn!(
                "elapsed interval of {} ticks exceeds the iterative budget; \
                 stepping in a single jump with relaxed determinism",
                elapsed_ticks
            );
        }
        let mode = if oversized {
            StepMode::SingleJump
        } else {
            StepMode::Iterative
        };

        state.predicted.clear_ephemeral();
        state.predicted = self.step.step(&state.predicted, elapsed_ticks, &area, mode)?;

        let Some(mut server) = state.server.take() else {
            return Ok(SyncOutcome::Synced);
        };

        // The predicted clock already advanced, so this lag covers both the
        // authoritative snapshot's age and the current interval.
        let lag = state.predicted.ticks.saturating_sub(server.ticks);

        // Rebase: unconfirmed local actions belong on the authoritative
        // timeline too, or stepping it would undo them.
        let processed_list = std::mem::take(&mut server.processed_actions);
        server.events.clear();
        let processed: HashSet<String> = processed_list.iter().cloned().collect();
        let mut replayed = 0usize;
        for pack in self.ledger.unconfirmed(&processed) {
            if pack.issued_at_tick <= state.predicted.ticks {
                for action in &pack.actions {
                    action.apply(&mut server);
                }
                replayed += 1;
            }
        }
        if replayed > 0 {
            debug!("replayed {} pending action packs onto the authoritative timeline", replayed);
        }

        let catchup_mode = if lag > self.config.max_iterative_elapsed_ticks {
            StepMode::SingleJump
        } else {
            mode
        };
        let mut server = match self.step.step(&server, lag, &area, catchup_mode) {
            Ok(stepped) => stepped,
            Err(err) => {
                // Put the authoritative view back; losing it would report
                // convergence for a divergence that was never healed.
                server.processed_actions = processed_list;
                state.server = Some(server);
                return Err(err.into());
            }
        };
        server.processed_actions = processed_list;

        merge::reconcile(&mut state.predicted, &server, &self.policy);

        let violations =
            violation::detect(&state.predicted, &server, elapsed_ticks, &area, &self.config);
        correction::apply(&mut state.predicted, &violations, elapsed_ticks, &self.config);
        let remaining =
            violation::detect(&state.predicted, &server, elapsed_ticks, &area, &self.config);
        self.violations.extend(violations);

        if remaining.is_empty() {
            // One simulation is cheaper than two; split again on the next
            // diverging server snapshot.
            debug!("views converged; collapsing to a single timeline");
            Ok(SyncOutcome::Synced)
        } else {
            state.server = Some(server);
            Ok(SyncOutcome::Desynced {
                ticks: lag.saturating_sub(elapsed_ticks),
            })
        }
    }

    fn on_server_state(&mut self, snapshot: Snapshot, _area: AreaBounds) -> Result<SyncOutcome> {
        let state = self.state.as_ref().ok_or(SyncError::NoState)?;

        if snapshot.id != state.predicted.id {
            debug!(
                "authoritative snapshot for {} while tracking {}; reinitializing",
                snapshot.id, state.predicted.id
            );
            return Ok(self.on_init(snapshot));
        }

        log_duplicate_ids(&snapshot);

        // Catch-up stepping aligns the clocks before reconciliation, so a
        // rollback is only observable here, against the raw incoming tick.
        if snapshot.ticks < state.predicted.ticks {
            self.violations.push(Violation::TimeRollback {
                predicted_tick: state.predicted.ticks,
                authoritative_tick: snapshot.ticks,
            });
        }

        let processed = snapshot.processed_action_tags();
        let confirmed = self.ledger.confirm(&processed);
        if confirmed > 0 {
            debug!("server confirmed {} pending action packs", confirmed);
        }

        let now = state.predicted.ticks.max(snapshot.ticks);
        let evicted = self
            .ledger
            .evict_expired(now, self.config.max_pending_lifetime_ticks);

        let state = self.state.as_mut().ok_or(SyncError::NoState)?;
        if !evicted.is_empty() {
            // The server lost an action we already applied locally; the
            // predicted timeline cannot be trusted any further.
            warn!(
                "{} pending action packs expired unacknowledged; discarding the predicted view",
                evicted.len()
            );
            state.predicted = snapshot;
            state.server = None;
            return Ok(SyncOutcome::FullResync);
        }

        let ticks = state.predicted.ticks.abs_diff(snapshot.ticks);
        state.server = Some(snapshot);
        Ok(SyncOutcome::Desynced { ticks })
    }

    fn on_player_action(
        &mut self,
        actions: Vec<Action>,
        _area: AreaBounds,
        tag: Option<String>,
    ) -> Result<SyncOutcome> {
        let state = self.state.as_mut().ok_or(SyncError::NoState)?;

        self.ledger
            .record(actions.clone(), tag, state.predicted.ticks);
        for action in &actions {
            action.apply(&mut state.predicted);
        }
        Ok(SyncOutcome::Synced)
    }

    fn refresh_shadow(&mut self) {
        if !self.config.shadow_enabled {
            return;
        }
        let Some(state) = &self.state else { return };
        let Some(server) = &state.server else { return };
        self.shadow = server.find_my_ship().cloned();
    }
}

fn log_duplicate_ids(snapshot: &Snapshot) {
    for location in &snapshot.locations {
        for spec in location.duplicate_ids() {
            warn!("duplicate id {} in location {}", spec, location.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astra_world::{
        KinematicStep, Location, ObjectId, Player, Ship, StepError, Vec2, TICKS_PER_SECOND,
    };
    use std::cell::Cell;

    /// Fails on the nth `step` call, passing through to the kinematic
    /// step otherwise.
    struct FailingStep {
        inner: KinematicStep,
        calls: Cell<u32>,
        fail_on: u32,
    }

    impl WorldStep for FailingStep {
        fn step(
            &self,
            snapshot: &Snapshot,
            elapsed_ticks: u64,
            area: &AreaBounds,
            mode: StepMode,
        ) -> std::result::Result<Snapshot, StepError> {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            if call == self.fail_on {
                return Err(StepError::Failed("induced failure".into()));
            }
            self.inner.step(snapshot, elapsed_ticks, area, mode)
        }
    }

    fn base_snapshot() -> Snapshot {
        let mut snap = Snapshot::new("w1", "p1");
        let mut player = Player::new("p1", "tester");
        player.ship_id = Some(ObjectId::new("s1"));
        snap.players.push(player);
        let mut loc = Location::new("l1");
        loc.ships.push(Ship::new("s1", Vec2::new(100.0, 0.0)));
        snap.locations.push(loc);
        snap
    }

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn syncer() -> StateSyncer<KinematicStep> {
        init_logs();
        StateSyncer::new(KinematicStep::default())
    }

    fn everything() -> AreaBounds {
        AreaBounds::everything()
    }

    #[test]
    fn test_events_before_init_fail() {
        let mut engine = syncer();
        let result = engine.handle(SyncEvent::TimeUpdate {
            elapsed_ticks: 1000,
            area: everything(),
        });
        assert!(matches!(result, Err(SyncError::NoState)));

        let result = engine.handle(SyncEvent::ServerState {
            snapshot: base_snapshot(),
            area: everything(),
        });
        assert!(matches!(result, Err(SyncError::NoState)));
    }

    #[test]
    fn test_init_adopts_snapshot() {
        let mut engine = syncer();
        let outcome = engine.handle(SyncEvent::Init(base_snapshot())).unwrap();
        assert_eq!(outcome, SyncOutcome::Synced);
        assert!(engine.view().is_some());
        assert!(engine.is_converged());
    }

    #[test]
    fn test_player_action_applies_optimistically() {
        let mut engine = syncer();
        engine.handle(SyncEvent::Init(base_snapshot())).unwrap();

        engine
            .handle(SyncEvent::PlayerAction {
                actions: vec![Action::Navigate {
                    ship_id: ObjectId::new("s1"),
                    target: Vec2::new(200.0, 0.0),
                }],
                area: everything(),
                tag: Some("abc".into()),
            })
            .unwrap();

        let ship = engine.view().unwrap().find_ship(&ObjectId::new("s1")).unwrap();
        assert_eq!(ship.navigate_target, Some(Vec2::new(200.0, 0.0)));
        assert_eq!(engine.pending_actions(), 1);
    }

    #[test]
    fn test_confirmed_tag_leaves_ledger() {
        let mut engine = syncer();
        engine.handle(SyncEvent::Init(base_snapshot())).unwrap();
        engine
            .handle(SyncEvent::PlayerAction {
                actions: vec![Action::Navigate {
                    ship_id: ObjectId::new("s1"),
                    target: Vec2::new(200.0, 0.0),
                }],
                area: everything(),
                tag: Some("abc".into()),
            })
            .unwrap();

        let mut server = base_snapshot();
        server.processed_actions.push("abc".into());
        engine
            .handle(SyncEvent::ServerState {
                snapshot: server,
                area: everything(),
            })
            .unwrap();

        // The pack is gone and will not be replayed on the next update
        assert_eq!(engine.pending_actions(), 0);
    }

    #[test]
    fn test_expired_pack_triggers_full_resync() {
        let mut engine = syncer();
        engine.handle(SyncEvent::Init(base_snapshot())).unwrap();
        engine
            .handle(SyncEvent::PlayerAction {
                actions: vec![Action::Undock {
                    ship_id: ObjectId::new("s1"),
                }],
                area: everything(),
                tag: Some("lost".into()),
            })
            .unwrap();

        // The server never echoes the tag and its clock moves well past
        // the pending lifetime.
        let mut server = base_snapshot();
        server.ticks = 4 * TICKS_PER_SECOND;
        let outcome = engine
            .handle(SyncEvent::ServerState {
                snapshot: server.clone(),
                area: everything(),
            })
            .unwrap();

        assert_eq!(outcome, SyncOutcome::FullResync);
        assert_eq!(engine.pending_actions(), 0);
        assert_eq!(engine.view().unwrap().ticks, server.ticks);
        assert!(engine.is_converged());
    }

    #[test]
    fn test_foreign_world_id_reinitializes() {
        let mut engine = syncer();
        engine.handle(SyncEvent::Init(base_snapshot())).unwrap();
        engine
            .handle(SyncEvent::PlayerAction {
                actions: vec![Action::Undock {
                    ship_id: ObjectId::new("s1"),
                }],
                area: everything(),
                tag: Some("t1".into()),
            })
            .unwrap();

        let mut other = base_snapshot();
        other.id = "w2".into();
        let outcome = engine
            .handle(SyncEvent::ServerState {
                snapshot: other,
                area: everything(),
            })
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Synced);
        assert_eq!(engine.view().unwrap().id, "w2".into());
        // The old session's pending actions are gone
        assert_eq!(engine.pending_actions(), 0);
    }

    #[test]
    fn test_convergence_is_idempotent() {
        // An authoritative snapshot identical to the predicted one must
        // not change the predicted view beyond the step's own effect.
        let mut engine = syncer();
        let snap = base_snapshot();
        engine.handle(SyncEvent::Init(snap.clone())).unwrap();
        engine
            .handle(SyncEvent::ServerState {
                snapshot: snap.clone(),
                area: everything(),
            })
            .unwrap();

        let outcome = engine
            .handle(SyncEvent::TimeUpdate {
                elapsed_ticks: TICKS_PER_SECOND,
                area: everything(),
            })
            .unwrap();
        assert_eq!(outcome, SyncOutcome::Synced);

        let mut expected = snap;
        expected.clear_ephemeral();
        let expected = KinematicStep::default()
            .step(&expected, TICKS_PER_SECOND, &everything(), StepMode::Iterative)
            .unwrap();
        assert_eq!(engine.view().unwrap(), &expected);
    }

    #[test]
    fn test_divergence_heals_at_bounded_rate() {
        let mut engine = syncer();
        engine.handle(SyncEvent::Init(base_snapshot())).unwrap();

        let mut server = base_snapshot();
        server.locations[0].ships[0].spatial.position = Vec2::new(100.0, 12.0);
        let outcome = engine
            .handle(SyncEvent::ServerState {
                snapshot: server,
                area: everything(),
            })
            .unwrap();
        assert_eq!(outcome, SyncOutcome::Desynced { ticks: 0 });

        engine
            .handle(SyncEvent::TimeUpdate {
                elapsed_ticks: TICKS_PER_SECOND,
                area: everything(),
            })
            .unwrap();

        // ObjectJump was flagged and the correction was bounded: the ship
        // moved toward the authoritative position without snapping.
        let violations = engine.drain_violations();
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::ObjectJump { .. })));
        let ship = engine.view().unwrap().find_ship(&ObjectId::new("s1")).unwrap();
        assert!(ship.spatial.position.y > 0.0);
        assert!(ship.spatial.position.y < 12.0);
    }

    #[test]
    fn test_converged_views_collapse() {
        let mut engine = syncer();
        engine.handle(SyncEvent::Init(base_snapshot())).unwrap();

        // Tiny divergence, below every threshold
        let mut server = base_snapshot();
        server.locations[0].ships[0].spatial.position = Vec2::new(100.0, 0.5);
        engine
            .handle(SyncEvent::ServerState {
                snapshot: server,
                area: everything(),
            })
            .unwrap();
        assert!(!engine.is_converged());

        let outcome = engine
            .handle(SyncEvent::TimeUpdate {
                elapsed_ticks: TICKS_PER_SECOND,
                area: everything(),
            })
            .unwrap();
        assert_eq!(outcome, SyncOutcome::Synced);
        assert!(engine.is_converged());
    }

    #[test]
    fn test_shadow_tracks_authoritative_ship() {
        let mut engine = syncer();
        engine.handle(SyncEvent::Init(base_snapshot())).unwrap();
        assert!(engine.shadow().is_none());

        let mut server = base_snapshot();
        server.locations[0].ships[0].spatial.position = Vec2::new(100.0, 40.0);
        engine
            .handle(SyncEvent::ServerState {
                snapshot: server,
                area: everything(),
            })
            .unwrap();

        let shadow = engine.shadow().unwrap();
        assert_eq!(shadow.spatial.position, Vec2::new(100.0, 40.0));
        // The shadow is an overlay; the predicted snapshot still holds the
        // locally-predicted position.
        let ship = engine.view().unwrap().find_ship(&ObjectId::new("s1")).unwrap();
        assert_eq!(ship.spatial.position, Vec2::new(100.0, 0.0));
    }

    #[test]
    fn test_unconfirmed_action_rebased_onto_authoritative_timeline() {
        let mut engine = syncer();
        engine.handle(SyncEvent::Init(base_snapshot())).unwrap();

        // Server snapshot arrives without having seen the action
        engine
            .handle(SyncEvent::ServerState {
                snapshot: base_snapshot(),
                area: everything(),
            })
            .unwrap();
        engine
            .handle(SyncEvent::PlayerAction {
                actions: vec![Action::Navigate {
                    ship_id: ObjectId::new("s1"),
                    target: Vec2::new(100.0, 1000.0),
                }],
                area: everything(),
                tag: Some("abc".into()),
            })
            .unwrap();

        engine
            .handle(SyncEvent::TimeUpdate {
                elapsed_ticks: TICKS_PER_SECOND,
                area: everything(),
            })
            .unwrap();

        // Both timelines now include the navigation: the predicted ship
        // moved and no jump was flagged against the rebased server view.
        let ship = engine.view().unwrap().find_ship(&ObjectId::new("s1")).unwrap();
        assert!(ship.spatial.position.y > 0.0);
        let violations = engine.drain_violations();
        assert!(!violations
            .iter()
            .any(|v| matches!(v, Violation::ObjectJump { .. })));
    }

    #[test]
    fn test_stale_server_clock_surfaces_time_rollback() {
        let mut engine = syncer();
        engine.handle(SyncEvent::Init(base_snapshot())).unwrap();
        engine
            .handle(SyncEvent::TimeUpdate {
                elapsed_ticks: TICKS_PER_SECOND,
                area: everything(),
            })
            .unwrap();

        // The server snapshot's clock is behind the predicted one
        engine
            .handle(SyncEvent::ServerState {
                snapshot: base_snapshot(),
                area: everything(),
            })
            .unwrap();

        let violations = engine.drain_violations();
        assert!(violations.iter().any(|v| matches!(
            v,
            Violation::TimeRollback {
                predicted_tick: 1_000_000,
                authoritative_tick: 0,
            }
        )));
    }

    #[test]
    fn test_step_failure_keeps_authoritative_view() {
        init_logs();
        let mut engine = StateSyncer::new(FailingStep {
            inner: KinematicStep::default(),
            calls: Cell::new(0),
            // First call advances the predicted view, second catches the
            // authoritative one up.
            fail_on: 2,
        });
        engine.handle(SyncEvent::Init(base_snapshot())).unwrap();

        let mut server = base_snapshot();
        server.locations[0].ships[0].spatial.position = Vec2::new(100.0, 50.0);
        engine
            .handle(SyncEvent::ServerState {
                snapshot: server,
                area: everything(),
            })
            .unwrap();

        let result = engine.handle(SyncEvent::TimeUpdate {
            elapsed_ticks: TICKS_PER_SECOND,
            area: everything(),
        });
        assert!(result.is_err());

        // The authoritative timeline survives the failed update and the
        // divergence is still tracked.
        assert!(!engine.is_converged());
        let server = engine.authoritative().unwrap();
        let ship = server.find_ship(&ObjectId::new("s1")).unwrap();
        assert_eq!(ship.spatial.position, Vec2::new(100.0, 50.0));
    }
}
