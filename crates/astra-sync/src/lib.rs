//! Astra Sync - predictive state reconciliation
//!
//! This crate keeps a locally-predicted world snapshot smoothly converging
//! to the periodically-received authoritative one while the player keeps
//! acting without visible stutter:
//!
//! - **Prediction**: player actions apply locally before server confirmation
//! - **Ledger**: unconfirmed actions are tracked and rebased onto the
//!   authoritative timeline until the server echoes their tag
//! - **Policy merge**: every snapshot field converges by a declared
//!   strategy (client wins, server wins, merge by identity, or invalidate
//!   on identity change)
//! - **Violations**: teleports, rotation jumps, and time rollbacks between
//!   the two views are detected against per-tick drift tolerances
//! - **Correction**: flagged divergence heals at a bounded rate instead of
//!   snapping; off-screen objects snap since popping is imperceptible
//!
//! # Architecture
//!
//! ```text
//!            TimeUpdate / ServerState / PlayerAction / Init
//!                              │
//!                              ▼
//!                      ┌──────────────┐
//!                      │  StateSyncer │
//!                      └──────────────┘
//!                       │     │      │
//!            ┌──────────┘     │      └──────────┐
//!            ▼                ▼                 ▼
//!     ┌────────────┐  ┌─────────────┐  ┌──────────────────┐
//!     │   Ledger   │  │ PolicyTable │  │ Violations +      │
//!     │  (replay)  │  │   (merge)   │  │ bounded correction│
//!     └────────────┘  └─────────────┘  └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use astra_sync::{StateSyncer, SyncEvent};
//! use astra_world::KinematicStep;
//!
//! let mut syncer = StateSyncer::new(KinematicStep::default());
//! syncer.handle(SyncEvent::Init(initial_snapshot))?;
//!
//! // Driving loop, once per rendered frame
//! loop {
//!     syncer.handle(SyncEvent::TimeUpdate { elapsed_ticks, area })?;
//!     if let Some(snapshot) = receive_server_snapshot() {
//!         syncer.handle(SyncEvent::ServerState { snapshot, area })?;
//!     }
//!     render(syncer.view());
//! }
//! ```

mod config;
mod correction;
mod engine;
mod error;
mod ledger;
mod merge;
mod policy;
mod violation;

pub use config::SyncConfig;
pub use engine::{StateSyncer, SyncEvent, SyncOutcome};
pub use error::{Result, SyncError};
pub use ledger::{ActionLedger, PendingActionPack};
pub use merge::{merge_by_id, reconcile};
pub use policy::{PolicyTable, SnapshotField, Strategy};
pub use violation::{detect, Violation};

// Re-export the step contract for convenience
pub use astra_world::{StepMode, WorldStep};
