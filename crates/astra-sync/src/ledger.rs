//! Pending action ledger
//!
//! Records every player action applied locally but not yet acknowledged by
//! the server. Packs leave the ledger when the server echoes their
//! correlation tag, or by lifetime eviction when the server silently lost
//! them - the failure-recovery path that triggers a full resync.

use astra_world::Action;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// A batch of locally-applied, not-yet-confirmed actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingActionPack {
    /// The actions applied optimistically
    pub actions: Vec<Action>,
    /// Correlation tag echoed back by the server once processed
    pub tag: Option<String>,
    /// Predicted tick at which the actions were issued
    pub issued_at_tick: u64,
    /// Whether the server has acknowledged this pack
    pub server_acknowledged: bool,
}

impl PendingActionPack {
    /// Create a new unacknowledged pack
    pub fn new(actions: Vec<Action>, tag: Option<String>, issued_at_tick: u64) -> Self {
        Self {
            actions,
            tag,
            issued_at_tick,
            server_acknowledged: false,
        }
    }
}

/// Ledger of pending action packs, oldest first
#[derive(Debug, Default)]
pub struct ActionLedger {
    packs: VecDeque<PendingActionPack>,
}

impl ActionLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly-applied pack at the current predicted tick
    pub fn record(&mut self, actions: Vec<Action>, tag: Option<String>, issued_at_tick: u64) {
        self.packs
            .push_back(PendingActionPack::new(actions, tag, issued_at_tick));
    }

    /// Remove packs whose tag the server reports as processed
    ///
    /// Returns the number of packs confirmed.
    pub fn confirm(&mut self, processed: &HashSet<String>) -> usize {
        let before = self.packs.len();
        for pack in &mut self.packs {
            if let Some(tag) = &pack.tag {
                if processed.contains(tag) {
                    pack.server_acknowledged = true;
                }
            }
        }
        self.packs.retain(|pack| !pack.server_acknowledged);
        before - self.packs.len()
    }

    /// Evict packs older than the maximum pending lifetime
    ///
    /// Returns the evicted packs; any eviction means the server lost or
    /// never received an action and the caller must fully resync.
    pub fn evict_expired(&mut self, now_tick: u64, max_lifetime_ticks: u64) -> Vec<PendingActionPack> {
        let mut evicted = Vec::new();
        self.packs.retain(|pack| {
            let age = now_tick.saturating_sub(pack.issued_at_tick);
            if age > max_lifetime_ticks {
                warn!(
                    "evicting pending action pack (tag {:?}) aged {} ticks, past the {} tick lifetime",
                    pack.tag, age, max_lifetime_ticks
                );
                evicted.push(pack.clone());
                false
            } else {
                true
            }
        });
        evicted
    }

    /// Packs whose tag is not in the given processed set
    ///
    /// These are the actions to rebase onto the authoritative timeline.
    pub fn unconfirmed<'a>(
        &'a self,
        processed: &'a HashSet<String>,
    ) -> impl Iterator<Item = &'a PendingActionPack> {
        self.packs.iter().filter(move |pack| match &pack.tag {
            Some(tag) => !processed.contains(tag),
            None => true,
        })
    }

    /// Number of pending packs
    pub fn len(&self) -> usize {
        self.packs.len()
    }

    /// Check if the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    /// Drop all pending packs
    pub fn clear(&mut self) {
        self.packs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astra_world::{ObjectId, Vec2};

    fn pack_actions() -> Vec<Action> {
        vec![Action::Navigate {
            ship_id: ObjectId::new("s1"),
            target: Vec2::new(1.0, 1.0),
        }]
    }

    #[test]
    fn test_confirm_removes_processed_tags() {
        let mut ledger = ActionLedger::new();
        ledger.record(pack_actions(), Some("abc".into()), 10);
        ledger.record(pack_actions(), Some("def".into()), 11);

        let mut processed = HashSet::new();
        processed.insert("abc".to_string());

        assert_eq!(ledger.confirm(&processed), 1);
        assert_eq!(ledger.len(), 1);
        let remaining: Vec<_> = ledger.unconfirmed(&processed).collect();
        assert_eq!(remaining[0].tag.as_deref(), Some("def"));
    }

    #[test]
    fn test_untagged_packs_survive_confirm() {
        let mut ledger = ActionLedger::new();
        ledger.record(pack_actions(), None, 10);

        let mut processed = HashSet::new();
        processed.insert("abc".to_string());
        assert_eq!(ledger.confirm(&processed), 0);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_evict_expired() {
        let mut ledger = ActionLedger::new();
        ledger.record(pack_actions(), Some("old".into()), 0);
        ledger.record(pack_actions(), Some("new".into()), 900);

        let evicted = ledger.evict_expired(1000, 500);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].tag.as_deref(), Some("old"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_unconfirmed_filters_processed() {
        let mut ledger = ActionLedger::new();
        ledger.record(pack_actions(), Some("a".into()), 1);
        ledger.record(pack_actions(), None, 2);
        ledger.record(pack_actions(), Some("b".into()), 3);

        let mut processed = HashSet::new();
        processed.insert("a".to_string());

        let unconfirmed: Vec<_> = ledger.unconfirmed(&processed).collect();
        assert_eq!(unconfirmed.len(), 2);
        assert_eq!(unconfirmed[0].issued_at_tick, 2);
        assert_eq!(unconfirmed[1].issued_at_tick, 3);
    }
}
