//! Difficulty unlock gating.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::Difficulty;
use crate::session::LevelResult;

/// Accuracy required on a tier to unlock the next one.
pub const UNLOCK_RATIO: f64 = 0.70;

/// The difficulty tiers a profile may currently play for one game.
/// Always contains the easiest tier and only ever grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnlockSet {
    tiers: SmallVec<[Difficulty; 3]>,
}

impl Default for UnlockSet {
    fn default() -> Self {
        Self {
            tiers: SmallVec::from_slice(&[Difficulty::Easy]),
        }
    }
}

impl UnlockSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, tier: Difficulty) -> bool {
        self.tiers.contains(&tier)
    }

    /// A tier is locked simply by not being in the set.
    #[must_use]
    pub fn is_locked(&self, tier: Difficulty) -> bool {
        !self.contains(tier)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Tiers in ladder order.
    pub fn iter(&self) -> impl Iterator<Item = Difficulty> + '_ {
        self.tiers.iter().copied()
    }

    /// The hardest unlocked tier.
    #[must_use]
    pub fn highest(&self) -> Difficulty {
        self.tiers
            .iter()
            .copied()
            .max_by_key(|t| t.rank())
            .unwrap_or(Difficulty::Easy)
    }

    /// Add a tier if absent, keeping ladder order. Returns true when the set
    /// grew.
    pub fn insert(&mut self, tier: Difficulty) -> bool {
        if self.contains(tier) {
            return false;
        }
        self.tiers.push(tier);
        self.tiers.sort_by_key(|t| t.rank());
        true
    }

    /// Repair a freshly loaded set: dedupe, restore ladder order, and make
    /// sure the easiest tier is present. Corrupt stored data degrades to a
    /// valid set instead of failing the load.
    pub fn sanitize(&mut self) {
        self.tiers.sort_by_key(|t| t.rank());
        self.tiers.dedup();
        if !self.contains(Difficulty::Easy) {
            self.tiers.insert(0, Difficulty::Easy);
        }
    }

    /// Apply the unlock rule after finishing a tier: at [`UNLOCK_RATIO`]
    /// accuracy or better, the next tier (if any) joins the set. Returns the
    /// newly unlocked tier, or `None` when nothing changed. Poor results
    /// never remove anything.
    pub fn maybe_unlock_next(
        &mut self,
        finished: Difficulty,
        result: &LevelResult,
    ) -> Option<Difficulty> {
        if !result.completed || result.accuracy() < UNLOCK_RATIO {
            return None;
        }
        let next = finished.next()?;
        self.insert(next).then_some(next)
    }
}
