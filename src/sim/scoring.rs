//! Scoring and end-of-batch time bonus

use serde::Serialize;

use super::state::BlockAction;
use crate::tuning::{BonusTier, ScoringTuning};

/// Transient "+N" notification shown after a bonus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BonusNotification {
    pub points: u64,
    pub visible: bool,
}

impl BonusNotification {
    pub fn show(points: u64) -> Self {
        Self {
            points,
            visible: true,
        }
    }
}

/// Points for resolving a block with a matching gesture
pub fn resolution_points(action: BlockAction, tuning: &ScoringTuning) -> u64 {
    match action {
        // Avoid pays on survival, never on interaction
        BlockAction::Avoid => 0,
        _ => tuning.block_points,
    }
}

/// One-time bonus for clearing a whole batch.
///
/// Only batches that spawned at the top difficulty tier qualify; the payout
/// is the first tier whose threshold the remaining round time meets.
pub fn time_bonus(batch_size: usize, max_batch: usize, remaining_ms: u32, tiers: &[BonusTier]) -> u64 {
    if batch_size < max_batch {
        return 0;
    }
    tiers
        .iter()
        .find(|t| remaining_ms >= t.min_remaining_ms)
        .map(|t| t.points)
        .unwrap_or(0)
}
