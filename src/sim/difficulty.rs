//! Difficulty model: cumulative score to batch size

use crate::tuning::{DifficultyStep, DifficultyTuning};

/// Ascending score thresholds, normalized so the block count never drops
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyTable {
    steps: Vec<DifficultyStep>,
}

impl DifficultyTable {
    pub fn new(tuning: &DifficultyTuning) -> Self {
        let mut steps = tuning.steps.clone();
        steps.sort_by_key(|s| s.min_score);
        if steps.first().is_none_or(|s| s.min_score > 0) {
            steps.insert(0, DifficultyStep { min_score: 0, blocks: 1 });
        }

        // Running maximum keeps the table monotonic even if tuned badly
        let mut floor = 1;
        for step in &mut steps {
            if step.blocks < floor {
                log::warn!(
                    "Difficulty step at {} lowers block count to {}, raising to {}",
                    step.min_score,
                    step.blocks,
                    floor
                );
            }
            step.blocks = step.blocks.max(floor);
            floor = step.blocks;
        }

        Self { steps }
    }

    /// Number of concurrently active blocks for a score
    pub fn block_count(&self, score: u64) -> usize {
        self.steps
            .iter()
            .rev()
            .find(|s| score >= s.min_score)
            .map(|s| s.blocks)
            .unwrap_or(1)
    }

    /// Highest tier's block count; time bonus only pays at this size
    pub fn max_count(&self) -> usize {
        self.steps.last().map(|s| s.blocks).unwrap_or(1)
    }
}

impl Default for DifficultyTable {
    fn default() -> Self {
        Self::new(&DifficultyTuning::default())
    }
}
