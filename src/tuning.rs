//! Data-driven game balance
//!
//! Every number the round engine uses lives here. Loaded from JSON so a
//! partial document only overrides the fields it names.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Gesture classifier thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureTuning {
    /// Pointer travel (px) at or above which an interaction is a swipe
    pub swipe_threshold_px: f32,
    /// Max gap between two taps that still counts as a double-tap
    pub double_tap_window_ms: u64,
}

impl Default for GestureTuning {
    fn default() -> Self {
        Self {
            swipe_threshold_px: SWIPE_THRESHOLD_PX,
            double_tap_window_ms: DOUBLE_TAP_WINDOW_MS,
        }
    }
}

/// Timer budgets and feedback delays (all milliseconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerTuning {
    pub tick_ms: u32,
    pub round_start_ms: u32,
    pub block_start_ms: u32,
    pub avoid_start_ms: u32,
    /// Exposed to the renderer for its "about to expire" cue
    pub warning_ms: u32,
    pub tap_feedback_ms: u32,
    pub swipe_feedback_ms: u32,
    pub avoid_clear_delay_ms: u32,
    pub bonus_visible_ms: u32,
    /// Terminal animation before an Avoid touch ends the round (0 = immediate)
    pub avoid_fail_delay_ms: u32,
}

impl Default for TimerTuning {
    fn default() -> Self {
        Self {
            tick_ms: TICK_MS,
            round_start_ms: ROUND_START_MS,
            block_start_ms: BLOCK_START_MS,
            avoid_start_ms: AVOID_START_MS,
            warning_ms: WARNING_MS,
            tap_feedback_ms: TAP_FEEDBACK_MS,
            swipe_feedback_ms: SWIPE_FEEDBACK_MS,
            avoid_clear_delay_ms: AVOID_CLEAR_DELAY_MS,
            bonus_visible_ms: BONUS_VISIBLE_MS,
            avoid_fail_delay_ms: 0,
        }
    }
}

/// One time-bonus tier: at least `min_remaining_ms` on the round clock pays `points`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusTier {
    pub min_remaining_ms: u32,
    pub points: u64,
}

/// Points awarded by the scoring engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringTuning {
    pub block_points: u64,
    pub avoid_points: u64,
    /// Checked best-first; sorted descending on load
    pub time_bonus: Vec<BonusTier>,
}

impl Default for ScoringTuning {
    fn default() -> Self {
        Self {
            block_points: BLOCK_POINTS,
            avoid_points: AVOID_POINTS,
            time_bonus: vec![
                BonusTier { min_remaining_ms: 3_500, points: 50 },
                BonusTier { min_remaining_ms: 2_500, points: 30 },
                BonusTier { min_remaining_ms: 1_500, points: 10 },
            ],
        }
    }
}

/// Difficulty step: a score of at least `min_score` spawns `blocks` per batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyStep {
    pub min_score: u64,
    pub blocks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyTuning {
    pub steps: Vec<DifficultyStep>,
}

impl Default for DifficultyTuning {
    fn default() -> Self {
        let steps = [
            (0, 1),
            (100, 2),
            (250, 3),
            (400, 4),
            (500, 5),
            (600, 6),
            (750, 7),
            (1_000, 9),
        ]
        .into_iter()
        .map(|(min_score, blocks)| DifficultyStep { min_score, blocks })
        .collect();
        Self { steps }
    }
}

/// Block sizing relative to the viewport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutTuning {
    pub block_height: f32,
    pub max_gap: f32,
    /// Space reserved at the top for the score/lives/timer header
    pub header_height: f32,
    pub narrow_breakpoint: f32,
    pub narrow_width_ratio: f32,
    pub wide_width_ratio: f32,
    /// Largest stack that must always fit
    pub max_stack: usize,
}

impl Default for LayoutTuning {
    fn default() -> Self {
        Self {
            block_height: BLOCK_HEIGHT,
            max_gap: MAX_BLOCK_GAP,
            header_height: HEADER_HEIGHT,
            narrow_breakpoint: NARROW_BREAKPOINT,
            narrow_width_ratio: 0.9,
            wide_width_ratio: 0.4,
            max_stack: MAX_STACK,
        }
    }
}

/// Complete tuning set
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub gesture: GestureTuning,
    pub timers: TimerTuning,
    pub scoring: ScoringTuning,
    pub difficulty: DifficultyTuning,
    pub layout: LayoutTuning,
    /// A mismatched gesture on a non-Avoid block ends the round
    pub wrong_gesture_fatal: bool,
}

impl Tuning {
    /// Environment variable naming a JSON tuning file (native)
    pub const ENV_PATH: &'static str = "REFLEX_RUSH_TUNING";
    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "reflex_rush_tuning";

    /// Parse a (possibly partial) JSON document and normalize it
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut tuning: Tuning = serde_json::from_str(json)?;
        tuning.normalize();
        Ok(tuning)
    }

    /// Repair values the engine cannot run with
    pub fn normalize(&mut self) {
        if self.timers.tick_ms == 0 {
            log::warn!("tick_ms of 0 is invalid, using {}", TICK_MS);
            self.timers.tick_ms = TICK_MS;
        }
        if self.layout.max_stack == 0 {
            self.layout.max_stack = MAX_STACK;
        }
        // The layout only guarantees room for max_stack blocks
        let max_stack = self.layout.max_stack;
        for step in &mut self.difficulty.steps {
            if step.blocks > max_stack {
                log::warn!(
                    "Difficulty step at score {} asks for {} blocks, capping at {}",
                    step.min_score,
                    step.blocks,
                    max_stack
                );
                step.blocks = max_stack;
            }
        }
        self.scoring
            .time_bonus
            .sort_by(|a, b| b.min_remaining_ms.cmp(&a.min_remaining_ms));
    }

    /// Load tuning from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(tuning) => {
                        log::info!("Loaded tuning from LocalStorage");
                        return tuning;
                    }
                    Err(e) => log::warn!("Ignoring invalid tuning: {}", e),
                }
            }
        }

        Self::default()
    }

    /// Load tuning from the file named by `REFLEX_RUSH_TUNING`, if set
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        let Ok(path) = std::env::var(Self::ENV_PATH) else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(tuning) => {
                    log::info!("Loaded tuning from {}", path);
                    tuning
                }
                Err(e) => {
                    log::warn!("Ignoring invalid tuning in {}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Cannot read tuning file {}: {}", path, e);
                Self::default()
            }
        }
    }
}
