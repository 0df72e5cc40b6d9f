//! Reflex Rush - A timed-block reflex arcade game
//!
//! Core modules:
//! - `sim`: Deterministic round engine (gestures, timers, scoring, tutorial)
//! - `platform`: Browser/native platform abstraction
//! - `persistence`: Key-value storage for tutorial progress and scores
//! - `tuning`: Data-driven game balance
//! - `highscores`: Local leaderboard and player names

pub mod highscores;
pub mod persistence;
pub mod platform;
pub mod sim;
pub mod tuning;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use highscores::{Leaderboard, ScoreService};
pub use tuning::Tuning;

/// Game configuration constants (defaults for [`Tuning`])
pub mod consts {
    /// Timer cadence shared by the round clock and every block clock
    pub const TICK_MS: u32 = 100;

    /// Round Timer budget for each batch (6.0s)
    pub const ROUND_START_MS: u32 = 6_000;
    /// Per-block budget for every kind except Avoid
    pub const BLOCK_START_MS: u32 = 6_000;
    /// Avoid blocks must be left alone for this long
    pub const AVOID_START_MS: u32 = 1_500;
    /// Renderer shakes blocks at or below this remaining time
    pub const WARNING_MS: u32 = 1_500;

    /// Pointer travel below this is a tap
    pub const SWIPE_THRESHOLD_PX: f32 = 20.0;
    /// Two taps on the same block within this window make a double-tap
    pub const DOUBLE_TAP_WINDOW_MS: u64 = 300;

    /// Feedback delays before a resolved block leaves the collection
    pub const TAP_FEEDBACK_MS: u32 = 200;
    pub const SWIPE_FEEDBACK_MS: u32 = 500;
    pub const AVOID_CLEAR_DELAY_MS: u32 = 300;
    /// How long the "+N" bonus notification stays up
    pub const BONUS_VISIBLE_MS: u32 = 1_500;

    /// Points per correctly resolved block
    pub const BLOCK_POINTS: u64 = 10;
    /// Points for surviving an Avoid block
    pub const AVOID_POINTS: u64 = 5;

    /// Largest batch the layout must always fit
    pub const MAX_STACK: usize = 9;
    /// Block sizing (pixels)
    pub const BLOCK_HEIGHT: f32 = 80.0;
    pub const MAX_BLOCK_GAP: f32 = 20.0;
    pub const HEADER_HEIGHT: f32 = 64.0;
    pub const NARROW_BREAKPOINT: f32 = 768.0;
}

/// Convert integer milliseconds to displayed seconds
#[inline]
pub fn ms_to_secs(ms: u32) -> f32 {
    ms as f32 / 1000.0
}
