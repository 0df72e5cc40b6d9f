//! Deterministic round engine
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Logical clock only (advanced by the host in fixed ticks)
//! - Seeded RNG only
//! - Stable iteration order (by block ID)
//! - No rendering or platform dependencies

pub mod controller;
pub mod difficulty;
pub mod gesture;
pub mod layout;
pub mod scoring;
pub mod state;
pub mod timers;
pub mod tutorial;

pub use controller::{Intent, RenderSurface, RoundController};
pub use difficulty::DifficultyTable;
pub use gesture::{Gesture, SwipeDirection, TapTracker, classify};
pub use layout::{BlockGeometry, Viewport, block_positions};
pub use scoring::{BonusNotification, time_bonus};
pub use state::{
    Block, BlockAction, BlockId, BlockView, Effect, GameOverReason, GamePhase, Snapshot,
    UnknownAction,
};
pub use timers::{Countdown, Fired, TimerHandle, TimerRegistry, TimerTask};
pub use tutorial::{TUTORIAL_STEPS, TutorialProgress, TutorialSequencer};
