//! Round state and core simulation types
//!
//! Everything the controller owns and everything the renderer is shown.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::gesture::SwipeDirection;
use super::scoring::BonusNotification;
use super::timers::Countdown;

/// Opaque block identifier, stable for the block's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a block demands from the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockAction {
    SwipeLeft,
    SwipeRight,
    SwipeUp,
    SwipeDown,
    Tap,
    DoubleTap,
    /// Correct play is to leave it alone until its timer runs out
    Avoid,
    /// Bonus: any tap grants points and a life
    ExtraLife,
    /// Bonus: any tap grants points
    Coins,
}

impl BlockAction {
    /// Full draw set for the batch generator
    pub const ALL: [Self; 9] = [
        Self::SwipeLeft,
        Self::SwipeRight,
        Self::SwipeUp,
        Self::SwipeDown,
        Self::Tap,
        Self::DoubleTap,
        Self::Avoid,
        Self::ExtraLife,
        Self::Coins,
    ];

    pub fn is_bonus(&self) -> bool {
        matches!(self, Self::ExtraLife | Self::Coins)
    }

    pub fn swipe_direction(&self) -> Option<SwipeDirection> {
        match self {
            Self::SwipeLeft => Some(SwipeDirection::Left),
            Self::SwipeRight => Some(SwipeDirection::Right),
            Self::SwipeUp => Some(SwipeDirection::Up),
            Self::SwipeDown => Some(SwipeDirection::Down),
            _ => None,
        }
    }

    /// Color hint passed along with shatter effects
    pub fn color_hint(&self) -> &'static str {
        match self {
            Self::SwipeLeft => "#FF6B6B",
            Self::SwipeRight => "#4ECDC4",
            Self::SwipeUp => "#45B7D1",
            Self::SwipeDown => "#96CEB4",
            Self::Tap => "#FFEEAD",
            Self::DoubleTap => "#FFD93D",
            Self::Avoid => "#000000",
            Self::ExtraLife => "#EF4444",
            Self::Coins => "#FCD34D",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SwipeLeft => "SWIPE_LEFT",
            Self::SwipeRight => "SWIPE_RIGHT",
            Self::SwipeUp => "SWIPE_UP",
            Self::SwipeDown => "SWIPE_DOWN",
            Self::Tap => "TAP",
            Self::DoubleTap => "DOUBLE_TAP",
            Self::Avoid => "AVOID",
            Self::ExtraLife => "EXTRA_LIFE",
            Self::Coins => "COINS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown block action: {0:?}")]
pub struct UnknownAction(pub String);

impl FromStr for BlockAction {
    type Err = UnknownAction;

    /// Case-insensitive `SCREAMING_SNAKE_CASE` name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

/// A unit of play
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub action: BlockAction,
    /// Top-left corner, fixed at creation
    pub position: Vec2,
    /// Tutorial blocks have no timer and score nothing
    pub is_tutorial: bool,
}

/// Round lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GamePhase {
    /// Onboarding, one block at a time (step 0..=2)
    Tutorial { step: u8 },
    /// Live play with both timers running
    Playing,
    /// Round ended; only restart is accepted
    GameOver,
}

/// Why a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GameOverReason {
    /// Round Timer hit zero with blocks left
    RoundTimeout,
    /// A non-Avoid block ran out of time
    BlockExpired { block_id: BlockId },
    /// The player interacted with an Avoid block
    AvoidTouched { block_id: BlockId },
    /// Mismatched gesture while wrong gestures are fatal
    WrongGesture { block_id: BlockId },
}

/// Declarative one-off effects for the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Effect {
    SwipeSuccess { block_id: BlockId, direction: SwipeDirection },
    TapSuccess { block_id: BlockId },
    /// Wrong gesture feedback; no state change
    Bounce { block_id: BlockId },
    AvoidSurvived { block_id: BlockId },
    Shatter { block_id: BlockId, color_hint: &'static str },
    BonusAwarded { points: u64 },
    BatchSpawned { count: usize },
    TutorialAdvanced { step: u8 },
    TutorialComplete,
    GameOver { reason: GameOverReason },
}

/// Authoritative round state, mutated only by the controller
#[derive(Debug, Clone)]
pub struct RoundState {
    pub phase: GamePhase,
    pub score: u64,
    pub lives: u32,
    pub round_timer: Countdown,
    /// One countdown per live, non-tutorial block
    pub block_timers: BTreeMap<BlockId, Countdown>,
    /// Active batch (sorted by id)
    pub blocks: Vec<Block>,
    /// Blocks mid-resolution; nothing may resolve them again
    pub processing: BTreeSet<BlockId>,
    /// Size of the active batch when it spawned
    pub batch_size: usize,
    pub game_over_reason: Option<GameOverReason>,
    pub bonus: BonusNotification,
    next_id: u32,
}

impl RoundState {
    pub fn new(phase: GamePhase, round_start_ms: u32) -> Self {
        Self {
            phase,
            score: 0,
            lives: 0,
            round_timer: Countdown::new(round_start_ms),
            block_timers: BTreeMap::new(),
            blocks: Vec::new(),
            processing: BTreeSet::new(),
            batch_size: 0,
            game_over_reason: None,
            bonus: BonusNotification::default(),
            next_id: 1,
        }
    }

    /// Fresh round; block IDs keep counting up
    pub fn reset(&mut self, phase: GamePhase, round_start_ms: u32) {
        let next_id = self.next_id;
        *self = Self::new(phase, round_start_ms);
        self.next_id = next_id;
    }

    /// Allocate a new block ID
    pub fn next_block_id(&mut self) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Remove a block and its timer. Returns false if it was already gone.
    pub fn remove_block(&mut self, id: BlockId) -> bool {
        let before = self.blocks.len();
        self.blocks.retain(|b| b.id != id);
        self.block_timers.remove(&id);
        self.processing.remove(&id);
        self.blocks.len() != before
    }
}

/// Renderer view of a single block
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockView {
    pub id: BlockId,
    pub required_action: BlockAction,
    pub position: Vec2,
    /// Seconds left on the block's own timer (None for tutorial or resolved blocks)
    pub remaining_time: Option<f32>,
    pub is_tutorial: bool,
    /// Block is mid-resolution (feedback animation playing)
    pub resolving: bool,
}

/// Immutable state snapshot handed to the rendering surface
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub revision: u64,
    pub phase: GamePhase,
    pub score: u64,
    pub lives: u32,
    /// Seconds left on the Round Timer
    pub round_timer: f32,
    pub blocks: Vec<BlockView>,
    pub block_size: Vec2,
    /// Block time (s) at or below which the renderer shows its expiry warning
    pub warning_time: f32,
    pub game_over: bool,
    pub game_over_reason: Option<GameOverReason>,
    pub bonus_notification: BonusNotification,
    pub tutorial_step: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_round_trip() {
        for action in BlockAction::ALL {
            assert_eq!(action.as_str().parse::<BlockAction>(), Ok(action));
        }
        assert_eq!(" double_tap ".parse::<BlockAction>(), Ok(BlockAction::DoubleTap));
        assert_eq!(
            "pinch".parse::<BlockAction>(),
            Err(UnknownAction("pinch".to_string()))
        );
    }

    #[test]
    fn test_action_serde_matches_names() {
        let json = serde_json::to_string(&BlockAction::ExtraLife).unwrap();
        assert_eq!(json, "\"EXTRA_LIFE\"");
    }

    #[test]
    fn test_remove_block_is_once() {
        let mut state = RoundState::new(GamePhase::Playing, 6_000);
        let id = state.next_block_id();
        state.blocks.push(Block {
            id,
            action: BlockAction::Tap,
            position: Vec2::ZERO,
            is_tutorial: false,
        });
        state.block_timers.insert(id, Countdown::new(6_000));
        state.processing.insert(id);

        assert!(state.remove_block(id));
        assert!(!state.remove_block(id));
        assert!(state.block_timers.is_empty());
        assert!(state.processing.is_empty());
    }

    #[test]
    fn test_effect_serializes_tagged() {
        let effect = Effect::Shatter {
            block_id: BlockId(7),
            color_hint: BlockAction::Avoid.color_hint(),
        };
        let json = serde_json::to_value(&effect).unwrap();
        assert_eq!(json["type"], "shatter");
        assert_eq!(json["blockId"], 7);
        assert_eq!(json["colorHint"], "#000000");
    }
}
