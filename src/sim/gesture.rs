//! Gesture classification
//!
//! Turns a pointer-down/pointer-up displacement into a discrete gesture.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::{BlockAction, BlockId};
use crate::tuning::GestureTuning;

/// Swipe direction in screen space (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SwipeDirection {
    Left,
    Right,
    Up,
    Down,
}

/// A classified player gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Gesture {
    /// Nothing usable (non-finite pointer coordinates)
    None,
    Tap,
    DoubleTap,
    Swipe(SwipeDirection),
}

impl Gesture {
    /// Whether this gesture resolves a block demanding `action`.
    /// Avoid is never satisfied by a gesture.
    pub fn satisfies(&self, action: BlockAction) -> bool {
        match (self, action) {
            (Gesture::Tap, BlockAction::Tap) => true,
            (Gesture::DoubleTap, BlockAction::DoubleTap) => true,
            (Gesture::Tap | Gesture::DoubleTap, a) if a.is_bonus() => true,
            (Gesture::Swipe(dir), a) => a.swipe_direction() == Some(*dir),
            _ => false,
        }
    }

    pub fn is_tap_class(&self) -> bool {
        matches!(self, Gesture::Tap | Gesture::DoubleTap)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Gesture::None => "none",
            Gesture::Tap => "tap",
            Gesture::DoubleTap => "doubleTap",
            Gesture::Swipe(SwipeDirection::Left) => "swipeLeft",
            Gesture::Swipe(SwipeDirection::Right) => "swipeRight",
            Gesture::Swipe(SwipeDirection::Up) => "swipeUp",
            Gesture::Swipe(SwipeDirection::Down) => "swipeDown",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tap" => Some(Gesture::Tap),
            "doubletap" | "double_tap" => Some(Gesture::DoubleTap),
            "swipeleft" | "swipe_left" | "left" => Some(Gesture::Swipe(SwipeDirection::Left)),
            "swiperight" | "swipe_right" | "right" => Some(Gesture::Swipe(SwipeDirection::Right)),
            "swipeup" | "swipe_up" | "up" => Some(Gesture::Swipe(SwipeDirection::Up)),
            "swipedown" | "swipe_down" | "down" => Some(Gesture::Swipe(SwipeDirection::Down)),
            _ => None,
        }
    }
}

/// Classify a single pointer interaction.
///
/// `since_last_tap_ms` is the time since the previous tap on the same block,
/// if any. A short interaction on a block that wants a double-tap becomes
/// `DoubleTap` when that previous tap is inside the window.
pub fn classify(
    start: Vec2,
    end: Vec2,
    since_last_tap_ms: Option<u64>,
    required: BlockAction,
    tuning: &GestureTuning,
) -> Gesture {
    let delta = end - start;
    if !delta.is_finite() {
        return Gesture::None;
    }

    if delta.length() < tuning.swipe_threshold_px {
        let within_window = since_last_tap_ms.is_some_and(|ms| ms <= tuning.double_tap_window_ms);
        return if within_window && required == BlockAction::DoubleTap {
            Gesture::DoubleTap
        } else {
            Gesture::Tap
        };
    }

    let direction = if delta.x.abs() > delta.y.abs() {
        if delta.x > 0.0 {
            SwipeDirection::Right
        } else {
            SwipeDirection::Left
        }
    } else if delta.y > 0.0 {
        SwipeDirection::Down
    } else {
        SwipeDirection::Up
    };
    Gesture::Swipe(direction)
}

/// Remembers the last tap instant per block (logical clock, ms)
#[derive(Debug, Clone, Default)]
pub struct TapTracker {
    last_tap: BTreeMap<BlockId, u64>,
}

impl TapTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Milliseconds since the last recorded tap on `block`
    pub fn since_last(&self, block: BlockId, now_ms: u64) -> Option<u64> {
        self.last_tap
            .get(&block)
            .map(|&t| now_ms.saturating_sub(t))
    }

    /// Record the outcome of a classification. A completed double-tap
    /// consumes the pending tap so a third tap starts over.
    pub fn observe(&mut self, block: BlockId, gesture: Gesture, now_ms: u64) {
        match gesture {
            Gesture::Tap => {
                self.last_tap.insert(block, now_ms);
            }
            Gesture::DoubleTap => {
                self.last_tap.remove(&block);
            }
            _ => {}
        }
    }

    pub fn forget(&mut self, block: BlockId) {
        self.last_tap.remove(&block);
    }

    pub fn clear(&mut self) {
        self.last_tap.clear();
    }
}
