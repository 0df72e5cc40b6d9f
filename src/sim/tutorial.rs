//! Tutorial sequencer
//!
//! Single source of truth for onboarding progress. Other components ask it
//! whether the tutorial is active; nothing else reads the stored flag.

use super::state::BlockAction;
use crate::persistence::{KeyValueStore, TUTORIAL_COMPLETE_KEY};

/// Onboarding steps, one block each
pub const TUTORIAL_STEPS: [BlockAction; 3] =
    [BlockAction::Tap, BlockAction::DoubleTap, BlockAction::SwipeLeft];

/// Result of resolving the current tutorial block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TutorialProgress {
    /// Moved on to `step`
    Advanced { step: u8 },
    /// Final step done; flag persisted
    Completed,
    /// Tutorial was not active
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorialSequencer {
    complete: bool,
    step: u8,
}

impl TutorialSequencer {
    /// Read the persisted flag. Any storage failure means "not complete".
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let complete = match store.get_bool(TUTORIAL_COMPLETE_KEY) {
            Ok(flag) => flag.unwrap_or(false),
            Err(e) => {
                log::warn!("Tutorial flag unavailable, starting tutorial: {}", e);
                false
            }
        };
        Self { complete, step: 0 }
    }

    pub fn is_active(&self) -> bool {
        !self.complete
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Current step while active
    pub fn step(&self) -> Option<u8> {
        self.is_active().then_some(self.step)
    }

    /// Action the current tutorial block demands
    pub fn current_action(&self) -> Option<BlockAction> {
        self.step().map(|s| TUTORIAL_STEPS[s as usize])
    }

    /// Step forward after the current block was resolved correctly.
    /// Completing the last step writes the flag once; a failed write is
    /// logged and completion still holds for this session.
    pub fn advance(&mut self, store: &mut dyn KeyValueStore) -> TutorialProgress {
        if self.complete {
            return TutorialProgress::Inactive;
        }

        let next = self.step + 1;
        if (next as usize) < TUTORIAL_STEPS.len() {
            self.step = next;
            return TutorialProgress::Advanced { step: next };
        }

        self.complete = true;
        self.step = 0;
        if let Err(e) = store.set_bool(TUTORIAL_COMPLETE_KEY, true) {
            log::warn!("Could not persist tutorial completion: {}", e);
        }
        TutorialProgress::Completed
    }

    /// Back to the first step on restart (no-op once complete)
    pub fn restart(&mut self) {
        if !self.complete {
            self.step = 0;
        }
    }
}
