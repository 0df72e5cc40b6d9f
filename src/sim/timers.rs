//! Countdowns and the round-scoped timer registry
//!
//! Timers never touch round state. When due, they come back out of the
//! registry as [`Fired`] records stamped with the epoch they were scheduled
//! in; the controller drops any record from an older epoch.

use serde::Serialize;

use super::state::{BlockId, GameOverReason};

/// Integer-millisecond countdown with an optional pause flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Countdown {
    start_ms: u32,
    remaining_ms: u32,
    paused: bool,
}

impl Countdown {
    pub fn new(start_ms: u32) -> Self {
        Self {
            start_ms,
            remaining_ms: start_ms,
            paused: false,
        }
    }

    /// Back to the starting budget (pause flag untouched)
    pub fn reset(&mut self) {
        self.remaining_ms = self.start_ms;
    }

    /// Step down by `step_ms`, clamping at zero.
    /// Returns true only on the tick that reaches zero.
    pub fn tick(&mut self, step_ms: u32) -> bool {
        if self.paused || self.remaining_ms == 0 {
            return false;
        }
        self.remaining_ms = self.remaining_ms.saturating_sub(step_ms);
        self.remaining_ms == 0
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn remaining_ms(&self) -> u32 {
        self.remaining_ms
    }

    pub fn seconds(&self) -> f32 {
        crate::ms_to_secs(self.remaining_ms)
    }

}

/// Registry-issued handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

/// Work a timer asks the controller to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    /// Round Timer cadence
    RoundTick,
    /// Block Timer Set cadence
    BlockTick,
    /// Feedback finished; drop the block from the collection
    RemoveBlock(BlockId),
    /// Hide the "+N" bonus notification
    ClearBonus,
    /// Terminal animation finished
    EndRound(GameOverReason),
}

/// A due timer, ready to be submitted as an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub handle: TimerHandle,
    pub epoch: u64,
    pub task: TimerTask,
}

#[derive(Debug, Clone)]
struct Entry {
    handle: TimerHandle,
    due_ms: u64,
    period_ms: Option<u32>,
    task: TimerTask,
}

/// Every pending interval and delay for the current round
#[derive(Debug, Clone, Default)]
pub struct TimerRegistry {
    epoch: u64,
    next_handle: u64,
    entries: Vec<Entry>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current epoch; bumped by every [`cancel_all`](Self::cancel_all)
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, due_ms: u64, period_ms: Option<u32>, task: TimerTask) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.push(Entry {
            handle,
            due_ms,
            period_ms,
            task,
        });
        handle
    }

    /// Fire once, `delay_ms` from `now_ms`
    pub fn schedule_once(&mut self, now_ms: u64, delay_ms: u32, task: TimerTask) -> TimerHandle {
        self.push(now_ms + delay_ms as u64, None, task)
    }

    /// Fire every `period_ms`, first at `now_ms + period_ms`
    pub fn schedule_every(&mut self, now_ms: u64, period_ms: u32, task: TimerTask) -> TimerHandle {
        let period_ms = period_ms.max(1);
        self.push(now_ms + period_ms as u64, Some(period_ms), task)
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.handle != handle);
        self.entries.len() != before
    }

    /// Cancel everything and start a new epoch. Returns how many were pending.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.entries.len();
        self.entries.clear();
        self.epoch += 1;
        cancelled
    }

    pub fn is_current(&self, fired: &Fired) -> bool {
        fired.epoch == self.epoch
    }

    /// Take the earliest timer due at or before `until_ms` (ties by handle).
    /// Intervals are re-armed one period later.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(u64, Fired)> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due_ms <= until_ms)
            .min_by_key(|(_, e)| (e.due_ms, e.handle))
            .map(|(i, _)| i)?;

        let due_ms = self.entries[idx].due_ms;
        let fired = Fired {
            handle: self.entries[idx].handle,
            epoch: self.epoch,
            task: self.entries[idx].task,
        };
        match self.entries[idx].period_ms {
            Some(period) => {
                let next = self.entries[idx].due_ms.saturating_add(period as u64);
                self.entries[idx].due_ms = next;
            }
            None => {
                self.entries.swap_remove(idx);
            }
        }
        Some((due_ms, fired))
    }
}
