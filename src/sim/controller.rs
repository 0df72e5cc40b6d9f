//! Round lifecycle controller
//!
//! Owns the authoritative round state. Input handlers and timers only
//! submit [`Intent`]s; every state change happens in here, one intent at a
//! time, so no partial update can interleave with another.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::difficulty::DifficultyTable;
use super::gesture::{Gesture, TapTracker, classify};
use super::layout::{BlockGeometry, Viewport, block_positions};
use super::scoring::{BonusNotification, resolution_points, time_bonus};
use super::state::{
    Block, BlockAction, BlockId, BlockView, Effect, GameOverReason, GamePhase, RoundState,
    Snapshot,
};
use super::timers::{Countdown, Fired, TimerHandle, TimerRegistry, TimerTask};
use super::tutorial::{TutorialProgress, TutorialSequencer};
use crate::persistence::KeyValueStore;
use crate::tuning::Tuning;

/// Everything that can change round state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// A classified gesture on a block
    Gesture { block: BlockId, gesture: Gesture },
    /// Start over after game over
    Restart,
    /// A registry timer came due
    Timer(Fired),
}

/// Consumer of snapshots and effects (the renderer)
pub trait RenderSurface {
    fn present(&mut self, snapshot: &Snapshot);

    fn effect(&mut self, _effect: &Effect) {}
}

pub struct RoundController {
    tuning: Tuning,
    difficulty: DifficultyTable,
    store: Box<dyn KeyValueStore>,
    tutorial: TutorialSequencer,
    state: RoundState,
    timers: TimerRegistry,
    taps: TapTracker,
    rng: Pcg32,
    seed: u64,
    viewport: Option<Viewport>,
    geometry: BlockGeometry,
    /// Logical clock (ms since construction)
    now_ms: u64,
    /// Avoid touched, terminal animation playing
    frozen: bool,
    bonus_timer: Option<TimerHandle>,
    revision: u64,
    presented: Option<u64>,
    effects: Vec<Effect>,
}

impl RoundController {
    /// Read tutorial progress from `store` and start the first round
    pub fn new(tuning: Tuning, store: Box<dyn KeyValueStore>, seed: u64) -> Self {
        let mut tuning = tuning;
        tuning.normalize();
        let tutorial = TutorialSequencer::load(&*store);
        let difficulty = DifficultyTable::new(&tuning.difficulty);
        let geometry = BlockGeometry::for_viewport(None, &tuning.layout);
        let state = RoundState::new(GamePhase::Playing, tuning.timers.round_start_ms);

        let mut controller = Self {
            tuning,
            difficulty,
            store,
            tutorial,
            state,
            timers: TimerRegistry::new(),
            taps: TapTracker::new(),
            rng: Pcg32::seed_from_u64(seed),
            seed,
            viewport: None,
            geometry,
            now_ms: 0,
            frozen: false,
            bonus_timer: None,
            revision: 0,
            presented: None,
            effects: Vec::new(),
        };
        log::info!("Round controller created with seed: {}", seed);
        controller.start_round();
        controller
    }

    // === Public API ===

    /// Apply one intent. The only way round state changes.
    pub fn submit(&mut self, intent: Intent) {
        match intent {
            Intent::Gesture { block, gesture } => self.on_gesture(block, gesture),
            Intent::Restart => self.on_restart(),
            Intent::Timer(fired) => {
                if !self.timers.is_current(&fired) {
                    log::debug!(
                        "Dropping stale {:?} from epoch {} (now {})",
                        fired.task,
                        fired.epoch,
                        self.timers.epoch()
                    );
                    return;
                }
                self.on_timer(fired.task);
            }
        }
    }

    pub fn gesture(&mut self, block: BlockId, gesture: Gesture) {
        self.submit(Intent::Gesture { block, gesture });
    }

    pub fn restart(&mut self) {
        self.submit(Intent::Restart);
    }

    /// Classify a raw pointer interaction on `block` and submit it.
    /// Returns the classified gesture, or None if the block is gone.
    pub fn pointer(&mut self, block: BlockId, start: Vec2, end: Vec2) -> Option<Gesture> {
        let required = self.state.block(block)?.action;
        let since_last_tap = self.taps.since_last(block, self.now_ms);
        let gesture = classify(start, end, since_last_tap, required, &self.tuning.gesture);
        self.gesture(block, gesture);
        Some(gesture)
    }

    /// Advance the logical clock, firing due timers in order
    pub fn advance(&mut self, elapsed_ms: u64) {
        let target = self.now_ms.saturating_add(elapsed_ms);
        while let Some((due, fired)) = self.timers.pop_due(target) {
            self.now_ms = self.now_ms.max(due);
            self.submit(Intent::Timer(fired));
        }
        self.now_ms = target;
    }

    /// Viewport geometry changed (None while unknown)
    pub fn set_viewport(&mut self, viewport: Option<Viewport>) {
        if self.viewport == viewport {
            return;
        }
        self.viewport = viewport;
        self.geometry = BlockGeometry::for_viewport(viewport, &self.tuning.layout);
        self.touch();
    }

    /// Hold the Round Timer without resetting it
    pub fn set_round_paused(&mut self, paused: bool) {
        if self.state.round_timer.is_paused() != paused {
            self.state.round_timer.set_paused(paused);
            self.touch();
        }
    }

    /// Immutable view for the renderer
    pub fn snapshot(&self) -> Snapshot {
        let blocks = self
            .state
            .blocks
            .iter()
            .map(|b| BlockView {
                id: b.id,
                required_action: b.action,
                position: b.position,
                remaining_time: self.state.block_timers.get(&b.id).map(Countdown::seconds),
                is_tutorial: b.is_tutorial,
                resolving: self.state.processing.contains(&b.id),
            })
            .collect();

        Snapshot {
            revision: self.revision,
            phase: self.state.phase,
            score: self.state.score,
            lives: self.state.lives,
            round_timer: self.state.round_timer.seconds(),
            blocks,
            block_size: self.geometry.size,
            warning_time: crate::ms_to_secs(self.tuning.timers.warning_ms),
            game_over: self.state.is_game_over(),
            game_over_reason: self.state.game_over_reason,
            bonus_notification: self.state.bonus,
            tutorial_step: match self.state.phase {
                GamePhase::Tutorial { step } => Some(step),
                _ => None,
            },
        }
    }

    /// Present a snapshot if anything changed since the last flush, then
    /// hand over pending effects in order
    pub fn flush(&mut self, surface: &mut dyn RenderSurface) {
        if self.presented != Some(self.revision) {
            surface.present(&self.snapshot());
            self.presented = Some(self.revision);
        }
        for effect in self.effects.drain(..) {
            surface.effect(&effect);
        }
    }

    /// Pending effects, oldest first
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn score(&self) -> u64 {
        self.state.score
    }

    pub fn lives(&self) -> u32 {
        self.state.lives
    }

    pub fn is_game_over(&self) -> bool {
        self.state.is_game_over()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.state.blocks
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn tutorial(&self) -> &TutorialSequencer {
        &self.tutorial
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        &*self.store
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Timer epoch; firings from older epochs are ignored
    pub fn epoch(&self) -> u64 {
        self.timers.epoch()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // === Transitions ===

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn emit(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Enter the opening phase for the current tutorial progress
    fn start_round(&mut self) {
        match self.tutorial.step() {
            Some(step) => {
                self.state.phase = GamePhase::Tutorial { step };
                log::info!("Starting tutorial at step {}", step);
                self.spawn_tutorial_block();
            }
            None => self.enter_live(),
        }
    }

    fn enter_live(&mut self) {
        self.state.phase = GamePhase::Playing;
        self.state.round_timer.reset();
        let tick = self.tuning.timers.tick_ms;
        self.timers.schedule_every(self.now_ms, tick, TimerTask::RoundTick);
        self.timers.schedule_every(self.now_ms, tick, TimerTask::BlockTick);
        log::info!("Live play started");
        self.spawn_batch();
    }

    fn block_budget_ms(&self, action: BlockAction) -> u32 {
        match action {
            BlockAction::Avoid => self.tuning.timers.avoid_start_ms,
            _ => self.tuning.timers.block_start_ms,
        }
    }

    /// Spawn a live batch sized by the current score
    fn spawn_batch(&mut self) {
        let count = self.difficulty.block_count(self.state.score);
        let positions = block_positions(count, &self.geometry);

        for position in positions {
            let action = BlockAction::ALL[self.rng.random_range(0..BlockAction::ALL.len())];
            let id = self.state.next_block_id();
            self.state.blocks.push(Block {
                id,
                action,
                position,
                is_tutorial: false,
            });
            let budget = self.block_budget_ms(action);
            self.state.block_timers.insert(id, Countdown::new(budget));
        }

        self.state.batch_size = count;
        self.state.round_timer.reset();
        log::info!("Batch of {} spawned at score {}", count, self.state.score);
        self.emit(Effect::BatchSpawned { count });
        self.touch();
    }

    fn spawn_tutorial_block(&mut self) {
        let Some(action) = self.tutorial.current_action() else {
            return;
        };
        let position = block_positions(1, &self.geometry)
            .first()
            .copied()
            .unwrap_or(Vec2::ZERO);
        let id = self.state.next_block_id();
        self.state.blocks.push(Block {
            id,
            action,
            position,
            is_tutorial: true,
        });
        self.state.batch_size = 1;
        self.touch();
    }

    fn on_gesture(&mut self, id: BlockId, gesture: Gesture) {
        if self.state.is_game_over() || self.frozen || gesture == Gesture::None {
            return;
        }
        if self.state.processing.contains(&id) {
            return;
        }
        let Some(block) = self.state.block(id).cloned() else {
            return;
        };

        if block.action == BlockAction::Avoid {
            self.touch_avoid(&block);
            return;
        }

        // Taps on a double-tap block pair up here, whatever produced them
        let mut gesture = gesture;
        if gesture == Gesture::Tap && block.action == BlockAction::DoubleTap {
            let window = self.tuning.gesture.double_tap_window_ms;
            let paired = self
                .taps
                .since_last(id, self.now_ms)
                .is_some_and(|ms| ms <= window);
            if !paired {
                self.taps.observe(id, Gesture::Tap, self.now_ms);
                return;
            }
            gesture = Gesture::DoubleTap;
        }

        if gesture.satisfies(block.action) {
            self.resolve(&block, gesture);
        } else if self.tuning.wrong_gesture_fatal && !block.is_tutorial {
            self.end_round(GameOverReason::WrongGesture { block_id: id });
        } else {
            log::debug!("Wrong gesture {:?} on {} ({:?})", gesture, id, block.action);
            self.emit(Effect::Bounce { block_id: id });
        }
    }

    fn resolve(&mut self, block: &Block, gesture: Gesture) {
        let id = block.id;
        self.state.processing.insert(id);
        self.state.block_timers.remove(&id);
        self.taps.forget(id);

        let delay = match gesture {
            Gesture::Swipe(direction) => {
                self.emit(Effect::SwipeSuccess {
                    block_id: id,
                    direction,
                });
                self.tuning.timers.swipe_feedback_ms
            }
            _ => {
                self.emit(Effect::TapSuccess { block_id: id });
                self.tuning.timers.tap_feedback_ms
            }
        };

        if block.is_tutorial {
            match self.tutorial.advance(&mut *self.store) {
                TutorialProgress::Advanced { step } => {
                    log::info!("Tutorial advanced to step {}", step);
                    self.state.phase = GamePhase::Tutorial { step };
                    self.emit(Effect::TutorialAdvanced { step });
                }
                TutorialProgress::Completed => {
                    log::info!("Tutorial complete");
                    self.emit(Effect::TutorialComplete);
                }
                TutorialProgress::Inactive => {}
            }
        } else {
            self.state.score += resolution_points(block.action, &self.tuning.scoring);
            if block.action == BlockAction::ExtraLife {
                self.state.lives += 1;
            }
            log::debug!("Resolved {} ({:?}), score {}", id, block.action, self.state.score);
        }

        self.timers
            .schedule_once(self.now_ms, delay, TimerTask::RemoveBlock(id));
        self.touch();
    }

    fn touch_avoid(&mut self, block: &Block) {
        let id = block.id;
        self.state.processing.insert(id);
        self.emit(Effect::Shatter {
            block_id: id,
            color_hint: block.action.color_hint(),
        });

        let reason = GameOverReason::AvoidTouched { block_id: id };
        let delay = self.tuning.timers.avoid_fail_delay_ms;
        if delay == 0 {
            self.end_round(reason);
            return;
        }

        // Freeze everything while the terminal animation plays
        self.frozen = true;
        self.state.round_timer.set_paused(true);
        self.timers
            .schedule_once(self.now_ms, delay, TimerTask::EndRound(reason));
        self.touch();
    }

    fn on_timer(&mut self, task: TimerTask) {
        match task {
            TimerTask::RoundTick => self.tick_round(),
            TimerTask::BlockTick => self.tick_blocks(),
            TimerTask::RemoveBlock(id) => self.remove_block(id),
            TimerTask::ClearBonus => {
                self.bonus_timer = None;
                self.state.bonus = BonusNotification::default();
                self.touch();
            }
            TimerTask::EndRound(reason) => self.end_round(reason),
        }
    }

    fn tick_round(&mut self) {
        if self.state.phase != GamePhase::Playing || self.frozen {
            return;
        }
        if self.state.round_timer.is_paused() {
            return;
        }
        let expired = self.state.round_timer.tick(self.tuning.timers.tick_ms);
        self.touch();
        if expired {
            self.end_round(GameOverReason::RoundTimeout);
        }
    }

    fn tick_blocks(&mut self) {
        if self.state.phase != GamePhase::Playing || self.frozen {
            return;
        }
        let step = self.tuning.timers.tick_ms;
        let mut expired = Vec::new();
        for (id, timer) in self.state.block_timers.iter_mut() {
            if self.state.processing.contains(id) {
                continue;
            }
            if timer.tick(step) {
                expired.push(*id);
            }
        }
        if !self.state.block_timers.is_empty() {
            self.touch();
        }

        for id in expired {
            self.state.block_timers.remove(&id);
            let Some(action) = self.state.block(id).map(|b| b.action) else {
                continue;
            };
            if action == BlockAction::Avoid {
                self.state.processing.insert(id);
                self.state.score += self.tuning.scoring.avoid_points;
                log::debug!("Avoid {} survived, score {}", id, self.state.score);
                self.emit(Effect::AvoidSurvived { block_id: id });
                let delay = self.tuning.timers.avoid_clear_delay_ms;
                self.timers
                    .schedule_once(self.now_ms, delay, TimerTask::RemoveBlock(id));
            } else {
                log::debug!("Block {} ({:?}) expired", id, action);
                self.end_round(GameOverReason::BlockExpired { block_id: id });
                return;
            }
        }
    }

    /// Deferred removal after feedback; the block may already be gone
    fn remove_block(&mut self, id: BlockId) {
        if self.state.is_game_over() {
            return;
        }
        if !self.state.remove_block(id) {
            return;
        }
        self.taps.forget(id);
        self.touch();
        if self.state.blocks.is_empty() {
            self.on_batch_cleared();
        }
    }

    fn on_batch_cleared(&mut self) {
        match self.state.phase {
            GamePhase::Tutorial { .. } => match self.tutorial.step() {
                Some(step) => {
                    self.state.phase = GamePhase::Tutorial { step };
                    self.spawn_tutorial_block();
                }
                None => self.enter_live(),
            },
            GamePhase::Playing => {
                let bonus = time_bonus(
                    self.state.batch_size,
                    self.difficulty.max_count(),
                    self.state.round_timer.remaining_ms(),
                    &self.tuning.scoring.time_bonus,
                );
                if bonus > 0 {
                    self.award_bonus(bonus);
                }
                self.spawn_batch();
            }
            GamePhase::GameOver => {}
        }
    }

    fn award_bonus(&mut self, points: u64) {
        self.state.score += points;
        self.state.bonus = BonusNotification::show(points);
        log::info!("Time bonus +{} (score {})", points, self.state.score);
        self.emit(Effect::BonusAwarded { points });

        if let Some(handle) = self.bonus_timer.take() {
            self.timers.cancel(handle);
        }
        let visible = self.tuning.timers.bonus_visible_ms;
        self.bonus_timer = Some(
            self.timers
                .schedule_once(self.now_ms, visible, TimerTask::ClearBonus),
        );
    }

    fn end_round(&mut self, reason: GameOverReason) {
        if self.state.is_game_over() {
            return;
        }
        let cancelled = self.timers.cancel_all();
        self.bonus_timer = None;
        self.frozen = false;
        self.state.phase = GamePhase::GameOver;
        self.state.game_over_reason = Some(reason);
        self.state.bonus = BonusNotification::default();
        log::info!(
            "Game over ({:?}) with score {}, cancelled {} timers",
            reason,
            self.state.score,
            cancelled
        );
        self.emit(Effect::GameOver { reason });
        self.touch();
    }

    fn on_restart(&mut self) {
        if !self.state.is_game_over() {
            log::debug!("Ignoring restart while {:?}", self.state.phase);
            return;
        }
        self.timers.cancel_all();
        self.taps.clear();
        self.frozen = false;
        self.bonus_timer = None;
        self.tutorial.restart();
        self.state.reset(GamePhase::Playing, self.tuning.timers.round_start_ms);
        log::info!("Restarting round");
        self.start_round();
        self.touch();
    }
}

#[cfg(test)]
impl RoundController {
    /// Overwrite the current batch's actions (and their timers)
    pub(crate) fn force_actions(&mut self, actions: &[BlockAction]) {
        let ids: Vec<BlockId> = self.state.blocks.iter().map(|b| b.id).collect();
        for (id, &action) in ids.iter().zip(actions) {
            let budget = self.block_budget_ms(action);
            if let Some(block) = self.state.blocks.iter_mut().find(|b| b.id == *id) {
                block.action = action;
                if !block.is_tutorial {
                    self.state.block_timers.insert(*id, Countdown::new(budget));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryStore, TUTORIAL_COMPLETE_KEY, UnavailableStore};
    use crate::sim::gesture::SwipeDirection;

    fn veteran_store() -> Box<dyn KeyValueStore> {
        let mut store = MemoryStore::new();
        store.set_bool(TUTORIAL_COMPLETE_KEY, true).unwrap();
        Box::new(store)
    }

    fn live(tuning: Tuning) -> RoundController {
        RoundController::new(tuning, veteran_store(), 42)
    }

    fn only_block(c: &RoundController) -> BlockId {
        assert_eq!(c.blocks().len(), 1);
        c.blocks()[0].id
    }

    fn count_effects(effects: &[Effect], pred: impl Fn(&Effect) -> bool) -> usize {
        effects.iter().filter(|e| pred(*e)).count()
    }

    #[derive(Default)]
    struct RecordingSurface {
        snapshots: Vec<Snapshot>,
        effects: Vec<Effect>,
    }

    impl RenderSurface for RecordingSurface {
        fn present(&mut self, snapshot: &Snapshot) {
            self.snapshots.push(snapshot.clone());
        }

        fn effect(&mut self, effect: &Effect) {
            self.effects.push(effect.clone());
        }
    }

    #[test]
    fn test_first_session_starts_tutorial() {
        let mut c = RoundController::new(Tuning::default(), Box::new(MemoryStore::new()), 1);
        assert_eq!(c.phase(), GamePhase::Tutorial { step: 0 });
        let block = &c.blocks()[0];
        assert!(block.is_tutorial);
        assert_eq!(block.action, BlockAction::Tap);
        assert!(c.state().block_timers.is_empty());

        // No clocks run during the tutorial
        c.advance(20_000);
        assert!(!c.is_game_over());
        assert_eq!(c.snapshot().round_timer, 6.0);
    }

    #[test]
    fn test_tutorial_to_live() {
        let mut c = RoundController::new(Tuning::default(), Box::new(MemoryStore::new()), 1);

        let tap = only_block(&c);
        c.gesture(tap, Gesture::Tap);
        assert_eq!(c.score(), 0);
        c.advance(200);
        assert_eq!(c.phase(), GamePhase::Tutorial { step: 1 });

        let double = only_block(&c);
        assert_eq!(c.blocks()[0].action, BlockAction::DoubleTap);
        c.gesture(double, Gesture::Tap);
        assert_eq!(c.blocks().len(), 1);
        c.advance(150);
        c.gesture(double, Gesture::Tap);
        c.advance(200);
        assert_eq!(c.phase(), GamePhase::Tutorial { step: 2 });

        let swipe = only_block(&c);
        c.gesture(swipe, Gesture::Swipe(SwipeDirection::Right));
        assert_eq!(c.phase(), GamePhase::Tutorial { step: 2 });
        c.gesture(swipe, Gesture::Swipe(SwipeDirection::Left));
        assert_eq!(c.store().get_bool(TUTORIAL_COMPLETE_KEY).unwrap(), Some(true));
        c.advance(500);

        assert_eq!(c.phase(), GamePhase::Playing);
        assert_eq!(c.score(), 0);
        assert_eq!(c.snapshot().round_timer, 6.0);
        assert!(!c.blocks()[0].is_tutorial);
        assert!(c.tutorial().is_complete());
    }

    #[test]
    fn test_tap_scores_and_spawns_next_batch() {
        let mut c = live(Tuning::default());
        assert_eq!(c.phase(), GamePhase::Playing);
        c.force_actions(&[BlockAction::Tap]);
        let id = only_block(&c);

        c.gesture(id, Gesture::Tap);
        assert_eq!(c.score(), 10);
        c.advance(200);

        assert!(c.state().block(id).is_none());
        assert_eq!(c.blocks().len(), 1);
        assert_ne!(c.blocks()[0].id, id);
        assert_eq!(c.snapshot().round_timer, 6.0);
        assert!(!c.snapshot().bonus_notification.visible);
        let effects = c.take_effects();
        assert_eq!(count_effects(&effects, |e| matches!(e, Effect::BatchSpawned { .. })), 2);
    }

    #[test]
    fn test_duplicate_gesture_resolves_once() {
        let mut c = live(Tuning::default());
        c.force_actions(&[BlockAction::SwipeUp]);
        let id = only_block(&c);

        c.gesture(id, Gesture::Swipe(SwipeDirection::Up));
        c.gesture(id, Gesture::Swipe(SwipeDirection::Up));
        assert_eq!(c.score(), 10);
        assert!(c.snapshot().blocks[0].resolving);

        c.advance(500);
        c.gesture(id, Gesture::Swipe(SwipeDirection::Up));
        assert_eq!(c.score(), 10);
        let effects = c.take_effects();
        assert_eq!(count_effects(&effects, |e| matches!(e, Effect::SwipeSuccess { .. })), 1);
        assert_eq!(count_effects(&effects, |e| matches!(e, Effect::BatchSpawned { .. })), 2);
    }

    #[test]
    fn test_avoid_survived_by_expiry() {
        let mut c = live(Tuning::default());
        c.force_actions(&[BlockAction::Avoid]);
        let id = only_block(&c);

        c.advance(1_400);
        assert_eq!(c.score(), 0);
        c.advance(100);
        assert_eq!(c.score(), 5);
        assert!(c.state().processing.contains(&id));
        assert!(!c.state().block_timers.contains_key(&id));

        c.advance(300);
        assert!(c.state().block(id).is_none());
        assert!(!c.is_game_over());
        assert_eq!(c.blocks().len(), 1);
        assert_eq!(c.score(), 5);
    }

    #[test]
    fn test_touching_avoid_ends_round() {
        for gesture in [Gesture::Tap, Gesture::DoubleTap, Gesture::Swipe(SwipeDirection::Left)] {
            let mut c = live(Tuning::default());
            c.force_actions(&[BlockAction::Avoid]);
            let id = only_block(&c);

            c.gesture(id, gesture);
            assert!(c.is_game_over());
            assert_eq!(
                c.state().game_over_reason,
                Some(GameOverReason::AvoidTouched { block_id: id })
            );
            let effects = c.take_effects();
            assert!(effects.contains(&Effect::Shatter {
                block_id: id,
                color_hint: "#000000"
            }));
        }
    }

    #[test]
    fn test_avoid_fail_delay_freezes_then_ends() {
        let mut tuning = Tuning::default();
        tuning.timers.avoid_fail_delay_ms = 400;
        let mut c = live(tuning);
        c.force_actions(&[BlockAction::Avoid]);
        let id = only_block(&c);

        c.advance(100);
        c.gesture(id, Gesture::Tap);
        assert!(!c.is_game_over());
        c.advance(300);
        assert!(!c.is_game_over());
        assert_eq!(c.state().round_timer.remaining_ms(), 5_900);
        c.advance(100);
        assert!(c.is_game_over());
        assert_eq!(c.score(), 0);
    }

    #[test]
    fn test_round_timeout_and_stale_tick() {
        let mut c = live(Tuning::default());
        c.force_actions(&[BlockAction::Tap]);

        // A round tick captured while the round is live
        let mut shadow = c.timers.clone();
        let (_, stale) = shadow.pop_due(u64::MAX).unwrap();
        assert_eq!(stale.task, TimerTask::RoundTick);

        c.advance(5_900);
        assert!(!c.is_game_over());
        c.advance(100);
        assert!(c.is_game_over());
        assert_eq!(c.state().game_over_reason, Some(GameOverReason::RoundTimeout));
        assert_eq!(c.snapshot().round_timer, 0.0);
        assert!(c.timers.is_empty());

        let before = c.snapshot();
        c.submit(Intent::Timer(stale));
        c.advance(10_000);
        assert_eq!(c.snapshot(), before);
    }

    #[test]
    fn test_block_expiry_ends_round() {
        let mut tuning = Tuning::default();
        tuning.timers.round_start_ms = 10_000;
        let mut c = live(tuning);
        c.force_actions(&[BlockAction::SwipeDown]);
        let id = only_block(&c);

        c.advance(6_000);
        assert!(c.is_game_over());
        assert_eq!(
            c.state().game_over_reason,
            Some(GameOverReason::BlockExpired { block_id: id })
        );
        assert_eq!(c.state().round_timer.remaining_ms(), 4_000);
    }

    #[test]
    fn test_full_batch_bonus_uses_spawn_size() {
        let mut c = live(Tuning::default());
        c.force_actions(&[BlockAction::Tap]);
        c.state.score = 1_000;
        let first = only_block(&c);
        c.gesture(first, Gesture::Tap);
        c.advance(200);

        assert_eq!(c.blocks().len(), 9);
        assert_eq!(c.state().batch_size, 9);
        c.force_actions(&[BlockAction::Tap; 9]);
        let ids: Vec<BlockId> = c.blocks().iter().map(|b| b.id).collect();
        for id in ids {
            c.gesture(id, Gesture::Tap);
        }
        assert_eq!(c.score(), 1_100);

        c.advance(200);
        // 5.8s left at clear: top tier
        assert_eq!(c.score(), 1_150);
        let notice = c.snapshot().bonus_notification;
        assert!(notice.visible);
        assert_eq!(notice.points, 50);
        assert_eq!(c.blocks().len(), 9);

        c.advance(1_500);
        assert!(!c.snapshot().bonus_notification.visible);
    }

    #[test]
    fn test_extra_life_and_coins() {
        let mut c = live(Tuning::default());
        c.force_actions(&[BlockAction::ExtraLife]);
        let id = only_block(&c);
        c.gesture(id, Gesture::Tap);
        assert_eq!(c.lives(), 1);
        assert_eq!(c.score(), 10);

        c.advance(200);
        c.force_actions(&[BlockAction::Coins]);
        let id = only_block(&c);
        c.gesture(id, Gesture::DoubleTap);
        assert_eq!(c.lives(), 1);
        assert_eq!(c.score(), 20);
    }

    #[test]
    fn test_wrong_gesture_bounces() {
        let mut c = live(Tuning::default());
        c.force_actions(&[BlockAction::SwipeUp]);
        let id = only_block(&c);

        c.gesture(id, Gesture::Swipe(SwipeDirection::Down));
        assert!(!c.is_game_over());
        assert_eq!(c.score(), 0);
        assert!(c.take_effects().contains(&Effect::Bounce { block_id: id }));

        // Still resolvable afterwards
        c.gesture(id, Gesture::Swipe(SwipeDirection::Up));
        assert_eq!(c.score(), 10);
    }

    #[test]
    fn test_wrong_gesture_fatal_when_tuned() {
        let mut tuning = Tuning::default();
        tuning.wrong_gesture_fatal = true;
        let mut c = live(tuning);
        c.force_actions(&[BlockAction::SwipeUp]);
        let id = only_block(&c);

        c.gesture(id, Gesture::Tap);
        assert_eq!(
            c.state().game_over_reason,
            Some(GameOverReason::WrongGesture { block_id: id })
        );
    }

    #[test]
    fn test_first_tap_of_double_is_not_wrong() {
        let mut tuning = Tuning::default();
        tuning.wrong_gesture_fatal = true;
        let mut c = live(tuning);
        c.force_actions(&[BlockAction::DoubleTap]);
        let id = only_block(&c);

        c.gesture(id, Gesture::Tap);
        assert!(!c.is_game_over());
        assert_eq!(c.score(), 0);
    }

    #[test]
    fn test_pointer_double_tap_window() {
        let mut c = live(Tuning::default());
        c.force_actions(&[BlockAction::DoubleTap]);
        let id = only_block(&c);
        let p = Vec2::new(100.0, 100.0);

        assert_eq!(c.pointer(id, p, p), Some(Gesture::Tap));
        c.advance(400);
        assert_eq!(c.pointer(id, p, p + Vec2::new(3.0, 2.0)), Some(Gesture::Tap));
        assert_eq!(c.score(), 0);
        c.advance(250);
        assert_eq!(c.pointer(id, p, p), Some(Gesture::DoubleTap));
        assert_eq!(c.score(), 10);
        assert_eq!(c.pointer(BlockId(9_999), p, p), None);
    }

    #[test]
    fn test_pointer_swipe() {
        let mut c = live(Tuning::default());
        c.force_actions(&[BlockAction::SwipeLeft]);
        let id = only_block(&c);
        let g = c.pointer(id, Vec2::new(300.0, 200.0), Vec2::new(200.0, 210.0));
        assert_eq!(g, Some(Gesture::Swipe(SwipeDirection::Left)));
        assert_eq!(c.score(), 10);
    }

    #[test]
    fn test_input_after_game_over_ignored() {
        let mut c = live(Tuning::default());
        c.force_actions(&[BlockAction::Avoid]);
        let id = only_block(&c);
        c.gesture(id, Gesture::Tap);
        assert!(c.is_game_over());

        let before = c.snapshot();
        c.gesture(id, Gesture::Tap);
        c.gesture(BlockId(12_345), Gesture::Tap);
        c.advance(5_000);
        assert_eq!(c.snapshot(), before);
    }

    #[test]
    fn test_restart_resets_round() {
        let mut c = live(Tuning::default());
        c.force_actions(&[BlockAction::ExtraLife]);
        let id = only_block(&c);
        c.gesture(id, Gesture::Tap);
        c.advance(200);
        c.force_actions(&[BlockAction::Tap]);
        c.advance(6_000);
        assert!(c.is_game_over());
        assert_eq!(c.score(), 10);

        c.restart();
        assert!(!c.is_game_over());
        assert_eq!(c.phase(), GamePhase::Playing);
        assert_eq!(c.score(), 0);
        assert_eq!(c.lives(), 0);
        assert_eq!(c.snapshot().round_timer, 6.0);
        assert_eq!(c.blocks().len(), 1);
        // Ids keep growing across rounds
        assert!(c.blocks()[0].id > id);

        // Timers run again in the new epoch
        c.advance(100);
        assert_eq!(c.state().round_timer.remaining_ms(), 5_900);
    }

    #[test]
    fn test_restart_ignored_while_live() {
        let mut c = live(Tuning::default());
        let id = only_block(&c);
        c.restart();
        assert_eq!(only_block(&c), id);
    }

    #[test]
    fn test_restart_returns_to_tutorial_if_never_completed() {
        let mut c = RoundController::new(Tuning::default(), Box::new(MemoryStore::new()), 5);
        // Nothing ends a tutorial round, so end it through the timer path
        c.end_round(GameOverReason::RoundTimeout);
        c.restart();
        assert_eq!(c.phase(), GamePhase::Tutorial { step: 0 });
        assert!(c.blocks()[0].is_tutorial);
    }

    #[test]
    fn test_unavailable_store_plays_tutorial() {
        let c = RoundController::new(Tuning::default(), Box::new(UnavailableStore), 5);
        assert_eq!(c.phase(), GamePhase::Tutorial { step: 0 });
    }

    #[test]
    fn test_viewport_geometry() {
        let mut c = live(Tuning::default());
        assert_eq!(c.snapshot().block_size, Vec2::ZERO);
        assert_eq!(c.blocks()[0].position, Vec2::ZERO);

        c.set_viewport(Some(Viewport::new(400.0, 800.0)));
        assert_eq!(c.snapshot().block_size, Vec2::new(360.0, 80.0));

        c.force_actions(&[BlockAction::Tap]);
        let id = only_block(&c);
        c.gesture(id, Gesture::Tap);
        c.advance(200);
        let position = c.blocks()[0].position;
        assert_eq!(position.x, 20.0);
        assert!(position.y > 64.0);
    }

    #[test]
    fn test_round_pause_holds_timer() {
        let mut c = live(Tuning::default());
        c.force_actions(&[BlockAction::Tap]);
        c.advance(1_000);
        c.set_round_paused(true);
        c.advance(1_000);
        assert_eq!(c.state().round_timer.remaining_ms(), 5_000);
        c.set_round_paused(false);
        c.advance(100);
        assert_eq!(c.state().round_timer.remaining_ms(), 4_900);
    }

    #[test]
    fn test_flush_presents_only_changes() {
        let mut c = live(Tuning::default());
        let mut surface = RecordingSurface::default();
        c.flush(&mut surface);
        c.flush(&mut surface);
        assert_eq!(surface.snapshots.len(), 1);
        assert_eq!(surface.snapshots[0].warning_time, 1.5);
        assert_eq!(surface.effects, vec![Effect::BatchSpawned { count: 1 }]);

        c.advance(100);
        c.flush(&mut surface);
        assert_eq!(surface.snapshots.len(), 2);
        assert_eq!(surface.snapshots[1].round_timer, 5.9);
    }

    #[test]
    fn test_snapshot_carries_tuned_warning() {
        let mut tuning = Tuning::default();
        tuning.timers.warning_ms = 2_500;
        let c = live(tuning);
        let snapshot = c.snapshot();
        assert_eq!(snapshot.warning_time, 2.5);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["warningTime"], 2.5);
    }

    #[test]
    fn test_huge_advance_saturates() {
        let mut c = live(Tuning::default());
        c.force_actions(&[BlockAction::Tap]);
        c.advance(u64::MAX);
        assert!(c.is_game_over());
        assert_eq!(c.now_ms(), u64::MAX);
        c.advance(1_000);
        assert_eq!(c.now_ms(), u64::MAX);
    }

    #[test]
    fn test_same_seed_same_batches() {
        let a = live(Tuning::default());
        let b = live(Tuning::default());
        assert_eq!(a.blocks()[0].action, b.blocks()[0].action);
        assert_eq!(a.seed(), 42);
    }
}
