//! Browser binding
//!
//! Exposes the round engine to a JavaScript renderer. JS drives `tick()`
//! from requestAnimationFrame, forwards pointer interactions, and reads
//! snapshots and effects back as JSON.

use glam::Vec2;
use wasm_bindgen::prelude::*;

use crate::highscores::{Leaderboard, ScoreService};
use crate::persistence::LocalStorageStore;
use crate::platform::{self, FrameClock, ViewportProvider, WindowViewport};
use crate::sim::{BlockId, Gesture, RoundController, Viewport};
use crate::tuning::Tuning;

/// Longest frame delta fed to the engine; a backgrounded tab resumes
/// instead of expiring everything at once
const MAX_FRAME_MS: f64 = 1_000.0;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if let Err(e) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::warn_1(&format!("Logger init failed: {}", e).into());
    }
    log::info!("Reflex Rush starting...");
}

#[wasm_bindgen]
pub struct WebGame {
    controller: RoundController,
    clock: FrameClock,
    leaderboard: Leaderboard,
}

#[wasm_bindgen]
impl WebGame {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WebGame {
        let seed = platform::time_seed();
        let mut controller = RoundController::new(Tuning::load(), Box::new(LocalStorageStore), seed);
        controller.set_viewport(WindowViewport.viewport());
        WebGame {
            controller,
            clock: FrameClock::new(MAX_FRAME_MS),
            leaderboard: Leaderboard::load(&LocalStorageStore),
        }
    }

    /// Advance by the wall-clock time since the last frame
    pub fn tick(&mut self, elapsed_ms: f64) {
        let whole_ms = self.clock.step(elapsed_ms);
        if whole_ms > 0 {
            self.controller.advance(whole_ms);
        }
    }

    /// Pointer down at (sx, sy), up at (ex, ey). Returns the gesture name.
    pub fn pointer(&mut self, block_id: u32, sx: f32, sy: f32, ex: f32, ey: f32) -> Option<String> {
        self.controller
            .pointer(BlockId(block_id), Vec2::new(sx, sy), Vec2::new(ex, ey))
            .map(|g| g.name().to_string())
    }

    /// Submit an already classified gesture. False for an unknown name.
    pub fn gesture(&mut self, block_id: u32, name: &str) -> bool {
        match Gesture::from_name(name) {
            Some(gesture) => {
                self.controller.gesture(BlockId(block_id), gesture);
                true
            }
            None => {
                log::warn!("Unknown gesture name: {}", name);
                false
            }
        }
    }

    pub fn restart(&mut self) {
        self.controller.restart();
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.controller
            .set_viewport(Some(Viewport::new(width, height)));
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.controller.set_round_paused(paused);
    }

    pub fn score(&self) -> u64 {
        self.controller.score()
    }

    pub fn is_game_over(&self) -> bool {
        self.controller.is_game_over()
    }

    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.controller.snapshot())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn drain_effects_json(&mut self) -> Result<String, JsValue> {
        serde_json::to_string(&self.controller.take_effects())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Record the finished round's score. Returns the player's rank.
    pub fn submit_score(&mut self, player_id: &str) -> Option<usize> {
        let rank = self
            .leaderboard
            .submit(player_id, self.controller.score())?;
        if let Err(e) = self.leaderboard.save(&mut LocalStorageStore) {
            log::warn!("Could not save leaderboard: {}", e);
        }
        Some(rank)
    }

    pub fn leaderboard_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.leaderboard.top()).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

impl Default for WebGame {
    fn default() -> Self {
        Self::new()
    }
}
