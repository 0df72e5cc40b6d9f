//! Reflex Rush entry point
//!
//! Native builds run a headless autoplay demo: a bot with human-ish reaction
//! times plays a few rounds against the real engine and logs what happens.
//! The browser build is driven from JavaScript through `reflex_rush::web`.

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::collections::BTreeMap;

    use glam::Vec2;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use reflex_rush::consts::TICK_MS;
    use reflex_rush::highscores::{Leaderboard, ScoreService, generate_player_name};
    use reflex_rush::persistence::{JsonFileStore, KeyValueStore};
    use reflex_rush::platform::{self, FixedViewport, ViewportProvider};
    use reflex_rush::sim::{
        BlockAction, BlockId, Effect, RenderSurface, RoundController, Snapshot, SwipeDirection,
        Viewport,
    };
    use reflex_rush::Tuning;

    const ROUNDS: u32 = 3;
    /// Give up on a round after ten simulated minutes
    const ROUND_LIMIT_MS: u64 = 600_000;
    const PLAYER_KEY: &str = "playerName";
    const SWIPE_PX: f32 = 60.0;

    /// Logs what a renderer would draw
    struct LogSurface;

    impl RenderSurface for LogSurface {
        fn present(&mut self, snapshot: &Snapshot) {
            log::trace!(
                "score {} lives {} timer {:.1}s blocks {}",
                snapshot.score,
                snapshot.lives,
                snapshot.round_timer,
                snapshot.blocks.len()
            );
        }

        fn effect(&mut self, effect: &Effect) {
            match effect {
                Effect::BonusAwarded { .. } | Effect::GameOver { .. } => {
                    log::info!("{:?}", effect)
                }
                _ => log::debug!("{:?}", effect),
            }
        }
    }

    #[derive(Debug, Clone, Copy)]
    struct Plan {
        at_ms: u64,
        /// Taps still to deliver (double-taps take two)
        taps_left: u8,
    }

    /// Reacts to every block after a random delay. Leaves Avoid blocks alone
    /// unless it slips.
    struct Bot {
        rng: Pcg32,
        plans: BTreeMap<BlockId, Plan>,
    }

    impl Bot {
        fn new(seed: u64) -> Self {
            Self {
                rng: Pcg32::seed_from_u64(seed ^ 0x5EED),
                plans: BTreeMap::new(),
            }
        }

        fn reaction_ms(&mut self) -> u64 {
            // Mostly quick, sometimes distracted
            if self.rng.random_bool(0.04) {
                self.rng.random_range(4_000..8_000)
            } else {
                self.rng.random_range(250..1_800)
            }
        }

        fn act(&mut self, controller: &mut RoundController) {
            let now = controller.now_ms();
            let snapshot = controller.snapshot();
            let half = snapshot.block_size / 2.0;

            self.plans
                .retain(|id, _| snapshot.blocks.iter().any(|b| b.id == *id));

            for block in &snapshot.blocks {
                if block.resolving || self.plans.contains_key(&block.id) {
                    continue;
                }
                if block.required_action == BlockAction::Avoid && !self.rng.random_bool(0.005) {
                    continue;
                }
                let taps_left = if block.required_action == BlockAction::DoubleTap { 2 } else { 1 };
                let at_ms = now + self.reaction_ms();
                self.plans.insert(block.id, Plan { at_ms, taps_left });
            }

            let due: Vec<(BlockId, Plan)> = self
                .plans
                .iter()
                .filter(|(_, p)| p.at_ms <= now && p.taps_left > 0)
                .map(|(id, p)| (*id, *p))
                .collect();

            for (id, plan) in due {
                let Some(block) = snapshot.blocks.iter().find(|b| b.id == id) else {
                    continue;
                };
                let start = block.position + half;
                let end = match block.required_action.swipe_direction() {
                    Some(SwipeDirection::Left) => start - Vec2::new(SWIPE_PX, 0.0),
                    Some(SwipeDirection::Right) => start + Vec2::new(SWIPE_PX, 0.0),
                    Some(SwipeDirection::Up) => start - Vec2::new(0.0, SWIPE_PX),
                    Some(SwipeDirection::Down) => start + Vec2::new(0.0, SWIPE_PX),
                    None => start + Vec2::new(2.0, -1.0),
                };
                if let Some(gesture) = controller.pointer(id, start, end) {
                    log::trace!("Bot {:?} on {}", gesture, id);
                }
                self.plans.insert(
                    id,
                    Plan {
                        at_ms: now + u64::from(TICK_MS),
                        taps_left: plan.taps_left - 1,
                    },
                );
            }
        }
    }

    fn player_name(store: &mut JsonFileStore, rng: &mut Pcg32) -> String {
        match store.get(PLAYER_KEY) {
            Ok(Some(name)) => name,
            _ => {
                let name = generate_player_name(rng);
                if let Err(e) = store.set(PLAYER_KEY, &name) {
                    log::warn!("Could not save player name: {}", e);
                }
                name
            }
        }
    }

    pub fn run() {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        log::info!("Reflex Rush (native autoplay) starting...");

        let seed = std::env::args()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(platform::time_seed);

        let mut store = JsonFileStore::in_config_dir();
        log::info!("Using store {}", store.path().display());
        let mut rng = Pcg32::seed_from_u64(seed);
        let player = player_name(&mut store, &mut rng);
        let mut leaderboard = Leaderboard::load(&store);

        let mut controller = RoundController::new(
            Tuning::load(),
            Box::new(JsonFileStore::new(store.path())),
            seed,
        );
        controller.set_viewport(FixedViewport(Viewport::new(390.0, 844.0)).viewport());

        let mut bot = Bot::new(seed);
        let mut surface = LogSurface;

        for round in 1..=ROUNDS {
            let started = controller.now_ms();
            while !controller.is_game_over() {
                if controller.now_ms() - started > ROUND_LIMIT_MS {
                    log::warn!("Round {} hit the time limit, stopping", round);
                    return;
                }
                bot.act(&mut controller);
                controller.advance(u64::from(TICK_MS));
                controller.flush(&mut surface);
            }

            let score = controller.score();
            log::info!(
                "Round {} over after {:.1}s: score {}",
                round,
                (controller.now_ms() - started) as f64 / 1000.0,
                score
            );
            match leaderboard.submit(&player, score) {
                Some(rank) => log::info!("{} is ranked #{} of {}", player, rank, leaderboard.len()),
                None => log::info!("No score recorded"),
            }
            if let Err(e) = leaderboard.save(&mut store) {
                log::warn!("Could not save leaderboard: {}", e);
            }

            if round < ROUNDS {
                controller.restart();
                controller.flush(&mut surface);
            }
        }

        for (i, entry) in leaderboard.top().iter().take(5).enumerate() {
            log::info!("{:>2}. {:<15} {}", i + 1, entry.name, entry.score);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    demo::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is reflex_rush::web::start
}
