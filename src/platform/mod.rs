//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Wall-clock time (seeding and frame deltas only; the engine runs on its
//!   own logical clock)
//! - Viewport size

use crate::sim::Viewport;

/// Milliseconds since the Unix epoch
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    js_sys::Date::now()
}

/// Milliseconds since the Unix epoch
#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

/// Seed for a new round engine
pub fn time_seed() -> u64 {
    now_ms() as u64
}

/// Turns fractional frame deltas into whole logical milliseconds.
/// The sub-millisecond remainder carries over to the next frame, so the
/// logical clock tracks wall time at any refresh rate.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    accumulator: f64,
    max_frame_ms: f64,
}

impl FrameClock {
    /// `max_frame_ms` caps a single frame (e.g. after a backgrounded tab)
    pub fn new(max_frame_ms: f64) -> Self {
        Self {
            accumulator: 0.0,
            max_frame_ms,
        }
    }

    /// Whole milliseconds to advance for a frame of `elapsed_ms`
    pub fn step(&mut self, elapsed_ms: f64) -> u64 {
        if !elapsed_ms.is_finite() || elapsed_ms <= 0.0 {
            return 0;
        }
        self.accumulator += elapsed_ms.min(self.max_frame_ms);
        let whole = self.accumulator.floor();
        self.accumulator -= whole;
        whole as u64
    }

    /// Carried fraction of a millisecond
    pub fn remainder(&self) -> f64 {
        self.accumulator
    }
}

/// Source of the current viewport geometry
pub trait ViewportProvider {
    /// None while the size is not known yet
    fn viewport(&self) -> Option<Viewport>;
}

/// Fixed size, for headless hosts
#[derive(Debug, Clone, Copy)]
pub struct FixedViewport(pub Viewport);

impl ViewportProvider for FixedViewport {
    fn viewport(&self) -> Option<Viewport> {
        Some(self.0)
    }
}

/// The browser window's inner size
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowViewport;

#[cfg(target_arch = "wasm32")]
impl ViewportProvider for WindowViewport {
    fn viewport(&self) -> Option<Viewport> {
        let window = web_sys::window()?;
        let width = window.inner_width().ok()?.as_f64()?;
        let height = window.inner_height().ok()?.as_f64()?;
        Some(Viewport::new(width as f32, height as f32))
    }
}
