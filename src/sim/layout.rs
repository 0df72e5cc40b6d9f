//! Batch layout: vertically stacked, horizontally centered blocks

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::tuning::LayoutTuning;

/// Current viewport size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Block size and spacing for a viewport
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockGeometry {
    pub size: Vec2,
    pub gap: f32,
    /// Top of the play area (below the header)
    pub top: f32,
    /// Height available for the stack
    pub usable_height: f32,
    pub viewport_width: f32,
}

impl BlockGeometry {
    /// Zero-sized layout used until a viewport is known
    pub const NONE: Self = Self {
        size: Vec2::ZERO,
        gap: 0.0,
        top: 0.0,
        usable_height: 0.0,
        viewport_width: 0.0,
    };

    /// Size blocks so a full `max_stack` batch always fits.
    /// Shrinks the gap first, then the block height.
    pub fn for_viewport(viewport: Option<Viewport>, tuning: &LayoutTuning) -> Self {
        let Some(vp) = viewport.filter(Viewport::is_usable) else {
            return Self::NONE;
        };

        let ratio = if vp.width < tuning.narrow_breakpoint {
            tuning.narrow_width_ratio
        } else {
            tuning.wide_width_ratio
        };
        let width = vp.width * ratio;

        let top = tuning.header_height.clamp(0.0, vp.height);
        let usable = vp.height - top;
        let n = tuning.max_stack.max(1) as f32;
        let gaps = (n - 1.0).max(0.0);

        let mut height = tuning.block_height;
        let mut gap = tuning.max_gap;
        if n * height + gaps * gap > usable {
            gap = if gaps > 0.0 {
                ((usable - n * height) / gaps).clamp(0.0, tuning.max_gap)
            } else {
                0.0
            };
            if n * height + gaps * gap > usable {
                height = ((usable - gaps * gap) / n).max(0.0);
            }
        }

        Self {
            size: Vec2::new(width, height),
            gap,
            top,
            usable_height: usable,
            viewport_width: vp.width,
        }
    }

    /// Total height of a stack of `count` blocks
    pub fn stack_height(&self, count: usize) -> f32 {
        if count == 0 {
            return 0.0;
        }
        count as f32 * self.size.y + (count - 1) as f32 * self.gap
    }
}

/// Top-left positions for a batch of `count` blocks (slot 0 at the top).
/// Deterministic for a given count and geometry.
pub fn block_positions(count: usize, geometry: &BlockGeometry) -> Vec<Vec2> {
    let x = (geometry.viewport_width - geometry.size.x) / 2.0;
    let start_y = geometry.top + (geometry.usable_height - geometry.stack_height(count)) / 2.0;
    (0..count)
        .map(|i| Vec2::new(x, start_y + i as f32 * (geometry.size.y + geometry.gap)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_viewport_is_zero_layout() {
        let geometry = BlockGeometry::for_viewport(None, &LayoutTuning::default());
        assert_eq!(geometry, BlockGeometry::NONE);
        let positions = block_positions(3, &geometry);
        assert_eq!(positions, vec![Vec2::ZERO; 3]);

        let degenerate = BlockGeometry::for_viewport(
            Some(Viewport::new(0.0, 800.0)),
            &LayoutTuning::default(),
        );
        assert_eq!(degenerate, BlockGeometry::NONE);
    }

    #[test]
    fn test_wide_screen_uses_wide_ratio() {
        let geometry = BlockGeometry::for_viewport(
            Some(Viewport::new(1_920.0, 1_080.0)),
            &LayoutTuning::default(),
        );
        assert!((geometry.size.x - 768.0).abs() < 0.01);
        assert_eq!(geometry.size.y, 80.0);
        assert_eq!(geometry.gap, 20.0);
    }

    #[test]
    fn test_full_stack_fits_small_phone() {
        let tuning = LayoutTuning::default();
        // 320x568: usable 504px cannot hold 9*80 + 8*20
        let geometry = BlockGeometry::for_viewport(Some(Viewport::new(320.0, 568.0)), &tuning);
        assert!((geometry.size.x - 288.0).abs() < 0.01);
        assert!(geometry.stack_height(9) <= geometry.usable_height + 0.01);

        let positions = block_positions(9, &geometry);
        let last = positions.last().unwrap();
        assert!(positions[0].y >= geometry.top - 0.01);
        assert!(last.y + geometry.size.y <= 568.0 + 0.01);
    }

    #[test]
    fn test_positions_centered_and_disjoint() {
        let geometry = BlockGeometry::for_viewport(
            Some(Viewport::new(1_024.0, 900.0)),
            &LayoutTuning::default(),
        );
        let positions = block_positions(4, &geometry);
        for pair in positions.windows(2) {
            assert!(pair[1].y >= pair[0].y + geometry.size.y);
            assert_eq!(pair[0].x, pair[1].x);
        }
        let centre = positions[0].x + geometry.size.x / 2.0;
        assert!((centre - 512.0).abs() < 0.01);
        // Same input, same layout
        assert_eq!(positions, block_positions(4, &geometry));
    }
}
