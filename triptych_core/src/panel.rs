// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Panel identification, pixel extents, and layout.
//!
//! A *panel* is the screen region owned by one backend. [`PanelId`] values
//! are assigned by the [`Orchestrator`](crate::orchestrator::Orchestrator) in
//! creation order; that order is also the per-frame render order and the
//! reverse of the teardown order.

use alloc::vec::Vec;
use core::fmt;

use kurbo::{Rect, Size, Vec2};

/// Identifies one panel (and the backend that draws it).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PanelId(pub u32);

impl fmt::Debug for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PanelId({})", self.0)
    }
}

/// A size in whole pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Extent {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent {
    /// The zero-area extent.
    pub const ZERO: Self = Self::new(0, 0);

    /// Creates an extent from a width and a height.
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `true` when either dimension is zero.
    ///
    /// A zero-area window suspends all GPU work.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered by this extent.
    #[inline]
    #[must_use]
    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Converts to a `kurbo` size in logical units (one unit per pixel).
    #[inline]
    #[must_use]
    pub fn to_size(self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

/// Pixel formats shared by every backend in this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit red, green, blue, alpha.
    Rgba8Unorm,
    /// 8-bit blue, green, red, alpha (the usual DXGI composition format).
    Bgra8Unorm,
}

impl PixelFormat {
    /// Size of one pixel in bytes.
    #[inline]
    #[must_use]
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Rgba8Unorm | Self::Bgra8Unorm => 4,
        }
    }
}

/// Where a panel sits inside the window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanelLayout {
    /// Which panel this layout belongs to.
    pub id: PanelId,
    /// Size of the panel's visual in pixels.
    pub extent: Extent,
    /// Offset of the panel's top-left corner from the window origin.
    pub offset: Vec2,
    /// Depth offset passed to the compositor.
    pub z: f32,
}

impl PanelLayout {
    /// Layout of panel `id` in a left-to-right row of equally sized panels.
    #[must_use]
    pub fn in_row(id: PanelId, panel: Extent) -> Self {
        Self {
            id,
            extent: panel,
            offset: Vec2::new(f64::from(id.0) * f64::from(panel.width), 0.0),
            z: 0.0,
        }
    }

    /// Returns the panel's rectangle in window coordinates.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.offset.to_point(), self.extent.to_size())
    }
}

/// Lays out `count` panels of `panel` size left to right, starting at the
/// window origin.
#[must_use]
pub fn row_layout(count: u32, panel: Extent) -> Vec<PanelLayout> {
    (0..count)
        .map(|i| PanelLayout::in_row(PanelId(i), panel))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_when_either_dimension_is_zero() {
        assert!(Extent::ZERO.is_empty());
        assert!(Extent::new(0, 480).is_empty());
        assert!(Extent::new(320, 0).is_empty());
        assert!(!Extent::new(1, 1).is_empty());
    }

    #[test]
    fn row_layout_places_panels_side_by_side() {
        let layouts = row_layout(3, Extent::new(320, 480));
        let xs: Vec<f64> = layouts.iter().map(|l| l.offset.x).collect();
        assert_eq!(xs, [0.0, 320.0, 640.0]);
        assert!(layouts.iter().all(|l| l.offset.y == 0.0));
        assert_eq!(layouts[2].id, PanelId(2));
    }

    #[test]
    fn row_layout_bounds_do_not_overlap() {
        let layouts = row_layout(3, Extent::new(320, 480));
        for pair in layouts.windows(2) {
            let overlap = pair[0].bounds().intersect(pair[1].bounds());
            assert!(
                overlap.area() == 0.0,
                "panels {:?} and {:?} overlap",
                pair[0].id,
                pair[1].id
            );
        }
        assert_eq!(layouts[2].bounds().x1, 960.0);
    }

    #[test]
    fn formats_are_four_bytes() {
        assert_eq!(PixelFormat::Rgba8Unorm.bytes_per_pixel(), 4);
        assert_eq!(PixelFormat::Bgra8Unorm.bytes_per_pixel(), 4);
    }
}
