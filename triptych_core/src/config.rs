// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compile-time configuration.
//!
//! Nothing here is read from the environment or from disk; applications pick
//! a preset (or build a struct literal) when they set up the pipeline.

use alloc::vec::Vec;

use crate::panel::{Extent, PanelId, PanelLayout, row_layout};

/// Configuration for a [`FramePacer`](crate::pacer::FramePacer).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacerConfig {
    /// Number of frame slots (each with its own fence). Values below 1 are
    /// promoted to 1.
    pub slots: u32,
}

impl PacerConfig {
    /// Two slots: one being built while the other's GPU work retires.
    #[must_use]
    pub const fn double_buffered() -> Self {
        Self { slots: 2 }
    }

    /// Slot count with the minimum of one applied.
    #[must_use]
    pub const fn slot_count(&self) -> usize {
        if self.slots == 0 {
            1
        } else {
            self.slots as usize
        }
    }
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self::double_buffered()
    }
}

/// How the window is divided into panels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanelConfig {
    /// Initial size of every panel.
    pub panel_extent: Extent,
    /// Number of panels laid out left to right.
    pub panel_count: u32,
}

impl PanelConfig {
    /// Three 320×480 panels in a 960×480 window.
    #[must_use]
    pub const fn triptych() -> Self {
        Self {
            panel_extent: Extent::new(320, 480),
            panel_count: 3,
        }
    }

    /// Initial window size that fits every panel exactly.
    #[must_use]
    pub const fn window_extent(&self) -> Extent {
        Extent::new(
            self.panel_extent.width.saturating_mul(self.panel_count),
            self.panel_extent.height,
        )
    }

    /// Per-panel render extent for a given window size.
    ///
    /// The window width is split evenly; any remainder columns are left
    /// uncovered.
    #[must_use]
    pub const fn panel_extent_for(&self, window: Extent) -> Extent {
        if self.panel_count == 0 {
            return Extent::ZERO;
        }
        Extent::new(window.width / self.panel_count, window.height)
    }

    /// Initial layout of one panel.
    #[must_use]
    pub fn layout(&self, id: PanelId) -> PanelLayout {
        PanelLayout::in_row(id, self.panel_extent)
    }

    /// Initial layouts of every panel.
    #[must_use]
    pub fn layouts(&self) -> Vec<PanelLayout> {
        row_layout(self.panel_count, self.panel_extent)
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self::triptych()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triptych_window_is_960_by_480() {
        let config = PanelConfig::triptych();
        assert_eq!(config.window_extent(), Extent::new(960, 480));
        assert_eq!(config.layouts().len(), 3);
    }

    #[test]
    fn panel_extent_splits_window_width() {
        let config = PanelConfig::triptych();
        assert_eq!(
            config.panel_extent_for(Extent::new(1200, 600)),
            Extent::new(400, 600)
        );
        assert_eq!(
            config.panel_extent_for(Extent::new(961, 480)),
            Extent::new(320, 480)
        );
        assert!(config.panel_extent_for(Extent::new(2, 480)).is_empty());
    }

    #[test]
    fn zero_slots_promoted_to_one() {
        assert_eq!(PacerConfig { slots: 0 }.slot_count(), 1);
        assert_eq!(PacerConfig::default().slot_count(), 2);
    }
}
