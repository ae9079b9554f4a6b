// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The compositor boundary.
//!
//! The system compositor is reached only through [`CompositionHost`]. Each
//! panel's visual is created, sized, positioned, and inserted exactly once by
//! [`PanelVisual::attach`]; after that the compositor shows whatever the
//! wrapped surface last presented, with no per-frame calls.

use core::fmt;

use kurbo::{Size, Vec2};

use crate::device::RawSurface;
use crate::error::Result;
use crate::panel::PanelLayout;

/// A window compositor that displays pre-rendered surfaces.
pub trait CompositionHost {
    /// Compositor-side wrapper of a presentable surface.
    type Surface;
    /// A node in the compositor's visual tree.
    type Visual;

    /// Wraps a backend's native surface handle.
    fn wrap_surface(&mut self, raw: RawSurface) -> Result<Self::Surface>;

    /// Creates a visual showing `surface`.
    fn create_visual(&mut self, surface: &Self::Surface) -> Result<Self::Visual>;

    /// Sets the visual's size in window units.
    fn set_size(&mut self, visual: &Self::Visual, size: Size) -> Result<()>;

    /// Sets the visual's offset from the window origin, plus a depth offset.
    fn set_offset(&mut self, visual: &Self::Visual, offset: Vec2, z: f32) -> Result<()>;

    /// Inserts the visual at the top of the root collection.
    fn insert_top(&mut self, visual: &Self::Visual) -> Result<()>;

    /// Releases a visual and its surface wrapper at teardown.
    fn release(&mut self, visual: Self::Visual, surface: Self::Surface) {
        _ = (visual, surface);
    }
}

/// A panel's visual, wired into the composition tree.
pub struct PanelVisual<H: CompositionHost> {
    visual: H::Visual,
    surface: H::Surface,
    layout: PanelLayout,
}

impl<H: CompositionHost> fmt::Debug for PanelVisual<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelVisual")
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl<H: CompositionHost> PanelVisual<H> {
    /// Wraps `raw`, creates a visual for it, applies `layout`, and inserts
    /// the visual on top of the tree.
    ///
    /// # Errors
    ///
    /// The first compositor call that fails.
    pub fn attach(host: &mut H, raw: RawSurface, layout: &PanelLayout) -> Result<Self> {
        let surface = host.wrap_surface(raw)?;
        let visual = host.create_visual(&surface)?;
        host.set_size(&visual, layout.extent.to_size())?;
        host.set_offset(&visual, layout.offset, layout.z)?;
        host.insert_top(&visual)?;
        Ok(Self {
            visual,
            surface,
            layout: *layout,
        })
    }

    /// Layout applied at attach time.
    #[must_use]
    pub fn layout(&self) -> &PanelLayout {
        &self.layout
    }

    /// The compositor's visual.
    #[must_use]
    pub fn visual(&self) -> &H::Visual {
        &self.visual
    }

    /// Hands the visual and surface back to `host`.
    pub fn release(self, host: &mut H) {
        host.release(self.visual, self.surface);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::{Extent, PanelId};
    use crate::testing::{FakeHost, HostOp};

    #[test]
    fn attach_issues_each_call_once() {
        let mut host = FakeHost::default();
        let layout = PanelLayout::in_row(PanelId(1), Extent::new(320, 480));
        let visual =
            PanelVisual::attach(&mut host, RawSurface(core::ptr::null_mut()), &layout).unwrap();
        assert_eq!(
            host.ops,
            [
                HostOp::Wrap(0),
                HostOp::CreateVisual(0),
                HostOp::SetSize(0, Size::new(320.0, 480.0)),
                HostOp::SetOffset(0, Vec2::new(320.0, 0.0)),
                HostOp::InsertTop(0),
            ]
        );
        visual.release(&mut host);
        assert_eq!(host.ops.last(), Some(&HostOp::Release(0)));
    }
}
