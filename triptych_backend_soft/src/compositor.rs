// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory composition host.

use kurbo::{Size, Vec2};
use triptych_core::compose::CompositionHost;
use triptych_core::device::RawSurface;
use triptych_core::error::{FrameError, Result, SetupStage};

use crate::log::{Op, OpLog};

/// Composition surface wrapping a raw surface handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SoftSurface(pub usize);

/// Index of a visual in [`SoftCompositor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SoftVisual(pub u32);

/// Last state set on one visual.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisualState {
    /// Surface the visual shows.
    pub surface: SoftSurface,
    /// Size in pixels.
    pub size: Size,
    /// Offset from the root's origin.
    pub offset: Vec2,
    /// Depth.
    pub z: f32,
}

/// A composition tree that only records what it was told.
#[derive(Debug)]
pub struct SoftCompositor {
    visuals: Vec<Option<VisualState>>,
    /// Root children, bottom to top.
    children: Vec<SoftVisual>,
    log: OpLog,
}

impl SoftCompositor {
    /// Creates an empty tree.
    #[must_use]
    pub fn new(log: OpLog) -> Self {
        Self {
            visuals: Vec::new(),
            children: Vec::new(),
            log,
        }
    }

    /// State of a live visual.
    #[must_use]
    pub fn visual(&self, visual: SoftVisual) -> Option<&VisualState> {
        self.visuals.get(visual.0 as usize)?.as_ref()
    }

    /// Root children, bottom to top.
    #[must_use]
    pub fn children(&self) -> &[SoftVisual] {
        &self.children
    }

    /// States of the root children, bottom to top.
    #[must_use]
    pub fn stack(&self) -> Vec<VisualState> {
        self.children
            .iter()
            .filter_map(|v| self.visual(*v).copied())
            .collect()
    }

    fn state_mut(&mut self, visual: &SoftVisual) -> Result<&mut VisualState> {
        self.visuals
            .get_mut(visual.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(FrameError::Setup {
                stage: SetupStage::Composition,
                code: 1,
            })
    }
}

impl CompositionHost for SoftCompositor {
    type Surface = SoftSurface;
    type Visual = SoftVisual;

    fn wrap_surface(&mut self, raw: RawSurface) -> Result<SoftSurface> {
        if raw.0.is_null() {
            return Err(FrameError::Setup {
                stage: SetupStage::Composition,
                code: 0,
            });
        }
        let surface = raw.0.addr();
        self.log.push(Op::WrapSurface { surface });
        Ok(SoftSurface(surface))
    }

    fn create_visual(&mut self, surface: &SoftSurface) -> Result<SoftVisual> {
        let visual = u32::try_from(self.visuals.len()).map_err(|_| FrameError::Setup {
            stage: SetupStage::Composition,
            code: 2,
        })?;
        self.visuals.push(Some(VisualState {
            surface: *surface,
            size: Size::ZERO,
            offset: Vec2::ZERO,
            z: 0.0,
        }));
        self.log.push(Op::CreateVisual { visual });
        Ok(SoftVisual(visual))
    }

    fn set_size(&mut self, visual: &SoftVisual, size: Size) -> Result<()> {
        self.state_mut(visual)?.size = size;
        self.log.push(Op::SetSize {
            visual: visual.0,
            size,
        });
        Ok(())
    }

    fn set_offset(&mut self, visual: &SoftVisual, offset: Vec2, z: f32) -> Result<()> {
        let state = self.state_mut(visual)?;
        state.offset = offset;
        state.z = z;
        self.log.push(Op::SetOffset {
            visual: visual.0,
            offset,
            z,
        });
        Ok(())
    }

    fn insert_top(&mut self, visual: &SoftVisual) -> Result<()> {
        self.state_mut(visual)?;
        self.children.retain(|v| v != visual);
        self.children.push(*visual);
        self.log.push(Op::InsertTop { visual: visual.0 });
        Ok(())
    }

    fn release(&mut self, visual: SoftVisual, _surface: SoftSurface) {
        self.children.retain(|v| *v != visual);
        if let Some(slot) = self.visuals.get_mut(visual.0 as usize) {
            *slot = None;
        }
        self.log.push(Op::ReleaseVisual { visual: visual.0 });
    }
}
