// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rendering backends.
//!
//! [`RenderBackend`] is the object-safe seam the
//! [`Orchestrator`](crate::orchestrator::Orchestrator) drives. Each variant
//! combines device halves from [`device`](crate::device) with a
//! [`FramePacer`] and its bridge:
//!
//! | Variant | Display half | Rendering half | Bridge |
//! |---|---|---|---|
//! | [`NativeBackend`] | [`NativeRenderer`] | (same device) | none |
//! | [`ZeroCopyBackend`] | [`InteropDisplay`] | [`SharedRenderer`] | [`ZeroCopyBridge`] |
//! | [`CpuBridgeBackend`] | [`StagingTarget`] | [`OffscreenRenderer`] | [`CpuBridge`] |
//!
//! Fields are declared in reverse order of creation so that drop order
//! releases fences first and the display device last. Every variant
//! idle-waits in `Drop` before its fields are released, unless nothing has
//! been acquired since its last successful [`wait_idle`](RenderBackend::wait_idle).

use crate::bridge::{BridgeStrategy, CpuBridge, ZeroCopyBridge};
use crate::config::PacerConfig;
use crate::device::{
    DisplayDevice, InteropDevice, InteropDisplay, NativeRenderer, OffscreenRenderer, RawSurface,
    SharedRenderer, StagingTarget, SurfaceDesc,
};
use crate::error::{FrameError, Result};
use crate::pacer::{AcquiredFrame, FramePacer};
use crate::panel::{Extent, PanelId};
use crate::trace::{PanelPhase, PhaseEvent, Tracer};

/// Per-panel context threaded through one frame's backend calls.
#[derive(Debug)]
pub struct FrameCx<'a, 't> {
    /// Panel being driven.
    pub panel: PanelId,
    /// Application frame counter.
    pub frame_index: u64,
    /// Trace output.
    pub tracer: &'a mut Tracer<'t>,
}

impl<'a, 't> FrameCx<'a, 't> {
    /// Creates a context for one panel's frame.
    pub fn new(panel: PanelId, frame_index: u64, tracer: &'a mut Tracer<'t>) -> Self {
        Self {
            panel,
            frame_index,
            tracer,
        }
    }

    /// Emits a [`PhaseEvent`] for this panel.
    #[inline]
    pub fn phase(&mut self, phase: PanelPhase) {
        self.tracer.phase(&PhaseEvent {
            frame_index: self.frame_index,
            panel: self.panel,
            phase,
        });
    }
}

/// One independent rendering backend drawing one panel.
///
/// A frame is `acquire_surface`, `render_frame`, `bridge`, `present`, in that
/// order. If `render_frame` or `bridge` fails, the caller hands the frame to
/// `abandon` instead of presenting it.
pub trait RenderBackend {
    /// Bridging strategy this backend uses.
    fn strategy(&self) -> BridgeStrategy;

    /// Current presentable surface.
    fn surface(&self) -> SurfaceDesc;

    /// Native surface handle for the compositor.
    fn raw_surface(&self) -> RawSurface;

    /// Waits for the frame slot and acquires the next image (and, for
    /// zero-copy, its write lock).
    fn acquire_surface(&mut self, cx: &mut FrameCx<'_, '_>) -> Result<AcquiredFrame>;

    /// Issues this frame's draw calls.
    fn render_frame(&mut self, frame: &AcquiredFrame, cx: &mut FrameCx<'_, '_>) -> Result<()>;

    /// Moves the rendered image into the presentable surface.
    fn bridge(&mut self, frame: &AcquiredFrame, cx: &mut FrameCx<'_, '_>) -> Result<()>;

    /// Submits, waits for the frame's fence, and presents.
    fn present(&mut self, frame: AcquiredFrame, cx: &mut FrameCx<'_, '_>) -> Result<()>;

    /// Drops an acquired frame without presenting it.
    fn abandon(&mut self, frame: AcquiredFrame);

    /// Idle-waits and recreates every size-dependent resource at `extent`.
    fn resize(&mut self, extent: Extent) -> Result<()>;

    /// Blocks until no work is in flight on any of the backend's devices.
    fn wait_idle(&mut self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Native
// ---------------------------------------------------------------------------

/// Backend whose rendering API owns a compositor-ready swapchain.
pub struct NativeBackend<D: NativeRenderer> {
    pacer: FramePacer<D::Fence>,
    display: D,
    idle: bool,
}

impl<D: NativeRenderer> core::fmt::Debug for NativeBackend<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NativeBackend")
            .field("pacer", &self.pacer)
            .finish_non_exhaustive()
    }
}

impl<D: NativeRenderer> NativeBackend<D> {
    /// Wraps `display` and creates its frame slots.
    ///
    /// # Errors
    ///
    /// Returns the fence creation error.
    pub fn new(mut display: D, config: PacerConfig) -> Result<Self> {
        let pacer = FramePacer::new(&mut display, config)?;
        Ok(Self {
            pacer,
            display,
            idle: false,
        })
    }

    /// The display device.
    #[must_use]
    pub fn display(&self) -> &D {
        &self.display
    }
}

impl<D: NativeRenderer> RenderBackend for NativeBackend<D> {
    fn strategy(&self) -> BridgeStrategy {
        BridgeStrategy::Native
    }

    fn surface(&self) -> SurfaceDesc {
        self.display.surface()
    }

    fn raw_surface(&self) -> RawSurface {
        self.display.raw_surface()
    }

    fn acquire_surface(&mut self, cx: &mut FrameCx<'_, '_>) -> Result<AcquiredFrame> {
        self.idle = false;
        self.pacer.begin_frame(&mut self.display, cx)
    }

    fn render_frame(&mut self, frame: &AcquiredFrame, cx: &mut FrameCx<'_, '_>) -> Result<()> {
        cx.phase(PanelPhase::Render);
        self.display.draw(frame.image(), cx.frame_index)
    }

    fn bridge(&mut self, _frame: &AcquiredFrame, _cx: &mut FrameCx<'_, '_>) -> Result<()> {
        Ok(())
    }

    fn present(&mut self, frame: AcquiredFrame, cx: &mut FrameCx<'_, '_>) -> Result<()> {
        self.pacer.end_frame(&mut self.display, frame, cx)
    }

    fn abandon(&mut self, frame: AcquiredFrame) {
        self.pacer.abandon(frame);
    }

    fn resize(&mut self, extent: Extent) -> Result<()> {
        self.wait_idle()?;
        self.display.recreate_surface(extent)
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.pacer.wait_all()?;
        self.display.wait_idle()?;
        self.idle = true;
        Ok(())
    }
}

impl<D: NativeRenderer> Drop for NativeBackend<D> {
    fn drop(&mut self) {
        if !self.idle {
            _ = self.wait_idle();
        }
    }
}

// ---------------------------------------------------------------------------
// Zero-copy
// ---------------------------------------------------------------------------

/// Backend whose rendering API draws into the display API's images through
/// shared registrations.
pub struct ZeroCopyBackend<R, D>
where
    R: SharedRenderer,
    D: InteropDisplay<Image = <R::Interop as InteropDevice>::Image>,
{
    pacer: FramePacer<D::Fence>,
    bridge: ZeroCopyBridge<R::Interop>,
    renderer: R,
    display: D,
    idle: bool,
}

impl<R, D> core::fmt::Debug for ZeroCopyBackend<R, D>
where
    R: SharedRenderer,
    D: InteropDisplay<Image = <R::Interop as InteropDevice>::Image>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ZeroCopyBackend")
            .field("pacer", &self.pacer)
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}

impl<R, D> ZeroCopyBackend<R, D>
where
    R: SharedRenderer,
    D: InteropDisplay<Image = <R::Interop as InteropDevice>::Image>,
{
    /// Registers `display`'s images with `renderer` and creates frame slots.
    ///
    /// # Errors
    ///
    /// Registration or fence creation errors.
    pub fn new(renderer: R, mut display: D, config: PacerConfig) -> Result<Self> {
        let mut bridge = ZeroCopyBridge::new();
        let extent = display.surface().extent;
        bridge.register_all(renderer.interop(), &display.shareable_images(), extent)?;
        let pacer = FramePacer::new(&mut display, config)?;
        Ok(Self {
            pacer,
            bridge,
            renderer,
            display,
            idle: false,
        })
    }

    /// Number of display images currently registered.
    #[must_use]
    pub fn registered_images(&self) -> usize {
        self.bridge.handle_count()
    }
}

impl<R, D> RenderBackend for ZeroCopyBackend<R, D>
where
    R: SharedRenderer,
    D: InteropDisplay<Image = <R::Interop as InteropDevice>::Image>,
{
    fn strategy(&self) -> BridgeStrategy {
        BridgeStrategy::ZeroCopy
    }

    fn surface(&self) -> SurfaceDesc {
        self.display.surface()
    }

    fn raw_surface(&self) -> RawSurface {
        self.display.raw_surface()
    }

    fn acquire_surface(&mut self, cx: &mut FrameCx<'_, '_>) -> Result<AcquiredFrame> {
        self.idle = false;
        let frame = self.pacer.begin_frame(&mut self.display, cx)?;
        cx.phase(PanelPhase::Lock);
        if let Err(e) = self.bridge.lock(frame.image()) {
            self.pacer.abandon(frame);
            return Err(e);
        }
        Ok(frame)
    }

    fn render_frame(&mut self, _frame: &AcquiredFrame, cx: &mut FrameCx<'_, '_>) -> Result<()> {
        let lock = self.bridge.current_lock()?;
        cx.phase(PanelPhase::Render);
        self.renderer.draw(lock, cx.frame_index)
    }

    fn bridge(&mut self, _frame: &AcquiredFrame, cx: &mut FrameCx<'_, '_>) -> Result<()> {
        cx.phase(PanelPhase::Unlock);
        self.bridge.unlock()
    }

    fn present(&mut self, frame: AcquiredFrame, cx: &mut FrameCx<'_, '_>) -> Result<()> {
        if self.bridge.current_lock().is_ok() {
            self.bridge.discard_lock();
            self.pacer.abandon(frame);
            return Err(FrameError::NotLocked);
        }
        self.pacer.end_frame(&mut self.display, frame, cx)
    }

    fn abandon(&mut self, frame: AcquiredFrame) {
        self.bridge.discard_lock();
        self.pacer.abandon(frame);
    }

    fn resize(&mut self, extent: Extent) -> Result<()> {
        self.wait_idle()?;
        self.bridge.unregister_all();
        self.display.recreate_surface(extent)?;
        self.renderer.resize(extent)?;
        self.bridge.register_all(
            self.renderer.interop(),
            &self.display.shareable_images(),
            extent,
        )
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.pacer.wait_all()?;
        self.renderer.wait_idle()?;
        self.display.wait_idle()?;
        self.idle = true;
        Ok(())
    }
}

impl<R, D> Drop for ZeroCopyBackend<R, D>
where
    R: SharedRenderer,
    D: InteropDisplay<Image = <R::Interop as InteropDevice>::Image>,
{
    fn drop(&mut self) {
        if !self.idle {
            _ = self.wait_idle();
        }
    }
}

// ---------------------------------------------------------------------------
// CPU bridge
// ---------------------------------------------------------------------------

/// Backend that renders offscreen and copies through host memory.
pub struct CpuBridgeBackend<S: OffscreenRenderer, D: StagingTarget> {
    pacer: FramePacer<D::Fence>,
    bridge: CpuBridge,
    source: S,
    display: D,
    idle: bool,
}

impl<S: OffscreenRenderer, D: StagingTarget> core::fmt::Debug for CpuBridgeBackend<S, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CpuBridgeBackend")
            .field("pacer", &self.pacer)
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}

impl<S: OffscreenRenderer, D: StagingTarget> CpuBridgeBackend<S, D> {
    /// Pairs an offscreen `source` with a staging-capable `display`.
    ///
    /// # Errors
    ///
    /// [`FrameError::ExtentMismatch`] or [`FrameError::FormatMismatch`] if the
    /// two images differ, or the fence creation error.
    pub fn new(source: S, mut display: D, config: PacerConfig) -> Result<Self> {
        let surface = display.surface();
        if source.extent() != surface.extent {
            return Err(FrameError::ExtentMismatch {
                expected: surface.extent,
                actual: source.extent(),
            });
        }
        if source.format() != surface.format {
            return Err(FrameError::FormatMismatch {
                expected: surface.format,
                actual: source.format(),
            });
        }
        let pacer = FramePacer::new(&mut display, config)?;
        Ok(Self {
            pacer,
            bridge: CpuBridge::new(),
            source,
            display,
            idle: false,
        })
    }

    /// Payload bytes moved by the most recent frame.
    #[must_use]
    pub fn last_copied(&self) -> usize {
        self.bridge.last_copied()
    }
}

impl<S: OffscreenRenderer, D: StagingTarget> RenderBackend for CpuBridgeBackend<S, D> {
    fn strategy(&self) -> BridgeStrategy {
        BridgeStrategy::CpuBridge
    }

    fn surface(&self) -> SurfaceDesc {
        self.display.surface()
    }

    fn raw_surface(&self) -> RawSurface {
        self.display.raw_surface()
    }

    fn acquire_surface(&mut self, cx: &mut FrameCx<'_, '_>) -> Result<AcquiredFrame> {
        self.idle = false;
        self.pacer.begin_frame(&mut self.display, cx)
    }

    fn render_frame(&mut self, _frame: &AcquiredFrame, cx: &mut FrameCx<'_, '_>) -> Result<()> {
        cx.phase(PanelPhase::Render);
        self.source.draw(cx.frame_index)
    }

    fn bridge(&mut self, frame: &AcquiredFrame, cx: &mut FrameCx<'_, '_>) -> Result<()> {
        self.bridge
            .transfer(&mut self.source, &mut self.display, frame.image(), cx)?;
        Ok(())
    }

    fn present(&mut self, frame: AcquiredFrame, cx: &mut FrameCx<'_, '_>) -> Result<()> {
        self.pacer.end_frame(&mut self.display, frame, cx)
    }

    fn abandon(&mut self, frame: AcquiredFrame) {
        self.pacer.abandon(frame);
    }

    fn resize(&mut self, extent: Extent) -> Result<()> {
        self.wait_idle()?;
        self.display.recreate_surface(extent)?;
        self.source.resize(extent)
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.pacer.wait_all()?;
        self.source.wait_idle()?;
        self.display.wait_idle()?;
        self.idle = true;
        Ok(())
    }
}

impl<S: OffscreenRenderer, D: StagingTarget> Drop for CpuBridgeBackend<S, D> {
    fn drop(&mut self) {
        if !self.idle {
            _ = self.wait_idle();
        }
    }
}
