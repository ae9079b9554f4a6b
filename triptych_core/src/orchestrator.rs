// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-frame driver.
//!
//! An [`Orchestrator`] owns every panel's backend and composition visual.
//! Each [`tick`](Orchestrator::tick) drives every backend once, in panel
//! order, through acquire, render, bridge, and present. Nothing runs
//! concurrently; the only blocking points are fence waits and CPU-bridge
//! readbacks inside the backends.
//!
//! # Resize and suspension
//!
//! [`notify_resized`](Orchestrator::notify_resized) only records the new
//! window size. The next tick idle-waits and recreates every backend's
//! surface at `(window.width / panel_count, window.height)`. While that
//! extent has zero area the orchestrator is *suspended*: ticks issue no
//! device calls at all, and the pending resize is applied on the first tick
//! with a non-zero size. Visual size and offset are never touched after
//! setup.
//!
//! # Teardown
//!
//! Panels are torn down in reverse creation order. For each panel the
//! composition visual is released first, then the backend (which idle-waits
//! in its `Drop` before releasing fences, registrations, and devices).

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::backend::{FrameCx, RenderBackend};
use crate::compose::{CompositionHost, PanelVisual};
use crate::config::PanelConfig;
use crate::device::SurfaceDesc;
use crate::error::Result;
use crate::panel::{Extent, PanelId, PanelLayout};
use crate::trace::{
    FrameBeginEvent, FrameEndEvent, RecreateEvent, RecreateReason, ResizeEvent, TeardownEvent,
    Tracer,
};

/// Outcome of one [`Orchestrator::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub struct FrameReport {
    /// Frame counter of this tick. Suspended ticks do not advance it.
    pub frame_index: u64,
    /// Panels that presented.
    pub presented: u32,
    /// Panels whose frame was skipped after recreating an out-of-date
    /// surface.
    pub skipped: u32,
    /// Whether the tick was skipped because the window has no area.
    pub suspended: bool,
}

struct Panel<H: CompositionHost> {
    visual: PanelVisual<H>,
    backend: Box<dyn RenderBackend>,
}

/// Drives every panel's backend once per application frame.
pub struct Orchestrator<H: CompositionHost> {
    panels: Vec<Panel<H>>,
    host: H,
    config: PanelConfig,
    window: Extent,
    pending_resize: bool,
    suspended: bool,
    frame_index: u64,
}

impl<H: CompositionHost> fmt::Debug for Orchestrator<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("panels", &self.panels.len())
            .field("config", &self.config)
            .field("window", &self.window)
            .field("pending_resize", &self.pending_resize)
            .field("suspended", &self.suspended)
            .field("frame_index", &self.frame_index)
            .finish_non_exhaustive()
    }
}

impl<H: CompositionHost> Orchestrator<H> {
    /// Creates an orchestrator with no panels for a window sized to fit
    /// `config`.
    #[must_use]
    pub fn new(host: H, config: PanelConfig) -> Self {
        Self {
            panels: Vec::new(),
            host,
            config,
            window: config.window_extent(),
            pending_resize: false,
            suspended: false,
            frame_index: 0,
        }
    }

    /// Adds the next panel and wires its visual into the composition tree.
    ///
    /// Panels are laid out left to right in the order they are added.
    ///
    /// # Errors
    ///
    /// The compositor error; the backend is dropped.
    pub fn add_panel(&mut self, backend: Box<dyn RenderBackend>) -> Result<PanelId> {
        let id = PanelId(panel_id(self.panels.len()));
        let mut layout = self.config.layout(id);
        layout.extent = backend.surface().extent;
        let visual = PanelVisual::attach(&mut self.host, backend.raw_surface(), &layout)?;
        self.panels.push(Panel { visual, backend });
        Ok(id)
    }

    /// Records a new window size. Applied on the next tick.
    pub fn notify_resized(&mut self, window: Extent) {
        self.window = window;
        self.pending_resize = true;
    }

    /// Drives one application frame.
    ///
    /// A panel whose surface is out of date is recreated at its current
    /// extent and counted as skipped; the loop continues with the next panel.
    ///
    /// # Errors
    ///
    /// Any fatal [`FrameError`](crate::error::FrameError), unchanged.
    pub fn tick(&mut self, tracer: &mut Tracer<'_>) -> Result<FrameReport> {
        let extent = self.config.panel_extent_for(self.window);
        if extent.is_empty() {
            if !self.suspended {
                self.suspended = true;
                tracer.resize(&ResizeEvent {
                    window: self.window,
                    suspended: true,
                });
            }
            return Ok(FrameReport {
                frame_index: self.frame_index,
                presented: 0,
                skipped: 0,
                suspended: true,
            });
        }
        if self.pending_resize {
            self.apply_resize(extent, tracer)?;
        }

        let frame_index = self.frame_index;
        self.frame_index += 1;
        tracer.frame_begin(&FrameBeginEvent {
            frame_index,
            panel_count: panel_id(self.panels.len()),
        });

        let mut presented = 0;
        let mut skipped = 0;
        for (i, panel) in self.panels.iter_mut().enumerate() {
            let id = PanelId(panel_id(i));
            let backend = panel.backend.as_mut();
            let outcome = {
                let mut cx = FrameCx::new(id, frame_index, tracer);
                run_panel(backend, &mut cx)
            };
            match outcome {
                Ok(()) => presented += 1,
                Err(e) if e.is_recoverable() => {
                    let extent = backend.surface().extent;
                    backend.resize(extent)?;
                    tracer.recreate(&RecreateEvent {
                        panel: id,
                        extent,
                        reason: RecreateReason::OutOfDate,
                    });
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tracer.frame_end(&FrameEndEvent {
            frame_index,
            presented,
            skipped,
        });
        Ok(FrameReport {
            frame_index,
            presented,
            skipped,
            suspended: false,
        })
    }

    fn apply_resize(&mut self, extent: Extent, tracer: &mut Tracer<'_>) -> Result<()> {
        self.suspended = false;
        tracer.resize(&ResizeEvent {
            window: self.window,
            suspended: false,
        });
        for (i, panel) in self.panels.iter_mut().enumerate() {
            panel.backend.resize(extent)?;
            tracer.recreate(&RecreateEvent {
                panel: PanelId(panel_id(i)),
                extent,
                reason: RecreateReason::Resize,
            });
        }
        self.pending_resize = false;
        Ok(())
    }

    /// Releases every panel in reverse creation order.
    ///
    /// # Errors
    ///
    /// The first idle-wait failure. Every panel is released regardless.
    pub fn teardown(&mut self, tracer: &mut Tracer<'_>) -> Result<()> {
        let mut first_error = None;
        while let Some(Panel { visual, mut backend }) = self.panels.pop() {
            let id = PanelId(panel_id(self.panels.len()));
            visual.release(&mut self.host);
            if let Err(e) = backend.wait_idle() {
                first_error.get_or_insert(e);
            }
            drop(backend);
            tracer.teardown(&TeardownEvent { panel: id });
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Current surface of every panel, in panel order.
    #[must_use]
    pub fn surfaces(&self) -> Vec<SurfaceDesc> {
        self.panels.iter().map(|p| p.backend.surface()).collect()
    }

    /// Layout every panel was attached with, in panel order.
    #[must_use]
    pub fn layouts(&self) -> Vec<PanelLayout> {
        self.panels.iter().map(|p| *p.visual.layout()).collect()
    }

    /// Number of panels.
    #[must_use]
    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    /// Most recently reported window size.
    #[must_use]
    pub fn window(&self) -> Extent {
        self.window
    }

    /// Whether ticks are currently skipped for a zero-area window.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// The composition host.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }
}

impl<H: CompositionHost> Drop for Orchestrator<H> {
    fn drop(&mut self) {
        _ = self.teardown(&mut Tracer::none());
    }
}

fn run_panel(backend: &mut dyn RenderBackend, cx: &mut FrameCx<'_, '_>) -> Result<()> {
    let frame = backend.acquire_surface(cx)?;
    if let Err(e) = backend.render_frame(&frame, cx) {
        backend.abandon(frame);
        return Err(e);
    }
    if let Err(e) = backend.bridge(&frame, cx) {
        backend.abandon(frame);
        return Err(e);
    }
    backend.present(frame, cx)
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "panel counts are tiny; ids are u32 by definition"
)]
const fn panel_id(index: usize) -> u32 {
    index as u32
}
