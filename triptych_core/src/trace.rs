// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the frame loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! orchestrator, pacer, and bridges call at each step. All method bodies
//! default to no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! Sinks that print, record, or export these events live in `triptych_debug`.

use crate::panel::{Extent, PanelId};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which step of one panel's frame is starting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PanelPhase {
    /// Waiting on the frame slot's fence.
    Wait,
    /// Acquiring the next presentable image.
    Acquire,
    /// Taking the shared image's write lock.
    Lock,
    /// Issuing backend-native draw calls.
    Render,
    /// Releasing the shared image's write lock (and flushing).
    Unlock,
    /// Reading the offscreen image back into host memory.
    Readback,
    /// Writing host rows into the display staging texture.
    Stage,
    /// Copying the staging texture into the presentable image.
    Copy,
    /// Submitting queued work and signaling the slot fence.
    Submit,
    /// Presenting the image to the compositor.
    Present,
}

impl PanelPhase {
    /// All phases, in the order a single frame can visit them.
    pub const ALL: [Self; 10] = [
        Self::Wait,
        Self::Acquire,
        Self::Lock,
        Self::Render,
        Self::Unlock,
        Self::Readback,
        Self::Stage,
        Self::Copy,
        Self::Submit,
        Self::Present,
    ];

    /// Short lowercase name used by text and JSON sinks.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Wait => "wait",
            Self::Acquire => "acquire",
            Self::Lock => "lock",
            Self::Render => "render",
            Self::Unlock => "unlock",
            Self::Readback => "readback",
            Self::Stage => "stage",
            Self::Copy => "copy",
            Self::Submit => "submit",
            Self::Present => "present",
        }
    }
}

/// Why a backend's presentable surface was recreated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecreateReason {
    /// The window changed size.
    Resize,
    /// The display API reported the surface as out of date.
    OutOfDate,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted at the start of every non-suspended application frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameBeginEvent {
    /// Application frame counter.
    pub frame_index: u64,
    /// Number of panels that will be driven this frame.
    pub panel_count: u32,
}

/// Marks the start of one step of a panel's frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseEvent {
    /// Application frame counter.
    pub frame_index: u64,
    /// Which panel.
    pub panel: PanelId,
    /// Which step is starting.
    pub phase: PanelPhase,
}

/// Emitted immediately before an image is presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentEvent {
    /// Application frame counter.
    pub frame_index: u64,
    /// Which panel.
    pub panel: PanelId,
    /// Frame slot whose fence guarded the work.
    pub slot: u32,
    /// Swapchain image index being presented.
    pub image: u32,
    /// Fence value signaled by this frame's submission.
    pub fence_value: u64,
    /// Whether that value had been reached when presenting.
    pub fence_signaled: bool,
}

/// Emitted after a CPU bridge copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BridgeCopyEvent {
    /// Application frame counter.
    pub frame_index: u64,
    /// Which panel.
    pub panel: PanelId,
    /// Payload bytes copied (row padding excluded).
    pub bytes: u64,
}

/// Emitted when the orchestrator enters or leaves suspension, or applies a
/// window resize.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResizeEvent {
    /// New window size.
    pub window: Extent,
    /// Whether GPU work is suspended at this size.
    pub suspended: bool,
}

/// Emitted after a backend recreates its presentable surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecreateEvent {
    /// Which panel.
    pub panel: PanelId,
    /// Extent of the new surface.
    pub extent: Extent,
    /// Why the surface was recreated.
    pub reason: RecreateReason,
}

/// Emitted after a panel's visual and backend have been released.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TeardownEvent {
    /// Which panel.
    pub panel: PanelId,
}

/// Emitted at the end of every non-suspended application frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameEndEvent {
    /// Application frame counter.
    pub frame_index: u64,
    /// Panels that presented.
    pub presented: u32,
    /// Panels whose frame was skipped after recreating an out-of-date surface.
    pub skipped: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the frame loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when an application frame starts.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called when a step of one panel's frame starts.
    fn on_phase(&mut self, e: &PhaseEvent) {
        _ = e;
    }

    /// Called right before an image is presented.
    fn on_present(&mut self, e: &PresentEvent) {
        _ = e;
    }

    /// Called after a CPU bridge copy.
    fn on_bridge_copy(&mut self, e: &BridgeCopyEvent) {
        _ = e;
    }

    /// Called when the window size changes what the loop does.
    fn on_resize(&mut self, e: &ResizeEvent) {
        _ = e;
    }

    /// Called after a backend recreates its surface.
    fn on_recreate(&mut self, e: &RecreateEvent) {
        _ = e;
    }

    /// Called after a panel is torn down.
    fn on_teardown(&mut self, e: &TeardownEvent) {
        _ = e;
    }

    /// Called when an application frame ends.
    fn on_frame_end(&mut self, e: &FrameEndEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FrameBeginEvent`].
    #[inline]
    pub fn frame_begin(&mut self, e: &FrameBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEvent`].
    #[inline]
    pub fn phase(&mut self, e: &PhaseEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PresentEvent`].
    #[inline]
    pub fn present(&mut self, e: &PresentEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_present(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`BridgeCopyEvent`].
    #[inline]
    pub fn bridge_copy(&mut self, e: &BridgeCopyEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_bridge_copy(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ResizeEvent`].
    #[inline]
    pub fn resize(&mut self, e: &ResizeEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_resize(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RecreateEvent`].
    #[inline]
    pub fn recreate(&mut self, e: &RecreateEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_recreate(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TeardownEvent`].
    #[inline]
    pub fn teardown(&mut self, e: &TeardownEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_teardown(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameEndEvent`].
    #[inline]
    pub fn frame_end(&mut self, e: &FrameEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingSink {
        phases: u32,
        presents: u32,
    }

    impl TraceSink for CountingSink {
        fn on_phase(&mut self, _e: &PhaseEvent) {
            self.phases += 1;
        }

        fn on_present(&mut self, _e: &PresentEvent) {
            self.presents += 1;
        }
    }

    fn sample_phase() -> PhaseEvent {
        PhaseEvent {
            frame_index: 3,
            panel: PanelId(1),
            phase: PanelPhase::Render,
        }
    }

    #[test]
    fn tracer_none_does_not_panic() {
        let mut tracer = Tracer::none();
        tracer.phase(&sample_phase());
        tracer.frame_end(&FrameEndEvent {
            frame_index: 3,
            presented: 3,
            skipped: 0,
        });
    }

    #[test]
    fn noop_sink_accepts_everything() {
        let mut sink = NoopSink;
        let mut tracer = Tracer::new(&mut sink);
        tracer.phase(&sample_phase());
        tracer.teardown(&TeardownEvent { panel: PanelId(0) });
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        let mut sink = CountingSink::default();
        {
            let mut tracer = Tracer::new(&mut sink);
            tracer.phase(&sample_phase());
            tracer.phase(&sample_phase());
            tracer.present(&PresentEvent {
                frame_index: 3,
                panel: PanelId(1),
                slot: 0,
                image: 1,
                fence_value: 4,
                fence_signaled: true,
            });
        }
        assert_eq!(sink.phases, 2);
        assert_eq!(sink.presents, 1);
    }

    #[cfg(not(feature = "trace"))]
    #[test]
    fn tracer_compiles_away_without_feature() {
        let mut sink = CountingSink::default();
        {
            let mut tracer = Tracer::new(&mut sink);
            tracer.phase(&sample_phase());
        }
        assert_eq!(sink.phases, 0, "dispatch must be disabled without `trace`");
        assert_eq!(sink.presents, 0);
    }

    #[test]
    fn phase_names_are_unique() {
        for (i, a) in PanelPhase::ALL.iter().enumerate() {
            for b in &PanelPhase::ALL[i + 1..] {
                assert_ne!(a.name(), b.name());
            }
        }
    }
}
