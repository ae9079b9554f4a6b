// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use triptych_core::panel::Extent;
use triptych_core::trace::{
    BridgeCopyEvent, FrameBeginEvent, FrameEndEvent, PhaseEvent, PresentEvent, RecreateEvent,
    RecreateReason, ResizeEvent, TeardownEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    phases: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("phases", &self.phases)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self {
            writer,
            phases: true,
        }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            phases: true,
        }
    }

    /// Whether per-phase lines are written. On by default; turning them off
    /// leaves roughly one line per panel per frame.
    #[must_use]
    pub fn with_phases(mut self, phases: bool) -> Self {
        self.phases = phases;
        self
    }

    /// Consumes the sink and returns its writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn extent(e: Extent) -> String {
    format!("{}x{}", e.width, e.height)
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[frame:begin] frame={} panels={}",
            e.frame_index, e.panel_count,
        );
    }

    fn on_phase(&mut self, e: &PhaseEvent) {
        if self.phases {
            let _ = writeln!(
                self.writer,
                "[phase] frame={} panel={} {}",
                e.frame_index,
                e.panel.0,
                e.phase.name(),
            );
        }
    }

    fn on_present(&mut self, e: &PresentEvent) {
        let fence = if e.fence_signaled { "signaled" } else { "PENDING" };
        let _ = writeln!(
            self.writer,
            "[present] frame={} panel={} slot={} image={} fence={}:{fence}",
            e.frame_index, e.panel.0, e.slot, e.image, e.fence_value,
        );
    }

    fn on_bridge_copy(&mut self, e: &BridgeCopyEvent) {
        let _ = writeln!(
            self.writer,
            "[bridge] frame={} panel={} bytes={}",
            e.frame_index, e.panel.0, e.bytes,
        );
    }

    fn on_resize(&mut self, e: &ResizeEvent) {
        let state = if e.suspended { "suspended" } else { "active" };
        let _ = writeln!(
            self.writer,
            "[resize] window={} {state}",
            extent(e.window),
        );
    }

    fn on_recreate(&mut self, e: &RecreateEvent) {
        let reason = match e.reason {
            RecreateReason::Resize => "resize",
            RecreateReason::OutOfDate => "out-of-date",
        };
        let _ = writeln!(
            self.writer,
            "[recreate] panel={} extent={} reason={reason}",
            e.panel.0,
            extent(e.extent),
        );
    }

    fn on_teardown(&mut self, e: &TeardownEvent) {
        let _ = writeln!(self.writer, "[teardown] panel={}", e.panel.0);
    }

    fn on_frame_end(&mut self, e: &FrameEndEvent) {
        let _ = writeln!(
            self.writer,
            "[frame:end] frame={} presented={} skipped={}",
            e.frame_index, e.presented, e.skipped,
        );
    }
}

#[cfg(test)]
mod tests {
    use triptych_core::panel::PanelId;
    use triptych_core::trace::PanelPhase;

    use super::*;

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn present_line_shows_fence_state() {
        let mut sink = PrettyPrintSink::with_writer(Vec::new());
        sink.on_present(&PresentEvent {
            frame_index: 4,
            panel: PanelId(2),
            slot: 1,
            image: 0,
            fence_value: 9,
            fence_signaled: true,
        });
        assert_eq!(
            output(sink),
            "[present] frame=4 panel=2 slot=1 image=0 fence=9:signaled\n"
        );
    }

    #[test]
    fn phases_can_be_silenced() {
        let mut sink = PrettyPrintSink::with_writer(Vec::new()).with_phases(false);
        sink.on_phase(&PhaseEvent {
            frame_index: 0,
            panel: PanelId(0),
            phase: PanelPhase::Render,
        });
        sink.on_resize(&ResizeEvent {
            window: Extent::new(0, 480),
            suspended: true,
        });
        assert_eq!(output(sink), "[resize] window=0x480 suspended\n");
    }

    #[test]
    fn recreate_line_names_reason() {
        let mut sink = PrettyPrintSink::with_writer(Vec::new());
        sink.on_recreate(&RecreateEvent {
            panel: PanelId(1),
            extent: Extent::new(400, 600),
            reason: RecreateReason::OutOfDate,
        });
        assert_eq!(
            output(sink),
            "[recreate] panel=1 extent=400x600 reason=out-of-date\n"
        );
    }
}
