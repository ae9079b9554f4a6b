// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, each starting with a
//! one-byte tag. [`decode`] reads them back as an iterator of
//! [`RecordedEvent`]; an unknown tag or a truncated record ends iteration.

use triptych_core::panel::{Extent, PanelId};
use triptych_core::trace::{
    BridgeCopyEvent, FrameBeginEvent, FrameEndEvent, PanelPhase, PhaseEvent, PresentEvent,
    RecreateEvent, RecreateReason, ResizeEvent, TeardownEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME_BEGIN: u8 = 1;
const TAG_PHASE: u8 = 2;
const TAG_PRESENT: u8 = 3;
const TAG_BRIDGE_COPY: u8 = 4;
const TAG_RESIZE: u8 = 5;
const TAG_RECREATE: u8 = 6;
const TAG_TEARDOWN: u8 = 7;
const TAG_FRAME_END: u8 = 8;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Decodes everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        decode(&self.buf).collect()
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_extent(&mut self, e: Extent) {
        self.write_u32(e.width);
        self.write_u32(e.height);
    }

    fn write_phase(&mut self, p: PanelPhase) {
        self.write_u8(match p {
            PanelPhase::Wait => 0,
            PanelPhase::Acquire => 1,
            PanelPhase::Lock => 2,
            PanelPhase::Render => 3,
            PanelPhase::Unlock => 4,
            PanelPhase::Readback => 5,
            PanelPhase::Stage => 6,
            PanelPhase::Copy => 7,
            PanelPhase::Submit => 8,
            PanelPhase::Present => 9,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.write_u8(TAG_FRAME_BEGIN);
        self.write_u64(e.frame_index);
        self.write_u32(e.panel_count);
    }

    fn on_phase(&mut self, e: &PhaseEvent) {
        self.write_u8(TAG_PHASE);
        self.write_u64(e.frame_index);
        self.write_u32(e.panel.0);
        self.write_phase(e.phase);
    }

    fn on_present(&mut self, e: &PresentEvent) {
        self.write_u8(TAG_PRESENT);
        self.write_u64(e.frame_index);
        self.write_u32(e.panel.0);
        self.write_u32(e.slot);
        self.write_u32(e.image);
        self.write_u64(e.fence_value);
        self.write_u8(u8::from(e.fence_signaled));
    }

    fn on_bridge_copy(&mut self, e: &BridgeCopyEvent) {
        self.write_u8(TAG_BRIDGE_COPY);
        self.write_u64(e.frame_index);
        self.write_u32(e.panel.0);
        self.write_u64(e.bytes);
    }

    fn on_resize(&mut self, e: &ResizeEvent) {
        self.write_u8(TAG_RESIZE);
        self.write_extent(e.window);
        self.write_u8(u8::from(e.suspended));
    }

    fn on_recreate(&mut self, e: &RecreateEvent) {
        self.write_u8(TAG_RECREATE);
        self.write_u32(e.panel.0);
        self.write_extent(e.extent);
        self.write_u8(match e.reason {
            RecreateReason::Resize => 0,
            RecreateReason::OutOfDate => 1,
        });
    }

    fn on_teardown(&mut self, e: &TeardownEvent) {
        self.write_u8(TAG_TEARDOWN);
        self.write_u32(e.panel.0);
    }

    fn on_frame_end(&mut self, e: &FrameEndEvent) {
        self.write_u8(TAG_FRAME_END);
        self.write_u64(e.frame_index);
        self.write_u32(e.presented);
        self.write_u32(e.skipped);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// A [`FrameBeginEvent`].
    FrameBegin(FrameBeginEvent),
    /// A [`PhaseEvent`].
    Phase(PhaseEvent),
    /// A [`PresentEvent`].
    Present(PresentEvent),
    /// A [`BridgeCopyEvent`].
    BridgeCopy(BridgeCopyEvent),
    /// A [`ResizeEvent`].
    Resize(ResizeEvent),
    /// A [`RecreateEvent`].
    Recreate(RecreateEvent),
    /// A [`TeardownEvent`].
    Teardown(TeardownEvent),
    /// A [`FrameEndEvent`].
    FrameEnd(FrameEndEvent),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_bool(&mut self) -> Option<bool> {
        self.read_u8().map(|b| b != 0)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_panel(&mut self) -> Option<PanelId> {
        self.read_u32().map(PanelId)
    }

    fn read_extent(&mut self) -> Option<Extent> {
        Some(Extent::new(self.read_u32()?, self.read_u32()?))
    }

    fn read_phase(&mut self) -> Option<PanelPhase> {
        PanelPhase::ALL.get(usize::from(self.read_u8()?)).copied()
    }

    fn decode_frame_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameBegin(FrameBeginEvent {
            frame_index: self.read_u64()?,
            panel_count: self.read_u32()?,
        }))
    }

    fn decode_phase(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Phase(PhaseEvent {
            frame_index: self.read_u64()?,
            panel: self.read_panel()?,
            phase: self.read_phase()?,
        }))
    }

    fn decode_present(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Present(PresentEvent {
            frame_index: self.read_u64()?,
            panel: self.read_panel()?,
            slot: self.read_u32()?,
            image: self.read_u32()?,
            fence_value: self.read_u64()?,
            fence_signaled: self.read_bool()?,
        }))
    }

    fn decode_bridge_copy(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::BridgeCopy(BridgeCopyEvent {
            frame_index: self.read_u64()?,
            panel: self.read_panel()?,
            bytes: self.read_u64()?,
        }))
    }

    fn decode_resize(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Resize(ResizeEvent {
            window: self.read_extent()?,
            suspended: self.read_bool()?,
        }))
    }

    fn decode_recreate(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Recreate(RecreateEvent {
            panel: self.read_panel()?,
            extent: self.read_extent()?,
            reason: match self.read_u8()? {
                0 => RecreateReason::Resize,
                _ => RecreateReason::OutOfDate,
            },
        }))
    }

    fn decode_frame_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameEnd(FrameEndEvent {
            frame_index: self.read_u64()?,
            presented: self.read_u32()?,
            skipped: self.read_u32()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_FRAME_BEGIN => self.decode_frame_begin(),
            TAG_PHASE => self.decode_phase(),
            TAG_PRESENT => self.decode_present(),
            TAG_BRIDGE_COPY => self.decode_bridge_copy(),
            TAG_RESIZE => self.decode_resize(),
            TAG_RECREATE => self.decode_recreate(),
            TAG_TEARDOWN => Some(RecordedEvent::Teardown(TeardownEvent {
                panel: self.read_panel()?,
            })),
            TAG_FRAME_END => self.decode_frame_end(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
