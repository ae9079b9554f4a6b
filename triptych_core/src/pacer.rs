// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fence discipline for one backend.
//!
//! A [`FramePacer`] owns a small ring of [`FrameSlot`]s, each with its own
//! fence. Every frame walks one slot through
//!
//! ```text
//!   Idle ──▶ Waiting ──▶ Acquired ──▶ Submitted ──▶ Presented ──▶ (reused)
//!              │             │
//!              └── failure ──┴──▶ Idle
//! ```
//!
//! [`begin_frame`](FramePacer::begin_frame) waits until the slot's previous
//! submission has retired and acquires the next swapchain image.
//! [`end_frame`](FramePacer::end_frame) submits with a fresh fence value,
//! waits for that value, and only then presents. An image is therefore never
//! presented while the work that filled it is in flight.
//!
//! Pacers of different backends are independent; there is no cross-backend
//! ordering.

use alloc::vec::Vec;
use core::fmt;

use crate::backend::FrameCx;
use crate::config::PacerConfig;
use crate::device::{DisplayDevice, Fence};
use crate::error::{FrameError, Result};
use crate::trace::{PanelPhase, PresentEvent};

/// Where a frame slot is in its cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotState {
    /// Never used, or reset after a failure or idle wait.
    Idle,
    /// Waiting on the fence of the slot's previous submission.
    Waiting,
    /// An image has been acquired for this slot's frame.
    Acquired,
    /// Work has been submitted and the fence will reach `pending`.
    Submitted,
    /// The frame was presented; reusable once its fence is reached.
    Presented,
}

/// One ring entry: a fence plus the value its last submission signals.
pub struct FrameSlot<F> {
    fence: F,
    pending: u64,
    state: SlotState,
}

impl<F> fmt::Debug for FrameSlot<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSlot")
            .field("pending", &self.pending)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<F> FrameSlot<F> {
    /// The slot's fence.
    #[must_use]
    pub fn fence(&self) -> &F {
        &self.fence
    }

    /// Fence value the slot's last submission signals.
    #[must_use]
    pub fn pending(&self) -> u64 {
        self.pending
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SlotState {
        self.state
    }
}

/// Token for a frame between [`FramePacer::begin_frame`] and
/// [`FramePacer::end_frame`].
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an acquired frame must be presented or abandoned"]
pub struct AcquiredFrame {
    slot: u32,
    image: u32,
    frame_index: u64,
}

impl AcquiredFrame {
    #[cfg(test)]
    pub(crate) fn new(slot: u32, image: u32, frame_index: u64) -> Self {
        Self {
            slot,
            image,
            frame_index,
        }
    }

    /// Ring slot guarding this frame.
    #[must_use]
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Swapchain image to render into and present.
    #[must_use]
    pub fn image(&self) -> u32 {
        self.image
    }

    /// Application frame counter.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }
}

/// Per-backend ring of fenced frame slots.
pub struct FramePacer<F> {
    slots: Vec<FrameSlot<F>>,
    cursor: usize,
    next_value: u64,
}

impl<F> fmt::Debug for FramePacer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramePacer")
            .field("slots", &self.slots)
            .field("cursor", &self.cursor)
            .field("next_value", &self.next_value)
            .finish()
    }
}

// Fences are released newest first.
impl<F> Drop for FramePacer<F> {
    fn drop(&mut self) {
        while let Some(slot) = self.slots.pop() {
            drop(slot);
        }
    }
}

impl<F: Fence> FramePacer<F> {
    /// Creates one fence per configured slot on `device`.
    ///
    /// # Errors
    ///
    /// Returns the device's fence creation error.
    pub fn new<D>(device: &mut D, config: PacerConfig) -> Result<Self>
    where
        D: DisplayDevice<Fence = F> + ?Sized,
    {
        let mut slots = Vec::with_capacity(config.slot_count());
        for _ in 0..config.slot_count() {
            slots.push(FrameSlot {
                fence: device.create_fence()?,
                pending: 0,
                state: SlotState::Idle,
            });
        }
        Ok(Self {
            slots,
            cursor: 0,
            next_value: 0,
        })
    }

    /// Number of ring slots.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// The slot at `index`.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&FrameSlot<F>> {
        self.slots.get(index)
    }

    /// Index of the slot the next frame will use.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Last fence value handed to a submission.
    #[must_use]
    pub fn last_value(&self) -> u64 {
        self.next_value
    }

    /// Waits for the current slot's previous work and acquires an image.
    ///
    /// # Errors
    ///
    /// The fence wait or acquire error; the slot is returned to
    /// [`SlotState::Idle`].
    pub fn begin_frame<D>(
        &mut self,
        device: &mut D,
        cx: &mut FrameCx<'_, '_>,
    ) -> Result<AcquiredFrame>
    where
        D: DisplayDevice<Fence = F> + ?Sized,
    {
        let index = self.cursor;
        let slot = &mut self.slots[index];
        slot.state = SlotState::Waiting;
        cx.phase(PanelPhase::Wait);
        if let Err(e) = slot.fence.wait_for(slot.pending) {
            slot.state = SlotState::Idle;
            return Err(e);
        }
        cx.phase(PanelPhase::Acquire);
        match device.acquire_next_image() {
            Ok(image) => {
                slot.state = SlotState::Acquired;
                Ok(AcquiredFrame {
                    slot: slot_index(index),
                    image,
                    frame_index: cx.frame_index,
                })
            }
            Err(e) => {
                slot.state = SlotState::Idle;
                Err(e)
            }
        }
    }

    /// Submits the frame, waits for its fence value, and presents.
    ///
    /// # Errors
    ///
    /// The submit, wait, or present error. [`FrameError::DeviceLost`] if the
    /// fence reports its value unreached after the wait returns.
    pub fn end_frame<D>(
        &mut self,
        device: &mut D,
        frame: AcquiredFrame,
        cx: &mut FrameCx<'_, '_>,
    ) -> Result<()>
    where
        D: DisplayDevice<Fence = F> + ?Sized,
    {
        self.next_value += 1;
        let value = self.next_value;
        let index = frame.slot as usize;
        let slot = &mut self.slots[index];

        cx.phase(PanelPhase::Submit);
        if let Err(e) = device.submit(&slot.fence, value) {
            slot.state = SlotState::Idle;
            return Err(e);
        }
        slot.pending = value;
        slot.state = SlotState::Submitted;

        slot.fence.wait_for(value)?;
        let fence_signaled = slot.fence.is_signaled(value);
        if !fence_signaled {
            return Err(FrameError::DeviceLost);
        }

        cx.tracer.present(&PresentEvent {
            frame_index: cx.frame_index,
            panel: cx.panel,
            slot: frame.slot,
            image: frame.image,
            fence_value: value,
            fence_signaled,
        });
        cx.phase(PanelPhase::Present);
        let presented = device.present(frame.image);
        slot.state = if presented.is_ok() {
            SlotState::Presented
        } else {
            SlotState::Idle
        };
        self.cursor = (index + 1) % self.slots.len();
        presented
    }

    /// Returns an acquired frame's slot to [`SlotState::Idle`] without
    /// submitting.
    pub fn abandon(&mut self, frame: AcquiredFrame) {
        if let Some(slot) = self.slots.get_mut(frame.slot as usize) {
            slot.state = SlotState::Idle;
        }
    }

    /// Waits for every slot's last submission and resets all slots to
    /// [`SlotState::Idle`].
    ///
    /// # Errors
    ///
    /// The first fence wait error.
    pub fn wait_all(&mut self) -> Result<()> {
        for slot in &mut self.slots {
            slot.fence.wait_for(slot.pending)?;
            slot.state = SlotState::Idle;
        }
        Ok(())
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "slot counts come from a u32 config value"
)]
const fn slot_index(index: usize) -> u32 {
    index as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::{Extent, PanelId};
    use crate::testing::{FakeDisplay, Op};
    use crate::trace::Tracer;

    fn run_frame(
        pacer: &mut FramePacer<<FakeDisplay as DisplayDevice>::Fence>,
        display: &mut FakeDisplay,
        frame_index: u64,
    ) -> Result<AcquiredFrame> {
        let mut tracer = Tracer::none();
        let mut cx = FrameCx::new(PanelId(0), frame_index, &mut tracer);
        let frame = pacer.begin_frame(display, &mut cx)?;
        let token = AcquiredFrame {
            slot: frame.slot,
            image: frame.image,
            frame_index: frame.frame_index,
        };
        pacer.end_frame(display, frame, &mut cx)?;
        Ok(token)
    }

    #[test]
    fn slots_rotate_and_values_increase() {
        let mut display = FakeDisplay::new(Extent::new(8, 8), 2);
        let mut pacer = FramePacer::new(&mut display, PacerConfig::double_buffered()).unwrap();
        let a = run_frame(&mut pacer, &mut display, 0).unwrap();
        let b = run_frame(&mut pacer, &mut display, 1).unwrap();
        let c = run_frame(&mut pacer, &mut display, 2).unwrap();
        assert_eq!([a.slot(), b.slot(), c.slot()], [0, 1, 0]);
        assert_eq!(pacer.slot(0).unwrap().pending(), 3);
        assert_eq!(pacer.slot(1).unwrap().pending(), 2);
        assert_eq!(pacer.slot(1).unwrap().state(), SlotState::Presented);
    }

    #[test]
    fn present_follows_signaled_submit() {
        let mut display = FakeDisplay::new(Extent::new(8, 8), 2);
        let mut pacer = FramePacer::new(&mut display, PacerConfig::double_buffered()).unwrap();
        run_frame(&mut pacer, &mut display, 0).unwrap();
        assert_eq!(
            display.ops(),
            [
                Op::Acquire(0),
                Op::Submit(1),
                Op::Present {
                    image: 0,
                    fence_signaled: true,
                },
            ]
        );
    }

    #[test]
    fn stuck_fence_never_presents() {
        let mut display = FakeDisplay::new(Extent::new(8, 8), 2);
        let mut pacer = FramePacer::new(&mut display, PacerConfig::double_buffered()).unwrap();
        display.stall_fences();
        assert_eq!(
            run_frame(&mut pacer, &mut display, 0).unwrap_err(),
            FrameError::DeviceLost
        );
        assert!(
            !display
                .ops()
                .iter()
                .any(|op| matches!(op, Op::Present { .. })),
            "an unsignaled frame must not be presented"
        );
    }

    #[test]
    fn failed_acquire_returns_slot_to_idle() {
        let mut display = FakeDisplay::new(Extent::new(8, 8), 2);
        let mut pacer = FramePacer::new(&mut display, PacerConfig::double_buffered()).unwrap();
        display.fail_next_acquire(FrameError::SurfaceOutOfDate);
        assert_eq!(
            run_frame(&mut pacer, &mut display, 0).unwrap_err(),
            FrameError::SurfaceOutOfDate
        );
        assert_eq!(pacer.slot(0).unwrap().state(), SlotState::Idle);
        assert_eq!(pacer.cursor(), 0);
        assert!(run_frame(&mut pacer, &mut display, 1).is_ok());
    }

    #[test]
    fn single_slot_reuses_its_fence() {
        let mut display = FakeDisplay::new(Extent::new(8, 8), 2);
        let mut pacer = FramePacer::new(&mut display, PacerConfig { slots: 0 }).unwrap();
        assert_eq!(pacer.slot_count(), 1);
        for i in 0..3 {
            assert_eq!(run_frame(&mut pacer, &mut display, i).unwrap().slot(), 0);
        }
        assert_eq!(pacer.last_value(), 3);
    }

    #[test]
    fn wait_all_resets_slots() {
        let mut display = FakeDisplay::new(Extent::new(8, 8), 2);
        let mut pacer = FramePacer::new(&mut display, PacerConfig::double_buffered()).unwrap();
        run_frame(&mut pacer, &mut display, 0).unwrap();
        pacer.wait_all().unwrap();
        assert_eq!(pacer.slot(0).unwrap().state(), SlotState::Idle);
    }
}
