// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Timeline fences and fault injection.

use std::cell::Cell;
use std::rc::Rc;

use triptych_core::device::Fence;
use triptych_core::error::{FrameError, Result};

use crate::log::{Op, OpLog};

/// Submitted and completed values of one fence.
#[derive(Debug, Default)]
pub(crate) struct Timeline {
    submitted: Cell<u64>,
    completed: Cell<u64>,
}

impl Timeline {
    pub(crate) fn submit(&self, value: u64) {
        self.submitted.set(self.submitted.get().max(value));
    }

    /// Retires everything submitted so far.
    pub(crate) fn drain(&self) {
        self.completed.set(self.submitted.get());
    }

    pub(crate) fn reached(&self, value: u64) -> bool {
        self.completed.get() >= value
    }
}

#[derive(Debug, Default)]
struct FaultState {
    acquire: Cell<Option<FrameError>>,
    present: Cell<Option<FrameError>>,
    draw: Cell<Option<FrameError>>,
    stalled: Cell<bool>,
}

/// Failure switches shared by every device of one panel.
///
/// The `fail_next_*` switches are one-shot; a stall lasts until cleared.
#[derive(Clone, Debug, Default)]
pub struct SoftFaults(Rc<FaultState>);

impl SoftFaults {
    /// Creates a set with every switch off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The next image acquire fails with `error`.
    pub fn fail_next_acquire(&self, error: FrameError) {
        self.0.acquire.set(Some(error));
    }

    /// The next present fails with `error`.
    pub fn fail_next_present(&self, error: FrameError) {
        self.0.present.set(Some(error));
    }

    /// The next draw, on whichever device of the panel draws, fails with
    /// `error`.
    pub fn fail_next_draw(&self, error: FrameError) {
        self.0.draw.set(Some(error));
    }

    /// While stalled, fence waits return without the GPU making progress,
    /// and idle-waits retire nothing.
    pub fn stall_fences(&self, stalled: bool) {
        self.0.stalled.set(stalled);
    }

    pub(crate) fn take_acquire(&self) -> Result<()> {
        self.0.acquire.take().map_or(Ok(()), Err)
    }

    pub(crate) fn take_present(&self) -> Result<()> {
        self.0.present.take().map_or(Ok(()), Err)
    }

    pub(crate) fn take_draw(&self) -> Result<()> {
        self.0.draw.take().map_or(Ok(()), Err)
    }

    pub(crate) fn is_stalled(&self) -> bool {
        self.0.stalled.get()
    }
}

/// A software timeline fence.
///
/// Work submitted against the fence completes when someone waits for it.
/// Waiting for a value that was never submitted is a device loss.
pub struct SoftFence {
    device: u32,
    id: u32,
    timeline: Rc<Timeline>,
    faults: SoftFaults,
    log: OpLog,
}

impl core::fmt::Debug for SoftFence {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SoftFence")
            .field("device", &self.device)
            .field("id", &self.id)
            .field("timeline", &self.timeline)
            .finish_non_exhaustive()
    }
}

impl SoftFence {
    /// `id` numbers the fences of one device in creation order.
    pub(crate) fn new(device: u32, id: u32, faults: SoftFaults, log: OpLog) -> Self {
        log.push(Op::CreateFence { device, fence: id });
        Self {
            device,
            id,
            timeline: Rc::default(),
            faults,
            log,
        }
    }

    pub(crate) fn timeline(&self) -> &Rc<Timeline> {
        &self.timeline
    }
}

impl Fence for SoftFence {
    fn completed_value(&self) -> u64 {
        self.timeline.completed.get()
    }

    fn wait_for(&self, value: u64) -> Result<()> {
        if self.timeline.reached(value) || self.faults.is_stalled() {
            return Ok(());
        }
        if value > self.timeline.submitted.get() {
            return Err(FrameError::DeviceLost);
        }
        self.timeline.drain();
        Ok(())
    }
}

impl Drop for SoftFence {
    fn drop(&mut self) {
        self.log.push(Op::DestroyFence {
            device: self.device,
            fence: self.id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fence() -> (SoftFence, SoftFaults) {
        let faults = SoftFaults::new();
        (SoftFence::new(0, 0, faults.clone(), OpLog::new()), faults)
    }

    #[test]
    fn waiting_completes_submitted_work() {
        let (fence, _) = fence();
        fence.timeline().submit(3);
        assert!(!fence.is_signaled(3));
        fence.wait_for(3).unwrap();
        assert!(fence.is_signaled(3));
        assert_eq!(fence.completed_value(), 3);
    }

    #[test]
    fn waiting_for_unsubmitted_value_is_device_loss() {
        let (fence, _) = fence();
        fence.timeline().submit(1);
        assert_eq!(fence.wait_for(2), Err(FrameError::DeviceLost));
        assert_eq!(fence.wait_for(0), Ok(()), "value 0 is signaled from creation");
    }

    #[test]
    fn stalled_wait_makes_no_progress() {
        let (fence, faults) = fence();
        fence.timeline().submit(1);
        faults.stall_fences(true);
        fence.wait_for(1).unwrap();
        assert!(!fence.is_signaled(1));
    }

    #[test]
    fn fault_switches_are_one_shot() {
        let faults = SoftFaults::new();
        faults.fail_next_acquire(FrameError::SurfaceOutOfDate);
        assert_eq!(faults.take_acquire(), Err(FrameError::SurfaceOutOfDate));
        assert_eq!(faults.take_acquire(), Ok(()));
    }

    #[test]
    fn create_and_destroy_are_logged() {
        let log = OpLog::new();
        drop(SoftFence::new(4, 7, SoftFaults::new(), log.clone()));
        assert_eq!(
            log.take(),
            [
                Op::CreateFence { device: 4, fence: 7 },
                Op::DestroyFence { device: 4, fence: 7 },
            ]
        );
    }
}
