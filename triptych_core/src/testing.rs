// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-crate fakes for unit tests.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use kurbo::{Size, Vec2};

use crate::backend::{FrameCx, RenderBackend};
use crate::bridge::BridgeStrategy;
use crate::compose::CompositionHost;
use crate::device::{DisplayDevice, Fence, InteropDevice, RawSurface, SurfaceDesc};
use crate::error::{FrameError, Result};
use crate::pacer::AcquiredFrame;
use crate::panel::{Extent, PixelFormat};

// ----- Devices -----

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Op {
    Acquire(u32),
    Submit(u64),
    Present { image: u32, fence_signaled: bool },
    Register(u32),
    Lock(u32),
    Unlock(u32),
    Unregister(u32),
}

#[derive(Debug, Default)]
pub(crate) struct Timeline {
    submitted: Cell<u64>,
    completed: Cell<u64>,
}

/// Completes up to the last submitted value on wait, unless stalled, in
/// which case waits return without progress.
#[derive(Debug)]
pub(crate) struct FakeFence {
    timeline: Rc<Timeline>,
    stalled: Rc<Cell<bool>>,
}

impl Fence for FakeFence {
    fn completed_value(&self) -> u64 {
        self.timeline.completed.get()
    }

    fn wait_for(&self, value: u64) -> Result<()> {
        if self.timeline.completed.get() >= value || self.stalled.get() {
            return Ok(());
        }
        if value > self.timeline.submitted.get() {
            return Err(FrameError::DeviceLost);
        }
        self.timeline.completed.set(self.timeline.submitted.get());
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct FakeDisplay {
    ops: Vec<Op>,
    extent: Extent,
    image_count: u32,
    next_image: u32,
    stalled: Rc<Cell<bool>>,
    acquire_error: Option<FrameError>,
    last_submit: Option<(Rc<Timeline>, u64)>,
}

impl FakeDisplay {
    pub(crate) fn new(extent: Extent, image_count: u32) -> Self {
        Self {
            ops: Vec::new(),
            extent,
            image_count,
            next_image: 0,
            stalled: Rc::default(),
            acquire_error: None,
            last_submit: None,
        }
    }

    pub(crate) fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub(crate) fn stall_fences(&mut self) {
        self.stalled.set(true);
    }

    pub(crate) fn fail_next_acquire(&mut self, error: FrameError) {
        self.acquire_error = Some(error);
    }
}

impl DisplayDevice for FakeDisplay {
    type Fence = FakeFence;

    fn create_fence(&mut self) -> Result<FakeFence> {
        Ok(FakeFence {
            timeline: Rc::default(),
            stalled: Rc::clone(&self.stalled),
        })
    }

    fn surface(&self) -> SurfaceDesc {
        SurfaceDesc {
            extent: self.extent,
            format: PixelFormat::Bgra8Unorm,
            image_count: self.image_count,
        }
    }

    fn raw_surface(&self) -> RawSurface {
        RawSurface(core::ptr::null_mut())
    }

    fn acquire_next_image(&mut self) -> Result<u32> {
        if let Some(e) = self.acquire_error.take() {
            return Err(e);
        }
        let image = self.next_image;
        self.next_image = (image + 1) % self.image_count;
        self.ops.push(Op::Acquire(image));
        Ok(image)
    }

    fn submit(&mut self, fence: &FakeFence, value: u64) -> Result<()> {
        fence.timeline.submitted.set(value);
        self.last_submit = Some((Rc::clone(&fence.timeline), value));
        self.ops.push(Op::Submit(value));
        Ok(())
    }

    fn present(&mut self, image: u32) -> Result<()> {
        let fence_signaled = self
            .last_submit
            .as_ref()
            .is_some_and(|(t, v)| t.completed.get() >= *v);
        self.ops.push(Op::Present {
            image,
            fence_signaled,
        });
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        Ok(())
    }

    fn recreate_surface(&mut self, extent: Extent) -> Result<()> {
        self.extent = extent;
        self.next_image = 0;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeInterop {
    ops: RefCell<Vec<Op>>,
    pub(crate) fail_next_lock: Cell<bool>,
}

impl FakeInterop {
    pub(crate) fn ops(&self) -> Vec<Op> {
        self.ops.borrow().clone()
    }
}

impl InteropDevice for FakeInterop {
    type Image = u32;
    type Object = u32;

    fn register(&self, image: &u32, _extent: Extent) -> Result<u32> {
        self.ops.borrow_mut().push(Op::Register(*image));
        Ok(*image)
    }

    fn unregister(&self, object: &u32) {
        self.ops.borrow_mut().push(Op::Unregister(*object));
    }

    fn lock(&self, object: &u32) -> Result<()> {
        if self.fail_next_lock.replace(false) {
            return Err(FrameError::InteropFailed { code: -1 });
        }
        self.ops.borrow_mut().push(Op::Lock(*object));
        Ok(())
    }

    fn unlock(&self, object: &u32) -> Result<()> {
        self.ops.borrow_mut().push(Op::Unlock(*object));
        Ok(())
    }
}

// ----- Compositor -----

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum HostOp {
    Wrap(u32),
    CreateVisual(u32),
    SetSize(u32, Size),
    SetOffset(u32, Vec2),
    InsertTop(u32),
    Release(u32),
}

#[derive(Debug, Default)]
pub(crate) struct FakeHost {
    pub(crate) ops: Vec<HostOp>,
    surfaces: u32,
    visuals: u32,
}

impl CompositionHost for FakeHost {
    type Surface = u32;
    type Visual = u32;

    fn wrap_surface(&mut self, _raw: RawSurface) -> Result<u32> {
        let id = self.surfaces;
        self.surfaces += 1;
        self.ops.push(HostOp::Wrap(id));
        Ok(id)
    }

    fn create_visual(&mut self, _surface: &u32) -> Result<u32> {
        let id = self.visuals;
        self.visuals += 1;
        self.ops.push(HostOp::CreateVisual(id));
        Ok(id)
    }

    fn set_size(&mut self, visual: &u32, size: Size) -> Result<()> {
        self.ops.push(HostOp::SetSize(*visual, size));
        Ok(())
    }

    fn set_offset(&mut self, visual: &u32, offset: Vec2, _z: f32) -> Result<()> {
        self.ops.push(HostOp::SetOffset(*visual, offset));
        Ok(())
    }

    fn insert_top(&mut self, visual: &u32) -> Result<()> {
        self.ops.push(HostOp::InsertTop(*visual));
        Ok(())
    }

    fn release(&mut self, visual: u32, _surface: u32) {
        self.ops.push(HostOp::Release(visual));
    }
}

// ----- Scripted backend -----

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    Acquire(u32),
    Render(u32),
    Bridge(u32),
    Present(u32),
    Abandon(u32),
    Resize(u32, Extent),
    WaitIdle(u32),
    Drop(u32),
}

#[derive(Debug, Default)]
struct LogInner {
    steps: Vec<Step>,
    failures: Vec<(Step, FrameError)>,
}

/// Shared step log with one-shot failure injection.
#[derive(Clone, Debug, Default)]
pub(crate) struct Log(Rc<RefCell<LogInner>>);

impl Log {
    pub(crate) fn take(&self) -> Vec<Step> {
        core::mem::take(&mut self.0.borrow_mut().steps)
    }

    pub(crate) fn fail(&self, step: Step, error: FrameError) {
        self.0.borrow_mut().failures.push((step, error));
    }

    fn record(&self, step: Step) -> Result<()> {
        let mut inner = self.0.borrow_mut();
        inner.steps.push(step);
        match inner.failures.iter().position(|(s, _)| *s == step) {
            Some(i) => Err(inner.failures.remove(i).1),
            None => Ok(()),
        }
    }
}

#[derive(Debug)]
pub(crate) struct FakeBackend {
    id: u32,
    extent: Extent,
    log: Log,
}

impl FakeBackend {
    pub(crate) fn new(id: u32, extent: Extent, log: Log) -> Self {
        Self { id, extent, log }
    }
}

impl RenderBackend for FakeBackend {
    fn strategy(&self) -> BridgeStrategy {
        BridgeStrategy::Native
    }

    fn surface(&self) -> SurfaceDesc {
        SurfaceDesc {
            extent: self.extent,
            format: PixelFormat::Bgra8Unorm,
            image_count: 2,
        }
    }

    fn raw_surface(&self) -> RawSurface {
        RawSurface(core::ptr::without_provenance_mut(self.id as usize + 1))
    }

    fn acquire_surface(&mut self, cx: &mut FrameCx<'_, '_>) -> Result<AcquiredFrame> {
        self.log.record(Step::Acquire(self.id))?;
        Ok(AcquiredFrame::new(0, 0, cx.frame_index))
    }

    fn render_frame(&mut self, _frame: &AcquiredFrame, _cx: &mut FrameCx<'_, '_>) -> Result<()> {
        self.log.record(Step::Render(self.id))
    }

    fn bridge(&mut self, _frame: &AcquiredFrame, _cx: &mut FrameCx<'_, '_>) -> Result<()> {
        self.log.record(Step::Bridge(self.id))
    }

    fn present(&mut self, _frame: AcquiredFrame, _cx: &mut FrameCx<'_, '_>) -> Result<()> {
        self.log.record(Step::Present(self.id))
    }

    fn abandon(&mut self, _frame: AcquiredFrame) {
        _ = self.log.record(Step::Abandon(self.id));
    }

    fn resize(&mut self, extent: Extent) -> Result<()> {
        self.log.record(Step::Resize(self.id, extent))?;
        self.extent = extent;
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.log.record(Step::WaitIdle(self.id))
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        _ = self.log.record(Step::Drop(self.id));
    }
}
