// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared operation log.

use std::cell::RefCell;
use std::rc::Rc;

use kurbo::{Size, Vec2};
use triptych_core::panel::Extent;

/// Which device of a panel an operation came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// The display device owning the presentable surface.
    Display,
    /// The shared-image renderer of a zero-copy panel.
    Renderer,
    /// The interop device registrations go through.
    Interop,
    /// The offscreen renderer of a CPU-bridge panel.
    Offscreen,
}

/// One device or compositor call, in the order it happened.
///
/// `device` is the id the device was created with; the software triptych
/// uses the panel index, so every device of one panel shares it.
#[expect(missing_docs, reason = "variants are named after the call they record")]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Op {
    CreateFence { device: u32, fence: u32 },
    DestroyFence { device: u32, fence: u32 },
    Acquire { device: u32, image: u32 },
    Draw { device: u32, image: u32 },
    Submit { device: u32, value: u64 },
    Present { device: u32, image: u32, fence_signaled: bool },
    WaitIdle { device: u32, role: Role },
    Recreate { device: u32, role: Role, extent: Extent },
    Register { device: u32, object: u32 },
    Unregister { device: u32, object: u32 },
    Lock { device: u32, object: u32 },
    Unlock { device: u32, object: u32 },
    SharedDraw { device: u32, object: u32 },
    OffscreenDraw { device: u32 },
    Readback { device: u32, bytes: usize },
    Stage { device: u32, bytes: usize },
    CopyStaging { device: u32, image: u32 },
    Release { device: u32, role: Role },
    WrapSurface { surface: usize },
    CreateVisual { visual: u32 },
    SetSize { visual: u32, size: Size },
    SetOffset { visual: u32, offset: Vec2, z: f32 },
    InsertTop { visual: u32 },
    ReleaseVisual { visual: u32 },
}

impl Op {
    /// Device id, or `None` for compositor calls.
    #[must_use]
    pub fn device(&self) -> Option<u32> {
        match *self {
            Self::CreateFence { device, .. }
            | Self::DestroyFence { device, .. }
            | Self::Acquire { device, .. }
            | Self::Draw { device, .. }
            | Self::Submit { device, .. }
            | Self::Present { device, .. }
            | Self::WaitIdle { device, .. }
            | Self::Recreate { device, .. }
            | Self::Register { device, .. }
            | Self::Unregister { device, .. }
            | Self::Lock { device, .. }
            | Self::Unlock { device, .. }
            | Self::SharedDraw { device, .. }
            | Self::OffscreenDraw { device }
            | Self::Readback { device, .. }
            | Self::Stage { device, .. }
            | Self::CopyStaging { device, .. }
            | Self::Release { device, .. } => Some(device),
            Self::WrapSurface { .. }
            | Self::CreateVisual { .. }
            | Self::SetSize { .. }
            | Self::SetOffset { .. }
            | Self::InsertTop { .. }
            | Self::ReleaseVisual { .. } => None,
        }
    }

    /// Whether this is per-frame GPU work: acquiring, drawing, copying,
    /// submitting, or presenting.
    #[must_use]
    pub fn is_frame_work(&self) -> bool {
        matches!(
            self,
            Self::Acquire { .. }
                | Self::Draw { .. }
                | Self::Submit { .. }
                | Self::Present { .. }
                | Self::Lock { .. }
                | Self::Unlock { .. }
                | Self::SharedDraw { .. }
                | Self::OffscreenDraw { .. }
                | Self::Readback { .. }
                | Self::Stage { .. }
                | Self::CopyStaging { .. }
        )
    }

    /// Whether this is a compositor call.
    #[must_use]
    pub fn is_compositor(&self) -> bool {
        self.device().is_none()
    }
}

/// Append-only log shared by every software device of one run.
#[derive(Clone, Debug, Default)]
pub struct OpLog(Rc<RefCell<Vec<Op>>>);

impl OpLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `op`.
    pub fn push(&self, op: Op) {
        self.0.borrow_mut().push(op);
    }

    /// Copies out every recorded operation.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Op> {
        self.0.borrow().clone()
    }

    /// Removes and returns every recorded operation.
    pub fn take(&self) -> Vec<Op> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    /// Number of recorded operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Whether nothing has been recorded since the last [`take`](Self::take).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}
