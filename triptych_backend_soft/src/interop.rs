// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Zero-copy sharing between two software APIs.
//!
//! [`SoftInterop`] plays the role of an interop extension: it registers a
//! display image under a second API and hands out [`SoftObject`]s that
//! alias the same memory. [`SoftSharedRenderer`] draws through those
//! objects.

use std::cell::Cell;
use std::rc::Rc;

use triptych_core::device::{InteropDevice, SharedRenderer};
use triptych_core::error::{FrameError, Result};
use triptych_core::panel::Extent;
use triptych_core::shared::SharedWriteLock;

use crate::fence::SoftFaults;
use crate::image::SharedImage;
use crate::log::{Op, OpLog, Role};
use crate::raster::Triangle;
use crate::triptych::BACKGROUND;

/// A display image as seen by the rendering API.
#[derive(Clone, Debug)]
pub struct SoftObject {
    id: u32,
    image: SharedImage,
}

impl SoftObject {
    /// Registration id, unique per interop device.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The aliased display image.
    #[must_use]
    pub fn image(&self) -> &SharedImage {
        &self.image
    }
}

/// Software interop device.
pub struct SoftInterop {
    device: u32,
    next_object: Cell<u32>,
    log: OpLog,
}

impl core::fmt::Debug for SoftInterop {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SoftInterop")
            .field("device", &self.device)
            .field("next_object", &self.next_object.get())
            .finish_non_exhaustive()
    }
}

impl SoftInterop {
    /// Creates an interop device logging under device id `device`.
    #[must_use]
    pub fn new(device: u32, log: OpLog) -> Self {
        Self {
            device,
            next_object: Cell::new(0),
            log,
        }
    }
}

impl InteropDevice for SoftInterop {
    type Image = SharedImage;
    type Object = SoftObject;

    fn register(&self, image: &SharedImage, extent: Extent) -> Result<SoftObject> {
        let actual = image.borrow().extent();
        if actual != extent {
            return Err(FrameError::ExtentMismatch {
                expected: extent,
                actual,
            });
        }
        let id = self.next_object.get();
        self.next_object.set(id + 1);
        self.log.push(Op::Register {
            device: self.device,
            object: id,
        });
        Ok(SoftObject {
            id,
            image: Rc::clone(image),
        })
    }

    fn unregister(&self, object: &SoftObject) {
        self.log.push(Op::Unregister {
            device: self.device,
            object: object.id,
        });
    }

    fn lock(&self, object: &SoftObject) -> Result<()> {
        self.log.push(Op::Lock {
            device: self.device,
            object: object.id,
        });
        Ok(())
    }

    fn unlock(&self, object: &SoftObject) -> Result<()> {
        self.log.push(Op::Unlock {
            device: self.device,
            object: object.id,
        });
        Ok(())
    }
}

impl Drop for SoftInterop {
    fn drop(&mut self) {
        self.log.push(Op::Release {
            device: self.device,
            role: Role::Interop,
        });
    }
}

/// Draws a triangle into shared images.
pub struct SoftSharedRenderer {
    device: u32,
    interop: Rc<SoftInterop>,
    extent: Extent,
    scene: Triangle,
    faults: SoftFaults,
    log: OpLog,
}

impl core::fmt::Debug for SoftSharedRenderer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SoftSharedRenderer")
            .field("device", &self.device)
            .field("extent", &self.extent)
            .finish_non_exhaustive()
    }
}

impl SoftSharedRenderer {
    /// Creates a renderer, and its interop device, for `extent`-sized
    /// targets.
    #[must_use]
    pub fn new(device: u32, extent: Extent, scene: Triangle, faults: SoftFaults, log: OpLog) -> Self {
        Self {
            device,
            interop: Rc::new(SoftInterop::new(device, log.clone())),
            extent,
            scene,
            faults,
            log,
        }
    }
}

impl SharedRenderer for SoftSharedRenderer {
    type Interop = SoftInterop;

    fn interop(&self) -> &Rc<SoftInterop> {
        &self.interop
    }

    fn draw(&mut self, target: &SharedWriteLock<SoftInterop>, _frame_index: u64) -> Result<()> {
        self.faults.take_draw()?;
        let object = target.object();
        let mut image = object.image.borrow_mut();
        if image.extent() != self.extent {
            return Err(FrameError::ExtentMismatch {
                expected: image.extent(),
                actual: self.extent,
            });
        }
        self.scene.draw(&mut image, BACKGROUND);
        self.log.push(Op::SharedDraw {
            device: self.device,
            object: object.id,
        });
        Ok(())
    }

    fn resize(&mut self, extent: Extent) -> Result<()> {
        self.extent = extent;
        self.log.push(Op::Recreate {
            device: self.device,
            role: Role::Renderer,
            extent,
        });
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.log.push(Op::WaitIdle {
            device: self.device,
            role: Role::Renderer,
        });
        Ok(())
    }
}

impl Drop for SoftSharedRenderer {
    fn drop(&mut self) {
        self.log.push(Op::Release {
            device: self.device,
            role: Role::Renderer,
        });
    }
}
