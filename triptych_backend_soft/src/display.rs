// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software display device.

use std::cell::RefCell;
use std::rc::Rc;

use triptych_core::bridge::{ImageLayout, copy_rows};
use triptych_core::device::{
    DisplayDevice, InteropDisplay, NativeRenderer, RawSurface, StagingTarget, SurfaceDesc,
};
use triptych_core::error::{FrameError, Result, SetupStage};
use triptych_core::panel::{Extent, PixelFormat};

use crate::fence::{SoftFaults, SoftFence, Timeline};
use crate::image::{SharedImage, SoftImage};
use crate::log::{Op, OpLog, Role};
use crate::raster::Triangle;
use crate::triptych::BACKGROUND;

/// Row alignment of the staging texture, matching D3D12's
/// `D3D12_TEXTURE_DATA_PITCH_ALIGNMENT`.
const STAGING_ALIGNMENT: usize = 256;

/// Fill byte of freshly allocated staging memory.
const STAGING_FILL: u8 = 0xAB;

/// A swapchain, staging texture, and screen, all in host memory.
///
/// Presenting copies the image into [`screen`](Self::screen), which stands
/// in for what the compositor shows. The display can also draw directly
/// into its images ([`NativeRenderer`]) and share them with a second API
/// ([`InteropDisplay`]).
pub struct SoftDisplay {
    id: u32,
    format: PixelFormat,
    image_count: u32,
    images: Vec<SharedImage>,
    staging: SharedImage,
    screen: SharedImage,
    next_image: u32,
    next_fence: u32,
    last_submit: Option<(Rc<Timeline>, u64)>,
    scene: Triangle,
    faults: SoftFaults,
    log: OpLog,
}

impl core::fmt::Debug for SoftDisplay {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SoftDisplay")
            .field("id", &self.id)
            .field("surface", &self.surface())
            .field("next_image", &self.next_image)
            .finish_non_exhaustive()
    }
}

impl SoftDisplay {
    /// Creates a display with device id `id` and a swapchain described by
    /// `desc`.
    ///
    /// # Errors
    ///
    /// [`FrameError::Setup`] if the swapchain would have no images.
    pub fn new(id: u32, desc: SurfaceDesc, faults: SoftFaults, log: OpLog) -> Result<Self> {
        if desc.image_count == 0 {
            return Err(FrameError::Setup {
                stage: SetupStage::Swapchain,
                code: 0,
            });
        }
        let images = (0..desc.image_count)
            .map(|_| Rc::new(RefCell::new(SoftImage::tight(desc.extent, desc.format))))
            .collect();
        Ok(Self {
            id,
            format: desc.format,
            image_count: desc.image_count,
            images,
            staging: Rc::new(RefCell::new(staging(desc.extent, desc.format))),
            screen: Rc::new(RefCell::new(SoftImage::tight(desc.extent, desc.format))),
            next_image: 0,
            next_fence: 0,
            last_submit: None,
            scene: Triangle::centered([255, 255, 255, 255]),
            faults,
            log,
        })
    }

    /// Sets what [`NativeRenderer::draw`] draws.
    #[must_use]
    pub fn with_scene(mut self, scene: Triangle) -> Self {
        self.scene = scene;
        self
    }

    /// The image the compositor currently shows.
    ///
    /// The handle stays valid across surface recreation.
    #[must_use]
    pub fn screen(&self) -> SharedImage {
        Rc::clone(&self.screen)
    }

    /// The staging texture.
    ///
    /// The handle stays valid across surface recreation.
    #[must_use]
    pub fn staging(&self) -> SharedImage {
        Rc::clone(&self.staging)
    }

    fn image(&self, index: u32) -> Result<&SharedImage> {
        self.images
            .get(index as usize)
            .ok_or(FrameError::SurfaceOutOfDate)
    }
}

fn staging(extent: Extent, format: PixelFormat) -> SoftImage {
    SoftImage::aligned(extent, format, STAGING_ALIGNMENT, STAGING_FILL)
}

impl DisplayDevice for SoftDisplay {
    type Fence = SoftFence;

    fn create_fence(&mut self) -> Result<SoftFence> {
        let id = self.next_fence;
        self.next_fence += 1;
        Ok(SoftFence::new(
            self.id,
            id,
            self.faults.clone(),
            self.log.clone(),
        ))
    }

    fn surface(&self) -> SurfaceDesc {
        SurfaceDesc {
            extent: self.screen.borrow().extent(),
            format: self.format,
            image_count: self.image_count,
        }
    }

    fn raw_surface(&self) -> RawSurface {
        RawSurface(core::ptr::without_provenance_mut(self.id as usize + 1))
    }

    fn acquire_next_image(&mut self) -> Result<u32> {
        self.faults.take_acquire()?;
        let image = self.next_image;
        self.next_image = (image + 1) % self.image_count;
        self.log.push(Op::Acquire {
            device: self.id,
            image,
        });
        Ok(image)
    }

    fn submit(&mut self, fence: &SoftFence, value: u64) -> Result<()> {
        fence.timeline().submit(value);
        self.last_submit = Some((Rc::clone(fence.timeline()), value));
        self.log.push(Op::Submit {
            device: self.id,
            value,
        });
        Ok(())
    }

    fn present(&mut self, image: u32) -> Result<()> {
        self.faults.take_present()?;
        let fence_signaled = self
            .last_submit
            .as_ref()
            .is_some_and(|(timeline, value)| timeline.reached(*value));
        let source = self.image(image)?;
        self.screen.borrow_mut().clone_from(&source.borrow());
        self.log.push(Op::Present {
            device: self.id,
            image,
            fence_signaled,
        });
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        if let Some((timeline, _)) = &self.last_submit
            && !self.faults.is_stalled()
        {
            timeline.drain();
        }
        self.log.push(Op::WaitIdle {
            device: self.id,
            role: Role::Display,
        });
        Ok(())
    }

    fn recreate_surface(&mut self, extent: Extent) -> Result<()> {
        for image in &self.images {
            *image.borrow_mut() = SoftImage::tight(extent, self.format);
        }
        *self.staging.borrow_mut() = staging(extent, self.format);
        *self.screen.borrow_mut() = SoftImage::tight(extent, self.format);
        self.next_image = 0;
        self.log.push(Op::Recreate {
            device: self.id,
            role: Role::Display,
            extent,
        });
        Ok(())
    }
}

impl NativeRenderer for SoftDisplay {
    fn draw(&mut self, image: u32, _frame_index: u64) -> Result<()> {
        self.faults.take_draw()?;
        self.scene
            .draw(&mut self.image(image)?.borrow_mut(), BACKGROUND);
        self.log.push(Op::Draw {
            device: self.id,
            image,
        });
        Ok(())
    }
}

impl StagingTarget for SoftDisplay {
    fn write_staging(
        &mut self,
        write: &mut dyn FnMut(&mut [u8], ImageLayout) -> Result<usize>,
    ) -> Result<usize> {
        let mut staging = self.staging.borrow_mut();
        let layout = staging.layout();
        let bytes = write(staging.bytes_mut(), layout)?;
        self.log.push(Op::Stage {
            device: self.id,
            bytes,
        });
        Ok(bytes)
    }

    fn copy_staging_to_image(&mut self, image: u32) -> Result<()> {
        let staging = self.staging.borrow();
        let mut target = self.image(image)?.borrow_mut();
        let layout = target.layout();
        copy_rows(staging.bytes(), staging.layout(), target.bytes_mut(), layout)?;
        self.log.push(Op::CopyStaging {
            device: self.id,
            image,
        });
        Ok(())
    }
}

impl InteropDisplay for SoftDisplay {
    type Image = SharedImage;

    fn shareable_images(&self) -> Vec<SharedImage> {
        self.images.iter().map(Rc::clone).collect()
    }
}

impl Drop for SoftDisplay {
    fn drop(&mut self) {
        self.log.push(Op::Release {
            device: self.id,
            role: Role::Display,
        });
    }
}

#[cfg(test)]
mod tests {
    use triptych_core::device::Fence;

    use super::*;

    fn display(log: &OpLog) -> SoftDisplay {
        let desc = SurfaceDesc {
            extent: Extent::new(8, 4),
            format: PixelFormat::Bgra8Unorm,
            image_count: 2,
        };
        SoftDisplay::new(0, desc, SoftFaults::new(), log.clone()).unwrap()
    }

    #[test]
    fn acquire_cycles_through_images() {
        let log = OpLog::new();
        let mut display = display(&log);
        let seen: Vec<u32> = (0..3)
            .map(|_| display.acquire_next_image().unwrap())
            .collect();
        assert_eq!(seen, [0, 1, 0]);
    }

    #[test]
    fn present_reports_fence_state_and_updates_screen() {
        let log = OpLog::new();
        let mut display = display(&log);
        let fence = display.create_fence().unwrap();
        let image = display.acquire_next_image().unwrap();
        display.draw(image, 0).unwrap();
        display.submit(&fence, 1).unwrap();
        fence.wait_for(1).unwrap();
        display.present(image).unwrap();

        assert!(log.snapshot().contains(&Op::Present {
            device: 0,
            image: 0,
            fence_signaled: true,
        }));
        let screen = display.screen();
        assert!(screen.borrow().same_pixels(&display.images[0].borrow()));
        assert_ne!(screen.borrow().pixel(4, 2), BACKGROUND);
    }

    #[test]
    fn staging_rows_are_padded() {
        let log = OpLog::new();
        let display = display(&log);
        let staging = display.staging();
        let layout = staging.borrow().layout();
        assert_eq!(layout.row_pitch, 256);
        assert_eq!(layout.row_bytes(), 32);
    }

    #[test]
    fn recreate_keeps_handles_stable() {
        let log = OpLog::new();
        let mut display = display(&log);
        let screen = display.screen();
        let raw = display.raw_surface();
        display.recreate_surface(Extent::new(16, 16)).unwrap();
        assert_eq!(screen.borrow().extent(), Extent::new(16, 16));
        assert_eq!(display.surface().extent, Extent::new(16, 16));
        assert_eq!(display.raw_surface(), raw);
    }

    #[test]
    fn zero_images_is_a_setup_failure() {
        let desc = SurfaceDesc {
            extent: Extent::new(8, 4),
            format: PixelFormat::Bgra8Unorm,
            image_count: 0,
        };
        let err = SoftDisplay::new(0, desc, SoftFaults::new(), OpLog::new()).unwrap_err();
        assert!(matches!(err, FrameError::Setup { .. }));
    }
}
