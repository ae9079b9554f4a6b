// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software offscreen renderer with a padded readback buffer.

use triptych_core::bridge::{ImageLayout, copy_rows};
use triptych_core::device::OffscreenRenderer;
use triptych_core::error::Result;
use triptych_core::panel::{Extent, PixelFormat};

use crate::fence::SoftFaults;
use crate::image::SoftImage;
use crate::log::{Op, OpLog, Role};
use crate::raster::Triangle;
use crate::triptych::BACKGROUND;

/// Row alignment of the readback buffer, matching wgpu's
/// `COPY_BYTES_PER_ROW_ALIGNMENT`.
pub const READBACK_ALIGNMENT: usize = 256;

/// Fill byte of readback row padding. Never part of a copied payload.
const PADDING_FILL: u8 = 0xCD;

/// Renders into a private image and reads it back through a buffer whose
/// rows are padded to [`READBACK_ALIGNMENT`].
pub struct SoftOffscreen {
    device: u32,
    target: SoftImage,
    readback: SoftImage,
    scene: Triangle,
    faults: SoftFaults,
    log: OpLog,
}

impl core::fmt::Debug for SoftOffscreen {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SoftOffscreen")
            .field("device", &self.device)
            .field("target", &self.target)
            .field("readback", &self.readback.layout())
            .finish_non_exhaustive()
    }
}

impl SoftOffscreen {
    /// Creates a renderer drawing `scene` into an `extent`-sized image.
    #[must_use]
    pub fn new(
        device: u32,
        extent: Extent,
        format: PixelFormat,
        scene: Triangle,
        faults: SoftFaults,
        log: OpLog,
    ) -> Self {
        Self {
            device,
            target: SoftImage::tight(extent, format),
            readback: SoftImage::aligned(extent, format, READBACK_ALIGNMENT, PADDING_FILL),
            scene,
            faults,
            log,
        }
    }

    /// The rendered image.
    #[must_use]
    pub fn target(&self) -> &SoftImage {
        &self.target
    }
}

impl OffscreenRenderer for SoftOffscreen {
    fn extent(&self) -> Extent {
        self.target.extent()
    }

    fn format(&self) -> PixelFormat {
        self.target.layout().format
    }

    fn draw(&mut self, _frame_index: u64) -> Result<()> {
        self.faults.take_draw()?;
        self.scene.draw(&mut self.target, BACKGROUND);
        self.log.push(Op::OffscreenDraw {
            device: self.device,
        });
        Ok(())
    }

    fn read_back(
        &mut self,
        read: &mut dyn FnMut(&[u8], ImageLayout) -> Result<usize>,
    ) -> Result<usize> {
        // Device-to-host copy into the padded buffer.
        let layout = self.readback.layout();
        copy_rows(
            self.target.bytes(),
            self.target.layout(),
            self.readback.bytes_mut(),
            layout,
        )?;
        let bytes = read(self.readback.bytes(), layout)?;
        self.log.push(Op::Readback {
            device: self.device,
            bytes,
        });
        Ok(bytes)
    }

    fn resize(&mut self, extent: Extent) -> Result<()> {
        let format = self.format();
        self.target = SoftImage::tight(extent, format);
        self.readback = SoftImage::aligned(extent, format, READBACK_ALIGNMENT, PADDING_FILL);
        self.log.push(Op::Recreate {
            device: self.device,
            role: Role::Offscreen,
            extent,
        });
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.log.push(Op::WaitIdle {
            device: self.device,
            role: Role::Offscreen,
        });
        Ok(())
    }
}

impl Drop for SoftOffscreen {
    fn drop(&mut self) {
        self.log.push(Op::Release {
            device: self.device,
            role: Role::Offscreen,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readback_hands_out_padded_rows() {
        let mut offscreen = SoftOffscreen::new(
            2,
            Extent::new(10, 3),
            PixelFormat::Bgra8Unorm,
            Triangle::centered([0, 0, 255, 255]),
            SoftFaults::new(),
            OpLog::new(),
        );
        offscreen.draw(0).unwrap();
        let mut seen = None;
        let n = offscreen
            .read_back(&mut |bytes, layout| {
                seen = Some((bytes.len(), layout));
                Ok(layout.payload_len())
            })
            .unwrap();
        let (len, layout) = seen.unwrap();
        assert_eq!(layout.row_pitch, 256);
        assert_eq!(len, 256 * 3);
        assert_eq!(n, 10 * 3 * 4);
        assert_eq!(offscreen.readback.row_padding(2), [PADDING_FILL; 216]);
    }

    #[test]
    fn resize_reallocates_both_images() {
        let mut offscreen = SoftOffscreen::new(
            0,
            Extent::new(4, 4),
            PixelFormat::Rgba8Unorm,
            Triangle::centered([255, 255, 255, 255]),
            SoftFaults::new(),
            OpLog::new(),
        );
        offscreen.resize(Extent::new(100, 7)).unwrap();
        assert_eq!(offscreen.extent(), Extent::new(100, 7));
        assert_eq!(offscreen.readback.layout().row_pitch, 512);
    }
}
