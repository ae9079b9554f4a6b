// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host-memory images.

use std::cell::RefCell;
use std::rc::Rc;

use triptych_core::bridge::ImageLayout;
use triptych_core::panel::{Extent, PixelFormat};

/// An image shared between two software devices, standing in for one
/// GPU allocation both APIs can reach.
pub type SharedImage = Rc<RefCell<SoftImage>>;

/// A 2D image in host memory with an explicit row pitch.
///
/// Every row, including the last, is `row_pitch` bytes long. Bytes between
/// `row_bytes` and `row_pitch` are padding.
#[derive(Clone, PartialEq, Eq)]
pub struct SoftImage {
    layout: ImageLayout,
    data: Vec<u8>,
}

impl core::fmt::Debug for SoftImage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SoftImage")
            .field("layout", &self.layout)
            .field("len", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl SoftImage {
    /// Allocates an image with `layout`, every byte set to `fill`.
    #[must_use]
    pub fn filled(layout: ImageLayout, fill: u8) -> Self {
        let len = layout.row_pitch * layout.extent.height as usize;
        Self {
            layout,
            data: vec![fill; len],
        }
    }

    /// Allocates a zeroed image without row padding.
    #[must_use]
    pub fn tight(extent: Extent, format: PixelFormat) -> Self {
        Self::filled(ImageLayout::tight(extent, format), 0)
    }

    /// Allocates an image whose rows are padded to `alignment` bytes, with
    /// padding bytes set to `padding`.
    #[must_use]
    pub fn aligned(extent: Extent, format: PixelFormat, alignment: usize, padding: u8) -> Self {
        Self::filled(ImageLayout::aligned(extent, format, alignment), padding)
    }

    /// Memory layout.
    #[must_use]
    pub fn layout(&self) -> ImageLayout {
        self.layout
    }

    /// Image size.
    #[must_use]
    pub fn extent(&self) -> Extent {
        self.layout.extent
    }

    /// Raw bytes, padding included.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw bytes, padding included.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Pixel data of row `y`, padding excluded.
    #[must_use]
    pub fn row(&self, y: u32) -> &[u8] {
        &self.data[self.layout.row_range(y)]
    }

    /// Padding bytes of row `y`.
    #[must_use]
    pub fn row_padding(&self, y: u32) -> &[u8] {
        let range = self.layout.row_range(y);
        let end = range.start + self.layout.row_pitch;
        &self.data[range.end..end]
    }

    /// The four bytes of pixel `(x, y)`, in the image's own channel order.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let at = self.offset(x, y);
        let mut px = [0; 4];
        px.copy_from_slice(&self.data[at..at + 4]);
        px
    }

    /// Writes pixel `(x, y)`. `px` is already in the image's channel order.
    pub fn set_pixel(&mut self, x: u32, y: u32, px: [u8; 4]) {
        let at = self.offset(x, y);
        self.data[at..at + 4].copy_from_slice(&px);
    }

    /// Fills every pixel with `px`, leaving padding untouched.
    pub fn clear(&mut self, px: [u8; 4]) {
        for y in 0..self.layout.extent.height {
            let range = self.layout.row_range(y);
            for chunk in self.data[range].chunks_exact_mut(4) {
                chunk.copy_from_slice(&px);
            }
        }
    }

    /// Whether both images hold the same pixels in the same format,
    /// ignoring row padding.
    #[must_use]
    pub fn same_pixels(&self, other: &Self) -> bool {
        self.layout.extent == other.layout.extent
            && self.layout.format == other.layout.format
            && (0..self.layout.extent.height).all(|y| self.row(y) == other.row(y))
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.layout.row_pitch
            + x as usize * self.layout.format.bytes_per_pixel() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_leaves_padding_alone() {
        let mut image = SoftImage::aligned(Extent::new(3, 2), PixelFormat::Rgba8Unorm, 16, 0xEE);
        image.clear([1, 2, 3, 4]);
        assert_eq!(image.layout().row_pitch, 16);
        assert_eq!(image.row(1), [1, 2, 3, 4, 1, 2, 3, 4, 1, 2, 3, 4]);
        assert_eq!(image.row_padding(0), [0xEE; 4]);
        assert_eq!(image.row_padding(1), [0xEE; 4]);
    }

    #[test]
    fn same_pixels_ignores_padding() {
        let extent = Extent::new(2, 2);
        let mut tight = SoftImage::tight(extent, PixelFormat::Bgra8Unorm);
        let mut padded = SoftImage::aligned(extent, PixelFormat::Bgra8Unorm, 64, 0x55);
        tight.clear([9, 9, 9, 255]);
        padded.clear([9, 9, 9, 255]);
        assert!(tight.same_pixels(&padded));

        padded.set_pixel(1, 1, [0, 0, 0, 0]);
        assert!(!tight.same_pixels(&padded));
        assert_eq!(padded.pixel(1, 1), [0, 0, 0, 0]);
    }
}
