// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Moving a backend's rendered image into a presentable surface.
//!
//! Three strategies exist, chosen per backend by [`BridgeStrategy::select`]:
//!
//! - [`Native`](BridgeStrategy::Native): the backend renders straight into a
//!   compositor-ready swapchain. Nothing to bridge.
//! - [`ZeroCopy`](BridgeStrategy::ZeroCopy): the display image is registered
//!   under the rendering API. Each frame takes the write lock before
//!   rendering and releases it (flushing) before presenting. See
//!   [`ZeroCopyBridge`].
//! - [`CpuBridge`](BridgeStrategy::CpuBridge): the backend renders offscreen;
//!   the image is read back to host memory, copied row by row into the display
//!   API's staging texture, and copied on the device into the swapchain
//!   image. See [`CpuBridge`].
//!
//! Host rows are copied with [`copy_rows`], which honors the row pitch of
//! both sides and never reads or writes row padding.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use crate::backend::FrameCx;
use crate::device::{InteropDevice, OffscreenRenderer, StagingTarget};
use crate::error::{FrameError, Result};
use crate::panel::{Extent, PixelFormat};
use crate::shared::{SharedResourceHandle, SharedWriteLock};
use crate::trace::{BridgeCopyEvent, PanelPhase};

/// How a backend's output reaches the compositor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BridgeStrategy {
    /// Shared image, no copies.
    ZeroCopy,
    /// Compositor-ready swapchain owned by the rendering API itself.
    Native,
    /// Host-memory round trip.
    CpuBridge,
}

/// What a backend's platform supports, as probed at setup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct InteropCaps {
    /// The rendering API can create a swapchain for composition.
    pub composition_swapchain: bool,
    /// The rendering API can register display images through an interop
    /// extension.
    pub shared_registration: bool,
}

impl BridgeStrategy {
    /// Picks the cheapest strategy `caps` allow.
    #[must_use]
    pub const fn select(caps: InteropCaps) -> Self {
        if caps.composition_swapchain {
            Self::Native
        } else if caps.shared_registration {
            Self::ZeroCopy
        } else {
            Self::CpuBridge
        }
    }
}

/// Host-memory layout of one image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageLayout {
    /// Image size.
    pub extent: Extent,
    /// Pixel format.
    pub format: PixelFormat,
    /// Distance in bytes between the starts of consecutive rows.
    pub row_pitch: usize,
}

impl ImageLayout {
    /// A layout with no row padding.
    #[must_use]
    pub const fn tight(extent: Extent, format: PixelFormat) -> Self {
        let row_pitch = extent.width as usize * format.bytes_per_pixel() as usize;
        Self {
            extent,
            format,
            row_pitch,
        }
    }

    /// A layout whose row pitch is rounded up to a multiple of `alignment`.
    #[must_use]
    pub const fn aligned(extent: Extent, format: PixelFormat, alignment: usize) -> Self {
        let tight = Self::tight(extent, format);
        let row_pitch = if alignment <= 1 {
            tight.row_pitch
        } else {
            tight.row_pitch.next_multiple_of(alignment)
        };
        Self {
            extent,
            format,
            row_pitch,
        }
    }

    /// Bytes of pixel data in one row.
    #[must_use]
    pub const fn row_bytes(&self) -> usize {
        self.extent.width as usize * self.format.bytes_per_pixel() as usize
    }

    /// Minimum buffer length holding the image. The last row needs no
    /// padding.
    #[must_use]
    pub const fn required_len(&self) -> usize {
        if self.extent.is_empty() {
            0
        } else {
            self.row_pitch * (self.extent.height as usize - 1) + self.row_bytes()
        }
    }

    /// Bytes of pixel data in the whole image, padding excluded.
    #[must_use]
    pub const fn payload_len(&self) -> usize {
        self.row_bytes() * self.extent.height as usize
    }

    /// Byte range of row `y` within a buffer with this layout.
    #[must_use]
    pub const fn row_range(&self, y: u32) -> core::ops::Range<usize> {
        let start = self.row_pitch * y as usize;
        start..start + self.row_bytes()
    }
}

/// Copies pixel rows from `src` to `dst`.
///
/// Returns the number of payload bytes copied. Row padding on either side is
/// neither read nor written.
///
/// # Errors
///
/// - [`FrameError::ExtentMismatch`] or [`FrameError::FormatMismatch`] when
///   the layouts describe different images.
/// - [`FrameError::BufferTooSmall`] when a buffer is shorter than its layout
///   or a row pitch is shorter than a row.
pub fn copy_rows(
    src: &[u8],
    src_layout: ImageLayout,
    dst: &mut [u8],
    dst_layout: ImageLayout,
) -> Result<usize> {
    if src_layout.extent != dst_layout.extent {
        return Err(FrameError::ExtentMismatch {
            expected: dst_layout.extent,
            actual: src_layout.extent,
        });
    }
    if src_layout.format != dst_layout.format {
        return Err(FrameError::FormatMismatch {
            expected: dst_layout.format,
            actual: src_layout.format,
        });
    }
    if src_layout.extent.is_empty() {
        return Ok(0);
    }
    let row = src_layout.row_bytes();
    for (layout, len) in [(src_layout, src.len()), (dst_layout, dst.len())] {
        if layout.row_pitch < row {
            return Err(FrameError::BufferTooSmall {
                required: row,
                actual: layout.row_pitch,
            });
        }
        if len < layout.required_len() {
            return Err(FrameError::BufferTooSmall {
                required: layout.required_len(),
                actual: len,
            });
        }
    }
    for y in 0..src_layout.extent.height {
        dst[dst_layout.row_range(y)].copy_from_slice(&src[src_layout.row_range(y)]);
    }
    Ok(src_layout.payload_len())
}

// ---------------------------------------------------------------------------
// Zero-copy
// ---------------------------------------------------------------------------

/// Registered display images and the lock held for the current frame.
pub struct ZeroCopyBridge<I: InteropDevice> {
    lock: Option<SharedWriteLock<I>>,
    handles: Vec<Rc<SharedResourceHandle<I>>>,
}

impl<I: InteropDevice> fmt::Debug for ZeroCopyBridge<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZeroCopyBridge")
            .field("locked", &self.lock.is_some())
            .field("handles", &self.handles.len())
            .finish()
    }
}

impl<I: InteropDevice> Default for ZeroCopyBridge<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: InteropDevice> Drop for ZeroCopyBridge<I> {
    fn drop(&mut self) {
        self.unregister_all();
    }
}

impl<I: InteropDevice> ZeroCopyBridge<I> {
    /// Creates a bridge with nothing registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lock: None,
            handles: Vec::new(),
        }
    }

    /// Replaces every registration with one per image in `images`.
    ///
    /// # Errors
    ///
    /// Returns the first registration failure; images registered before it
    /// are released.
    pub fn register_all(
        &mut self,
        interop: &Rc<I>,
        images: &[I::Image],
        extent: Extent,
    ) -> Result<()> {
        self.unregister_all();
        for image in images {
            let handle = SharedResourceHandle::register(interop, image, extent)?;
            self.handles.push(handle);
        }
        Ok(())
    }

    /// Drops the current lock (if any) and every registration, newest
    /// first.
    pub fn unregister_all(&mut self) {
        self.lock = None;
        while let Some(handle) = self.handles.pop() {
            drop(handle);
        }
    }

    /// Number of registered images.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Takes the write lock on the image registered for swapchain index
    /// `image`.
    ///
    /// # Errors
    ///
    /// [`FrameError::LockContended`] if this bridge already holds a lock,
    /// [`FrameError::InteropFailed`] if nothing is registered, or the
    /// interop device's lock error.
    pub fn lock(&mut self, image: u32) -> Result<()> {
        if self.lock.is_some() {
            return Err(FrameError::LockContended);
        }
        if self.handles.is_empty() {
            return Err(FrameError::InteropFailed { code: 0 });
        }
        let handle = &self.handles[image as usize % self.handles.len()];
        self.lock = Some(handle.acquire()?);
        Ok(())
    }

    /// The lock taken by [`lock`](Self::lock).
    ///
    /// # Errors
    ///
    /// [`FrameError::NotLocked`] if no lock is held.
    pub fn current_lock(&self) -> Result<&SharedWriteLock<I>> {
        self.lock.as_ref().ok_or(FrameError::NotLocked)
    }

    /// Releases the lock, flushing the rendering API's writes.
    ///
    /// # Errors
    ///
    /// [`FrameError::NotLocked`] if no lock is held, or the interop
    /// device's unlock error.
    pub fn unlock(&mut self) -> Result<()> {
        self.lock.take().ok_or(FrameError::NotLocked)?.release()
    }

    /// Drops the lock without reporting unlock failures.
    pub fn discard_lock(&mut self) {
        self.lock = None;
    }
}

// ---------------------------------------------------------------------------
// CPU round trip
// ---------------------------------------------------------------------------

/// Synchronous host-memory bridge.
///
/// Each transfer blocks on the offscreen renderer's readback, so the
/// backend's frame production is serialized with its presentation.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuBridge {
    last_copied: usize,
}

impl CpuBridge {
    /// Creates a bridge that has not copied anything yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { last_copied: 0 }
    }

    /// Payload bytes moved by the most recent transfer.
    #[must_use]
    pub const fn last_copied(&self) -> usize {
        self.last_copied
    }

    /// Reads `source` back, stages its rows in `display`, and records a copy
    /// into swapchain image `image`.
    ///
    /// # Errors
    ///
    /// Any readback, map, layout, or copy failure.
    pub fn transfer<S, D>(
        &mut self,
        source: &mut S,
        display: &mut D,
        image: u32,
        cx: &mut FrameCx<'_, '_>,
    ) -> Result<usize>
    where
        S: OffscreenRenderer + ?Sized,
        D: StagingTarget + ?Sized,
    {
        cx.phase(PanelPhase::Readback);
        let bytes = source.read_back(&mut |src, src_layout| {
            cx.phase(PanelPhase::Stage);
            display.write_staging(&mut |dst, dst_layout| {
                copy_rows(src, src_layout, dst, dst_layout)
            })
        })?;
        cx.phase(PanelPhase::Copy);
        display.copy_staging_to_image(image)?;
        cx.tracer.bridge_copy(&BridgeCopyEvent {
            frame_index: cx.frame_index,
            panel: cx.panel,
            bytes: bytes as u64,
        });
        self.last_copied = bytes;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::testing::{FakeInterop, Op};

    const FMT: PixelFormat = PixelFormat::Rgba8Unorm;

    #[test]
    fn strategy_prefers_native_then_zero_copy() {
        let both = InteropCaps {
            composition_swapchain: true,
            shared_registration: true,
        };
        assert_eq!(BridgeStrategy::select(both), BridgeStrategy::Native);
        let shared = InteropCaps {
            shared_registration: true,
            ..InteropCaps::default()
        };
        assert_eq!(BridgeStrategy::select(shared), BridgeStrategy::ZeroCopy);
        assert_eq!(
            BridgeStrategy::select(InteropCaps::default()),
            BridgeStrategy::CpuBridge
        );
    }

    #[test]
    fn aligned_layout_pads_rows() {
        let layout = ImageLayout::aligned(Extent::new(3, 2), FMT, 256);
        assert_eq!(layout.row_bytes(), 12);
        assert_eq!(layout.row_pitch, 256);
        assert_eq!(layout.required_len(), 256 + 12);
        assert_eq!(layout.payload_len(), 24);
        assert_eq!(ImageLayout::aligned(Extent::new(64, 1), FMT, 256).row_pitch, 256);
    }

    #[test]
    fn copy_rows_skips_padding_on_both_sides() {
        let extent = Extent::new(2, 3);
        let src_layout = ImageLayout::aligned(extent, FMT, 16);
        let dst_layout = ImageLayout::aligned(extent, FMT, 12);
        let mut src = vec![0xAA_u8; src_layout.required_len()];
        for (y, base) in [(0, 0_u8), (1, 8), (2, 16)] {
            for (b, v) in src[src_layout.row_range(y)].iter_mut().zip(base..) {
                *b = v;
            }
        }
        let mut dst = vec![0x55_u8; dst_layout.required_len()];
        let copied = copy_rows(&src, src_layout, &mut dst, dst_layout).unwrap();
        assert_eq!(copied, 24);
        for y in 0..3 {
            assert_eq!(&dst[dst_layout.row_range(y)], &src[src_layout.row_range(y)]);
        }
        assert_eq!(&dst[8..12], &[0x55; 4], "destination padding must be untouched");
        assert_eq!(&dst[20..24], &[0x55; 4], "destination padding must be untouched");
    }

    #[test]
    fn copy_rows_accepts_unpadded_last_row() {
        let layout = ImageLayout::aligned(Extent::new(1, 2), FMT, 8);
        let src = [1, 2, 3, 4, 9, 9, 9, 9, 5, 6, 7, 8];
        let mut dst = [0; 8];
        copy_rows(&src, layout, &mut dst, ImageLayout::tight(Extent::new(1, 2), FMT)).unwrap();
        assert_eq!(dst, [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn copy_rows_rejects_mismatched_images() {
        let a = ImageLayout::tight(Extent::new(2, 2), FMT);
        let b = ImageLayout::tight(Extent::new(3, 2), FMT);
        let mut dst = [0; 24];
        assert_eq!(
            copy_rows(&[0; 16], a, &mut dst, b),
            Err(FrameError::ExtentMismatch {
                expected: b.extent,
                actual: a.extent,
            })
        );
        let c = ImageLayout::tight(Extent::new(2, 2), PixelFormat::Bgra8Unorm);
        assert!(matches!(
            copy_rows(&[0; 16], a, &mut dst, c),
            Err(FrameError::FormatMismatch { .. })
        ));
    }

    #[test]
    fn copy_rows_rejects_short_buffers() {
        let layout = ImageLayout::tight(Extent::new(2, 2), FMT);
        let mut dst = [0; 16];
        assert_eq!(
            copy_rows(&[0; 15], layout, &mut dst, layout),
            Err(FrameError::BufferTooSmall {
                required: 16,
                actual: 15,
            })
        );
        let bad_pitch = ImageLayout {
            row_pitch: 4,
            ..layout
        };
        assert!(matches!(
            copy_rows(&[0; 16], layout, &mut dst, bad_pitch),
            Err(FrameError::BufferTooSmall { required: 8, actual: 4 })
        ));
    }

    #[test]
    fn zero_copy_bridge_holds_one_lock() {
        let interop = Rc::new(FakeInterop::default());
        let mut bridge = ZeroCopyBridge::new();
        bridge
            .register_all(&interop, &[0, 1], Extent::new(4, 4))
            .unwrap();
        assert_eq!(bridge.handle_count(), 2);
        assert_eq!(bridge.current_lock().unwrap_err(), FrameError::NotLocked);
        bridge.lock(1).unwrap();
        assert_eq!(*bridge.current_lock().unwrap().object(), 1);
        assert_eq!(bridge.lock(0), Err(FrameError::LockContended));
        bridge.unlock().unwrap();
        assert_eq!(bridge.unlock(), Err(FrameError::NotLocked));
    }

    #[test]
    fn registrations_are_released_newest_first() {
        let interop = Rc::new(FakeInterop::default());
        let mut bridge = ZeroCopyBridge::new();
        bridge
            .register_all(&interop, &[0, 1, 2], Extent::new(4, 4))
            .unwrap();
        bridge.register_all(&interop, &[3], Extent::new(8, 8)).unwrap();
        drop(bridge);
        assert_eq!(
            interop.ops(),
            [
                Op::Register(0),
                Op::Register(1),
                Op::Register(2),
                Op::Unregister(2),
                Op::Unregister(1),
                Op::Unregister(0),
                Op::Register(3),
                Op::Unregister(3),
            ]
        );
    }

    #[test]
    fn single_back_buffer_serves_every_index() {
        let interop = Rc::new(FakeInterop::default());
        let mut bridge = ZeroCopyBridge::new();
        bridge.register_all(&interop, &[5], Extent::new(4, 4)).unwrap();
        bridge.lock(3).unwrap();
        assert_eq!(*bridge.current_lock().unwrap().object(), 5);
    }

    #[test]
    fn unregistered_bridge_cannot_lock() {
        let mut bridge = ZeroCopyBridge::<FakeInterop>::new();
        assert!(matches!(
            bridge.lock(0),
            Err(FrameError::InteropFailed { .. })
        ));
    }
}
