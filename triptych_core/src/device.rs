// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Traits implemented by platform graphics APIs.
//!
//! A backend is assembled from two halves:
//!
//! - a **display** half that owns the presentable surface the compositor
//!   shows ([`DisplayDevice`] plus one of [`NativeRenderer`],
//!   [`StagingTarget`], or [`InteropDisplay`]), and
//! - for the bridged strategies, a **rendering** half that draws with a
//!   different API ([`SharedRenderer`] or [`OffscreenRenderer`]).
//!
//! The [`backend`](crate::backend) module combines the halves with a
//! [`FramePacer`](crate::pacer::FramePacer) and the matching bridge.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::ffi::c_void;

use crate::bridge::ImageLayout;
use crate::error::Result;
use crate::panel::{Extent, PixelFormat};
use crate::shared::SharedWriteLock;

/// Opaque native handle to a presentable surface, as consumed by
/// [`CompositionHost::wrap_surface`](crate::compose::CompositionHost::wrap_surface).
///
/// On Windows this is an `IDXGISwapChain1` pointer. Software devices use the
/// pointer value as a plain surface id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawSurface(pub *mut c_void);

/// Description of a backend's presentable surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceDesc {
    /// Size of every image in the set.
    pub extent: Extent,
    /// Pixel format of every image in the set.
    pub format: PixelFormat,
    /// Number of images in the swapchain.
    pub image_count: u32,
}

/// Pipeline stage a compiled shader belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage, entry point `vs_main`.
    Vertex,
    /// Fragment (pixel) stage, entry point `fs_main`.
    Fragment,
}

impl ShaderStage {
    /// The entry point every shader artifact for this stage must export.
    #[must_use]
    pub const fn entry_point(self) -> &'static str {
        match self {
            Self::Vertex => "vs_main",
            Self::Fragment => "fs_main",
        }
    }
}

/// A compiled shader artifact.
///
/// The bytes are opaque (DXBC, SPIR-V, GLSL, or WGSL text depending on the
/// backend); only the entry-point name is fixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShaderBlob<'a> {
    /// Stage the artifact is compiled for.
    pub stage: ShaderStage,
    /// Exported entry point.
    pub entry_point: &'static str,
    /// Artifact contents.
    pub bytes: &'a [u8],
}

impl<'a> ShaderBlob<'a> {
    /// A vertex-stage artifact exporting `vs_main`.
    #[must_use]
    pub const fn vertex(bytes: &'a [u8]) -> Self {
        Self {
            stage: ShaderStage::Vertex,
            entry_point: ShaderStage::Vertex.entry_point(),
            bytes,
        }
    }

    /// A fragment-stage artifact exporting `fs_main`.
    #[must_use]
    pub const fn fragment(bytes: &'a [u8]) -> Self {
        Self {
            stage: ShaderStage::Fragment,
            entry_point: ShaderStage::Fragment.entry_point(),
            bytes,
        }
    }
}

/// A monotonically increasing GPU timeline value.
pub trait Fence {
    /// Highest value the GPU has signaled so far.
    fn completed_value(&self) -> u64;

    /// Blocks until [`completed_value`](Self::completed_value) reaches
    /// `value`.
    ///
    /// Waiting for a value that will never be signaled is a device loss.
    fn wait_for(&self, value: u64) -> Result<()>;

    /// Returns `true` once `value` has been reached.
    fn is_signaled(&self, value: u64) -> bool {
        self.completed_value() >= value
    }
}

/// The API that owns a backend's presentable surface.
pub trait DisplayDevice {
    /// Fence type signaled by [`submit`](Self::submit).
    type Fence: Fence;

    /// Creates a new fence at value 0.
    fn create_fence(&mut self) -> Result<Self::Fence>;

    /// Current surface description.
    fn surface(&self) -> SurfaceDesc;

    /// Native handle for the compositor. Stable across
    /// [`recreate_surface`](Self::recreate_surface).
    fn raw_surface(&self) -> RawSurface;

    /// Returns the index of the next image to render into.
    fn acquire_next_image(&mut self) -> Result<u32>;

    /// Submits all recorded work, then signals `fence` with `value`.
    fn submit(&mut self, fence: &Self::Fence, value: u64) -> Result<()>;

    /// Hands image `image` to the compositor.
    fn present(&mut self, image: u32) -> Result<()>;

    /// Blocks until the device has no work in flight.
    fn wait_idle(&mut self) -> Result<()>;

    /// Recreates every surface-sized resource at `extent`.
    ///
    /// Callers idle-wait first.
    fn recreate_surface(&mut self, extent: Extent) -> Result<()>;
}

/// A display device that can also draw directly into its own images.
pub trait NativeRenderer: DisplayDevice {
    /// Records this frame's draw calls into image `image`.
    fn draw(&mut self, image: u32, frame_index: u64) -> Result<()>;
}

/// A display device with a host-writable staging texture.
pub trait StagingTarget: DisplayDevice {
    /// Maps the staging texture, passes its bytes and layout to `write`, and
    /// unmaps it.
    ///
    /// Returns whatever `write` returned.
    fn write_staging(
        &mut self,
        write: &mut dyn FnMut(&mut [u8], ImageLayout) -> Result<usize>,
    ) -> Result<usize>;

    /// Records a device copy from the staging texture into image `image`.
    fn copy_staging_to_image(&mut self, image: u32) -> Result<()>;
}

/// A display device whose images can be shared with another API.
pub trait InteropDisplay: DisplayDevice {
    /// Handle to one display image, as understood by the interop device.
    type Image;

    /// Images to register, indexed by the values
    /// [`acquire_next_image`](DisplayDevice::acquire_next_image) returns.
    ///
    /// Swapchains that expose only the current back buffer return a single
    /// image; acquired indices then wrap onto it.
    fn shareable_images(&self) -> Vec<Self::Image>;
}

/// The rendering API's view of images owned by another API.
///
/// Methods take `&self` because the device is shared between the renderer
/// and every [`SharedResourceHandle`](crate::shared::SharedResourceHandle)
/// registered through it.
pub trait InteropDevice {
    /// Handle to a display image being registered.
    type Image;
    /// The rendering API's object for a registered image.
    type Object;

    /// Registers `image` so the rendering API can draw into it.
    fn register(&self, image: &Self::Image, extent: Extent) -> Result<Self::Object>;

    /// Releases a registration. Never called while the object is locked.
    fn unregister(&self, object: &Self::Object);

    /// Acquires the object for writing by the rendering API.
    fn lock(&self, object: &Self::Object) -> Result<()>;

    /// Releases the object back to the display API, flushing pending writes.
    fn unlock(&self, object: &Self::Object) -> Result<()>;
}

/// Renders into a shared image through an [`InteropDevice`].
pub trait SharedRenderer {
    /// Interop device used to reach the display API's images.
    type Interop: InteropDevice;

    /// The interop device registrations are made through.
    fn interop(&self) -> &Rc<Self::Interop>;

    /// Draws this frame into the image `target` holds the write lock for.
    fn draw(&mut self, target: &SharedWriteLock<Self::Interop>, frame_index: u64) -> Result<()>;

    /// Adapts viewport and other size-dependent state to `extent`.
    fn resize(&mut self, extent: Extent) -> Result<()>;

    /// Blocks until the rendering API has no work in flight.
    fn wait_idle(&mut self) -> Result<()>;
}

/// Renders into its own offscreen image and reads it back to host memory.
pub trait OffscreenRenderer {
    /// Size of the offscreen image.
    fn extent(&self) -> Extent;

    /// Format of the offscreen image.
    fn format(&self) -> PixelFormat;

    /// Records and submits this frame's draw calls.
    fn draw(&mut self, frame_index: u64) -> Result<()>;

    /// Waits for rendering, maps the readback buffer, passes its bytes and
    /// layout to `read`, and unmaps.
    ///
    /// Returns whatever `read` returned.
    fn read_back(
        &mut self,
        read: &mut dyn FnMut(&[u8], ImageLayout) -> Result<usize>,
    ) -> Result<usize>;

    /// Recreates the offscreen image and readback buffer at `extent`.
    fn resize(&mut self, extent: Extent) -> Result<()>;

    /// Blocks until no GPU work is in flight.
    fn wait_idle(&mut self) -> Result<()>;
}
