// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors raised while setting up or driving a backend.
//!
//! Everything except [`FrameError::SurfaceOutOfDate`] is fatal: the
//! orchestrator propagates it out of [`tick`](crate::orchestrator::Orchestrator::tick)
//! unchanged and the affected backend must be torn down. Nothing is retried.

use core::fmt;

use crate::panel::{Extent, PixelFormat};

/// Shorthand for results produced by this crate.
pub type Result<T, E = FrameError> = core::result::Result<T, E>;

/// Which setup step failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SetupStage {
    /// Creating an adapter, device, or queue.
    Device,
    /// Creating or recreating a presentable surface.
    Swapchain,
    /// Building shaders, pipeline state, or render targets.
    Pipeline,
    /// Creating a fence or its wait event.
    Fence,
    /// Opening an interop device or resolving its entry points.
    Interop,
    /// Creating a staging texture or readback buffer.
    Staging,
    /// Creating compositor objects.
    Composition,
}

impl fmt::Display for SetupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Device => "device",
            Self::Swapchain => "swapchain",
            Self::Pipeline => "pipeline",
            Self::Fence => "fence",
            Self::Interop => "interop",
            Self::Staging => "staging",
            Self::Composition => "composition",
        })
    }
}

/// Failure of a setup step or of one frame's work.
///
/// Platform crates map native status codes into these variants at the API
/// boundary; `code` fields carry the raw value (an `HRESULT` on Windows).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameError {
    /// A backend could not be created.
    Setup {
        /// The step that failed.
        stage: SetupStage,
        /// Native status code.
        code: i32,
    },
    /// The presentable surface no longer matches the window and must be
    /// recreated before the next frame.
    SurfaceOutOfDate,
    /// The GPU device was removed, reset, or hung.
    DeviceLost,
    /// Registering, locking, or unlocking a shared image failed.
    InteropFailed {
        /// Native status code.
        code: i32,
    },
    /// Mapping a staging texture or readback buffer failed.
    MapFailed {
        /// Native status code.
        code: i32,
    },
    /// A shared image already has a write-lock holder.
    LockContended,
    /// A render step that writes a shared image ran without holding its lock.
    NotLocked,
    /// Two images that must have the same size do not.
    ExtentMismatch {
        /// Size the destination requires.
        expected: Extent,
        /// Size the source provided.
        actual: Extent,
    },
    /// Two images that must share a pixel format do not.
    FormatMismatch {
        /// Format the destination requires.
        expected: PixelFormat,
        /// Format the source provided.
        actual: PixelFormat,
    },
    /// A host buffer is shorter than its declared layout.
    BufferTooSmall {
        /// Bytes the layout covers.
        required: usize,
        /// Bytes actually available.
        actual: usize,
    },
}

impl FrameError {
    /// Returns `true` when the frame can be skipped and the loop continued
    /// after recreating the surface.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::SurfaceOutOfDate)
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup { stage, code } => {
                write!(f, "{stage} setup failed ({code:#010x})")
            }
            Self::SurfaceOutOfDate => f.write_str("surface out of date"),
            Self::DeviceLost => f.write_str("device lost"),
            Self::InteropFailed { code } => write!(f, "interop call failed ({code:#010x})"),
            Self::MapFailed { code } => write!(f, "map failed ({code:#010x})"),
            Self::LockContended => f.write_str("shared image is already write-locked"),
            Self::NotLocked => f.write_str("shared image is not write-locked"),
            Self::ExtentMismatch { expected, actual } => write!(
                f,
                "extent mismatch: expected {}x{}, got {}x{}",
                expected.width, expected.height, actual.width, actual.height
            ),
            Self::FormatMismatch { expected, actual } => {
                write!(f, "format mismatch: expected {expected:?}, got {actual:?}")
            }
            Self::BufferTooSmall { required, actual } => {
                write!(f, "buffer too small: need {required} bytes, have {actual}")
            }
        }
    }
}

impl core::error::Error for FrameError {}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn only_out_of_date_is_recoverable() {
        assert!(FrameError::SurfaceOutOfDate.is_recoverable());
        assert!(!FrameError::DeviceLost.is_recoverable());
        assert!(!FrameError::LockContended.is_recoverable());
        assert!(
            !FrameError::Setup {
                stage: SetupStage::Swapchain,
                code: -1,
            }
            .is_recoverable()
        );
    }

    #[test]
    fn display_formats_codes_as_hex() {
        let e = FrameError::InteropFailed {
            code: 0x8007_000E_u32 as i32,
        };
        assert_eq!(e.to_string(), "interop call failed (0x8007000e)");
        let e = FrameError::Setup {
            stage: SetupStage::Fence,
            code: 5,
        };
        assert_eq!(e.to_string(), "fence setup failed (0x00000005)");
    }

    #[test]
    fn display_extent_mismatch() {
        let e = FrameError::ExtentMismatch {
            expected: Extent::new(320, 480),
            actual: Extent::new(400, 600),
        };
        assert_eq!(
            e.to_string(),
            "extent mismatch: expected 320x480, got 400x600"
        );
    }
}
