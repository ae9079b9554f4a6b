// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `HRESULT` to [`FrameError`] mapping.

use triptych_core::error::{FrameError, SetupStage};
use windows::Win32::Foundation::GetLastError;
use windows::Win32::Graphics::Dxgi::{
    DXGI_ERROR_DEVICE_HUNG, DXGI_ERROR_DEVICE_REMOVED, DXGI_ERROR_DEVICE_RESET,
};
use windows_core::HRESULT;

/// Returns `true` for the codes DXGI uses to report a removed, reset, or
/// hung device.
#[must_use]
pub fn is_device_lost(code: HRESULT) -> bool {
    code == DXGI_ERROR_DEVICE_REMOVED
        || code == DXGI_ERROR_DEVICE_RESET
        || code == DXGI_ERROR_DEVICE_HUNG
}

/// Maps a failure during `stage` to [`FrameError::Setup`], unless the device
/// is gone.
pub(crate) fn setup(stage: SetupStage) -> impl Fn(windows_core::Error) -> FrameError {
    move |e| {
        let code = e.code();
        if is_device_lost(code) {
            FrameError::DeviceLost
        } else {
            FrameError::Setup {
                stage,
                code: code.0,
            }
        }
    }
}

/// Maps a failed per-frame call. Anything but device loss is reported as a
/// swapchain failure.
pub(crate) fn frame(e: windows_core::Error) -> FrameError {
    setup(SetupStage::Swapchain)(e)
}

/// Maps a failed `Map` of a staging resource.
pub(crate) fn map(e: windows_core::Error) -> FrameError {
    let code = e.code();
    if is_device_lost(code) {
        FrameError::DeviceLost
    } else {
        FrameError::MapFailed { code: code.0 }
    }
}

/// [`FrameError::InteropFailed`] carrying the calling thread's last error.
///
/// The `wglDX*` entry points report failure through a `BOOL` and
/// `SetLastError`.
pub(crate) fn last_interop_error() -> FrameError {
    // SAFETY: reads thread-local state only.
    let code = unsafe { GetLastError() }.to_hresult();
    FrameError::InteropFailed { code: code.0 }
}
