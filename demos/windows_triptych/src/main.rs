// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Win32 window with three panels side by side.
//!
//! - Left: OpenGL drawing into the D3D11 back buffer through
//!   `WGL_NV_DX_interop2` (zero copy).
//! - Middle: Direct3D 11 drawing into its own composition swapchain.
//! - Right: wgpu (Vulkan when available) rendering offscreen, copied
//!   through host memory into a D3D11 staging texture.
//!
//! All three swapchains are shown by DirectComposition visuals created once
//! at startup. Resizing the window recreates every surface at a third of
//! the client width; minimizing suspends rendering.

#[cfg(windows)]
#[expect(
    unsafe_code,
    reason = "the window procedure, message loop, and shader compiler are Win32 FFI"
)]
mod app;

#[cfg(windows)]
fn main() {
    if let Err(e) = app::run() {
        eprintln!("windows_triptych: {e}");
        std::process::exit(1);
    }
}

#[cfg(not(windows))]
fn main() {
    eprintln!("windows_triptych only runs on Windows; try headless_triptych");
}
