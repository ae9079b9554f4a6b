// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Windows backend for triptych.
//!
//! Building blocks for running the three panels against real Windows APIs:
//!
//! - [`D3d11Display`]: a Direct3D 11 device with a DXGI composition
//!   swapchain, `ID3D11Fence` frame fences, and a CPU-writable staging
//!   texture. It is the display half of every panel and draws natively
//!   when given a triangle pipeline.
//! - [`WglInterop`] and [`GlRenderer`]: OpenGL drawing straight into the
//!   swapchain's back buffer through `WGL_NV_DX_interop2`.
//! - [`DcompHost`]: a DirectComposition [`CompositionHost`] for one window.
//!
//! Shader bytecode is supplied by the caller: [`TRIANGLE_HLSL`] must be
//! compiled to DXBC (for example with `D3DCompile`) before it is handed to
//! [`D3d11Display::set_scene`]; the OpenGL sources in [`gl_shaders`] are
//! compiled by the driver.
//!
//! Native status codes are mapped to
//! [`FrameError`](triptych_core::error::FrameError) at the API boundary:
//! `DXGI_ERROR_DEVICE_REMOVED`, `DXGI_ERROR_DEVICE_RESET`, and
//! `DXGI_ERROR_DEVICE_HUNG` become
//! [`DeviceLost`](triptych_core::error::FrameError::DeviceLost).
//!
//! [`CompositionHost`]: triptych_core::compose::CompositionHost

#![cfg(windows)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![expect(
    unsafe_code,
    reason = "Windows backend calls Direct3D, DXGI, DirectComposition, and WGL through FFI"
)]

mod d3d;
mod dcomp;
mod error;
mod shader;
mod wgl;

pub use d3d::{D3d11Display, D3d11Fence};
pub use dcomp::DcompHost;
pub use error::is_device_lost;
pub use shader::{TRIANGLE_HLSL, Vertex, gl_shaders, triangle_vertices};
pub use wgl::{GlRenderer, GlSharedObject, WglInterop};
