// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! wgpu backend for triptych.
//!
//! [`WgpuOffscreen`] implements
//! [`OffscreenRenderer`](triptych_core::device::OffscreenRenderer): it owns a
//! wgpu device (Vulkan unless configured otherwise), draws a triangle into
//! an offscreen texture, and reads it back through a buffer whose rows are
//! padded to [`wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`]. Paired with a
//! [`StagingTarget`](triptych_core::device::StagingTarget) display in a
//! [`CpuBridgeBackend`](triptych_core::backend::CpuBridgeBackend), this is
//! the CPU round-trip path for APIs that cannot present to the compositor
//! directly.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod config;
mod offscreen;
mod shader;

pub use config::WgpuConfig;
pub use offscreen::WgpuOffscreen;
pub use shader::{TRIANGLE_WGSL, Vertex, triangle_shaders, triangle_vertices};
