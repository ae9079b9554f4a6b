// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software reference backend for triptych.
//!
//! Every device trait from [`triptych_core::device`] is implemented over
//! plain host memory, so the whole pipeline (all three bridging strategies,
//! frame pacing, composition, resize, and teardown) runs headless:
//!
//! - [`SoftDisplay`]: swapchain images, staging texture, timeline fences,
//!   and a "screen" image that receives whatever was last presented.
//! - [`SoftInterop`] and [`SoftSharedRenderer`]: a second API drawing into
//!   the display's images through shared registrations.
//! - [`SoftOffscreen`]: renders into its own image and reads it back with
//!   padded rows, like a GPU readback buffer.
//! - [`SoftCompositor`]: an in-memory [`CompositionHost`] that remembers
//!   each visual's size, offset, and stacking order.
//!
//! All devices append to a shared [`OpLog`], and [`SoftFaults`] injects
//! acquire, present, draw, or fence failures on demand.
//! [`build_triptych`] wires one panel per strategy into an
//! [`Orchestrator`](triptych_core::orchestrator::Orchestrator).
//!
//! [`CompositionHost`]: triptych_core::compose::CompositionHost

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod compositor;
mod display;
mod fence;
mod image;
mod interop;
mod log;
mod offscreen;
mod raster;
mod triptych;

#[cfg(test)]
mod scenarios;

pub use compositor::{SoftCompositor, SoftSurface, SoftVisual, VisualState};
pub use display::SoftDisplay;
pub use fence::{SoftFaults, SoftFence};
pub use image::{SharedImage, SoftImage};
pub use interop::{SoftInterop, SoftObject, SoftSharedRenderer};
pub use log::{Op, OpLog, Role};
pub use offscreen::{READBACK_ALIGNMENT, SoftOffscreen};
pub use raster::{Triangle, encode_color};
pub use triptych::{BACKGROUND, PANEL_COLORS, SoftTriptych, build_triptych, panel_caps};
