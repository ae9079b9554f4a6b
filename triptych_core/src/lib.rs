// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types and frame pipeline for multi-backend render-and-compose.
//!
//! `triptych_core` drives several independent GPU backends side by side,
//! bridges each backend's rendered image into a shared composition tree, and
//! paces every backend's frame production so that no image is presented while
//! the GPU work that filled it is still in flight. It is `no_std` compatible
//! (with `alloc`); platform APIs live in backend crates that implement the
//! [`device`] traits.
//!
//! # Architecture
//!
//! One application frame walks every panel in order:
//!
//! ```text
//!   Orchestrator::tick()
//!       │   (per panel, in PanelId order)
//!       ▼
//!   RenderBackend::acquire_surface() ── FramePacer::begin_frame()
//!       │                                 wait slot fence, acquire image
//!       ▼
//!   RenderBackend::render_frame()     ── backend-native draw calls
//!       │
//!       ▼
//!   RenderBackend::bridge()           ── ZeroCopy: unlock + flush
//!       │                                 Native:   nothing
//!       │                                 CpuBridge: readback → staging → copy
//!       ▼
//!   RenderBackend::present()          ── FramePacer::end_frame()
//!                                         submit, wait fence, present
//! ```
//!
//! The composition tree is wired once per panel by
//! [`PanelVisual::attach`](compose::PanelVisual::attach); afterwards the
//! compositor picks up new contents whenever a wrapped surface is presented.
//!
//! **[`panel`]** — Panel identity, pixel extents, formats, and layout.
//!
//! **[`config`]** — Compile-time panel and pacing configuration presets.
//!
//! **[`error`]** — The [`FrameError`](error::FrameError) taxonomy: setup
//! failures and device loss are fatal; an out-of-date surface is recovered
//! by recreating it.
//!
//! **[`device`]** — Traits that platform backends implement: fences, display
//! devices, staging targets, interop devices, and renderers.
//!
//! **[`shared`]** — Cross-API shared images with a single-writer lock token.
//!
//! **[`pacer`]** — Per-backend ring of fenced frame slots.
//!
//! **[`bridge`]** — The three surface bridging strategies and the row-pitch
//! aware host copy.
//!
//! **[`backend`]** — The [`RenderBackend`](backend::RenderBackend) trait and
//! its three variants.
//!
//! **[`compose`]** — The narrow [`CompositionHost`](compose::CompositionHost)
//! boundary and per-panel visual wiring.
//!
//! **[`orchestrator`]** — The per-frame driver, resize handling, and teardown.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! frame-loop instrumentation, with a zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod backend;
pub mod bridge;
pub mod compose;
pub mod config;
pub mod device;
pub mod error;
pub mod orchestrator;
pub mod pacer;
pub mod panel;
pub mod shared;
pub mod trace;

#[cfg(test)]
mod testing;
