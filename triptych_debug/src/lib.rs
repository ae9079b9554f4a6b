// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing, binary recording, and JSON export for triptych frame
//! traces.
//!
//! This crate provides [`TraceSink`](triptych_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`json::export`]: writes recorded bytes as a Chrome Trace Event Format
//!   JSON array, one track per panel.

pub mod json;
pub mod pretty;
pub mod recorder;
