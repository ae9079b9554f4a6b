// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format export.
//!
//! [`export`] reads recorded bytes from a
//! [`RecorderSink`](super::recorder::RecorderSink) and writes
//! [Chrome Trace Event Format][trace-format] JSON to the given writer.
//!
//! Frame-loop events carry no wall-clock time, so each event's `ts` is its
//! position in the recording (one microsecond per event). Every panel gets
//! its own track (`tid` = panel id + 1); orchestrator-level events use track
//! 0.
//!
//! [trace-format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};
use triptych_core::panel::PanelId;
use triptych_core::trace::RecreateReason;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// # Errors
///
/// Returns any error from serializing into `writer`.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let events: Vec<Value> = decode(bytes)
        .enumerate()
        .map(|(ts, recorded)| to_json(ts as u64, &recorded))
        .collect();
    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn track(panel: PanelId) -> u64 {
    u64::from(panel.0) + 1
}

fn instant(ts: u64, tid: u64, name: &str, cat: &str, args: Value) -> Value {
    json!({
        "ph": "i",
        "name": name,
        "cat": cat,
        "ts": ts,
        "pid": 0,
        "tid": tid,
        "s": "t",
        "args": args,
    })
}

fn to_json(ts: u64, recorded: &RecordedEvent) -> Value {
    match *recorded {
        RecordedEvent::FrameBegin(e) => json!({
            "ph": "B",
            "name": "Frame",
            "cat": "Frame",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": e.frame_index,
                "panel_count": e.panel_count,
            }
        }),
        RecordedEvent::FrameEnd(e) => json!({
            "ph": "E",
            "name": "Frame",
            "cat": "Frame",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": e.frame_index,
                "presented": e.presented,
                "skipped": e.skipped,
            }
        }),
        RecordedEvent::Phase(e) => instant(
            ts,
            track(e.panel),
            e.phase.name(),
            "Phase",
            json!({ "frame_index": e.frame_index }),
        ),
        RecordedEvent::Present(e) => instant(
            ts,
            track(e.panel),
            "Present",
            "Pacer",
            json!({
                "frame_index": e.frame_index,
                "slot": e.slot,
                "image": e.image,
                "fence_value": e.fence_value,
                "fence_signaled": e.fence_signaled,
            }),
        ),
        RecordedEvent::BridgeCopy(e) => instant(
            ts,
            track(e.panel),
            "BridgeCopy",
            "Bridge",
            json!({
                "frame_index": e.frame_index,
                "bytes": e.bytes,
            }),
        ),
        RecordedEvent::Resize(e) => instant(
            ts,
            0,
            "Resize",
            "Window",
            json!({
                "width": e.window.width,
                "height": e.window.height,
                "suspended": e.suspended,
            }),
        ),
        RecordedEvent::Recreate(e) => {
            let reason = match e.reason {
                RecreateReason::Resize => "resize",
                RecreateReason::OutOfDate => "out-of-date",
            };
            instant(
                ts,
                track(e.panel),
                "Recreate",
                "Window",
                json!({
                    "width": e.extent.width,
                    "height": e.extent.height,
                    "reason": reason,
                }),
            )
        }
        RecordedEvent::Teardown(e) => {
            instant(ts, track(e.panel), "Teardown", "Lifecycle", json!({}))
        }
    }
}
