// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless three-panel run.
//!
//! Builds one software panel per bridging strategy. The CPU-bridge panel
//! renders with wgpu when an adapter is available and falls back to the
//! software offscreen renderer otherwise. The loop runs 60 frames, shrinks
//! the window to zero width at frame 20, restores it larger at frame 30,
//! then tears everything down. Events are pretty-printed to stderr and
//! exported as Chrome trace JSON.

use std::fs::File;
use std::io::BufWriter;

use triptych_backend_soft::{
    OpLog, PANEL_COLORS, SoftCompositor, SoftDisplay, SoftFaults, SoftOffscreen,
    SoftSharedRenderer, Triangle, panel_caps,
};
use triptych_backend_wgpu::{WgpuConfig, WgpuOffscreen};
use triptych_core::backend::{CpuBridgeBackend, NativeBackend, RenderBackend, ZeroCopyBackend};
use triptych_core::bridge::BridgeStrategy;
use triptych_core::config::{PacerConfig, PanelConfig};
use triptych_core::device::SurfaceDesc;
use triptych_core::orchestrator::Orchestrator;
use triptych_core::panel::{Extent, PixelFormat};
use triptych_core::trace::{
    BridgeCopyEvent, FrameBeginEvent, FrameEndEvent, PhaseEvent, PresentEvent, RecreateEvent,
    ResizeEvent, TeardownEvent, TraceSink, Tracer,
};
use triptych_debug::pretty::PrettyPrintSink;
use triptych_debug::recorder::RecorderSink;

const FRAME_COUNT: u64 = 60;

/// Forwards every event to two sinks.
struct Tee<'a>(&'a mut dyn TraceSink, &'a mut dyn TraceSink);

impl TraceSink for Tee<'_> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.0.on_frame_begin(e);
        self.1.on_frame_begin(e);
    }

    fn on_phase(&mut self, e: &PhaseEvent) {
        self.0.on_phase(e);
        self.1.on_phase(e);
    }

    fn on_present(&mut self, e: &PresentEvent) {
        self.0.on_present(e);
        self.1.on_present(e);
    }

    fn on_bridge_copy(&mut self, e: &BridgeCopyEvent) {
        self.0.on_bridge_copy(e);
        self.1.on_bridge_copy(e);
    }

    fn on_resize(&mut self, e: &ResizeEvent) {
        self.0.on_resize(e);
        self.1.on_resize(e);
    }

    fn on_recreate(&mut self, e: &RecreateEvent) {
        self.0.on_recreate(e);
        self.1.on_recreate(e);
    }

    fn on_teardown(&mut self, e: &TeardownEvent) {
        self.0.on_teardown(e);
        self.1.on_teardown(e);
    }

    fn on_frame_end(&mut self, e: &FrameEndEvent) {
        self.0.on_frame_end(e);
        self.1.on_frame_end(e);
    }
}

fn main() {
    let panels = PanelConfig::triptych();
    let pacing = PacerConfig::double_buffered();
    let log = OpLog::new();
    let mut orchestrator = Orchestrator::new(SoftCompositor::new(log.clone()), panels);
    let mut screens = Vec::new();

    for index in 0..panels.panel_count {
        let faults = SoftFaults::new();
        let color = PANEL_COLORS[index as usize % PANEL_COLORS.len()];
        let scene = Triangle::centered(color);
        let desc = SurfaceDesc {
            extent: panels.panel_extent,
            format: PixelFormat::Bgra8Unorm,
            image_count: 2,
        };
        let display =
            SoftDisplay::new(index, desc, faults.clone(), log.clone()).expect("display setup");
        screens.push(display.screen());

        let strategy = BridgeStrategy::select(panel_caps(index));
        let backend: Box<dyn RenderBackend> = match strategy {
            BridgeStrategy::Native => Box::new(
                NativeBackend::new(display.with_scene(scene), pacing).expect("native backend"),
            ),
            BridgeStrategy::ZeroCopy => {
                let renderer =
                    SoftSharedRenderer::new(index, desc.extent, scene, faults, log.clone());
                Box::new(ZeroCopyBackend::new(renderer, display, pacing).expect("zero-copy backend"))
            }
            BridgeStrategy::CpuBridge => {
                match WgpuOffscreen::with_triangle(WgpuConfig::any(), desc.extent, desc.format, color)
                {
                    Ok(source) => {
                        eprintln!("panel {index}: wgpu on {}", source.adapter_info().name);
                        Box::new(
                            CpuBridgeBackend::new(source, display, pacing)
                                .expect("cpu-bridge backend"),
                        )
                    }
                    Err(e) => {
                        eprintln!("panel {index}: wgpu unavailable ({e}), rendering in software");
                        let source = SoftOffscreen::new(
                            index,
                            desc.extent,
                            desc.format,
                            scene,
                            faults,
                            log.clone(),
                        );
                        Box::new(
                            CpuBridgeBackend::new(source, display, pacing)
                                .expect("cpu-bridge backend"),
                        )
                    }
                }
            }
        };
        eprintln!("panel {index}: {strategy:?}");
        orchestrator.add_panel(backend).expect("attach panel");
    }

    let mut pretty = PrettyPrintSink::stderr().with_phases(false);
    let mut recorder = RecorderSink::new();
    let mut tee = Tee(&mut pretty, &mut recorder);

    let mut presented = 0;
    for frame in 0..FRAME_COUNT {
        match frame {
            20 => orchestrator.notify_resized(Extent::new(0, 480)),
            30 => orchestrator.notify_resized(Extent::new(1200, 600)),
            _ => {}
        }
        let report = orchestrator
            .tick(&mut Tracer::new(&mut tee))
            .expect("frame failed");
        presented += report.presented;
    }

    for (index, screen) in screens.iter().enumerate() {
        let screen = screen.borrow();
        let extent = screen.extent();
        let [b, g, r, a] = screen.pixel(extent.width / 2, extent.height / 2);
        println!(
            "panel {index}: {}x{}, center pixel rgba({r}, {g}, {b}, {a})",
            extent.width, extent.height
        );
    }

    orchestrator
        .teardown(&mut Tracer::new(&mut tee))
        .expect("teardown failed");

    let path = "triptych_trace.json";
    let file = File::create(path).expect("failed to create trace file");
    let mut writer = BufWriter::new(file);
    triptych_debug::json::export(recorder.as_bytes(), &mut writer).expect("failed to write trace");

    println!(
        "{presented} presents over {FRAME_COUNT} frames, {} device calls; wrote {path}",
        log.len()
    );
}
