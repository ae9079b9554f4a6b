// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end runs of the software triptych.

use kurbo::Size;
use triptych_core::backend::{
    CpuBridgeBackend, FrameCx, NativeBackend, RenderBackend, ZeroCopyBackend,
};
use triptych_core::config::{PacerConfig, PanelConfig};
use triptych_core::device::SurfaceDesc;
use triptych_core::error::FrameError;
use triptych_core::orchestrator::FrameReport;
use triptych_core::panel::{Extent, PanelId, PixelFormat};
use triptych_core::trace::{PresentEvent, Tracer};
use triptych_debug::recorder::{RecordedEvent, RecorderSink};

use crate::{
    BACKGROUND, Op, OpLog, PANEL_COLORS, Role, SoftDisplay, SoftFaults, SoftImage, SoftOffscreen,
    SoftSharedRenderer, SoftTriptych, Triangle, build_triptych, encode_color,
};

const BGRA: PixelFormat = PixelFormat::Bgra8Unorm;

fn triptych() -> SoftTriptych {
    build_triptych(PanelConfig::triptych(), PacerConfig::double_buffered()).unwrap()
}

fn tick(t: &mut SoftTriptych) -> FrameReport {
    t.orchestrator.tick(&mut Tracer::none()).unwrap()
}

fn device_ops(ops: &[Op], device: u32) -> Vec<Op> {
    ops.iter()
        .filter(|op| op.device() == Some(device))
        .copied()
        .collect()
}

#[test]
fn three_panels_sit_side_by_side_with_their_own_triangles() {
    let mut t = triptych();
    let report = tick(&mut t);
    assert_eq!(report.presented, 3);

    let stack = t.orchestrator.host().stack();
    let offsets: Vec<f64> = stack.iter().map(|v| v.offset.x).collect();
    assert_eq!(offsets, [0.0, 320.0, 640.0]);
    for visual in &stack {
        assert_eq!(visual.size, Size::new(320.0, 480.0));
        assert_eq!(visual.offset.y, 0.0);
    }
    assert_ne!(stack[0].surface, stack[1].surface);
    assert_ne!(stack[1].surface, stack[2].surface);

    for (i, screen) in t.screens.iter().enumerate() {
        let screen = screen.borrow();
        assert_eq!(screen.extent(), Extent::new(320, 480));
        assert_eq!(
            screen.pixel(160, 240),
            encode_color(PANEL_COLORS[i], BGRA),
            "panel {i} shows its own triangle"
        );
        assert_eq!(screen.pixel(0, 0), encode_color(BACKGROUND, BGRA));
    }
}

#[test]
fn frames_issue_no_compositor_calls() {
    let mut t = triptych();
    let setup = t.log.take();
    assert_eq!(setup.iter().filter(|op| op.is_compositor()).count(), 15);

    for _ in 0..3 {
        let _ = tick(&mut t);
    }
    assert!(!t.log.take().iter().any(Op::is_compositor));
}

#[test]
fn zero_copy_frame_locks_around_render() {
    let mut t = triptych();
    t.log.take();
    let _ = tick(&mut t);
    let _ = tick(&mut t);
    assert_eq!(
        device_ops(&t.log.take(), 0),
        [
            Op::Acquire { device: 0, image: 0 },
            Op::Lock { device: 0, object: 0 },
            Op::SharedDraw { device: 0, object: 0 },
            Op::Unlock { device: 0, object: 0 },
            Op::Submit { device: 0, value: 1 },
            Op::Present { device: 0, image: 0, fence_signaled: true },
            Op::Acquire { device: 0, image: 1 },
            Op::Lock { device: 0, object: 1 },
            Op::SharedDraw { device: 0, object: 1 },
            Op::Unlock { device: 0, object: 1 },
            Op::Submit { device: 0, value: 2 },
            Op::Present { device: 0, image: 1, fence_signaled: true },
        ]
    );
}

#[test]
fn native_and_cpu_bridge_frames_run_in_order() {
    let mut t = triptych();
    t.log.take();
    let _ = tick(&mut t);
    let ops = t.log.take();
    assert_eq!(
        device_ops(&ops, 1),
        [
            Op::Acquire { device: 1, image: 0 },
            Op::Draw { device: 1, image: 0 },
            Op::Submit { device: 1, value: 1 },
            Op::Present { device: 1, image: 0, fence_signaled: true },
        ]
    );
    let payload = 320 * 480 * 4;
    assert_eq!(
        device_ops(&ops, 2),
        [
            Op::Acquire { device: 2, image: 0 },
            Op::OffscreenDraw { device: 2 },
            Op::Stage { device: 2, bytes: payload },
            Op::Readback { device: 2, bytes: payload },
            Op::CopyStaging { device: 2, image: 0 },
            Op::Submit { device: 2, value: 1 },
            Op::Present { device: 2, image: 0, fence_signaled: true },
        ]
    );
    let first = ops.iter().position(|op| op.device() == Some(0));
    let last = ops.iter().rposition(|op| op.device() == Some(2));
    assert!(first < last, "panels run in creation order");
}

#[test]
fn zero_area_window_issues_no_calls_until_restored() {
    let mut t = triptych();
    let _ = tick(&mut t);
    t.log.take();

    for window in [Extent::new(0, 480), Extent::new(960, 0), Extent::new(2, 480)] {
        t.orchestrator.notify_resized(window);
        for _ in 0..3 {
            let report = tick(&mut t);
            assert!(report.suspended);
            assert_eq!(report.presented, 0);
        }
    }
    assert!(t.log.take().is_empty(), "suspended ticks reach no device");

    t.orchestrator.notify_resized(Extent::new(1200, 600));
    let report = tick(&mut t);
    assert!(!report.suspended);
    assert_eq!(report.presented, 3);
    let ops = t.log.take();
    for device in 0..3 {
        assert!(ops.contains(&Op::Recreate {
            device,
            role: Role::Display,
            extent: Extent::new(400, 600),
        }));
    }
    for screen in &t.screens {
        assert_eq!(screen.borrow().extent(), Extent::new(400, 600));
    }
}

#[test]
fn resizing_twice_to_one_size_is_idempotent() {
    let mut t = triptych();
    let layouts = t.orchestrator.layouts();

    t.orchestrator.notify_resized(Extent::new(1200, 600));
    let _ = tick(&mut t);
    let surfaces = t.orchestrator.surfaces();
    let pixels: Vec<SoftImage> = t.screens.iter().map(|s| s.borrow().clone()).collect();
    let ops = t.log.take();
    assert!(ops.contains(&Op::Unregister { device: 0, object: 1 }));
    assert!(ops.contains(&Op::Register { device: 0, object: 3 }));

    t.orchestrator.notify_resized(Extent::new(1200, 600));
    let _ = tick(&mut t);
    assert_eq!(t.orchestrator.surfaces(), surfaces);
    assert_eq!(t.orchestrator.layouts(), layouts, "visuals keep their setup layout");
    for (screen, before) in t.screens.iter().zip(&pixels) {
        assert!(screen.borrow().same_pixels(before));
    }
}

#[test]
fn cpu_bridge_copies_exact_payload_and_skips_padding() {
    let log = OpLog::new();
    let faults = SoftFaults::new();
    let extent = Extent::new(300, 200);
    let desc = SurfaceDesc {
        extent,
        format: BGRA,
        image_count: 2,
    };
    let display = SoftDisplay::new(0, desc, faults.clone(), log.clone()).unwrap();
    let screen = display.screen();
    let staging = display.staging();
    let scene = Triangle::centered(PANEL_COLORS[2]);
    let source = SoftOffscreen::new(0, extent, BGRA, scene, faults, log);
    let mut backend =
        CpuBridgeBackend::new(source, display, PacerConfig::double_buffered()).unwrap();

    let mut sink = RecorderSink::new();
    {
        let mut tracer = Tracer::new(&mut sink);
        let mut cx = FrameCx::new(PanelId(0), 0, &mut tracer);
        let frame = backend.acquire_surface(&mut cx).unwrap();
        backend.render_frame(&frame, &mut cx).unwrap();
        backend.bridge(&frame, &mut cx).unwrap();
        backend.present(frame, &mut cx).unwrap();
    }

    let payload = 300 * 200 * 4;
    assert_eq!(backend.last_copied(), payload);
    let copies: Vec<u64> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            RecordedEvent::BridgeCopy(c) => Some(c.bytes),
            _ => None,
        })
        .collect();
    assert_eq!(copies, [payload as u64]);

    let mut expected = SoftImage::tight(extent, BGRA);
    scene.draw(&mut expected, BACKGROUND);
    assert!(screen.borrow().same_pixels(&expected), "lossless round trip");

    let staging = staging.borrow();
    assert_eq!(staging.layout().row_pitch, 1280);
    for y in 0..200 {
        assert!(
            staging.row_padding(y).iter().all(|&b| b == 0xAB),
            "staging padding of row {y} was written"
        );
    }
}

#[test]
fn every_present_follows_a_signaled_fence() {
    let mut t = triptych();
    let mut sink = RecorderSink::new();
    {
        let mut tracer = Tracer::new(&mut sink);
        for _ in 0..4 {
            t.orchestrator.tick(&mut tracer).unwrap();
        }
    }
    let presents: Vec<PresentEvent> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            RecordedEvent::Present(p) => Some(p),
            _ => None,
        })
        .collect();
    assert_eq!(presents.len(), 12);
    assert!(presents.iter().all(|p| p.fence_signaled));
    for panel in 0..3 {
        let values: Vec<u64> = presents
            .iter()
            .filter(|p| p.panel == PanelId(panel))
            .map(|p| p.fence_value)
            .collect();
        assert_eq!(values, [1, 2, 3, 4]);
    }
    assert!(t.log.snapshot().iter().all(|op| match op {
        Op::Present { fence_signaled, .. } => *fence_signaled,
        _ => true,
    }));
}

#[test]
fn out_of_date_surface_is_recreated_and_skipped() {
    let mut t = triptych();
    let _ = tick(&mut t);
    t.log.take();

    t.faults[1].fail_next_acquire(FrameError::SurfaceOutOfDate);
    let report = tick(&mut t);
    assert_eq!((report.presented, report.skipped), (2, 1));
    let ops = t.log.take();
    assert!(ops.contains(&Op::Recreate {
        device: 1,
        role: Role::Display,
        extent: Extent::new(320, 480),
    }));
    assert!(!ops.iter().any(|op| matches!(op, Op::Present { device: 1, .. })));

    let report = tick(&mut t);
    assert_eq!(report.presented, 3);
}

#[test]
fn stalled_fence_is_device_loss_and_never_presents() {
    let mut t = triptych();
    t.log.take();
    t.faults[2].stall_fences(true);

    assert_eq!(
        t.orchestrator.tick(&mut Tracer::none()),
        Err(FrameError::DeviceLost)
    );
    let ops = device_ops(&t.log.take(), 2);
    assert!(ops.contains(&Op::Submit { device: 2, value: 1 }));
    assert!(!ops.iter().any(|op| matches!(op, Op::Present { .. })));
}

#[test]
fn failed_shared_draw_releases_the_lock() {
    let mut t = triptych();
    t.log.take();
    t.faults[0].fail_next_draw(FrameError::DeviceLost);

    assert_eq!(
        t.orchestrator.tick(&mut Tracer::none()),
        Err(FrameError::DeviceLost)
    );
    assert_eq!(
        device_ops(&t.log.take(), 0),
        [
            Op::Acquire { device: 0, image: 0 },
            Op::Lock { device: 0, object: 0 },
            Op::Unlock { device: 0, object: 0 },
        ]
    );
    assert_eq!(tick(&mut t).presented, 3, "no lock is left behind");
}

#[test]
fn teardown_reverses_creation() {
    let mut t = triptych();
    let _ = tick(&mut t);
    t.log.take();

    t.orchestrator.teardown(&mut Tracer::none()).unwrap();
    assert_eq!(t.orchestrator.panel_count(), 0);
    assert_eq!(
        t.log.take(),
        [
            // CPU bridge panel.
            Op::ReleaseVisual { visual: 2 },
            Op::WaitIdle { device: 2, role: Role::Offscreen },
            Op::WaitIdle { device: 2, role: Role::Display },
            Op::DestroyFence { device: 2, fence: 1 },
            Op::DestroyFence { device: 2, fence: 0 },
            Op::Release { device: 2, role: Role::Offscreen },
            Op::Release { device: 2, role: Role::Display },
            // Native panel.
            Op::ReleaseVisual { visual: 1 },
            Op::WaitIdle { device: 1, role: Role::Display },
            Op::DestroyFence { device: 1, fence: 1 },
            Op::DestroyFence { device: 1, fence: 0 },
            Op::Release { device: 1, role: Role::Display },
            // Zero-copy panel.
            Op::ReleaseVisual { visual: 0 },
            Op::WaitIdle { device: 0, role: Role::Renderer },
            Op::WaitIdle { device: 0, role: Role::Display },
            Op::DestroyFence { device: 0, fence: 1 },
            Op::DestroyFence { device: 0, fence: 0 },
            Op::Unregister { device: 0, object: 1 },
            Op::Unregister { device: 0, object: 0 },
            Op::Release { device: 0, role: Role::Renderer },
            Op::Release { device: 0, role: Role::Interop },
            Op::Release { device: 0, role: Role::Display },
        ]
    );
    assert!(t.orchestrator.host().children().is_empty());
}

#[test]
fn registrations_are_released_newest_first() {
    let mut t = triptych();
    let _ = tick(&mut t);
    t.orchestrator.notify_resized(Extent::new(1200, 600));
    let _ = tick(&mut t);
    t.orchestrator.teardown(&mut Tracer::none()).unwrap();

    let mut registered = Vec::new();
    let mut unregistered = Vec::new();
    for op in device_ops(&t.log.take(), 0) {
        match op {
            Op::Register { object, .. } => registered.push(object),
            Op::Unregister { object, .. } => unregistered.push(object),
            _ => {}
        }
    }
    assert_eq!(registered, [0, 1, 2, 3]);
    assert_eq!(unregistered, [1, 0, 3, 2]);
}

#[test]
fn fences_are_destroyed_newest_first() {
    let log = OpLog::new();
    let desc = SurfaceDesc {
        extent: Extent::new(4, 4),
        format: BGRA,
        image_count: 2,
    };
    let display = SoftDisplay::new(0, desc, SoftFaults::new(), log.clone()).unwrap();
    let backend = NativeBackend::new(display, PacerConfig { slots: 3 }).unwrap();
    drop(backend);
    let fences: Vec<Op> = log
        .take()
        .into_iter()
        .filter(|op| matches!(op, Op::CreateFence { .. } | Op::DestroyFence { .. }))
        .collect();
    assert_eq!(
        fences,
        [
            Op::CreateFence { device: 0, fence: 0 },
            Op::CreateFence { device: 0, fence: 1 },
            Op::CreateFence { device: 0, fence: 2 },
            Op::DestroyFence { device: 0, fence: 2 },
            Op::DestroyFence { device: 0, fence: 1 },
            Op::DestroyFence { device: 0, fence: 0 },
        ]
    );
}

#[test]
fn dropping_a_busy_backend_waits_once() {
    let log = OpLog::new();
    let faults = SoftFaults::new();
    let desc = SurfaceDesc {
        extent: Extent::new(4, 4),
        format: BGRA,
        image_count: 2,
    };
    let display = SoftDisplay::new(0, desc, faults.clone(), log.clone()).unwrap();
    let renderer = SoftSharedRenderer::new(
        0,
        desc.extent,
        Triangle::centered(PANEL_COLORS[0]),
        faults,
        log.clone(),
    );
    let mut backend =
        ZeroCopyBackend::new(renderer, display, PacerConfig::double_buffered()).unwrap();
    {
        let mut tracer = Tracer::none();
        let mut cx = FrameCx::new(PanelId(0), 0, &mut tracer);
        let frame = backend.acquire_surface(&mut cx).unwrap();
        backend.render_frame(&frame, &mut cx).unwrap();
        backend.bridge(&frame, &mut cx).unwrap();
        backend.present(frame, &mut cx).unwrap();
    }
    log.take();
    drop(backend);
    let waits = log
        .take()
        .into_iter()
        .filter(|op| matches!(op, Op::WaitIdle { .. }))
        .count();
    assert_eq!(waits, 2, "renderer and display are each idle-waited once");
}

#[test]
fn presenting_a_still_locked_image_is_rejected() {
    let log = OpLog::new();
    let faults = SoftFaults::new();
    let desc = SurfaceDesc {
        extent: Extent::new(4, 4),
        format: BGRA,
        image_count: 2,
    };
    let display = SoftDisplay::new(0, desc, faults.clone(), log.clone()).unwrap();
    let renderer = SoftSharedRenderer::new(
        0,
        desc.extent,
        Triangle::centered(PANEL_COLORS[0]),
        faults,
        log.clone(),
    );
    let mut backend =
        ZeroCopyBackend::new(renderer, display, PacerConfig::double_buffered()).unwrap();
    let mut tracer = Tracer::none();
    let mut cx = FrameCx::new(PanelId(0), 0, &mut tracer);

    let frame = backend.acquire_surface(&mut cx).unwrap();
    backend.render_frame(&frame, &mut cx).unwrap();
    assert_eq!(backend.present(frame, &mut cx), Err(FrameError::NotLocked));
    assert!(
        !log.snapshot().iter().any(|op| matches!(op, Op::Present { .. })),
        "nothing was presented"
    );

    let frame = backend.acquire_surface(&mut cx).unwrap();
    backend.render_frame(&frame, &mut cx).unwrap();
    backend.bridge(&frame, &mut cx).unwrap();
    backend.present(frame, &mut cx).unwrap();
}
