// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software three-panel setup: one panel per bridging strategy.

use triptych_core::backend::{CpuBridgeBackend, NativeBackend, RenderBackend, ZeroCopyBackend};
use triptych_core::bridge::{BridgeStrategy, InteropCaps};
use triptych_core::config::{PacerConfig, PanelConfig};
use triptych_core::device::{DisplayDevice, SurfaceDesc};
use triptych_core::error::Result;
use triptych_core::orchestrator::Orchestrator;
use triptych_core::panel::PixelFormat;

use crate::compositor::SoftCompositor;
use crate::display::SoftDisplay;
use crate::fence::SoftFaults;
use crate::image::SharedImage;
use crate::interop::SoftSharedRenderer;
use crate::log::OpLog;
use crate::offscreen::SoftOffscreen;
use crate::raster::Triangle;

/// Clear color of every panel, RGBA.
pub const BACKGROUND: [u8; 4] = [0, 0, 0, 255];

/// Triangle color of each panel, RGBA, cycling when there are more than
/// three panels.
pub const PANEL_COLORS: [[u8; 4]; 3] = [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]];

/// Swapchain images per display.
const IMAGE_COUNT: u32 = 2;

/// A running software triptych.
#[derive(Debug)]
pub struct SoftTriptych {
    /// Drives every panel.
    pub orchestrator: Orchestrator<SoftCompositor>,
    /// What each panel's display last presented, in panel order.
    pub screens: Vec<SharedImage>,
    /// Fault switches of each panel, in panel order.
    pub faults: Vec<SoftFaults>,
    /// Every device and compositor call.
    pub log: OpLog,
}

/// Capabilities the software devices of panel `index` advertise.
///
/// Panels cycle through zero-copy, native, and CPU bridge so that a
/// three-panel window exercises every strategy once.
#[must_use]
pub fn panel_caps(index: u32) -> InteropCaps {
    match index % 3 {
        0 => InteropCaps {
            composition_swapchain: false,
            shared_registration: true,
        },
        1 => InteropCaps {
            composition_swapchain: true,
            shared_registration: true,
        },
        _ => InteropCaps {
            composition_swapchain: false,
            shared_registration: false,
        },
    }
}

/// Builds an orchestrator with `panels.panel_count` software panels.
///
/// # Errors
///
/// Any device setup, registration, or compositor error.
pub fn build_triptych(panels: PanelConfig, pacing: PacerConfig) -> Result<SoftTriptych> {
    let log = OpLog::new();
    let mut orchestrator = Orchestrator::new(SoftCompositor::new(log.clone()), panels);
    let mut screens = Vec::new();
    let mut faults = Vec::new();

    for index in 0..panels.panel_count {
        let panel_faults = SoftFaults::new();
        let scene = Triangle::centered(PANEL_COLORS[index as usize % PANEL_COLORS.len()]);
        let desc = SurfaceDesc {
            extent: panels.panel_extent,
            format: PixelFormat::Bgra8Unorm,
            image_count: IMAGE_COUNT,
        };
        let display = SoftDisplay::new(index, desc, panel_faults.clone(), log.clone())?;
        screens.push(display.screen());

        let backend: Box<dyn RenderBackend> = match BridgeStrategy::select(panel_caps(index)) {
            BridgeStrategy::Native => {
                Box::new(NativeBackend::new(display.with_scene(scene), pacing)?)
            }
            BridgeStrategy::ZeroCopy => {
                let renderer = SoftSharedRenderer::new(
                    index,
                    desc.extent,
                    scene,
                    panel_faults.clone(),
                    log.clone(),
                );
                Box::new(ZeroCopyBackend::new(renderer, display, pacing)?)
            }
            BridgeStrategy::CpuBridge => {
                let surface = display.surface();
                let source = SoftOffscreen::new(
                    index,
                    surface.extent,
                    surface.format,
                    scene,
                    panel_faults.clone(),
                    log.clone(),
                );
                Box::new(CpuBridgeBackend::new(source, display, pacing)?)
            }
        };
        orchestrator.add_panel(backend)?;
        faults.push(panel_faults);
    }

    Ok(SoftTriptych {
        orchestrator,
        screens,
        faults,
        log,
    })
}
