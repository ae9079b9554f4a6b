// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DirectComposition host.

use kurbo::{Size, Vec2};
use triptych_core::compose::CompositionHost;
use triptych_core::device::RawSurface;
use triptych_core::error::{FrameError, Result, SetupStage};
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Direct2D::Common::D2D_RECT_F;
use windows::Win32::Graphics::DirectComposition::{
    DCompositionCreateDevice, IDCompositionDevice, IDCompositionTarget, IDCompositionVisual,
};
use windows::Win32::Graphics::Dxgi::IDXGIDevice;
use windows::core::{IUnknown, Interface};

use crate::d3d::create_device;
use crate::error;

/// Displays panel swapchains as children of one window's root visual.
///
/// Every mutating call commits immediately. DirectComposition has no depth
/// axis, so stacking follows insertion order and the `z` offset is ignored.
pub struct DcompHost {
    root: IDCompositionVisual,
    _target: IDCompositionTarget,
    device: IDCompositionDevice,
}

impl core::fmt::Debug for DcompHost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DcompHost").finish_non_exhaustive()
    }
}

impl DcompHost {
    /// Creates a composition device and binds a root visual to `hwnd`.
    ///
    /// The window should be created with `WS_EX_NOREDIRECTIONBITMAP`.
    pub fn new(hwnd: HWND) -> Result<Self> {
        let failed = error::setup(SetupStage::Composition);
        let (d3d, _context) = create_device()?;
        let dxgi: IDXGIDevice = d3d.cast().map_err(&failed)?;
        // SAFETY: `hwnd` is a live window owned by the caller; every object
        // created here is owned by the returned host.
        unsafe {
            let device: IDCompositionDevice = DCompositionCreateDevice(&dxgi).map_err(&failed)?;
            let target = device.CreateTargetForHwnd(hwnd, true).map_err(&failed)?;
            let root = device.CreateVisual().map_err(&failed)?;
            target.SetRoot(&root).map_err(&failed)?;
            device.Commit().map_err(&failed)?;
            Ok(Self {
                root,
                _target: target,
                device,
            })
        }
    }

    fn commit(&self) -> Result<()> {
        // SAFETY: commits this host's own device.
        unsafe { self.device.Commit() }.map_err(error::setup(SetupStage::Composition))
    }
}

impl CompositionHost for DcompHost {
    type Surface = IUnknown;
    type Visual = IDCompositionVisual;

    fn wrap_surface(&mut self, raw: RawSurface) -> Result<IUnknown> {
        // SAFETY: `raw` is a swapchain pointer owned by a backend that
        // outlives the visual; cloning adds a reference.
        unsafe { IUnknown::from_raw_borrowed(&raw.0) }
            .cloned()
            .ok_or(FrameError::Setup {
                stage: SetupStage::Composition,
                code: 0,
            })
    }

    fn create_visual(&mut self, surface: &IUnknown) -> Result<IDCompositionVisual> {
        let failed = error::setup(SetupStage::Composition);
        // SAFETY: `surface` is a composition swapchain.
        unsafe {
            let visual = self.device.CreateVisual().map_err(&failed)?;
            visual.SetContent(surface).map_err(&failed)?;
            Ok(visual)
        }
    }

    fn set_size(&mut self, visual: &IDCompositionVisual, size: Size) -> Result<()> {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "DirectComposition takes single-precision coordinates"
        )]
        let clip = D2D_RECT_F {
            left: 0.0,
            top: 0.0,
            right: size.width as f32,
            bottom: size.height as f32,
        };
        // SAFETY: `clip` outlives the call.
        unsafe { visual.SetClip2(&clip) }.map_err(error::setup(SetupStage::Composition))?;
        self.commit()
    }

    fn set_offset(&mut self, visual: &IDCompositionVisual, offset: Vec2, _z: f32) -> Result<()> {
        let failed = error::setup(SetupStage::Composition);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "DirectComposition takes single-precision coordinates"
        )]
        let (x, y) = (offset.x as f32, offset.y as f32);
        // SAFETY: plain property updates on a visual of this device.
        unsafe {
            visual.SetOffsetX2(x).map_err(&failed)?;
            visual.SetOffsetY2(y).map_err(&failed)?;
        }
        self.commit()
    }

    fn insert_top(&mut self, visual: &IDCompositionVisual) -> Result<()> {
        // SAFETY: with no reference visual, `insertabove = true` places the
        // child on top of the root collection.
        unsafe { self.root.AddVisual(visual, true, None) }
            .map_err(error::setup(SetupStage::Composition))?;
        self.commit()
    }

    fn release(&mut self, visual: IDCompositionVisual, surface: IUnknown) {
        // SAFETY: removing a child this host inserted.
        _ = unsafe { self.root.RemoveVisual(&visual) };
        _ = self.commit();
        drop(visual);
        drop(surface);
    }
}
