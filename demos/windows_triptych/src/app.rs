// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::Cell;
use std::error::Error;

use triptych_backend_wgpu::{WgpuConfig, WgpuOffscreen};
use triptych_backend_windows::{D3d11Display, DcompHost, GlRenderer, TRIANGLE_HLSL, gl_shaders};
use triptych_core::backend::{CpuBridgeBackend, NativeBackend, RenderBackend, ZeroCopyBackend};
use triptych_core::config::{PacerConfig, PanelConfig};
use triptych_core::device::{ShaderBlob, SurfaceDesc};
use triptych_core::orchestrator::Orchestrator;
use triptych_core::panel::{Extent, PixelFormat};
use triptych_core::trace::Tracer;
use triptych_debug::pretty::PrettyPrintSink;
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::Graphics::Direct3D::Fxc::D3DCompile;
use windows::Win32::Graphics::Direct3D::ID3DBlob;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    AdjustWindowRectEx, CW_USEDEFAULT, CreateWindowExW, DefWindowProcW, DispatchMessageW,
    IDC_ARROW, LoadCursorW, MSG, PM_REMOVE, PeekMessageW, PostQuitMessage, RegisterClassW,
    SW_SHOW, ShowWindow, TranslateMessage, WM_DESTROY, WM_QUIT, WM_SIZE, WNDCLASSW,
    WS_EX_NOREDIRECTIONBITMAP, WS_OVERLAPPEDWINDOW,
};
use windows::core::{PCSTR, s, w};

const COLORS: [[u8; 4]; 3] = [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]];

/// Frames traced to stderr after startup and after each resize.
const TRACED_FRAMES: u32 = 3;

thread_local! {
    static RESIZED: Cell<Option<Extent>> = const { Cell::new(None) };
}

extern "system" fn wndproc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    match msg {
        WM_SIZE => {
            let width = u32::try_from(lparam.0 & 0xffff).unwrap_or(0);
            let height = u32::try_from((lparam.0 >> 16) & 0xffff).unwrap_or(0);
            RESIZED.set(Some(Extent::new(width, height)));
            LRESULT(0)
        }
        WM_DESTROY => {
            // SAFETY: called on the window's own thread.
            unsafe { PostQuitMessage(0) };
            LRESULT(0)
        }
        // SAFETY: forwarding the message unchanged.
        _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}

fn create_window(client: Extent) -> windows::core::Result<HWND> {
    // SAFETY: standard class registration and window creation on this
    // thread; `wndproc` has the required signature.
    unsafe {
        let instance = GetModuleHandleW(None)?;
        let class = WNDCLASSW {
            lpfnWndProc: Some(wndproc),
            hInstance: instance.into(),
            hCursor: LoadCursorW(None, IDC_ARROW)?,
            lpszClassName: w!("triptych"),
            ..WNDCLASSW::default()
        };
        RegisterClassW(&class);

        let mut rect = RECT {
            left: 0,
            top: 0,
            right: i32::try_from(client.width).unwrap_or(960),
            bottom: i32::try_from(client.height).unwrap_or(480),
        };
        AdjustWindowRectEx(
            &mut rect,
            WS_OVERLAPPEDWINDOW,
            false,
            WS_EX_NOREDIRECTIONBITMAP,
        )?;
        let hwnd = CreateWindowExW(
            WS_EX_NOREDIRECTIONBITMAP,
            w!("triptych"),
            w!("triptych"),
            WS_OVERLAPPEDWINDOW,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            rect.right - rect.left,
            rect.bottom - rect.top,
            None,
            None,
            Some(instance.into()),
            None,
        )?;
        _ = ShowWindow(hwnd, SW_SHOW);
        Ok(hwnd)
    }
}

/// Compiles one entry point of [`TRIANGLE_HLSL`] to DXBC.
fn compile_hlsl(entry: PCSTR, target: PCSTR) -> windows::core::Result<Vec<u8>> {
    let mut code: Option<ID3DBlob> = None;
    // SAFETY: the source slice outlives the call; `code` receives the
    // blob, whose buffer is copied out before it drops.
    unsafe {
        D3DCompile(
            TRIANGLE_HLSL.as_ptr().cast(),
            TRIANGLE_HLSL.len(),
            PCSTR::null(),
            None,
            None,
            entry,
            target,
            0,
            0,
            &mut code,
            None,
        )?;
        let code = code.ok_or_else(windows::core::Error::empty)?;
        let bytes =
            std::slice::from_raw_parts(code.GetBufferPointer().cast::<u8>(), code.GetBufferSize());
        Ok(bytes.to_vec())
    }
}

fn build_panels(
    hwnd: HWND,
    orchestrator: &mut Orchestrator<DcompHost>,
    config: PanelConfig,
) -> Result<(), Box<dyn Error>> {
    let pacing = PacerConfig::double_buffered();
    let desc = SurfaceDesc {
        extent: config.panel_extent,
        format: PixelFormat::Bgra8Unorm,
        image_count: 2,
    };

    // Zero copy: OpenGL into the D3D11 back buffer.
    let display = D3d11Display::new(desc)?;
    let renderer = GlRenderer::new(
        hwnd,
        display.device(),
        desc.extent,
        &gl_shaders(),
        COLORS[0],
    )?;
    let zero_copy: Box<dyn RenderBackend> =
        Box::new(ZeroCopyBackend::new(renderer, display, pacing)?);
    orchestrator.add_panel(zero_copy)?;

    // Native: Direct3D 11 draws its own swapchain.
    let vs = compile_hlsl(s!("vs_main"), s!("vs_5_0"))?;
    let ps = compile_hlsl(s!("fs_main"), s!("ps_5_0"))?;
    let mut display = D3d11Display::new(desc)?;
    display.set_scene(&[ShaderBlob::vertex(&vs), ShaderBlob::fragment(&ps)], COLORS[1])?;
    let native: Box<dyn RenderBackend> = Box::new(NativeBackend::new(display, pacing)?);
    orchestrator.add_panel(native)?;

    // CPU bridge: wgpu offscreen, copied into a D3D11 staging texture.
    let source = WgpuOffscreen::with_triangle(
        WgpuConfig::vulkan(),
        desc.extent,
        desc.format,
        COLORS[2],
    )
    .or_else(|_| {
        WgpuOffscreen::with_triangle(WgpuConfig::any(), desc.extent, desc.format, COLORS[2])
    })?;
    eprintln!("cpu bridge renders on {}", source.adapter_info().name);
    let display = D3d11Display::new(desc)?;
    let bridged: Box<dyn RenderBackend> =
        Box::new(CpuBridgeBackend::new(source, display, pacing)?);
    orchestrator.add_panel(bridged)?;
    Ok(())
}

pub(crate) fn run() -> Result<(), Box<dyn Error>> {
    let config = PanelConfig::triptych();
    let hwnd = create_window(config.window_extent())?;
    let mut orchestrator = Orchestrator::new(DcompHost::new(hwnd)?, config);
    build_panels(hwnd, &mut orchestrator, config)?;

    let mut pretty = PrettyPrintSink::stderr().with_phases(false);
    let mut traced = 0;
    let mut msg = MSG::default();
    let result = 'frames: loop {
        // SAFETY: standard message pump on the window's thread.
        unsafe {
            while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                if msg.message == WM_QUIT {
                    break 'frames Ok(());
                }
                _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
        if let Some(window) = RESIZED.take() {
            orchestrator.notify_resized(window);
            traced = 0;
        }
        let mut tracer = if traced < TRACED_FRAMES {
            traced += 1;
            Tracer::new(&mut pretty)
        } else {
            Tracer::none()
        };
        if let Err(e) = orchestrator.tick(&mut tracer) {
            break 'frames Err(e);
        }
    };

    orchestrator.teardown(&mut Tracer::new(&mut pretty))?;
    Ok(result?)
}
