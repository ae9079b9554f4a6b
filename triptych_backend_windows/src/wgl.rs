// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! OpenGL rendering into D3D11 textures through `WGL_NV_DX_interop2`.

use std::ffi::{CString, c_void};
use std::rc::Rc;

use gl::types::{GLenum, GLint, GLuint};
use triptych_core::device::{InteropDevice, SharedRenderer, ShaderBlob, ShaderStage};
use triptych_core::error::{FrameError, Result, SetupStage};
use triptych_core::panel::Extent;
use triptych_core::shared::SharedWriteLock;
use windows::Win32::Foundation::{HANDLE, HWND};
use windows::Win32::Graphics::Direct3D11::{ID3D11Device, ID3D11Texture2D};
use windows::Win32::Graphics::Gdi::{GetDC, HDC, ReleaseDC};
use windows::Win32::Graphics::OpenGL::{
    ChoosePixelFormat, HGLRC, PFD_DOUBLEBUFFER, PFD_DRAW_TO_WINDOW, PFD_SUPPORT_OPENGL,
    PFD_TYPE_RGBA, PIXELFORMATDESCRIPTOR, SetPixelFormat, wglCreateContext, wglDeleteContext,
    wglGetProcAddress, wglMakeCurrent,
};
use windows::Win32::System::LibraryLoader::{GetModuleHandleA, GetProcAddress};
use windows::core::{Interface, PCSTR, s};

use crate::error;
use crate::shader::{Vertex, triangle_vertices};

const WGL_ACCESS_READ_WRITE_NV: GLenum = 0x0001;

type DxOpenDevice = unsafe extern "system" fn(dx_device: *mut c_void) -> HANDLE;
type DxCloseDevice = unsafe extern "system" fn(device: HANDLE) -> i32;
type DxRegisterObject = unsafe extern "system" fn(
    device: HANDLE,
    dx_object: *mut c_void,
    name: GLuint,
    kind: GLenum,
    access: GLenum,
) -> HANDLE;
type DxUnregisterObject = unsafe extern "system" fn(device: HANDLE, object: HANDLE) -> i32;
type DxLockObjects =
    unsafe extern "system" fn(device: HANDLE, count: GLint, objects: *mut HANDLE) -> i32;

/// Resolves an OpenGL or WGL entry point, falling back to `opengl32.dll`
/// for the GL 1.1 core functions `wglGetProcAddress` does not return.
fn proc_address(name: &str) -> *const c_void {
    let Ok(name) = CString::new(name) else {
        return core::ptr::null();
    };
    let name = PCSTR(name.as_ptr().cast());
    // SAFETY: `name` is NUL-terminated and outlives both lookups.
    unsafe {
        if let Some(f) = wglGetProcAddress(name) {
            return f as *const c_void;
        }
        GetModuleHandleA(s!("opengl32.dll"))
            .ok()
            .and_then(|module| GetProcAddress(module, name))
            .map_or(core::ptr::null(), |f| f as *const c_void)
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// A WGL context made current on the calling thread for its lifetime.
struct WglContext {
    glrc: HGLRC,
    dc: HDC,
    hwnd: HWND,
}

impl WglContext {
    fn new(hwnd: HWND) -> Result<Self> {
        let failed = |code: i32| FrameError::Setup {
            stage: SetupStage::Interop,
            code,
        };
        #[expect(
            clippy::cast_possible_truncation,
            reason = "the descriptor is 40 bytes"
        )]
        let pfd = PIXELFORMATDESCRIPTOR {
            nSize: size_of::<PIXELFORMATDESCRIPTOR>() as u16,
            nVersion: 1,
            dwFlags: PFD_DRAW_TO_WINDOW | PFD_SUPPORT_OPENGL | PFD_DOUBLEBUFFER,
            iPixelType: PFD_TYPE_RGBA,
            cColorBits: 32,
            ..PIXELFORMATDESCRIPTOR::default()
        };
        // SAFETY: `hwnd` is a live window owned by the caller; the DC and
        // context are released in `Drop`.
        unsafe {
            let dc = GetDC(Some(hwnd));
            if dc.is_invalid() {
                return Err(failed(0));
            }
            let format = ChoosePixelFormat(dc, &pfd);
            if format == 0 {
                ReleaseDC(Some(hwnd), dc);
                return Err(failed(0));
            }
            if let Err(e) = SetPixelFormat(dc, format, &pfd) {
                ReleaseDC(Some(hwnd), dc);
                return Err(failed(e.code().0));
            }
            let glrc = match wglCreateContext(dc) {
                Ok(glrc) => glrc,
                Err(e) => {
                    ReleaseDC(Some(hwnd), dc);
                    return Err(failed(e.code().0));
                }
            };
            let context = Self { glrc, dc, hwnd };
            wglMakeCurrent(dc, glrc).map_err(|e| failed(e.code().0))?;
            gl::load_with(proc_address);
            Ok(context)
        }
    }
}

impl Drop for WglContext {
    fn drop(&mut self) {
        // SAFETY: releases exactly what `new` acquired, current context
        // first.
        unsafe {
            _ = wglMakeCurrent(HDC::default(), HGLRC::default());
            _ = wglDeleteContext(self.glrc);
            ReleaseDC(Some(self.hwnd), self.dc);
        }
    }
}

// ---------------------------------------------------------------------------
// Interop device
// ---------------------------------------------------------------------------

/// A D3D11 texture registered as an OpenGL texture, with a framebuffer to
/// draw into it.
#[derive(Debug)]
pub struct GlSharedObject {
    handle: HANDLE,
    texture: GLuint,
    framebuffer: GLuint,
}

/// `wglDXOpenDeviceNV` over a D3D11 device.
pub struct WglInterop {
    device: HANDLE,
    close: DxCloseDevice,
    register: DxRegisterObject,
    unregister: DxUnregisterObject,
    lock: DxLockObjects,
    unlock: DxLockObjects,
}

impl core::fmt::Debug for WglInterop {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WglInterop")
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl WglInterop {
    /// Opens an interop device on `d3d`. A WGL context must be current.
    fn open(d3d: &ID3D11Device) -> Result<Self> {
        let missing = FrameError::Setup {
            stage: SetupStage::Interop,
            code: 0,
        };
        let load = |name: &str| {
            let f = proc_address(name);
            if f.is_null() { Err(missing) } else { Ok(f) }
        };
        // SAFETY: each pointer was resolved under its documented
        // `WGL_NV_DX_interop` name and has that signature.
        unsafe {
            let open: DxOpenDevice = core::mem::transmute(load("wglDXOpenDeviceNV")?);
            let close = core::mem::transmute::<*const c_void, DxCloseDevice>(load(
                "wglDXCloseDeviceNV",
            )?);
            let register = core::mem::transmute::<*const c_void, DxRegisterObject>(load(
                "wglDXRegisterObjectNV",
            )?);
            let unregister = core::mem::transmute::<*const c_void, DxUnregisterObject>(load(
                "wglDXUnregisterObjectNV",
            )?);
            let lock =
                core::mem::transmute::<*const c_void, DxLockObjects>(load("wglDXLockObjectsNV")?);
            let unlock = core::mem::transmute::<*const c_void, DxLockObjects>(load(
                "wglDXUnlockObjectsNV",
            )?);
            let device = open(d3d.as_raw());
            if device.is_invalid() {
                return Err(error::last_interop_error());
            }
            Ok(Self {
                device,
                close,
                register,
                unregister,
                lock,
                unlock,
            })
        }
    }
}

impl InteropDevice for WglInterop {
    type Image = ID3D11Texture2D;
    type Object = GlSharedObject;

    fn register(&self, image: &ID3D11Texture2D, _extent: Extent) -> Result<GlSharedObject> {
        let mut texture = 0;
        let mut framebuffer = 0;
        // SAFETY: the context that opened this device is current; `image`
        // is a texture of the device it was opened on.
        unsafe {
            gl::GenTextures(1, &mut texture);
            let handle = (self.register)(
                self.device,
                image.as_raw(),
                texture,
                gl::TEXTURE_2D,
                WGL_ACCESS_READ_WRITE_NV,
            );
            if handle.is_invalid() {
                let e = error::last_interop_error();
                gl::DeleteTextures(1, &texture);
                return Err(e);
            }
            gl::GenFramebuffers(1, &mut framebuffer);
            Ok(GlSharedObject {
                handle,
                texture,
                framebuffer,
            })
        }
    }

    fn unregister(&self, object: &GlSharedObject) {
        // SAFETY: `object` was registered on this device and is unlocked.
        unsafe {
            (self.unregister)(self.device, object.handle);
            gl::DeleteFramebuffers(1, &object.framebuffer);
            gl::DeleteTextures(1, &object.texture);
        }
    }

    fn lock(&self, object: &GlSharedObject) -> Result<()> {
        let mut handle = object.handle;
        // SAFETY: one live handle of this device.
        if unsafe { (self.lock)(self.device, 1, &mut handle) } == 0 {
            return Err(error::last_interop_error());
        }
        Ok(())
    }

    fn unlock(&self, object: &GlSharedObject) -> Result<()> {
        let mut handle = object.handle;
        // SAFETY: as in `lock`; unlocking flushes pending GL writes.
        if unsafe { (self.unlock)(self.device, 1, &mut handle) } == 0 {
            return Err(error::last_interop_error());
        }
        Ok(())
    }
}

impl Drop for WglInterop {
    fn drop(&mut self) {
        // SAFETY: every object was unregistered by its handle's drop.
        _ = unsafe { (self.close)(self.device) };
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Draws a colored triangle with OpenGL into shared D3D11 back buffers.
pub struct GlRenderer {
    // Field order is release order; the context goes last.
    program: GLuint,
    vertex_array: GLuint,
    vertex_buffer: GLuint,
    extent: Extent,
    interop: Rc<WglInterop>,
    _context: WglContext,
}

impl core::fmt::Debug for GlRenderer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GlRenderer")
            .field("extent", &self.extent)
            .field("interop", &self.interop)
            .finish_non_exhaustive()
    }
}

impl GlRenderer {
    /// Creates a GL context on `hwnd`'s device context, opens an interop
    /// device on `d3d`, and builds the triangle program from GLSL
    /// `shaders`.
    ///
    /// The context stays current on the calling thread; every later call
    /// must come from that thread.
    pub fn new(
        hwnd: HWND,
        d3d: &ID3D11Device,
        extent: Extent,
        shaders: &[ShaderBlob<'_>],
        color: [u8; 4],
    ) -> Result<Self> {
        let context = WglContext::new(hwnd)?;
        let interop = Rc::new(WglInterop::open(d3d)?);
        let program = link_program(shaders)?;

        let data = triangle_vertices(color);
        let bytes: &[u8] = bytemuck::cast_slice(&data);
        let mut vertex_array = 0;
        let mut vertex_buffer = 0;
        // SAFETY: the context is current; `bytes` outlives BufferData.
        unsafe {
            gl::GenVertexArrays(1, &mut vertex_array);
            gl::BindVertexArray(vertex_array);
            gl::GenBuffers(1, &mut vertex_buffer);
            gl::BindBuffer(gl::ARRAY_BUFFER, vertex_buffer);
            gl::BufferData(
                gl::ARRAY_BUFFER,
                bytes.len() as isize,
                bytes.as_ptr().cast(),
                gl::STATIC_DRAW,
            );
            let stride = Vertex::STRIDE as GLint;
            gl::VertexAttribPointer(0, 2, gl::FLOAT, gl::FALSE, stride, core::ptr::null());
            gl::EnableVertexAttribArray(0);
            gl::VertexAttribPointer(
                1,
                4,
                gl::FLOAT,
                gl::FALSE,
                stride,
                Vertex::COLOR_OFFSET as usize as *const c_void,
            );
            gl::EnableVertexAttribArray(1);
            gl::BindVertexArray(0);
        }

        Ok(Self {
            program,
            vertex_array,
            vertex_buffer,
            extent,
            interop,
            _context: context,
        })
    }
}

impl SharedRenderer for GlRenderer {
    type Interop = WglInterop;

    fn interop(&self) -> &Rc<WglInterop> {
        &self.interop
    }

    fn draw(&mut self, target: &SharedWriteLock<WglInterop>, _frame_index: u64) -> Result<()> {
        let object = target.object();
        let width = GLint::try_from(self.extent.width).map_err(|_| FrameError::DeviceLost)?;
        let height = GLint::try_from(self.extent.height).map_err(|_| FrameError::DeviceLost)?;
        // SAFETY: the context is current and `target` proves the object is
        // locked for GL access.
        unsafe {
            gl::BindFramebuffer(gl::FRAMEBUFFER, object.framebuffer);
            gl::FramebufferTexture2D(
                gl::FRAMEBUFFER,
                gl::COLOR_ATTACHMENT0,
                gl::TEXTURE_2D,
                object.texture,
                0,
            );
            gl::Viewport(0, 0, width, height);
            gl::ClearColor(0.0, 0.0, 0.0, 1.0);
            gl::Clear(gl::COLOR_BUFFER_BIT);
            gl::UseProgram(self.program);
            gl::BindVertexArray(self.vertex_array);
            gl::DrawArrays(gl::TRIANGLES, 0, 3);
            gl::BindVertexArray(0);
            gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
        }
        Ok(())
    }

    fn resize(&mut self, extent: Extent) -> Result<()> {
        self.extent = extent;
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        // SAFETY: the context is current.
        unsafe { gl::Finish() };
        Ok(())
    }
}

impl Drop for GlRenderer {
    fn drop(&mut self) {
        // SAFETY: the context is still current; it drops after this body.
        unsafe {
            gl::DeleteProgram(self.program);
            gl::DeleteBuffers(1, &self.vertex_buffer);
            gl::DeleteVertexArrays(1, &self.vertex_array);
        }
    }
}

// ---------------------------------------------------------------------------
// Program
// ---------------------------------------------------------------------------

fn link_program(shaders: &[ShaderBlob<'_>]) -> Result<GLuint> {
    let failed = FrameError::Setup {
        stage: SetupStage::Pipeline,
        code: 0,
    };
    let source = |stage: ShaderStage| {
        shaders
            .iter()
            .find(|blob| blob.stage == stage)
            .ok_or(failed)
    };
    let vs = compile(gl::VERTEX_SHADER, source(ShaderStage::Vertex)?.bytes)?;
    let fs = match compile(gl::FRAGMENT_SHADER, source(ShaderStage::Fragment)?.bytes) {
        Ok(fs) => fs,
        Err(e) => {
            // SAFETY: `vs` was created above.
            unsafe { gl::DeleteShader(vs) };
            return Err(e);
        }
    };
    // SAFETY: a context is current; both shaders compiled.
    unsafe {
        let program = gl::CreateProgram();
        gl::AttachShader(program, vs);
        gl::AttachShader(program, fs);
        gl::LinkProgram(program);
        gl::DeleteShader(vs);
        gl::DeleteShader(fs);
        let mut status = 0;
        gl::GetProgramiv(program, gl::LINK_STATUS, &mut status);
        if status == 0 {
            gl::DeleteProgram(program);
            return Err(failed);
        }
        Ok(program)
    }
}

fn compile(kind: GLenum, source: &[u8]) -> Result<GLuint> {
    let len = GLint::try_from(source.len()).map_err(|_| FrameError::Setup {
        stage: SetupStage::Pipeline,
        code: 0,
    })?;
    // SAFETY: a context is current; `source` outlives ShaderSource, which
    // copies it.
    unsafe {
        let shader = gl::CreateShader(kind);
        let ptr = source.as_ptr().cast();
        gl::ShaderSource(shader, 1, &ptr, &len);
        gl::CompileShader(shader);
        let mut status = 0;
        gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut status);
        if status == 0 {
            gl::DeleteShader(shader);
            return Err(FrameError::Setup {
                stage: SetupStage::Pipeline,
                code: 0,
            });
        }
        Ok(shader)
    }
}
