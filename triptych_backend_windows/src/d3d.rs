// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Direct3D 11 display device.
//!
//! One [`D3d11Display`] owns a D3D11 device, its immediate context, and a
//! DXGI swapchain created for composition. D3D11 flip-model swapchains only
//! expose the current back buffer as buffer 0, so every draw, copy, and
//! interop registration targets that buffer; the index returned by
//! `acquire_next_image` is the swapchain's own rotation counter.

use std::ffi::c_void;

use triptych_core::bridge::ImageLayout;
use triptych_core::device::{
    DisplayDevice, Fence, InteropDisplay, NativeRenderer, RawSurface, ShaderBlob, ShaderStage,
    StagingTarget, SurfaceDesc,
};
use triptych_core::error::{FrameError, Result, SetupStage};
use triptych_core::panel::{Extent, PixelFormat};
use windows::Win32::Foundation::{CloseHandle, HANDLE, HMODULE, WAIT_OBJECT_0};
use windows::Win32::Graphics::Direct3D::{
    D3D_DRIVER_TYPE_HARDWARE, D3D_FEATURE_LEVEL_11_0, D3D_FEATURE_LEVEL_11_1,
    D3D11_PRIMITIVE_TOPOLOGY_TRIANGLELIST,
};
use windows::Win32::Graphics::Direct3D11::{
    D3D11_BIND_VERTEX_BUFFER, D3D11_BUFFER_DESC, D3D11_CPU_ACCESS_WRITE,
    D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_FENCE_FLAG_NONE, D3D11_INPUT_ELEMENT_DESC,
    D3D11_INPUT_PER_VERTEX_DATA, D3D11_MAP_WRITE, D3D11_MAPPED_SUBRESOURCE, D3D11_SDK_VERSION,
    D3D11_SUBRESOURCE_DATA, D3D11_TEXTURE2D_DESC, D3D11_USAGE_IMMUTABLE, D3D11_USAGE_STAGING,
    D3D11_VIEWPORT, D3D11CreateDevice, ID3D11Buffer, ID3D11Device, ID3D11Device5,
    ID3D11DeviceContext, ID3D11DeviceContext4, ID3D11Fence, ID3D11InputLayout,
    ID3D11PixelShader, ID3D11RenderTargetView, ID3D11Texture2D, ID3D11VertexShader,
};
use windows::Win32::Graphics::Dxgi::Common::{
    DXGI_ALPHA_MODE_PREMULTIPLIED, DXGI_FORMAT, DXGI_FORMAT_B8G8R8A8_UNORM,
    DXGI_FORMAT_R8G8B8A8_UNORM, DXGI_FORMAT_R32G32_FLOAT, DXGI_FORMAT_R32G32B32A32_FLOAT,
    DXGI_FORMAT_UNKNOWN, DXGI_SAMPLE_DESC,
};
use windows::Win32::Graphics::Dxgi::{
    CreateDXGIFactory2, DXGI_CREATE_FACTORY_FLAGS, DXGI_PRESENT, DXGI_SCALING_STRETCH,
    DXGI_SWAP_CHAIN_DESC1, DXGI_SWAP_CHAIN_FLAG, DXGI_SWAP_EFFECT_FLIP_SEQUENTIAL,
    DXGI_USAGE_RENDER_TARGET_OUTPUT, IDXGIFactory2, IDXGISwapChain1, IDXGISwapChain3,
};
use windows::Win32::System::Threading::{CreateEventW, WaitForSingleObject};
use windows::core::{Interface, s};

use crate::error;
use crate::shader::{Vertex, triangle_vertices};

/// How long a fence wait may block before the device is presumed hung.
const FENCE_TIMEOUT_MS: u32 = 2_000;

/// Clear color of every frame: opaque black.
const CLEAR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Creates a hardware D3D11 device with BGRA support, as required by
/// DirectComposition and composition swapchains.
pub(crate) fn create_device() -> Result<(ID3D11Device, ID3D11DeviceContext)> {
    let mut device = None;
    let mut context = None;
    // SAFETY: out-pointers reference live locals; no adapter or software
    // module is passed.
    unsafe {
        D3D11CreateDevice(
            None,
            D3D_DRIVER_TYPE_HARDWARE,
            HMODULE::default(),
            D3D11_CREATE_DEVICE_BGRA_SUPPORT,
            Some(&[D3D_FEATURE_LEVEL_11_1, D3D_FEATURE_LEVEL_11_0]),
            D3D11_SDK_VERSION,
            Some(&mut device),
            None,
            Some(&mut context),
        )
    }
    .map_err(error::setup(SetupStage::Device))?;
    match (device, context) {
        (Some(device), Some(context)) => Ok((device, context)),
        _ => Err(FrameError::Setup {
            stage: SetupStage::Device,
            code: 0,
        }),
    }
}

const fn dxgi_format(format: PixelFormat) -> DXGI_FORMAT {
    match format {
        PixelFormat::Rgba8Unorm => DXGI_FORMAT_R8G8B8A8_UNORM,
        PixelFormat::Bgra8Unorm => DXGI_FORMAT_B8G8R8A8_UNORM,
    }
}

// ---------------------------------------------------------------------------
// Fence
// ---------------------------------------------------------------------------

/// An `ID3D11Fence` plus the event used to wait on it.
pub struct D3d11Fence {
    fence: ID3D11Fence,
    event: HANDLE,
}

impl core::fmt::Debug for D3d11Fence {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("D3d11Fence")
            .field("completed", &self.completed_value())
            .finish_non_exhaustive()
    }
}

impl D3d11Fence {
    fn new(device: &ID3D11Device5) -> Result<Self> {
        // SAFETY: plain object creation on a live device.
        let fence: ID3D11Fence = unsafe { device.CreateFence(0, D3D11_FENCE_FLAG_NONE) }
            .map_err(error::setup(SetupStage::Fence))?;
        // SAFETY: unnamed auto-reset event with default security.
        let event = unsafe { CreateEventW(None, false, false, None) }
            .map_err(error::setup(SetupStage::Fence))?;
        Ok(Self { fence, event })
    }
}

impl Fence for D3d11Fence {
    fn completed_value(&self) -> u64 {
        // SAFETY: read-only query on a live fence.
        unsafe { self.fence.GetCompletedValue() }
    }

    fn wait_for(&self, value: u64) -> Result<()> {
        if self.is_signaled(value) {
            return Ok(());
        }
        // SAFETY: `event` stays open for the fence's lifetime.
        unsafe { self.fence.SetEventOnCompletion(value, self.event) }.map_err(error::frame)?;
        // SAFETY: as above.
        let waited = unsafe { WaitForSingleObject(self.event, FENCE_TIMEOUT_MS) };
        if waited == WAIT_OBJECT_0 {
            Ok(())
        } else {
            Err(FrameError::DeviceLost)
        }
    }
}

impl Drop for D3d11Fence {
    fn drop(&mut self) {
        // SAFETY: the event was created in `new` and is closed exactly once.
        _ = unsafe { CloseHandle(self.event) };
    }
}

// ---------------------------------------------------------------------------
// Native pipeline
// ---------------------------------------------------------------------------

struct Pipeline {
    vertex_shader: ID3D11VertexShader,
    pixel_shader: ID3D11PixelShader,
    input_layout: ID3D11InputLayout,
    vertices: ID3D11Buffer,
}

impl Pipeline {
    fn new(device: &ID3D11Device, shaders: &[ShaderBlob<'_>], color: [u8; 4]) -> Result<Self> {
        let stage = |stage: ShaderStage| {
            shaders
                .iter()
                .find(|blob| blob.stage == stage)
                .ok_or(FrameError::Setup {
                    stage: SetupStage::Pipeline,
                    code: 0,
                })
        };
        let vs_blob = stage(ShaderStage::Vertex)?;
        let ps_blob = stage(ShaderStage::Fragment)?;
        let failed = error::setup(SetupStage::Pipeline);

        let mut vertex_shader = None;
        let mut pixel_shader = None;
        let mut input_layout = None;
        let mut vertices = None;

        let elements = [
            D3D11_INPUT_ELEMENT_DESC {
                SemanticName: s!("POSITION"),
                SemanticIndex: 0,
                Format: DXGI_FORMAT_R32G32_FLOAT,
                InputSlot: 0,
                AlignedByteOffset: 0,
                InputSlotClass: D3D11_INPUT_PER_VERTEX_DATA,
                InstanceDataStepRate: 0,
            },
            D3D11_INPUT_ELEMENT_DESC {
                SemanticName: s!("COLOR"),
                SemanticIndex: 0,
                Format: DXGI_FORMAT_R32G32B32A32_FLOAT,
                InputSlot: 0,
                AlignedByteOffset: Vertex::COLOR_OFFSET,
                InputSlotClass: D3D11_INPUT_PER_VERTEX_DATA,
                InstanceDataStepRate: 0,
            },
        ];
        let data = triangle_vertices(color);
        let bytes: &[u8] = bytemuck::cast_slice(&data);
        let buffer_desc = D3D11_BUFFER_DESC {
            ByteWidth: Vertex::STRIDE * 3,
            Usage: D3D11_USAGE_IMMUTABLE,
            BindFlags: D3D11_BIND_VERTEX_BUFFER.0 as u32,
            ..D3D11_BUFFER_DESC::default()
        };
        let initial = D3D11_SUBRESOURCE_DATA {
            pSysMem: bytes.as_ptr().cast::<c_void>(),
            ..D3D11_SUBRESOURCE_DATA::default()
        };

        // SAFETY: bytecode slices and descriptors outlive each call; the
        // vertex data is copied at creation.
        unsafe {
            device
                .CreateVertexShader(vs_blob.bytes, None, Some(&mut vertex_shader))
                .map_err(&failed)?;
            device
                .CreatePixelShader(ps_blob.bytes, None, Some(&mut pixel_shader))
                .map_err(&failed)?;
            device
                .CreateInputLayout(&elements, vs_blob.bytes, Some(&mut input_layout))
                .map_err(&failed)?;
            device
                .CreateBuffer(&buffer_desc, Some(&initial), Some(&mut vertices))
                .map_err(&failed)?;
        }

        match (vertex_shader, pixel_shader, input_layout, vertices) {
            (Some(vertex_shader), Some(pixel_shader), Some(input_layout), Some(vertices)) => {
                Ok(Self {
                    vertex_shader,
                    pixel_shader,
                    input_layout,
                    vertices,
                })
            }
            _ => Err(FrameError::Setup {
                stage: SetupStage::Pipeline,
                code: 0,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

/// A Direct3D 11 device presenting through a DXGI composition swapchain.
///
/// Implements every display-side trait: [`NativeRenderer`] once
/// [`set_scene`](Self::set_scene) has been called, [`StagingTarget`] through
/// a CPU-writable staging texture, and [`InteropDisplay`] by exposing the
/// back buffer.
pub struct D3d11Display {
    // Field order is release order.
    pipeline: Option<Pipeline>,
    staging: ID3D11Texture2D,
    idle: D3d11Fence,
    idle_value: u64,
    swapchain3: IDXGISwapChain3,
    swapchain: IDXGISwapChain1,
    context: ID3D11DeviceContext4,
    device5: ID3D11Device5,
    device: ID3D11Device,
    desc: SurfaceDesc,
}

impl core::fmt::Debug for D3d11Display {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("D3d11Display")
            .field("desc", &self.desc)
            .field("native", &self.pipeline.is_some())
            .finish_non_exhaustive()
    }
}

impl D3d11Display {
    /// Creates a device and a composition swapchain described by `desc`.
    ///
    /// The swapchain is flip-sequential with premultiplied alpha; it is
    /// shown once a [`DcompHost`](crate::DcompHost) visual references it.
    pub fn new(desc: SurfaceDesc) -> Result<Self> {
        let (device, context) = create_device()?;
        let device5: ID3D11Device5 = device.cast().map_err(error::setup(SetupStage::Device))?;
        let context: ID3D11DeviceContext4 =
            context.cast().map_err(error::setup(SetupStage::Device))?;

        // SAFETY: factory creation has no preconditions.
        let factory: IDXGIFactory2 = unsafe { CreateDXGIFactory2(DXGI_CREATE_FACTORY_FLAGS(0)) }
            .map_err(error::setup(SetupStage::Swapchain))?;
        let chain_desc = DXGI_SWAP_CHAIN_DESC1 {
            Width: desc.extent.width,
            Height: desc.extent.height,
            Format: dxgi_format(desc.format),
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: desc.image_count,
            Scaling: DXGI_SCALING_STRETCH,
            SwapEffect: DXGI_SWAP_EFFECT_FLIP_SEQUENTIAL,
            AlphaMode: DXGI_ALPHA_MODE_PREMULTIPLIED,
            ..DXGI_SWAP_CHAIN_DESC1::default()
        };
        // SAFETY: `chain_desc` outlives the call; no output restriction.
        let swapchain =
            unsafe { factory.CreateSwapChainForComposition(&device, &chain_desc, None) }
                .map_err(error::setup(SetupStage::Swapchain))?;
        let swapchain3: IDXGISwapChain3 = swapchain
            .cast()
            .map_err(error::setup(SetupStage::Swapchain))?;

        let staging = create_staging(&device, desc.extent, desc.format)?;
        let idle = D3d11Fence::new(&device5)?;

        Ok(Self {
            pipeline: None,
            staging,
            idle,
            idle_value: 0,
            swapchain3,
            swapchain,
            context,
            device5,
            device,
            desc,
        })
    }

    /// Builds the triangle pipeline from DXBC `shaders`, enabling
    /// [`NativeRenderer::draw`].
    pub fn set_scene(&mut self, shaders: &[ShaderBlob<'_>], color: [u8; 4]) -> Result<()> {
        self.pipeline = Some(Pipeline::new(&self.device, shaders, color)?);
        Ok(())
    }

    /// The underlying device, for opening interop devices on it.
    #[must_use]
    pub fn device(&self) -> &ID3D11Device {
        &self.device
    }

    fn back_buffer(&self) -> Result<ID3D11Texture2D> {
        // SAFETY: buffer 0 of a flip-model swapchain is always valid.
        unsafe { self.swapchain.GetBuffer(0) }.map_err(error::frame)
    }
}

fn create_staging(
    device: &ID3D11Device,
    extent: Extent,
    format: PixelFormat,
) -> Result<ID3D11Texture2D> {
    let desc = D3D11_TEXTURE2D_DESC {
        Width: extent.width,
        Height: extent.height,
        MipLevels: 1,
        ArraySize: 1,
        Format: dxgi_format(format),
        SampleDesc: DXGI_SAMPLE_DESC {
            Count: 1,
            Quality: 0,
        },
        Usage: D3D11_USAGE_STAGING,
        BindFlags: 0,
        CPUAccessFlags: D3D11_CPU_ACCESS_WRITE.0 as u32,
        MiscFlags: 0,
    };
    let mut texture = None;
    // SAFETY: `desc` outlives the call; no initial data.
    unsafe { device.CreateTexture2D(&desc, None, Some(&mut texture)) }
        .map_err(error::setup(SetupStage::Staging))?;
    texture.ok_or(FrameError::Setup {
        stage: SetupStage::Staging,
        code: 0,
    })
}

impl DisplayDevice for D3d11Display {
    type Fence = D3d11Fence;

    fn create_fence(&mut self) -> Result<D3d11Fence> {
        D3d11Fence::new(&self.device5)
    }

    fn surface(&self) -> SurfaceDesc {
        self.desc
    }

    fn raw_surface(&self) -> RawSurface {
        RawSurface(self.swapchain.as_raw())
    }

    fn acquire_next_image(&mut self) -> Result<u32> {
        // SAFETY: read-only query.
        Ok(unsafe { self.swapchain3.GetCurrentBackBufferIndex() })
    }

    fn submit(&mut self, fence: &D3d11Fence, value: u64) -> Result<()> {
        // SAFETY: the fence belongs to this device.
        unsafe {
            self.context.Signal(&fence.fence, value).map_err(error::frame)?;
            self.context.Flush();
        }
        Ok(())
    }

    fn present(&mut self, _image: u32) -> Result<()> {
        // SAFETY: presenting a swapchain owned by this device.
        unsafe { self.swapchain.Present(1, DXGI_PRESENT(0)) }
            .ok()
            .map_err(error::frame)
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.idle_value += 1;
        let value = self.idle_value;
        // SAFETY: the idle fence belongs to this device.
        unsafe {
            self.context
                .Signal(&self.idle.fence, value)
                .map_err(error::frame)?;
            self.context.Flush();
        }
        self.idle.wait_for(value)
    }

    fn recreate_surface(&mut self, extent: Extent) -> Result<()> {
        // Back-buffer references held by the pipeline state must go first.
        // SAFETY: the device is idle; no views outlive this call.
        unsafe {
            self.context.ClearState();
            self.context.Flush();
            self.swapchain.ResizeBuffers(
                0,
                extent.width,
                extent.height,
                DXGI_FORMAT_UNKNOWN,
                DXGI_SWAP_CHAIN_FLAG(0),
            )
        }
        .map_err(error::setup(SetupStage::Swapchain))?;
        self.staging = create_staging(&self.device, extent, self.desc.format)?;
        self.desc.extent = extent;
        Ok(())
    }
}

impl NativeRenderer for D3d11Display {
    fn draw(&mut self, _image: u32, _frame_index: u64) -> Result<()> {
        let pipeline = scene(self.pipeline.as_ref())?;
        let back = self.back_buffer()?;
        let mut view: Option<ID3D11RenderTargetView> = None;
        // SAFETY: `back` is a render-target texture of this device.
        unsafe { self.device.CreateRenderTargetView(&back, None, Some(&mut view)) }
            .map_err(error::frame)?;
        let view = view.ok_or(FrameError::DeviceLost)?;

        let viewport = D3D11_VIEWPORT {
            TopLeftX: 0.0,
            TopLeftY: 0.0,
            Width: self.desc.extent.width as f32,
            Height: self.desc.extent.height as f32,
            MinDepth: 0.0,
            MaxDepth: 1.0,
        };
        // SAFETY: every bound object belongs to this device and outlives
        // the recorded commands.
        unsafe {
            self.context
                .OMSetRenderTargets(Some(&[Some(view.clone())]), None);
            self.context.ClearRenderTargetView(&view, &CLEAR);
            self.context.RSSetViewports(Some(&[viewport]));
            self.context.IASetInputLayout(&pipeline.input_layout);
            self.context
                .IASetPrimitiveTopology(D3D11_PRIMITIVE_TOPOLOGY_TRIANGLELIST);
            let stride = Vertex::STRIDE;
            let offset = 0;
            self.context.IASetVertexBuffers(
                0,
                1,
                Some(&Some(pipeline.vertices.clone())),
                Some(&stride),
                Some(&offset),
            );
            self.context.VSSetShader(&pipeline.vertex_shader, None);
            self.context.PSSetShader(&pipeline.pixel_shader, None);
            self.context.Draw(3, 0);
        }
        Ok(())
    }
}

impl StagingTarget for D3d11Display {
    fn write_staging(
        &mut self,
        write: &mut dyn FnMut(&mut [u8], ImageLayout) -> Result<usize>,
    ) -> Result<usize> {
        let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
        // SAFETY: the staging texture was created with CPU write access.
        unsafe {
            self.context
                .Map(&self.staging, 0, D3D11_MAP_WRITE, 0, Some(&mut mapped))
        }
        .map_err(error::map)?;

        let layout = ImageLayout {
            extent: self.desc.extent,
            format: self.desc.format,
            row_pitch: mapped.RowPitch as usize,
        };
        // SAFETY: a successful Map yields `RowPitch` bytes per row for every
        // row of the texture, valid until Unmap.
        let bytes = unsafe {
            core::slice::from_raw_parts_mut(mapped.pData.cast::<u8>(), layout.required_len())
        };
        let result = write(bytes, layout);
        // SAFETY: paired with the Map above.
        unsafe { self.context.Unmap(&self.staging, 0) };
        result
    }

    fn copy_staging_to_image(&mut self, _image: u32) -> Result<()> {
        let back = self.back_buffer()?;
        // SAFETY: both textures share extent and format.
        unsafe { self.context.CopyResource(&back, &self.staging) };
        Ok(())
    }
}

impl InteropDisplay for D3d11Display {
    type Image = ID3D11Texture2D;

    fn shareable_images(&self) -> Vec<ID3D11Texture2D> {
        self.back_buffer().into_iter().collect()
    }
}

impl Drop for D3d11Display {
    fn drop(&mut self) {
        _ = self.wait_idle();
    }
}

/// The pipeline installed by [`D3d11Display::set_scene`].
fn scene<T>(pipeline: Option<&T>) -> Result<&T> {
    pipeline.ok_or(FrameError::Setup {
        stage: SetupStage::Pipeline,
        code: 0,
    })
}
