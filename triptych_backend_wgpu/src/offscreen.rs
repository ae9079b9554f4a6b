// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Offscreen wgpu renderer with a padded readback buffer.

use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use triptych_core::bridge::ImageLayout;
use triptych_core::device::{OffscreenRenderer, ShaderBlob, ShaderStage};
use triptych_core::error::{FrameError, Result, SetupStage};
use triptych_core::panel::{Extent, PixelFormat};
use wgpu::util::DeviceExt as _;

use crate::config::WgpuConfig;
use crate::shader::{Vertex, triangle_shaders, triangle_vertices};

/// Draws a colored triangle into its own texture and copies it to host
/// memory on request.
///
/// Owns its wgpu device and queue. Readback rows are padded to
/// [`wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`]; the [`ImageLayout`] handed to the
/// reader carries the padded pitch.
pub struct WgpuOffscreen {
    adapter: wgpu::AdapterInfo,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::RenderPipeline,
    vertices: wgpu::Buffer,
    target: Target,
    lost: Arc<AtomicBool>,
}

impl core::fmt::Debug for WgpuOffscreen {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WgpuOffscreen")
            .field("adapter", &self.adapter.name)
            .field("layout", &self.target.layout)
            .field("lost", &self.lost.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Size-dependent resources, rebuilt on resize.
struct Target {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    readback: wgpu::Buffer,
    layout: ImageLayout,
}

impl WgpuOffscreen {
    /// Opens a device per `config` and builds a triangle pipeline from
    /// WGSL `shaders`.
    ///
    /// `shaders` must hold one vertex and one fragment artifact. `color` is
    /// RGBA regardless of `format`.
    pub fn new(
        config: WgpuConfig,
        extent: Extent,
        format: PixelFormat,
        color: [u8; 4],
        shaders: &[ShaderBlob<'_>],
    ) -> Result<Self> {
        let (adapter, device, queue) = pollster::block_on(open_device(config))?;

        let lost = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |_reason, _message| {
            flag.store(true, Ordering::Release);
        });

        let pipeline = create_pipeline(&device, texture_format(format), shaders)?;
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("triptych triangle vertices"),
            contents: bytemuck::cast_slice(&triangle_vertices(color)),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let target = Target::new(&device, extent, format)?;

        Ok(Self {
            adapter,
            device,
            queue,
            pipeline,
            vertices,
            target,
            lost,
        })
    }

    /// [`new`](Self::new) with the built-in WGSL triangle.
    pub fn with_triangle(
        config: WgpuConfig,
        extent: Extent,
        format: PixelFormat,
        color: [u8; 4],
    ) -> Result<Self> {
        Self::new(config, extent, format, color, &triangle_shaders())
    }

    /// Adapter the device was opened on.
    #[must_use]
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter
    }

    fn check_lost(&self) -> Result<()> {
        if self.lost.load(Ordering::Acquire) {
            Err(FrameError::DeviceLost)
        } else {
            Ok(())
        }
    }

    fn wait(&self) -> Result<()> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map(|_| ())
            .map_err(|_| FrameError::DeviceLost)
    }
}

impl OffscreenRenderer for WgpuOffscreen {
    fn extent(&self) -> Extent {
        self.target.layout.extent
    }

    fn format(&self) -> PixelFormat {
        self.target.layout.format
    }

    fn draw(&mut self, _frame_index: u64) -> Result<()> {
        self.check_lost()?;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("triptych offscreen draw"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("triptych offscreen pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_vertex_buffer(0, self.vertices.slice(..));
            pass.draw(0..3, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn read_back(
        &mut self,
        read: &mut dyn FnMut(&[u8], ImageLayout) -> Result<usize>,
    ) -> Result<usize> {
        self.check_lost()?;
        let layout = self.target.layout;
        let bytes_per_row = u32::try_from(layout.row_pitch).map_err(|_| FrameError::MapFailed {
            code: -1,
        })?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("triptych readback"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.target.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(layout.extent.height),
                },
            },
            extent_3d(layout.extent),
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = self.target.readback.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.wait()?;
        rx.recv()
            .map_err(|_| FrameError::DeviceLost)?
            .map_err(|_| FrameError::MapFailed { code: -1 })?;

        let mapped = slice.get_mapped_range();
        let result = read(&mapped, layout);
        drop(mapped);
        self.target.readback.unmap();
        result
    }

    fn resize(&mut self, extent: Extent) -> Result<()> {
        self.wait()?;
        self.target = Target::new(&self.device, extent, self.target.layout.format)?;
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.wait()
    }
}

impl Target {
    fn new(device: &wgpu::Device, extent: Extent, format: PixelFormat) -> Result<Self> {
        if extent.is_empty() {
            return Err(FrameError::Setup {
                stage: SetupStage::Staging,
                code: 0,
            });
        }
        let layout = readback_layout(extent, format);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("triptych offscreen target"),
            size: extent_3d(extent),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(format),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("triptych readback buffer"),
            size: (layout.row_pitch * extent.height as usize) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(Self {
            texture,
            view,
            readback,
            layout,
        })
    }
}

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

async fn open_device(
    config: WgpuConfig,
) -> Result<(wgpu::AdapterInfo, wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: config.backends,
        ..wgpu::InstanceDescriptor::default()
    });
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: config.power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await;
    let adapter = match adapter {
        Ok(adapter) => adapter,
        Err(_) if config.allow_fallback => instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference,
                compatible_surface: None,
                force_fallback_adapter: true,
            })
            .await
            .map_err(|_| device_setup_failed())?,
        Err(_) => return Err(device_setup_failed()),
    };
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("triptych offscreen device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .map_err(|_| device_setup_failed())?;
    Ok((adapter.get_info(), device, queue))
}

const fn device_setup_failed() -> FrameError {
    FrameError::Setup {
        stage: SetupStage::Device,
        code: -1,
    }
}

const fn pipeline_setup_failed() -> FrameError {
    FrameError::Setup {
        stage: SetupStage::Pipeline,
        code: -1,
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    shaders: &[ShaderBlob<'_>],
) -> Result<wgpu::RenderPipeline> {
    let vs = shader_module(device, shaders, ShaderStage::Vertex)?;
    let fs = shader_module(device, shaders, ShaderStage::Fragment)?;

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("triptych triangle layout"),
        bind_group_layouts: &[],
        immediate_size: 0,
    });
    Ok(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("triptych triangle pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &vs,
            entry_point: Some(ShaderStage::Vertex.entry_point()),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            buffers: &[Vertex::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: &fs,
            entry_point: Some(ShaderStage::Fragment.entry_point()),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..wgpu::PrimitiveState::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    }))
}

/// Finds the artifact for `stage` and compiles it as WGSL.
fn shader_module(
    device: &wgpu::Device,
    shaders: &[ShaderBlob<'_>],
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule> {
    let blob = find_shader(shaders, stage)?;
    let source = core::str::from_utf8(blob.bytes).map_err(|_| pipeline_setup_failed())?;
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(stage.entry_point()),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
    }))
}

fn find_shader<'a>(shaders: &[ShaderBlob<'a>], stage: ShaderStage) -> Result<ShaderBlob<'a>> {
    shaders
        .iter()
        .find(|blob| blob.stage == stage)
        .copied()
        .ok_or_else(pipeline_setup_failed)
}

const fn texture_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        PixelFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
    }
}

const fn readback_layout(extent: Extent, format: PixelFormat) -> ImageLayout {
    ImageLayout::aligned(
        extent,
        format,
        wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize,
    )
}

const fn extent_3d(extent: Extent) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: extent.width,
        height: extent.height,
        depth_or_array_layers: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readback_rows_are_padded_to_copy_alignment() {
        let layout = readback_layout(Extent::new(300, 200), PixelFormat::Bgra8Unorm);
        assert_eq!(layout.row_bytes(), 1200);
        assert_eq!(layout.row_pitch, 1280);
        assert_eq!(layout.payload_len(), 240_000);

        let exact = readback_layout(Extent::new(64, 2), PixelFormat::Rgba8Unorm);
        assert_eq!(exact.row_pitch, 256, "aligned widths need no padding");
    }

    #[test]
    fn formats_map_to_unorm_textures() {
        assert_eq!(
            texture_format(PixelFormat::Bgra8Unorm),
            wgpu::TextureFormat::Bgra8Unorm
        );
        assert_eq!(
            texture_format(PixelFormat::Rgba8Unorm),
            wgpu::TextureFormat::Rgba8Unorm
        );
    }

    #[test]
    fn missing_shader_stage_is_a_pipeline_error() {
        let only_vertex = [ShaderBlob::vertex(b"")];
        assert!(find_shader(&only_vertex, ShaderStage::Vertex).is_ok());
        assert_eq!(
            find_shader(&only_vertex, ShaderStage::Fragment),
            Err(FrameError::Setup {
                stage: SetupStage::Pipeline,
                code: -1,
            })
        );
    }

    #[test]
    fn extent_is_single_layer() {
        let e = extent_3d(Extent::new(320, 480));
        assert_eq!((e.width, e.height, e.depth_or_array_layers), (320, 480, 1));
    }
}
