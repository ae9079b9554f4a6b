// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The triangle shader and its vertex data.

use bytemuck::{Pod, Zeroable};
use triptych_core::device::ShaderBlob;

/// WGSL source exporting `vs_main` and `fs_main`.
pub const TRIANGLE_WGSL: &str = r"
struct VertexOut {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(1) color: vec4<f32>) -> VertexOut {
    var out: VertexOut;
    out.position = vec4<f32>(position, 0.0, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOut) -> @location(0) vec4<f32> {
    return in.color;
}
";

/// Vertex and fragment artifacts for [`TRIANGLE_WGSL`]. Both stages live in
/// one module.
#[must_use]
pub const fn triangle_shaders() -> [ShaderBlob<'static>; 2] {
    [
        ShaderBlob::vertex(TRIANGLE_WGSL.as_bytes()),
        ShaderBlob::fragment(TRIANGLE_WGSL.as_bytes()),
    ]
}

/// One triangle corner.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Normalized device coordinates, y up.
    pub position: [f32; 2],
    /// Linear RGBA.
    pub color: [f32; 4],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4];

    /// Buffer layout matching `vs_main`'s inputs.
    #[must_use]
    pub const fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// The centered triangle every backend draws, filled with `rgba`.
#[must_use]
pub fn triangle_vertices(rgba: [u8; 4]) -> [Vertex; 3] {
    let color = rgba.map(|c| f32::from(c) / 255.0);
    [
        Vertex {
            position: [0.0, 0.5],
            color,
        },
        Vertex {
            position: [0.5, -0.5],
            color,
        },
        Vertex {
            position: [-0.5, -0.5],
            color,
        },
    ]
}

#[cfg(test)]
mod tests {
    use triptych_core::device::ShaderStage;

    use super::*;

    #[test]
    fn shader_exports_fixed_entry_points() {
        let [vs, fs] = triangle_shaders();
        assert_eq!(vs.stage, ShaderStage::Vertex);
        assert!(TRIANGLE_WGSL.contains(&format!("fn {}(", vs.entry_point)));
        assert!(TRIANGLE_WGSL.contains(&format!("fn {}(", fs.entry_point)));
    }

    #[test]
    fn vertex_layout_is_tightly_packed() {
        let layout = Vertex::layout();
        assert_eq!(layout.array_stride, 24);
        assert_eq!(layout.attributes[1].offset, 8);
        assert_eq!(bytemuck::cast_slice::<Vertex, u8>(&triangle_vertices([0; 4])).len(), 72);
    }

    #[test]
    fn colors_are_normalized() {
        let [v, ..] = triangle_vertices([255, 0, 51, 255]);
        assert_eq!(v.color, [1.0, 0.0, 0.2, 1.0]);
    }
}
