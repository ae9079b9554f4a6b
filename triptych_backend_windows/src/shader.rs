// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Triangle shader sources and vertex data shared by the D3D11 and OpenGL
//! renderers.

use bytemuck::{Pod, Zeroable};
use triptych_core::device::ShaderBlob;

/// HLSL source exporting `vs_main` (`vs_5_0`) and `fs_main` (`ps_5_0`).
pub const TRIANGLE_HLSL: &str = r"
struct VsOut {
    float4 position : SV_Position;
    float4 color : COLOR;
};

VsOut vs_main(float2 position : POSITION, float4 color : COLOR) {
    VsOut o;
    o.position = float4(position, 0.0, 1.0);
    o.color = color;
    return o;
}

float4 fs_main(VsOut i) : SV_Target {
    return i.color;
}
";

// GLSL needs a `main`; it forwards to the fixed entry point. Rows of the
// shared D3D texture run top-down, so y is flipped.
const GL_VERTEX: &str = r"#version 330 core
layout(location = 0) in vec2 position;
layout(location = 1) in vec4 color;
out vec4 v_color;

void vs_main() {
    v_color = color;
    gl_Position = vec4(position.x, -position.y, 0.0, 1.0);
}

void main() { vs_main(); }
";

const GL_FRAGMENT: &str = r"#version 330 core
in vec4 v_color;
out vec4 frag_color;

void fs_main() {
    frag_color = v_color;
}

void main() { fs_main(); }
";

/// GLSL 3.30 vertex and fragment sources for [`GlRenderer`](crate::GlRenderer).
#[must_use]
pub const fn gl_shaders() -> [ShaderBlob<'static>; 2] {
    [
        ShaderBlob::vertex(GL_VERTEX.as_bytes()),
        ShaderBlob::fragment(GL_FRAGMENT.as_bytes()),
    ]
}

/// One triangle corner: `POSITION` then `COLOR`, 24 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Normalized device coordinates, y up.
    pub position: [f32; 2],
    /// Linear RGBA.
    pub color: [f32; 4],
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "vertex sizes are a few dozen bytes"
)]
impl Vertex {
    /// Distance between consecutive vertices in a buffer.
    pub const STRIDE: u32 = size_of::<Self>() as u32;
    /// Byte offset of [`color`](Self::color).
    pub const COLOR_OFFSET: u32 = size_of::<[f32; 2]>() as u32;
}

/// The centered triangle, filled with `rgba`.
#[must_use]
pub fn triangle_vertices(rgba: [u8; 4]) -> [Vertex; 3] {
    let color = rgba.map(|c| f32::from(c) / 255.0);
    [[0.0, 0.5], [0.5, -0.5], [-0.5, -0.5]].map(|position| Vertex { position, color })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_export_fixed_entry_points() {
        let [vs, fs] = gl_shaders();
        let vs_src = core::str::from_utf8(vs.bytes).unwrap();
        let fs_src = core::str::from_utf8(fs.bytes).unwrap();
        assert!(vs_src.contains("void vs_main()"));
        assert!(fs_src.contains("void fs_main()"));
        assert!(TRIANGLE_HLSL.contains("VsOut vs_main("));
        assert!(TRIANGLE_HLSL.contains("float4 fs_main("));
    }

    #[test]
    fn vertex_layout_offsets() {
        assert_eq!(Vertex::STRIDE, 24);
        assert_eq!(Vertex::COLOR_OFFSET, 8);
        let v = triangle_vertices([0, 255, 0, 255]);
        assert_eq!(v[0].position, [0.0, 0.5]);
        assert_eq!(v[2].color, [0.0, 1.0, 0.0, 1.0]);
    }
}
