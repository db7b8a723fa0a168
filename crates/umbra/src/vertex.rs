//! # Vertex — Attribute Layouts and Shared Uniform Blocks
//!
//! Three vertex formats cover everything the renderer draws:
//!
//! ```text
//! MeshVertex (32 bytes)                      objects, models, gizmos
//! ┌──────────────┬──────────────┬──────────────┐
//! │ position     │ normal       │ uv           │
//! │ [f32; 3]     │ [f32; 3]     │ [f32; 2]     │
//! │ offset 0     │ offset 12    │ offset 24    │
//! │ location(0)  │ location(1)  │ location(2)  │
//! └──────────────┴──────────────┴──────────────┘
//!
//! [f32; 3] (12 bytes)                        skybox cube
//! ┌──────────────┐
//! │ location(0)  │
//! └──────────────┘
//!
//! ScreenVertex (16 bytes)                    fullscreen quad
//! ┌──────────────┬──────────────┐
//! │ position     │ uv           │
//! │ [f32; 2]     │ [f32; 2]     │
//! │ location(0)  │ location(1)  │
//! └──────────────┴──────────────┘
//! ```
//!
//! Instanced programs read a second, per-instance stream: one `mat4` split
//! into four `vec4` columns at locations 3..=6.
//!
//! ## The Matrices Block
//!
//! View and projection live in one uniform buffer shared by every program
//! (group 0, binding 0). The renderer writes it once per frame:
//!
//! ```text
//! ┌─────────────────────┬─────────────────────┐
//! │ view: mat4x4        │ projection: mat4x4  │
//! │ bytes [0, 64)       │ bytes [64, 128)     │
//! └─────────────────────┴─────────────────────┘
//! ```

use bytemuck::{Pod, Zeroable};

/// Per-vertex data for lit meshes: position, surface normal, texture UV.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position: vec3<f32>
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // normal: vec3<f32>
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            // uv: vec2<f32>
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };
}

/// Layout of bare `[f32; 3]` positions.
pub const POSITION_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: 12,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[wgpu::VertexAttribute {
        offset: 0,
        shader_location: 0,
        format: wgpu::VertexFormat::Float32x3,
    }],
};

/// Fullscreen-quad vertex in normalized device coordinates.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ScreenVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl ScreenVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<ScreenVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };
}

/// Per-instance model matrix, column-major like `glam::Mat4`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceTransform {
    pub model: [[f32; 4]; 4],
}

impl InstanceTransform {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<InstanceTransform>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 4,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 32,
                shader_location: 5,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 48,
                shader_location: 6,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };
}

impl From<glam::Mat4> for InstanceTransform {
    fn from(m: glam::Mat4) -> Self {
        Self {
            model: m.to_cols_array_2d(),
        }
    }
}

/// The shared view/projection block.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MatricesUniform {
    pub view: [[f32; 4]; 4],       // 64 bytes
    pub projection: [[f32; 4]; 4], // 64 bytes → total 128
}

/// Byte offset of `view` inside the matrices block.
pub const VIEW_OFFSET: u64 = 0;
/// Byte offset of `projection` inside the matrices block.
pub const PROJECTION_OFFSET: u64 = std::mem::size_of::<[[f32; 4]; 4]>() as u64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides_match_device_layouts() {
        use crate::gpu::VertexLayout;
        assert_eq!(std::mem::size_of::<MeshVertex>(), VertexLayout::Mesh.stride());
        assert_eq!(std::mem::size_of::<ScreenVertex>(), VertexLayout::ScreenQuad.stride());
        assert_eq!(POSITION_LAYOUT.array_stride as usize, VertexLayout::Position.stride());
    }

    #[test]
    fn matrices_block_offsets() {
        assert_eq!(VIEW_OFFSET, 0);
        assert_eq!(PROJECTION_OFFSET, 64);
        assert_eq!(std::mem::size_of::<MatricesUniform>(), 128);
    }
}
