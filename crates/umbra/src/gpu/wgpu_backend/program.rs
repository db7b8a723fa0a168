//! Programs on wgpu: uniform block packing, bind group layouts and the
//! render pipeline cache key.
//!
//! A program's plain uniforms live in one block at group 1. Offsets follow
//! WGSL uniform layout in declaration order, so the shader's `Uniforms`
//! struct must list the same fields in the same order:
//!
//! ```text
//!   kind    align  size
//!   ────    ─────  ────
//!   bool      4     4     stored as u32
//!   int       4     4
//!   float     4     4
//!   vec3     16    12     a following scalar fills the last 4 bytes
//!   vec4     16    16
//!   mat4     16    64
//! ```

use crate::gpu::{
    BlendMode, Face, FrontFace, ProgramDesc, SlotKind, UniformKind, UniformValue, VertexLayout,
};
use crate::vertex::{InstanceTransform, MeshVertex, POSITION_LAYOUT, ScreenVertex};

// ── Block packing ──────────────────────────────────────────────────────────

fn align_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

fn kind_layout(kind: UniformKind) -> (u32, u32) {
    match kind {
        UniformKind::Bool | UniformKind::Int | UniformKind::Float => (4, 4),
        UniformKind::Vec3 => (16, 12),
        UniformKind::Vec4 => (16, 16),
        UniformKind::Mat4 => (16, 64),
    }
}

/// Byte offsets of a program's uniforms inside its block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    pub offsets: Vec<u32>,
    /// Rounded up to 16 bytes, never zero.
    pub size: u32,
}

impl BlockLayout {
    pub fn pack(kinds: impl IntoIterator<Item = UniformKind>) -> Self {
        let mut cursor = 0;
        let offsets = kinds
            .into_iter()
            .map(|kind| {
                let (align, size) = kind_layout(kind);
                let offset = align_up(cursor, align);
                cursor = offset + size;
                offset
            })
            .collect();
        Self {
            offsets,
            size: align_up(cursor, 16).max(16),
        }
    }

    pub fn for_program(desc: &ProgramDesc) -> Self {
        Self::pack(desc.uniforms.iter().map(|u| u.kind))
    }
}

/// Write `value` into `block` at `offset`, in the layout the shader reads.
pub fn write_value(block: &mut [u8], offset: u32, value: UniformValue) {
    let offset = offset as usize;
    let mut put = |bytes: &[u8]| {
        if let Some(dst) = block.get_mut(offset..offset + bytes.len()) {
            dst.copy_from_slice(bytes);
        }
    };
    match value {
        UniformValue::Bool(v) => put(bytemuck::bytes_of(&u32::from(v))),
        UniformValue::Int(v) => put(bytemuck::bytes_of(&v)),
        UniformValue::Float(v) => put(bytemuck::bytes_of(&v)),
        UniformValue::Vec3(v) => put(bytemuck::cast_slice(&v.to_array())),
        UniformValue::Vec4(v) => put(bytemuck::cast_slice(&v.to_array())),
        UniformValue::Mat4(m) => put(bytemuck::cast_slice(&m.to_cols_array())),
    }
}

// ── Layouts ────────────────────────────────────────────────────────────────

/// Group 0 (shared matrices) and group 1 (per-draw uniform snapshot).
pub struct SharedLayouts {
    pub matrices: wgpu::BindGroupLayout,
    pub uniforms: wgpu::BindGroupLayout,
}

impl SharedLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_entry = |has_dynamic_offset| wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset,
                min_binding_size: None,
            },
            count: None,
        };
        let matrices = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("matrices layout"),
            entries: &[uniform_entry(false)],
        });
        let uniforms = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform block layout"),
            entries: &[uniform_entry(true)],
        });
        Self { matrices, uniforms }
    }
}

/// Group 2 layout: texture at binding `2i`, sampler at `2i + 1`.
pub fn texture_layout(device: &wgpu::Device, desc: &ProgramDesc) -> wgpu::BindGroupLayout {
    let entries: Vec<_> = desc
        .textures
        .iter()
        .enumerate()
        .flat_map(|(i, slot)| {
            let (sample_type, view_dimension, sampler) = match slot.kind {
                SlotKind::Color2d => (
                    wgpu::TextureSampleType::Float { filterable: true },
                    wgpu::TextureViewDimension::D2,
                    wgpu::SamplerBindingType::Filtering,
                ),
                SlotKind::ColorCube => (
                    wgpu::TextureSampleType::Float { filterable: true },
                    wgpu::TextureViewDimension::Cube,
                    wgpu::SamplerBindingType::Filtering,
                ),
                SlotKind::Depth2d => (
                    wgpu::TextureSampleType::Depth,
                    wgpu::TextureViewDimension::D2,
                    wgpu::SamplerBindingType::Comparison,
                ),
                SlotKind::DepthCube => (
                    wgpu::TextureSampleType::Depth,
                    wgpu::TextureViewDimension::Cube,
                    wgpu::SamplerBindingType::Comparison,
                ),
            };
            let binding = 2 * i as u32;
            [
                wgpu::BindGroupLayoutEntry {
                    binding,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type,
                        view_dimension,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: binding + 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(sampler),
                    count: None,
                },
            ]
        })
        .collect();

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(&format!("{} textures layout", desc.label)),
        entries: &entries,
    })
}

// ── Programs ───────────────────────────────────────────────────────────────

/// A compiled program and the CPU side of its uniform state.
pub struct GpuProgram {
    pub desc: ProgramDesc,
    pub module: wgpu::ShaderModule,
    pub block: BlockLayout,
    /// Current uniform values, snapshotted into the arena on every draw.
    pub staging: Vec<u8>,
    /// Texture unit each sampler slot reads.
    pub units: Vec<u32>,
    pub texture_layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
}

impl GpuProgram {
    /// Compile `desc`. Validation errors are returned, not raised.
    pub fn compile(
        device: &wgpu::Device,
        shared: &SharedLayouts,
        desc: &ProgramDesc,
    ) -> Result<Self, String> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.source.clone()),
        });
        let texture_layout = texture_layout(device, desc);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} pipeline layout", desc.label)),
            bind_group_layouts: &[&shared.matrices, &shared.uniforms, &texture_layout],
            push_constant_ranges: &[],
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(err.to_string());
        }

        let block = BlockLayout::for_program(desc);
        Ok(Self {
            desc: desc.clone(),
            module,
            staging: vec![0; block.size as usize],
            block,
            units: desc.textures.iter().map(|t| t.unit).collect(),
            texture_layout,
            pipeline_layout,
        })
    }
}

// ── Pipelines ──────────────────────────────────────────────────────────────

/// Everything that selects one immutable render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub program: crate::gpu::ProgramId,
    pub color: Option<wgpu::TextureFormat>,
    pub depth: Option<wgpu::TextureFormat>,
    pub samples: u32,
    pub cull: Option<Face>,
    pub depth_test: bool,
    pub blend: Option<BlendMode>,
}

fn vertex_layout(layout: VertexLayout) -> wgpu::VertexBufferLayout<'static> {
    match layout {
        VertexLayout::Mesh => MeshVertex::LAYOUT,
        VertexLayout::Position => POSITION_LAYOUT,
        VertexLayout::ScreenQuad => ScreenVertex::LAYOUT,
    }
}

pub fn build_pipeline(device: &wgpu::Device, program: &GpuProgram, key: &PipelineKey) -> wgpu::RenderPipeline {
    let desc = &program.desc;
    let mut buffers = vec![vertex_layout(desc.vertex_layout)];
    if desc.instanced {
        buffers.push(InstanceTransform::LAYOUT);
    }

    let blend = key.blend.map(|BlendMode::Alpha| wgpu::BlendState::ALPHA_BLENDING);
    let targets = [key.color.map(|format| wgpu::ColorTargetState {
        format,
        blend,
        write_mask: wgpu::ColorWrites::ALL,
    })];
    let targets: &[Option<wgpu::ColorTargetState>] = if key.color.is_some() { &targets } else { &[] };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&desc.label),
        layout: Some(&program.pipeline_layout),
        vertex: wgpu::VertexState {
            module: &program.module,
            entry_point: Some(desc.vertex_entry),
            buffers: &buffers,
            compilation_options: Default::default(),
        },
        fragment: desc.fragment_entry.map(|entry| wgpu::FragmentState {
            module: &program.module,
            entry_point: Some(entry),
            targets,
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: match desc.front_face {
                FrontFace::Ccw => wgpu::FrontFace::Ccw,
                FrontFace::Cw => wgpu::FrontFace::Cw,
            },
            cull_mode: key.cull.map(|face| match face {
                Face::Front => wgpu::Face::Front,
                Face::Back => wgpu::Face::Back,
            }),
            ..Default::default()
        },
        depth_stencil: key.depth.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: key.depth_test,
            depth_compare: if key.depth_test {
                wgpu::CompareFunction::Less
            } else {
                wgpu::CompareFunction::Always
            },
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: key.samples,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}
