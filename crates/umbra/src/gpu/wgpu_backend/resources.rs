//! wgpu objects behind geometry, buffer and texture ids.

use std::borrow::Cow;

use wgpu::util::DeviceExt;

use crate::gpu::{
    BorderColor, BufferDesc, BufferUsage, Fallback, Filter, GeometryDesc, PixelFormat, Sampling,
    SlotKind, TextureDesc, TextureDimension, VertexLayout, Wrap,
};

// ── Geometry and buffers ───────────────────────────────────────────────────

pub struct GpuGeometry {
    pub vertices: Option<wgpu::Buffer>,
    pub indices: Option<wgpu::Buffer>,
    pub layout: VertexLayout,
    pub vertex_count: u32,
    pub index_count: u32,
}

impl GpuGeometry {
    pub fn create(device: &wgpu::Device, desc: &GeometryDesc<'_>) -> Self {
        let vertices = (!desc.vertices.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(desc.label),
                contents: desc.vertices,
                usage: wgpu::BufferUsages::VERTEX,
            })
        });
        let indices = desc.indices.filter(|i| !i.is_empty()).map(|indices| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(desc.label),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            })
        });
        Self {
            vertices,
            indices,
            layout: desc.layout,
            vertex_count: (desc.vertices.len() / desc.layout.stride()) as u32,
            index_count: desc.indices.map_or(0, |i| i.len() as u32),
        }
    }

    /// Clamp a requested element count to what the buffers hold.
    pub fn clamp_count(&self, count: u32) -> u32 {
        if self.indices.is_some() {
            count.min(self.index_count)
        } else {
            count.min(self.vertex_count)
        }
    }
}

pub struct GpuBuffer {
    pub buffer: wgpu::Buffer,
    pub usage: BufferUsage,
}

impl GpuBuffer {
    pub fn create(device: &wgpu::Device, desc: &BufferDesc<'_>) -> Self {
        let usage = match desc.usage {
            BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            BufferUsage::Instance => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        };
        // Zero-sized buffers cannot be bound; keep at least one block.
        let mut contents = Cow::Borrowed(desc.contents);
        if contents.len() < 16 {
            let mut padded = contents.into_owned();
            padded.resize(16, 0);
            contents = Cow::Owned(padded);
        }
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(desc.label),
            contents: &contents,
            usage,
        });
        Self {
            buffer,
            usage: desc.usage,
        }
    }
}

// ── Textures ───────────────────────────────────────────────────────────────

pub fn texture_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::R8 => wgpu::TextureFormat::R8Unorm,
        PixelFormat::Rgb8 | PixelFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
        PixelFormat::Rgb8Srgb | PixelFormat::Rgba8Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        PixelFormat::Depth32 => wgpu::TextureFormat::Depth32Float,
    }
}

/// wgpu has no 3-channel 8-bit formats; pad RGB texels with opaque alpha.
pub fn expand_rgb(data: &[u8]) -> Vec<u8> {
    data.chunks_exact(3)
        .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 255])
        .collect()
}

fn address_mode(wrap: Wrap, clamp_to_border: bool) -> wgpu::AddressMode {
    match wrap {
        Wrap::Repeat => wgpu::AddressMode::Repeat,
        Wrap::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        Wrap::ClampToBorder if clamp_to_border => wgpu::AddressMode::ClampToBorder,
        Wrap::ClampToBorder => wgpu::AddressMode::ClampToEdge,
    }
}

pub fn create_sampler(device: &wgpu::Device, label: &str, sampling: &Sampling, clamp_to_border: bool) -> wgpu::Sampler {
    let mode = address_mode(sampling.wrap, clamp_to_border);
    let filter = match sampling.filter {
        Filter::Nearest => wgpu::FilterMode::Nearest,
        Filter::Linear => wgpu::FilterMode::Linear,
    };
    let border_color = (mode == wgpu::AddressMode::ClampToBorder)
        .then(|| match sampling.border.unwrap_or(BorderColor::OpaqueWhite) {
            BorderColor::OpaqueWhite => wgpu::SamplerBorderColor::OpaqueWhite,
            BorderColor::TransparentBlack => wgpu::SamplerBorderColor::TransparentBlack,
        });
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: mode,
        address_mode_v: mode,
        address_mode_w: mode,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        compare: sampling.compare.then_some(wgpu::CompareFunction::LessEqual),
        border_color,
        ..Default::default()
    })
}

pub struct GpuTexture {
    pub desc: TextureDesc,
    pub texture: wgpu::Texture,
    /// Sampling view: `D2` or `Cube`.
    pub view: wgpu::TextureView,
    /// Per-layer attachment views of a cube render target.
    pub face_views: Vec<wgpu::TextureView>,
    pub sampler: wgpu::Sampler,
}

impl GpuTexture {
    pub fn create(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        desc: &TextureDesc,
        data: Option<&[u8]>,
        clamp_to_border: bool,
    ) -> Self {
        let format = texture_format(desc.format);
        let multisampled = desc.samples > 1;
        let mut usage = wgpu::TextureUsages::empty();
        if !multisampled {
            usage |= wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
        }
        if desc.render_target {
            usage |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }
        let layers = desc.dimension.layers();
        let descriptor = wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size: wgpu::Extent3d {
                width: desc.width.max(1),
                height: desc.height.max(1),
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: desc.samples.max(1),
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        };

        let data = data.filter(|data| {
            let ok = data.len() == desc.data_len();
            if !ok {
                log::error!(
                    "texture '{}': expected {} bytes of texel data, got {}",
                    desc.label,
                    desc.data_len(),
                    data.len()
                );
            }
            ok
        });
        let texture = match data {
            Some(data) => {
                let expanded;
                let texels = if matches!(desc.format, PixelFormat::Rgb8 | PixelFormat::Rgb8Srgb) {
                    expanded = expand_rgb(data);
                    &expanded[..]
                } else {
                    data
                };
                device.create_texture_with_data(
                    queue,
                    &descriptor,
                    wgpu::util::TextureDataOrder::LayerMajor,
                    texels,
                )
            }
            None => device.create_texture(&descriptor),
        };

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&desc.label),
            dimension: Some(match desc.dimension {
                TextureDimension::D2 => wgpu::TextureViewDimension::D2,
                TextureDimension::Cube => wgpu::TextureViewDimension::Cube,
            }),
            ..Default::default()
        });
        let face_views = if desc.dimension == TextureDimension::Cube && desc.render_target {
            (0..layers)
                .map(|layer| {
                    texture.create_view(&wgpu::TextureViewDescriptor {
                        label: Some(&desc.label),
                        dimension: Some(wgpu::TextureViewDimension::D2),
                        base_array_layer: layer,
                        array_layer_count: Some(1),
                        ..Default::default()
                    })
                })
                .collect()
        } else {
            Vec::new()
        };
        let sampler = create_sampler(device, &desc.label, &desc.sampling, clamp_to_border);

        Self {
            desc: desc.clone(),
            texture,
            view,
            face_views,
            sampler,
        }
    }

    /// View to render into: the whole texture, or one cube face.
    pub fn attachment_view(&self, face: Option<u32>) -> Option<&wgpu::TextureView> {
        match face {
            None if self.desc.dimension == TextureDimension::D2 => Some(&self.view),
            None => None,
            Some(face) => self.face_views.get(face as usize),
        }
    }

    /// Whether a slot of `kind` can sample this texture.
    pub fn fits(&self, kind: SlotKind) -> bool {
        let depth = self.desc.format.is_depth();
        let cube = self.desc.dimension == TextureDimension::Cube;
        let sampleable = self.desc.samples <= 1;
        let shape = match kind {
            SlotKind::Color2d => !depth && !cube,
            SlotKind::ColorCube => !depth && cube,
            SlotKind::Depth2d => depth && !cube && self.desc.sampling.compare,
            SlotKind::DepthCube => depth && cube && self.desc.sampling.compare,
        };
        sampleable && shape
    }
}

// ── Fallbacks ──────────────────────────────────────────────────────────────

/// What an empty or mismatched sampler slot reads instead.
pub struct Fallbacks {
    white_2d: GpuTexture,
    black_2d: GpuTexture,
    white_cube: GpuTexture,
    black_cube: GpuTexture,
    depth_2d: GpuTexture,
    depth_cube: GpuTexture,
}

impl Fallbacks {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let color = |label: &str, dimension: TextureDimension, value: u8| {
            let desc = TextureDesc {
                label: label.into(),
                dimension,
                format: PixelFormat::Rgba8,
                width: 1,
                height: 1,
                samples: 1,
                sampling: Sampling::default(),
                render_target: false,
            };
            let data = vec![value; desc.data_len()];
            GpuTexture::create(device, queue, &desc, Some(&data), false)
        };
        let depth = |label: &str, dimension: TextureDimension| {
            let desc = TextureDesc {
                label: label.into(),
                dimension,
                format: PixelFormat::Depth32,
                width: 1,
                height: 1,
                samples: 1,
                sampling: Sampling {
                    wrap: Wrap::ClampToEdge,
                    filter: Filter::Nearest,
                    border: None,
                    compare: true,
                },
                render_target: true,
            };
            GpuTexture::create(device, queue, &desc, None, false)
        };

        let fallbacks = Self {
            white_2d: color("fallback white", TextureDimension::D2, 255),
            black_2d: color("fallback black", TextureDimension::D2, 0),
            white_cube: color("fallback white cube", TextureDimension::Cube, 255),
            black_cube: color("fallback black cube", TextureDimension::Cube, 0),
            depth_2d: depth("fallback depth", TextureDimension::D2),
            depth_cube: depth("fallback depth cube", TextureDimension::Cube),
        };
        fallbacks.clear_depth(device, queue);
        fallbacks
    }

    /// Depth fallbacks read as "farthest", so comparisons never shadow.
    fn clear_depth(&self, device: &wgpu::Device, queue: &wgpu::Queue) {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("fallback depth clear"),
        });
        let views = std::iter::once(&self.depth_2d.view).chain(&self.depth_cube.face_views);
        for view in views {
            encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("fallback depth clear"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        queue.submit(std::iter::once(encoder.finish()));
    }

    pub fn get(&self, kind: SlotKind, fallback: Fallback) -> &GpuTexture {
        match (kind, fallback) {
            (SlotKind::Color2d, Fallback::White) => &self.white_2d,
            (SlotKind::Color2d, Fallback::Black) => &self.black_2d,
            (SlotKind::ColorCube, Fallback::White) => &self.white_cube,
            (SlotKind::ColorCube, Fallback::Black) => &self.black_cube,
            (SlotKind::Depth2d, _) => &self.depth_2d,
            (SlotKind::DepthCube, _) => &self.depth_cube,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_gains_opaque_alpha() {
        assert_eq!(expand_rgb(&[1, 2, 3, 4, 5, 6]), vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn srgb_flavours_map_to_srgb_formats() {
        assert_eq!(texture_format(PixelFormat::Rgb8Srgb), wgpu::TextureFormat::Rgba8UnormSrgb);
        assert_eq!(texture_format(PixelFormat::Rgb8), wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(texture_format(PixelFormat::Depth32), wgpu::TextureFormat::Depth32Float);
    }

    #[test]
    fn border_wrap_degrades_to_edge_without_support() {
        assert_eq!(address_mode(Wrap::ClampToBorder, false), wgpu::AddressMode::ClampToEdge);
        assert_eq!(address_mode(Wrap::ClampToBorder, true), wgpu::AddressMode::ClampToBorder);
    }
}
