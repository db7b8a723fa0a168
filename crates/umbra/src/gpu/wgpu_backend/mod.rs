//! # wgpu Backend — Immediate-Mode State on Top of wgpu
//!
//! [`WgpuDevice`] implements [`GraphicsDevice`] for a window surface. The
//! trait's model (mutable state, uniforms stored on programs, texture units)
//! is translated at draw time:
//!
//! ```text
//!   set_uniform ──▶ program staging block
//!   bind_texture ─▶ unit table
//!   set_cull_face / set_depth_test / set_blend / bind_target
//!        │
//!        ▼  draw()
//!   PipelineKey ──▶ pipeline cache (built on first use)
//!   staging block ──▶ uniform arena snapshot (dynamic offset, group 1)
//!   program slots × unit table ──▶ textures or fallbacks (group 2)
//!        │
//!        ▼  end_frame()
//!   upload arena ─▶ encode recorded passes ─▶ submit ─▶ present ─▶ collect_released
//! ```
//!
//! Group 0 is the buffer bound with `bind_uniform_buffer(0, ..)` (the
//! view/projection block). Without one, a zeroed stand-in is bound.

mod context;
mod frame;
mod program;
mod resources;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub use context::GpuContext;

use crate::error::RenderError;
use crate::gpu::{
    BlendMode, BufferDesc, BufferId, BufferUsage, Clear, DrawCall, Face, FramebufferDesc,
    FramebufferId, FramebufferStatus, GeometryDesc, GeometryId, GraphicsDevice, ProgramDesc,
    ProgramId, RenderTarget, ReleaseQueue, Resource, TextureDesc, TextureId, UniformLocation,
    UniformTarget, UniformValue, Viewport, check_framebuffer,
};

use frame::{DrawPass, FrameRecording, RecordedDraw, RecordedPass, SlotSource, UniformArena};
use program::{GpuProgram, PipelineKey, SharedLayouts, build_pipeline, write_value};
use resources::{Fallbacks, GpuBuffer, GpuGeometry, GpuTexture, texture_format};

const MATRICES_BINDING: u32 = 0;

struct GpuFramebuffer {
    desc: FramebufferDesc,
    status: FramebufferStatus,
}

/// Formats and sample count of whatever a target renders into.
#[derive(Clone, Copy)]
struct TargetFormat {
    color: Option<wgpu::TextureFormat>,
    depth: Option<wgpu::TextureFormat>,
    samples: u32,
    size: (u32, u32),
}

struct State {
    target: RenderTarget,
    viewport: Viewport,
    cull: Option<Face>,
    depth_test: bool,
    blend: Option<BlendMode>,
    program: Option<ProgramId>,
    units: BTreeMap<u32, TextureId>,
    matrices: Option<BufferId>,
}

struct Frame {
    surface: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    recording: FrameRecording,
}

/// [`GraphicsDevice`] backed by wgpu and a window surface.
pub struct WgpuDevice {
    ctx: GpuContext,
    release: ReleaseQueue,
    next_id: u32,

    geometries: HashMap<GeometryId, GpuGeometry>,
    buffers: HashMap<BufferId, GpuBuffer>,
    textures: HashMap<TextureId, GpuTexture>,
    framebuffers: HashMap<FramebufferId, GpuFramebuffer>,
    programs: HashMap<ProgramId, GpuProgram>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    layouts: SharedLayouts,
    arena: UniformArena,
    fallbacks: Fallbacks,
    zero_matrices: wgpu::Buffer,
    screen_depth: wgpu::TextureView,

    state: State,
    frame: Option<Frame>,
}

const SCREEN_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

fn create_screen_depth(device: &wgpu::Device, (width, height): (u32, u32)) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("screen depth"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SCREEN_DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

impl WgpuDevice {
    /// Open a device rendering to `window`.
    pub fn new(window: Arc<winit::window::Window>) -> Result<Self, RenderError> {
        let ctx = GpuContext::new(window)?;
        let device = &ctx.device;

        let layouts = SharedLayouts::new(device);
        let arena = UniformArena::new(device, &layouts.uniforms);
        let fallbacks = Fallbacks::new(device, &ctx.queue);
        let zero_matrices = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("zero matrices"),
            size: std::mem::size_of::<crate::vertex::MatricesUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM,
            mapped_at_creation: false,
        });
        let screen_depth = create_screen_depth(device, ctx.surface_size());
        let (width, height) = ctx.surface_size();

        Ok(Self {
            ctx,
            release: ReleaseQueue::new(),
            next_id: 1,
            geometries: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            programs: HashMap::new(),
            pipelines: HashMap::new(),
            layouts,
            arena,
            fallbacks,
            zero_matrices,
            screen_depth,
            state: State {
                target: RenderTarget::Screen,
                viewport: Viewport::sized(width, height),
                cull: None,
                depth_test: true,
                blend: None,
                program: None,
                units: BTreeMap::new(),
                matrices: None,
            },
            frame: None,
        })
    }

    /// Follow a window resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
        self.screen_depth = create_screen_depth(&self.ctx.device, self.ctx.surface_size());
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    fn alloc(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn target_format(&self, target: RenderTarget) -> Option<TargetFormat> {
        let framebuffer = match target {
            RenderTarget::Screen => {
                return Some(TargetFormat {
                    color: Some(self.ctx.surface_format()),
                    depth: Some(SCREEN_DEPTH_FORMAT),
                    samples: 1,
                    size: self.ctx.surface_size(),
                });
            }
            RenderTarget::Framebuffer(id) | RenderTarget::Face(id, _) => self.framebuffers.get(&id)?,
        };
        if !framebuffer.status.is_complete() {
            return None;
        }
        let color = framebuffer.desc.color.and_then(|id| self.textures.get(&id));
        let depth = framebuffer.desc.depth.and_then(|id| self.textures.get(&id));
        let any = color.or(depth)?;
        Some(TargetFormat {
            color: color.map(|t| texture_format(t.desc.format)),
            depth: depth.map(|t| texture_format(t.desc.format)),
            samples: any.desc.samples.max(1),
            size: (any.desc.width, any.desc.height),
        })
    }

    fn slot_sources(&self, program: &GpuProgram) -> Vec<SlotSource> {
        program
            .desc
            .textures
            .iter()
            .zip(&program.units)
            .map(|(slot, unit)| {
                let bound = self.state.units.get(unit).copied();
                match bound.and_then(|id| self.textures.get(&id).map(|t| (id, t))) {
                    Some((id, texture)) if texture.fits(slot.kind) => SlotSource::Texture(id),
                    Some((id, _)) => {
                        log::trace!("{id} does not fit slot '{}', using fallback", slot.name);
                        SlotSource::Fallback(slot.kind, slot.fallback)
                    }
                    None => SlotSource::Fallback(slot.kind, slot.fallback),
                }
            })
            .collect()
    }

    // ── Encoding ──

    fn attachment(&self, texture: Option<TextureId>, face: Option<u32>) -> Option<&wgpu::TextureView> {
        self.textures.get(&texture?)?.attachment_view(face)
    }

    fn texture_bind_group(&self, program: &GpuProgram, slots: &[SlotSource]) -> wgpu::BindGroup {
        let textures: Vec<&GpuTexture> = slots
            .iter()
            .zip(&program.desc.textures)
            .map(|(source, slot)| match *source {
                SlotSource::Texture(id) => self
                    .textures
                    .get(&id)
                    .unwrap_or_else(|| self.fallbacks.get(slot.kind, slot.fallback)),
                SlotSource::Fallback(kind, fallback) => self.fallbacks.get(kind, fallback),
            })
            .collect();
        let entries: Vec<wgpu::BindGroupEntry> = textures
            .iter()
            .enumerate()
            .flat_map(|(i, texture)| {
                let binding = 2 * i as u32;
                [
                    wgpu::BindGroupEntry {
                        binding,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: binding + 1,
                        resource: wgpu::BindingResource::Sampler(&texture.sampler),
                    },
                ]
            })
            .collect();
        self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} textures", program.desc.label)),
            layout: &program.texture_layout,
            entries: &entries,
        })
    }

    fn encode_draw_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pass: &DrawPass,
        screen: &wgpu::TextureView,
        matrices: &wgpu::BindGroup,
        bind_groups: &mut HashMap<(ProgramId, Vec<SlotSource>), wgpu::BindGroup>,
    ) {
        if pass.draws.is_empty() && pass.clear_color.is_none() && pass.clear_depth.is_none() {
            return;
        }
        let Some(format) = self.target_format(pass.target) else {
            log::warn!("skipping pass into incomplete target {:?}", pass.target);
            return;
        };
        let (color_view, depth_view) = match pass.target {
            RenderTarget::Screen => (Some(screen), Some(&self.screen_depth)),
            RenderTarget::Framebuffer(id) | RenderTarget::Face(id, _) => {
                let face = match pass.target {
                    RenderTarget::Face(_, face) => Some(face),
                    _ => None,
                };
                let Some(fb) = self.framebuffers.get(&id) else {
                    return;
                };
                (self.attachment(fb.desc.color, face), self.attachment(fb.desc.depth, face))
            }
        };

        let color_attachment = color_view.map(|view| wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            depth_slice: None,
            ops: wgpu::Operations {
                load: match pass.clear_color {
                    Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                        r: r.into(),
                        g: g.into(),
                        b: b.into(),
                        a: a.into(),
                    }),
                    None => wgpu::LoadOp::Load,
                },
                store: wgpu::StoreOp::Store,
            },
        });
        let color_attachments = [color_attachment];
        let color_attachments: &[Option<wgpu::RenderPassColorAttachment>] =
            if color_view.is_some() { &color_attachments } else { &[] };
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("umbra pass"),
            color_attachments,
            depth_stencil_attachment: depth_view.map(|view| wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load: pass.clear_depth.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for draw in &pass.draws {
            let (Some(pipeline), Some(program), Some(geometry)) = (
                self.pipelines.get(&draw.pipeline),
                self.programs.get(&draw.pipeline.program),
                self.geometries.get(&draw.geometry),
            ) else {
                continue;
            };
            let Some(vertices) = &geometry.vertices else {
                continue;
            };

            let (x, y, width, height) = gl_viewport(draw.viewport, format.size);
            render_pass.set_viewport(x, y, width, height, 0.0, 1.0);
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, matrices, &[]);
            render_pass.set_bind_group(1, self.arena.bind_group(), &[draw.uniform_offset]);
            let textures = bind_groups
                .entry((draw.pipeline.program, draw.slots.clone()))
                .or_insert_with(|| self.texture_bind_group(program, &draw.slots));
            render_pass.set_bind_group(2, &*textures, &[]);
            render_pass.set_vertex_buffer(0, vertices.slice(..));
            if let Some(instances) = draw.instance_buffer.and_then(|id| self.buffers.get(&id)) {
                render_pass.set_vertex_buffer(1, instances.buffer.slice(..));
            }
            match &geometry.indices {
                Some(indices) => {
                    render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..draw.count, 0, 0..draw.instances);
                }
                None => render_pass.draw(0..draw.count, 0..draw.instances),
            }
        }
    }

    fn encode_resolve(&self, encoder: &mut wgpu::CommandEncoder, source: FramebufferId, destination: FramebufferId) {
        let color = |id: FramebufferId| {
            let fb = self.framebuffers.get(&id)?;
            self.attachment(fb.desc.color, None)
        };
        let (Some(source), Some(destination)) = (color(source), color(destination)) else {
            log::warn!("resolve between framebuffers without color attachments skipped");
            return;
        };
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("umbra resolve"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: source,
                resolve_target: Some(destination),
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
    }
}

/// Convert a bottom-left origin viewport into wgpu's top-left one, clamped
/// to the target.
fn gl_viewport(viewport: Viewport, (target_w, target_h): (u32, u32)) -> (f32, f32, f32, f32) {
    let x = viewport.x.min(target_w);
    let width = viewport.width.min(target_w - x).max(1);
    let top = (viewport.y + viewport.height).min(target_h);
    let y = target_h - top;
    let height = top.saturating_sub(viewport.y).max(1);
    (x as f32, y as f32, width as f32, height as f32)
}

impl GraphicsDevice for WgpuDevice {
    // ── Resources ──

    fn release_queue(&self) -> ReleaseQueue {
        self.release.clone()
    }

    fn collect_released(&mut self) {
        for resource in self.release.drain() {
            let found = match resource {
                Resource::Geometry(id) => self.geometries.remove(&id).is_some(),
                Resource::Buffer(id) => {
                    if self.state.matrices == Some(id) {
                        self.state.matrices = None;
                    }
                    self.buffers.remove(&id).is_some()
                }
                Resource::Texture(id) => self.textures.remove(&id).is_some(),
                Resource::Framebuffer(id) => self.framebuffers.remove(&id).is_some(),
                Resource::Program(id) => {
                    self.pipelines.retain(|key, _| key.program != id);
                    if self.state.program == Some(id) {
                        self.state.program = None;
                    }
                    self.programs.remove(&id).is_some()
                }
            };
            if !found {
                log::warn!("released unknown resource {resource:?}");
            }
        }
    }

    fn create_geometry(&mut self, desc: &GeometryDesc<'_>) -> GeometryId {
        let id = GeometryId(self.alloc());
        self.geometries.insert(id, GpuGeometry::create(&self.ctx.device, desc));
        id
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> BufferId {
        let id = BufferId(self.alloc());
        self.buffers.insert(id, GpuBuffer::create(&self.ctx.device, desc));
        id
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) {
        match self.buffers.get(&buffer) {
            Some(gpu) if offset + data.len() as u64 <= gpu.buffer.size() => {
                self.ctx.queue.write_buffer(&gpu.buffer, offset, data);
            }
            Some(_) => log::error!("write of {} bytes at {offset} overflows {buffer}", data.len()),
            None => log::warn!("write to unknown {buffer}"),
        }
    }

    fn create_texture(&mut self, desc: &TextureDesc, data: Option<&[u8]>) -> TextureId {
        let id = TextureId(self.alloc());
        let texture = GpuTexture::create(
            &self.ctx.device,
            &self.ctx.queue,
            desc,
            data,
            self.ctx.clamp_to_border,
        );
        self.textures.insert(id, texture);
        id
    }

    fn texture_desc(&self, texture: TextureId) -> Option<&TextureDesc> {
        self.textures.get(&texture).map(|t| &t.desc)
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> FramebufferId {
        let id = FramebufferId(self.alloc());
        let status = check_framebuffer(desc, |t| self.textures.get(&t).map(|t| &t.desc));
        self.framebuffers.insert(
            id,
            GpuFramebuffer {
                desc: desc.clone(),
                status,
            },
        );
        id
    }

    fn framebuffer_status(&self, framebuffer: FramebufferId) -> FramebufferStatus {
        self.framebuffers
            .get(&framebuffer)
            .map(|fb| fb.status.clone())
            .unwrap_or_else(|| FramebufferStatus::Incomplete(format!("unknown {framebuffer}")))
    }

    fn create_program(&mut self, desc: &ProgramDesc) -> Result<ProgramId, RenderError> {
        let program = GpuProgram::compile(&self.ctx.device, &self.layouts, desc).map_err(|message| {
            RenderError::Shader {
                label: desc.label.to_string(),
                message,
            }
        })?;
        self.arena.fit_block(program.block.size);
        let id = ProgramId(self.alloc());
        log::debug!("compiled program '{}' as {id}", desc.label);
        self.programs.insert(id, program);
        Ok(id)
    }

    // ── Frame ──

    fn begin_frame(&mut self) -> Result<(), RenderError> {
        if self.frame.is_some() {
            log::warn!("begin_frame called twice; dropping the unfinished frame");
            self.frame = None;
        }
        let surface = match self.ctx.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                self.ctx.reconfigure();
                self.ctx
                    .surface
                    .get_current_texture()
                    .map_err(|e| RenderError::Surface(e.to_string()))?
            }
            Err(e) => return Err(RenderError::Surface(e.to_string())),
        };
        let view = surface.texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.arena.reset();
        self.frame = Some(Frame {
            surface,
            view,
            recording: FrameRecording::default(),
        });
        Ok(())
    }

    fn end_frame(&mut self) {
        let Some(frame) = self.frame.take() else {
            log::warn!("end_frame without begin_frame");
            return;
        };
        let passes = frame.recording.finish();

        self.arena.upload(&self.ctx.device, &self.ctx.queue, &self.layouts.uniforms);

        let matrices_buffer = self
            .state
            .matrices
            .and_then(|id| self.buffers.get(&id))
            .map_or(&self.zero_matrices, |b| &b.buffer);
        let matrices = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("matrices"),
            layout: &self.layouts.matrices,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: matrices_buffer.as_entire_binding(),
            }],
        });

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("umbra frame") });
        let mut bind_groups = HashMap::new();
        for pass in &passes {
            match pass {
                RecordedPass::Draws(pass) => {
                    self.encode_draw_pass(&mut encoder, pass, &frame.view, &matrices, &mut bind_groups);
                }
                RecordedPass::Resolve { source, destination } => {
                    self.encode_resolve(&mut encoder, *source, *destination);
                }
            }
        }

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        frame.surface.present();
        self.collect_released();
    }

    fn screen_size(&self) -> (u32, u32) {
        self.ctx.surface_size()
    }

    // ── State ──

    fn bind_target(&mut self, target: RenderTarget) {
        if self.state.target != target
            && let Some(frame) = &mut self.frame
        {
            frame.recording.seal();
        }
        self.state.target = target;
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.state.viewport = viewport;
    }

    fn clear(&mut self, clear: Clear) {
        let target = self.state.target;
        match &mut self.frame {
            Some(frame) => frame.recording.clear(target, clear.color, clear.depth),
            None => log::warn!("clear outside a frame ignored"),
        }
    }

    fn set_cull_face(&mut self, face: Option<Face>) {
        self.state.cull = face;
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.state.depth_test = enabled;
    }

    fn set_blend(&mut self, blend: Option<BlendMode>) {
        self.state.blend = blend;
    }

    fn use_program(&mut self, program: ProgramId) {
        if self.programs.contains_key(&program) {
            self.state.program = Some(program);
        } else {
            log::warn!("use_program with unknown {program}");
        }
    }

    fn active_program(&self) -> Option<ProgramId> {
        self.state.program
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> UniformLocation {
        self.programs
            .get(&program)
            .map_or(UniformLocation::NOT_FOUND, |p| p.desc.location_of(name))
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let Some(program) = self.state.program.and_then(|id| self.programs.get_mut(&id)) else {
            log::warn!("set_uniform without an active program");
            return;
        };
        match program.desc.resolve(location) {
            Some(UniformTarget::Value(i, decl)) => {
                if decl.kind != value.kind() {
                    log::warn!(
                        "uniform '{}' is {:?}, got {:?}",
                        decl.name,
                        decl.kind,
                        value.kind()
                    );
                    return;
                }
                let offset = program.block.offsets[i];
                write_value(&mut program.staging, offset, value);
            }
            Some(UniformTarget::Sampler(i, slot)) => match value {
                UniformValue::Int(unit) => program.units[i] = unit.max(0) as u32,
                other => log::warn!("sampler '{}' takes a unit, got {other:?}", slot.name),
            },
            None => {}
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        if texture.is_valid() {
            self.state.units.insert(unit, texture);
        } else {
            self.state.units.remove(&unit);
        }
    }

    fn bind_uniform_buffer(&mut self, binding: u32, buffer: BufferId) {
        if binding != MATRICES_BINDING {
            log::warn!("uniform buffer binding {binding} is not used by any program");
            return;
        }
        match self.buffers.get(&buffer) {
            Some(b) if b.usage == BufferUsage::Uniform => self.state.matrices = Some(buffer),
            _ => log::warn!("{buffer} is not a uniform buffer"),
        }
    }

    fn draw(&mut self, call: &DrawCall) {
        if self.frame.is_none() {
            log::warn!("draw outside a frame ignored");
            return;
        }
        let Some(program_id) = self.state.program else {
            log::warn!("draw without an active program");
            return;
        };
        let Some(geometry) = self.geometries.get(&call.geometry) else {
            log::warn!("draw of unknown {}", call.geometry);
            return;
        };
        let count = geometry.clamp_count(call.count);
        if count == 0 || call.instances == 0 {
            return;
        }
        let Some(format) = self.target_format(self.state.target) else {
            log::warn!("draw into incomplete target {:?} skipped", self.state.target);
            return;
        };
        let Some(program) = self.programs.get(&program_id) else {
            return;
        };
        if program.desc.instanced && call.instance_buffer.is_none() {
            log::warn!("instanced program '{}' drawn without instances", program.desc.label);
            return;
        }

        let key = PipelineKey {
            program: program_id,
            color: format.color,
            depth: format.depth,
            samples: format.samples,
            cull: self.state.cull,
            depth_test: self.state.depth_test,
            blend: self.state.blend,
        };
        if !self.pipelines.contains_key(&key) {
            log::debug!("building pipeline for '{}': {key:?}", program.desc.label);
            let pipeline = build_pipeline(&self.ctx.device, program, &key);
            self.pipelines.insert(key, pipeline);
        }

        let slots = self.slot_sources(program);
        let uniform_offset = self.arena.push(&program.staging);
        let draw = RecordedDraw {
            pipeline: key,
            viewport: self.state.viewport,
            geometry: call.geometry,
            count,
            instances: call.instances,
            instance_buffer: call.instance_buffer.filter(|_| program.desc.instanced),
            uniform_offset,
            slots,
        };
        let target = self.state.target;
        if let Some(frame) = &mut self.frame {
            frame.recording.pass_for(target).push(draw);
        }
    }

    fn resolve(&mut self, source: FramebufferId, destination: FramebufferId) {
        match &mut self.frame {
            Some(frame) => frame.recording.resolve(source, destination),
            None => log::warn!("resolve outside a frame ignored"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_viewport_is_unchanged() {
        assert_eq!(gl_viewport(Viewport::sized(800, 600), (800, 600)), (0.0, 0.0, 800.0, 600.0));
    }

    #[test]
    fn viewport_origin_flips_to_top_left() {
        let viewport = Viewport {
            x: 10,
            y: 20,
            width: 100,
            height: 50,
        };
        assert_eq!(gl_viewport(viewport, (200, 100)), (10.0, 30.0, 100.0, 50.0));
    }

    #[test]
    fn oversized_viewport_is_clamped() {
        assert_eq!(gl_viewport(Viewport::sized(4096, 4096), (1024, 1024)), (0.0, 0.0, 1024.0, 1024.0));
    }
}
