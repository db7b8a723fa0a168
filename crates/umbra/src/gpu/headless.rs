//! # Headless Device — A Recording GPU Stand-In
//!
//! [`HeadlessDevice`] implements [`GraphicsDevice`] without touching a GPU.
//! It keeps the same bookkeeping a real device would (descriptors, uniform
//! values per program, texture units, framebuffer completeness) and appends
//! every state change and draw to a command log.
//!
//! That is enough to check most renderer behaviour without a window or an
//! adapter: which uniforms a light wrote, how often a mesh queried sampler
//! locations, how many textures a model uploaded, and in which order the
//! passes ran.
//!
//! ```text
//!   renderer ──▶ HeadlessDevice ──▶ commands: [BindTarget, Viewport, Clear, Draw, ...]
//!                      │
//!                      ├─▶ uniform("dirlight.ambient") == Vec3(0.01, ...)
//!                      └─▶ created / destroyed resource logs
//! ```

use std::collections::{BTreeMap, HashMap};

use super::*;

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BeginFrame,
    EndFrame,
    BindTarget(RenderTarget),
    Viewport(Viewport),
    Clear(Clear),
    CullFace(Option<Face>),
    DepthTest(bool),
    Blend(Option<BlendMode>),
    UseProgram(ProgramId),
    SetUniform {
        program: ProgramId,
        name: String,
        value: UniformValue,
    },
    BindTexture {
        unit: u32,
        texture: TextureId,
    },
    BindUniformBuffer {
        binding: u32,
        buffer: BufferId,
    },
    WriteBuffer {
        buffer: BufferId,
        offset: u64,
        len: usize,
    },
    Draw(RecordedDraw),
    Resolve {
        source: FramebufferId,
        destination: FramebufferId,
    },
}

/// A draw plus the state it was issued under.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub program: Option<ProgramId>,
    pub geometry: GeometryId,
    pub count: u32,
    pub instances: u32,
    pub target: RenderTarget,
    pub cull: Option<Face>,
    pub depth_test: bool,
    pub blend: Option<BlendMode>,
    /// Texture bound to each slot of the program, after unit resolution.
    pub slots: Vec<(String, TextureId)>,
}

struct HeadlessGeometry {
    layout: VertexLayout,
    vertex_count: usize,
    index_count: Option<usize>,
}

struct HeadlessProgram {
    desc: ProgramDesc,
    values: Vec<Option<UniformValue>>,
    units: Vec<u32>,
}

struct State {
    target: RenderTarget,
    viewport: Option<Viewport>,
    cull: Option<Face>,
    depth_test: bool,
    blend: Option<BlendMode>,
    program: Option<ProgramId>,
    units: BTreeMap<u32, TextureId>,
}

/// Recording implementation of [`GraphicsDevice`].
///
/// Initial state: screen target bound, depth test on, no culling, no blending.
pub struct HeadlessDevice {
    release: ReleaseQueue,
    next_id: u32,
    screen: (u32, u32),
    geometries: HashMap<GeometryId, HeadlessGeometry>,
    buffers: HashMap<BufferId, Vec<u8>>,
    textures: HashMap<TextureId, TextureDesc>,
    framebuffers: HashMap<FramebufferId, (FramebufferDesc, FramebufferStatus)>,
    programs: HashMap<ProgramId, HeadlessProgram>,
    uniform_buffers: BTreeMap<u32, BufferId>,
    state: State,
    commands: Vec<Command>,
    location_queries: Vec<(ProgramId, String)>,
    texture_uploads: usize,
    created: Vec<Resource>,
    destroyed: Vec<Resource>,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

impl HeadlessDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            release: ReleaseQueue::new(),
            next_id: 1,
            screen: (width, height),
            geometries: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            programs: HashMap::new(),
            uniform_buffers: BTreeMap::new(),
            state: State {
                target: RenderTarget::Screen,
                viewport: None,
                cull: None,
                depth_test: true,
                blend: None,
                program: None,
                units: BTreeMap::new(),
            },
            commands: Vec::new(),
            location_queries: Vec::new(),
            texture_uploads: 0,
            created: Vec::new(),
            destroyed: Vec::new(),
        }
    }

    fn alloc(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // ── Inspection ──

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn draws(&self) -> impl Iterator<Item = &RecordedDraw> {
        self.commands.iter().filter_map(|c| match c {
            Command::Draw(d) => Some(d),
            _ => None,
        })
    }

    /// Current value of a plain uniform, `None` if never written.
    pub fn uniform(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        let prog = self.programs.get(&program)?;
        let i = prog.desc.uniforms.iter().position(|u| u.name == name)?;
        prog.values[i]
    }

    /// Texture unit a sampler uniform currently points at.
    pub fn sampler_unit(&self, program: ProgramId, name: &str) -> Option<u32> {
        let prog = self.programs.get(&program)?;
        let i = prog.desc.textures.iter().position(|t| t.name == name)?;
        Some(prog.units[i])
    }

    /// Every `SetUniform` command targeting `name`, in order.
    pub fn uniform_writes<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a UniformValue> {
        self.commands.iter().filter_map(move |c| match c {
            Command::SetUniform { name: n, value, .. } if n == name => Some(value),
            _ => None,
        })
    }

    /// Total `uniform_location` calls so far.
    pub fn location_queries(&self) -> usize {
        self.location_queries.len()
    }

    pub fn location_queries_for(&self, name: &str) -> usize {
        self.location_queries.iter().filter(|(_, n)| n == name).count()
    }

    /// Number of textures created with initial data.
    pub fn texture_uploads(&self) -> usize {
        self.texture_uploads
    }

    pub fn created(&self) -> &[Resource] {
        &self.created
    }

    pub fn destroyed(&self) -> &[Resource] {
        &self.destroyed
    }

    pub fn bound_texture(&self, unit: u32) -> TextureId {
        self.state.units.get(&unit).copied().unwrap_or(TextureId::INVALID)
    }

    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    pub fn framebuffer_desc(&self, framebuffer: FramebufferId) -> Option<&FramebufferDesc> {
        self.framebuffers.get(&framebuffer).map(|(d, _)| d)
    }

    pub fn geometry_counts(&self, geometry: GeometryId) -> Option<(usize, Option<usize>)> {
        self.geometries
            .get(&geometry)
            .map(|g| (g.vertex_count, g.index_count))
    }

    pub fn set_screen_size(&mut self, width: u32, height: u32) {
        self.screen = (width, height);
    }

    fn snapshot_slots(&self) -> Vec<(String, TextureId)> {
        let Some(prog) = self.state.program.and_then(|p| self.programs.get(&p)) else {
            return Vec::new();
        };
        prog.desc
            .textures
            .iter()
            .zip(&prog.units)
            .map(|(slot, unit)| (slot.name.to_string(), self.bound_texture(*unit)))
            .collect()
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn release_queue(&self) -> ReleaseQueue {
        self.release.clone()
    }

    fn collect_released(&mut self) {
        for resource in self.release.drain() {
            let removed = match resource {
                Resource::Geometry(id) => self.geometries.remove(&id).is_some(),
                Resource::Buffer(id) => self.buffers.remove(&id).is_some(),
                Resource::Texture(id) => self.textures.remove(&id).is_some(),
                Resource::Framebuffer(id) => self.framebuffers.remove(&id).is_some(),
                Resource::Program(id) => self.programs.remove(&id).is_some(),
            };
            if removed {
                self.destroyed.push(resource);
            } else {
                log::error!("release of unknown or already destroyed {resource:?}");
            }
        }
    }

    fn create_geometry(&mut self, desc: &GeometryDesc<'_>) -> GeometryId {
        let id = GeometryId(self.alloc());
        let stride = desc.layout.stride();
        if desc.vertices.len() % stride != 0 {
            log::warn!(
                "geometry '{}': {} vertex bytes is not a multiple of stride {stride}",
                desc.label,
                desc.vertices.len()
            );
        }
        self.geometries.insert(
            id,
            HeadlessGeometry {
                layout: desc.layout,
                vertex_count: desc.vertices.len() / stride,
                index_count: desc.indices.map(<[u32]>::len),
            },
        );
        self.created.push(Resource::Geometry(id));
        id
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> BufferId {
        let id = BufferId(self.alloc());
        self.buffers.insert(id, desc.contents.to_vec());
        self.created.push(Resource::Buffer(id));
        id
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) {
        let Some(contents) = self.buffers.get_mut(&buffer) else {
            log::error!("write to unknown {buffer}");
            return;
        };
        let start = offset as usize;
        let end = start + data.len();
        if end > contents.len() {
            log::error!("write of {} bytes at {offset} overflows {buffer}", data.len());
            return;
        }
        contents[start..end].copy_from_slice(data);
        self.commands.push(Command::WriteBuffer {
            buffer,
            offset,
            len: data.len(),
        });
    }

    fn create_texture(&mut self, desc: &TextureDesc, data: Option<&[u8]>) -> TextureId {
        let id = TextureId(self.alloc());
        if let Some(data) = data {
            if data.len() != desc.data_len() {
                log::error!(
                    "texture '{}': expected {} bytes, got {}",
                    desc.label,
                    desc.data_len(),
                    data.len()
                );
            }
            self.texture_uploads += 1;
        }
        self.textures.insert(id, desc.clone());
        self.created.push(Resource::Texture(id));
        id
    }

    fn texture_desc(&self, texture: TextureId) -> Option<&TextureDesc> {
        self.textures.get(&texture)
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> FramebufferId {
        let id = FramebufferId(self.alloc());
        let status = check_framebuffer(desc, |t| self.textures.get(&t));
        self.framebuffers.insert(id, (desc.clone(), status));
        self.created.push(Resource::Framebuffer(id));
        id
    }

    fn framebuffer_status(&self, framebuffer: FramebufferId) -> FramebufferStatus {
        match self.framebuffers.get(&framebuffer) {
            Some((_, status)) => status.clone(),
            None => FramebufferStatus::Incomplete(format!("unknown {framebuffer}")),
        }
    }

    fn create_program(&mut self, desc: &ProgramDesc) -> Result<ProgramId, RenderError> {
        let id = ProgramId(self.alloc());
        self.programs.insert(
            id,
            HeadlessProgram {
                desc: desc.clone(),
                values: vec![None; desc.uniforms.len()],
                units: desc.textures.iter().map(|t| t.unit).collect(),
            },
        );
        self.created.push(Resource::Program(id));
        Ok(id)
    }

    fn begin_frame(&mut self) -> Result<(), RenderError> {
        self.commands.push(Command::BeginFrame);
        Ok(())
    }

    fn end_frame(&mut self) {
        self.commands.push(Command::EndFrame);
        self.collect_released();
    }

    fn screen_size(&self) -> (u32, u32) {
        self.screen
    }

    fn bind_target(&mut self, target: RenderTarget) {
        self.state.target = target;
        self.commands.push(Command::BindTarget(target));
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.state.viewport = Some(viewport);
        self.commands.push(Command::Viewport(viewport));
    }

    fn clear(&mut self, clear: Clear) {
        self.commands.push(Command::Clear(clear));
    }

    fn set_cull_face(&mut self, face: Option<Face>) {
        self.state.cull = face;
        self.commands.push(Command::CullFace(face));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.state.depth_test = enabled;
        self.commands.push(Command::DepthTest(enabled));
    }

    fn set_blend(&mut self, blend: Option<BlendMode>) {
        self.state.blend = blend;
        self.commands.push(Command::Blend(blend));
    }

    fn use_program(&mut self, program: ProgramId) {
        if !self.programs.contains_key(&program) {
            log::error!("use of unknown {program}");
        }
        self.state.program = Some(program);
        self.commands.push(Command::UseProgram(program));
    }

    fn active_program(&self) -> Option<ProgramId> {
        self.state.program
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> UniformLocation {
        self.location_queries.push((program, name.to_owned()));
        self.programs
            .get(&program)
            .map(|p| p.desc.location_of(name))
            .unwrap_or(UniformLocation::NOT_FOUND)
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        if !location.is_found() {
            return;
        }
        let Some(program) = self.state.program else {
            log::warn!("set_uniform with no active program");
            return;
        };
        let Some(prog) = self.programs.get_mut(&program) else {
            return;
        };
        let name = match prog.desc.resolve(location) {
            Some(UniformTarget::Value(i, decl)) => {
                if decl.kind != value.kind() {
                    log::warn!("uniform '{}' is {:?}, got {:?}", decl.name, decl.kind, value);
                    return;
                }
                let name = decl.name.to_string();
                prog.values[i] = Some(value);
                name
            }
            Some(UniformTarget::Sampler(i, slot)) => {
                let UniformValue::Int(unit) = value else {
                    log::warn!("sampler '{}' takes a texture unit, got {:?}", slot.name, value);
                    return;
                };
                let name = slot.name.to_string();
                prog.units[i] = unit.max(0) as u32;
                name
            }
            None => return,
        };
        self.commands.push(Command::SetUniform {
            program,
            name,
            value,
        });
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        if texture.is_valid() {
            self.state.units.insert(unit, texture);
        } else {
            self.state.units.remove(&unit);
        }
        self.commands.push(Command::BindTexture { unit, texture });
    }

    fn bind_uniform_buffer(&mut self, binding: u32, buffer: BufferId) {
        self.uniform_buffers.insert(binding, buffer);
        self.commands
            .push(Command::BindUniformBuffer { binding, buffer });
    }

    fn draw(&mut self, call: &DrawCall) {
        let Some(geometry) = self.geometries.get(&call.geometry) else {
            log::error!("draw of unknown {}", call.geometry);
            return;
        };
        let available = geometry.index_count.unwrap_or(geometry.vertex_count);
        if call.count as usize > available {
            log::warn!(
                "draw of {} elements from {} with only {available} ({:?})",
                call.count,
                call.geometry,
                geometry.layout
            );
        }
        let draw = RecordedDraw {
            program: self.state.program,
            geometry: call.geometry,
            count: call.count,
            instances: call.instances,
            target: self.state.target,
            cull: self.state.cull,
            depth_test: self.state.depth_test,
            blend: self.state.blend,
            slots: self.snapshot_slots(),
        };
        self.commands.push(Command::Draw(draw));
    }

    fn resolve(&mut self, source: FramebufferId, destination: FramebufferId) {
        self.commands.push(Command::Resolve {
            source,
            destination,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_program() -> ProgramDesc {
        ProgramDesc {
            label: "flat".into(),
            source: "".into(),
            vertex_entry: "vs_main",
            fragment_entry: Some("fs_main"),
            vertex_layout: VertexLayout::Position,
            instanced: false,
            front_face: FrontFace::Ccw,
            uniforms: vec![UniformDecl::new("tint", UniformKind::Vec3)],
            textures: vec![TextureSlot::new("image", 0, SlotKind::Color2d, Fallback::White)],
        }
    }

    #[test]
    fn uniforms_apply_to_active_program() {
        let mut dev = HeadlessDevice::default();
        let program = dev.create_program(&flat_program()).unwrap();
        dev.use_program(program);
        let loc = dev.uniform_location(program, "tint");
        dev.set_uniform(loc, UniformValue::Vec3(glam::Vec3::X));
        assert_eq!(dev.uniform(program, "tint"), Some(UniformValue::Vec3(glam::Vec3::X)));
        assert_eq!(dev.location_queries(), 1);
    }

    #[test]
    fn not_found_writes_are_ignored() {
        let mut dev = HeadlessDevice::default();
        let program = dev.create_program(&flat_program()).unwrap();
        dev.use_program(program);
        let loc = dev.uniform_location(program, "missing");
        assert_eq!(loc, UniformLocation::NOT_FOUND);
        dev.set_uniform(loc, UniformValue::Float(1.0));
        assert!(dev.uniform_writes("missing").next().is_none());
    }

    #[test]
    fn mismatched_uniform_kind_is_rejected() {
        let mut dev = HeadlessDevice::default();
        let program = dev.create_program(&flat_program()).unwrap();
        dev.use_program(program);
        let loc = dev.uniform_location(program, "tint");
        dev.set_uniform(loc, UniformValue::Float(1.0));
        assert_eq!(dev.uniform(program, "tint"), None);
    }

    #[test]
    fn sampler_uniform_moves_slot_to_another_unit() {
        let mut dev = HeadlessDevice::default();
        let program = dev.create_program(&flat_program()).unwrap();
        dev.use_program(program);
        let loc = dev.uniform_location(program, "image");
        dev.set_uniform(loc, UniformValue::Int(3));
        assert_eq!(dev.sampler_unit(program, "image"), Some(3));
    }

    #[test]
    fn collect_destroys_each_resource_once() {
        let mut dev = HeadlessDevice::default();
        let buffer = dev.create_buffer(&BufferDesc {
            label: "b",
            usage: BufferUsage::Uniform,
            contents: &[0; 16],
        });
        let queue = dev.release_queue();
        queue.push(Resource::Buffer(buffer));
        queue.push(Resource::Buffer(buffer));
        dev.collect_released();
        assert_eq!(dev.destroyed(), &[Resource::Buffer(buffer)]);
    }
}
