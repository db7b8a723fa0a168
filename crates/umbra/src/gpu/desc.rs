//! Descriptors and state enums passed across the [`GraphicsDevice`](super::GraphicsDevice) seam.

use std::borrow::Cow;

use glam::{Mat4, Vec3, Vec4};

use super::handle::{BufferId, FramebufferId, GeometryId, TextureId};

// ── Textures ───────────────────────────────────────────────────────────────

/// Texel storage format.
///
/// The 8-bit color formats come in linear and sRGB flavours; which one a
/// loaded image gets is decided by [`crate::texture::PixelFormatTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    R8,
    Rgb8,
    Rgb8Srgb,
    Rgba8,
    Rgba8Srgb,
    Depth32,
}

impl PixelFormat {
    /// Bytes per texel in the data handed to `create_texture`.
    pub fn bytes_per_texel(self) -> usize {
        match self {
            PixelFormat::R8 => 1,
            PixelFormat::Rgb8 | PixelFormat::Rgb8Srgb => 3,
            PixelFormat::Rgba8 | PixelFormat::Rgba8Srgb | PixelFormat::Depth32 => 4,
        }
    }

    pub fn is_depth(self) -> bool {
        matches!(self, PixelFormat::Depth32)
    }
}

/// 2D texture or six-face cubemap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    D2,
    Cube,
}

impl TextureDimension {
    pub fn layers(self) -> u32 {
        match self {
            TextureDimension::D2 => 1,
            TextureDimension::Cube => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wrap {
    Repeat,
    ClampToEdge,
    ClampToBorder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorderColor {
    /// Reads as 1.0 in every channel; for depth maps that means "never occluded".
    OpaqueWhite,
    TransparentBlack,
}

/// How a texture is sampled. Stored with the texture, like GL texture parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sampling {
    pub wrap: Wrap,
    pub filter: Filter,
    /// Only meaningful with [`Wrap::ClampToBorder`].
    pub border: Option<BorderColor>,
    /// Depth comparison sampling (`reference <= stored`).
    pub compare: bool,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            wrap: Wrap::Repeat,
            filter: Filter::Linear,
            border: None,
            compare: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureDesc {
    pub label: String,
    pub dimension: TextureDimension,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// 1 for ordinary textures, >1 for multisampled render targets.
    pub samples: u32,
    pub sampling: Sampling,
    /// Usable as a framebuffer attachment.
    pub render_target: bool,
}

impl TextureDesc {
    /// Size in bytes of the initial data `create_texture` expects
    /// (all faces, tightly packed, face-major).
    pub fn data_len(&self) -> usize {
        self.width as usize
            * self.height as usize
            * self.format.bytes_per_texel()
            * self.dimension.layers() as usize
    }
}

// ── Framebuffers ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct FramebufferDesc {
    pub label: String,
    pub color: Option<TextureId>,
    pub depth: Option<TextureId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramebufferStatus {
    Complete,
    Incomplete(String),
}

impl FramebufferStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, FramebufferStatus::Complete)
    }
}

/// Check attachment compatibility the way a GL completeness check would.
///
/// `lookup` resolves attachment ids to their descriptors.
pub fn check_framebuffer<'a>(
    desc: &FramebufferDesc,
    lookup: impl Fn(TextureId) -> Option<&'a TextureDesc>,
) -> FramebufferStatus {
    let color = match desc.color {
        Some(id) => match lookup(id) {
            Some(tex) => Some(tex),
            None => return FramebufferStatus::Incomplete(format!("unknown color attachment {id}")),
        },
        None => None,
    };
    let depth = match desc.depth {
        Some(id) => match lookup(id) {
            Some(tex) => Some(tex),
            None => return FramebufferStatus::Incomplete(format!("unknown depth attachment {id}")),
        },
        None => None,
    };

    if color.is_none() && depth.is_none() {
        return FramebufferStatus::Incomplete("no attachments".into());
    }
    for tex in color.iter().chain(depth.iter()) {
        if !tex.render_target {
            return FramebufferStatus::Incomplete(format!(
                "'{}' was not created as a render target",
                tex.label
            ));
        }
    }
    if let Some(c) = color
        && c.format.is_depth()
    {
        return FramebufferStatus::Incomplete("depth format in color slot".into());
    }
    if let Some(d) = depth
        && !d.format.is_depth()
    {
        return FramebufferStatus::Incomplete("color format in depth slot".into());
    }
    if let (Some(c), Some(d)) = (color, depth) {
        if (c.width, c.height) != (d.width, d.height) {
            return FramebufferStatus::Incomplete("attachment sizes differ".into());
        }
        if c.samples != d.samples {
            return FramebufferStatus::Incomplete("attachment sample counts differ".into());
        }
        if c.dimension != d.dimension {
            return FramebufferStatus::Incomplete("attachments are not all layered".into());
        }
    }
    FramebufferStatus::Complete
}

// ── Geometry and buffers ───────────────────────────────────────────────────

/// Vertex attribute layouts known to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexLayout {
    /// position, normal, uv at locations 0/1/2 (32-byte stride).
    Mesh,
    /// position only at location 0 (12-byte stride).
    Position,
    /// 2D position and uv at locations 0/1 (16-byte stride).
    ScreenQuad,
}

impl VertexLayout {
    pub fn stride(self) -> usize {
        match self {
            VertexLayout::Mesh => 32,
            VertexLayout::Position => 12,
            VertexLayout::ScreenQuad => 16,
        }
    }
}

pub struct GeometryDesc<'a> {
    pub label: &'a str,
    pub layout: VertexLayout,
    pub vertices: &'a [u8],
    /// `None` for non-indexed geometry (drawn with `glDrawArrays` semantics).
    pub indices: Option<&'a [u32]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Bound with `bind_uniform_buffer`.
    Uniform,
    /// Per-instance `mat4` stream at vertex locations 3..=6.
    Instance,
}

pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub usage: BufferUsage,
    pub contents: &'a [u8],
}

// ── Programs ───────────────────────────────────────────────────────────────

/// Type of one plain (non-sampler) uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Bool,
    Int,
    Float,
    Vec3,
    Vec4,
    Mat4,
}

/// A value written through `set_uniform`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Bool(_) => UniformKind::Bool,
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Mat4(_) => UniformKind::Mat4,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            UniformValue::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            UniformValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_mat4(&self) -> Option<Mat4> {
        match self {
            UniformValue::Mat4(m) => Some(*m),
            _ => None,
        }
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDecl {
    /// Name as seen by `uniform_location`, e.g. `"dirlight.direction"`.
    pub name: Cow<'static, str>,
    pub kind: UniformKind,
}

impl UniformDecl {
    pub const fn new(name: &'static str, kind: UniformKind) -> Self {
        Self {
            name: Cow::Borrowed(name),
            kind,
        }
    }
}

/// What kind of texture a sampler slot reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Color2d,
    ColorCube,
    /// Depth comparison sampling of a 2D depth texture.
    Depth2d,
    /// Depth comparison sampling of a depth cubemap.
    DepthCube,
}

/// What a slot reads when its unit has nothing (or something incompatible) bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fallback {
    White,
    Black,
}

/// A sampler uniform. Its value is a texture unit, initially `unit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSlot {
    pub name: Cow<'static, str>,
    pub unit: u32,
    pub kind: SlotKind,
    pub fallback: Fallback,
}

impl TextureSlot {
    pub const fn new(name: &'static str, unit: u32, kind: SlotKind, fallback: Fallback) -> Self {
        Self {
            name: Cow::Borrowed(name),
            unit,
            kind,
            fallback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    Ccw,
    Cw,
}

/// Everything the device needs to compile and drive a program.
///
/// The uniform interface is declared up front: `uniforms` are packed in
/// declaration order (WGSL uniform layout rules) into the program's
/// block at group 1, `textures` become texture/sampler pairs at group 2
/// (bindings `2i`, `2i + 1`), and the shared view/projection block sits
/// at group 0.
#[derive(Debug, Clone)]
pub struct ProgramDesc {
    pub label: Cow<'static, str>,
    /// WGSL source.
    pub source: Cow<'static, str>,
    pub vertex_entry: &'static str,
    /// `None` for depth-only programs.
    pub fragment_entry: Option<&'static str>,
    pub vertex_layout: VertexLayout,
    /// Reads a per-instance `mat4` stream at locations 3..=6.
    pub instanced: bool,
    pub front_face: FrontFace,
    pub uniforms: Vec<UniformDecl>,
    pub textures: Vec<TextureSlot>,
}

/// A resolved uniform name. `NOT_FOUND` is returned for unknown names;
/// writes to it are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

impl UniformLocation {
    pub const NOT_FOUND: Self = Self(-1);

    pub fn is_found(self) -> bool {
        self.0 >= 0
    }
}

impl ProgramDesc {
    /// Location of `name`: plain uniforms first, then sampler slots.
    pub fn location_of(&self, name: &str) -> UniformLocation {
        if let Some(i) = self.uniforms.iter().position(|u| u.name == name) {
            return UniformLocation(i as i32);
        }
        if let Some(i) = self.textures.iter().position(|t| t.name == name) {
            return UniformLocation((self.uniforms.len() + i) as i32);
        }
        UniformLocation::NOT_FOUND
    }

    /// What a location refers to.
    pub fn resolve(&self, location: UniformLocation) -> Option<UniformTarget<'_>> {
        if !location.is_found() {
            return None;
        }
        let i = location.0 as usize;
        if let Some(decl) = self.uniforms.get(i) {
            return Some(UniformTarget::Value(i, decl));
        }
        self.textures
            .get(i - self.uniforms.len())
            .map(|slot| UniformTarget::Sampler(i - self.uniforms.len(), slot))
    }
}

/// Result of [`ProgramDesc::resolve`].
#[derive(Debug, Clone, Copy)]
pub enum UniformTarget<'a> {
    Value(usize, &'a UniformDecl),
    Sampler(usize, &'a TextureSlot),
}

// ── Pipeline state ─────────────────────────────────────────────────────────

/// Where draws go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// The window surface (or the offscreen stand-in).
    Screen,
    Framebuffer(FramebufferId),
    /// One face of a cubemap-backed framebuffer, `0..6` in `+X -X +Y -Y +Z -Z` order.
    Face(FramebufferId, u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Which buffers a `clear` touches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clear {
    pub color: Option<[f32; 4]>,
    pub depth: Option<f32>,
}

impl Clear {
    pub fn depth() -> Self {
        Self {
            color: None,
            depth: Some(1.0),
        }
    }

    pub fn color_and_depth(color: [f32; 4]) -> Self {
        Self {
            color: Some(color),
            depth: Some(1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// `src * srcAlpha + dst * (1 - srcAlpha)`.
    Alpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub geometry: GeometryId,
    /// Index count for indexed geometry, vertex count otherwise.
    pub count: u32,
    pub instances: u32,
    pub instance_buffer: Option<BufferId>,
}

impl DrawCall {
    pub fn new(geometry: GeometryId, count: u32) -> Self {
        Self {
            geometry,
            count,
            instances: 1,
            instance_buffer: None,
        }
    }

    pub fn instanced(geometry: GeometryId, count: u32, instances: u32, buffer: BufferId) -> Self {
        Self {
            geometry,
            count,
            instances,
            instance_buffer: Some(buffer),
        }
    }
}
