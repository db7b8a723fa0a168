//! # GPU — The Graphics Device Seam
//!
//! Everything above this module (lights, shadow targets, meshes, the
//! renderer) talks to the GPU through one object-safe trait,
//! [`GraphicsDevice`]. Its shape is deliberately close to the classic
//! immediate-mode API the renderer was designed around:
//!
//! ```text
//!   bind_target ─▶ set_viewport ─▶ clear ─▶ set_cull_face / set_depth_test / set_blend
//!        │
//!        ▼
//!   use_program ─▶ set_uniform(location, value) ─▶ bind_texture(unit, id) ─▶ draw
//! ```
//!
//! State set through the trait persists until changed, uniforms live on the
//! program they were written to, and sampler uniforms hold texture *units*.
//! Two implementations exist:
//!
//! - [`wgpu_backend::WgpuDevice`] maps that state model onto wgpu: uniform writes go
//!   into a per-program staging block, each draw snapshots the block into a
//!   dynamic-offset arena, pipelines are cached per state combination, and
//!   passes are recorded then encoded when the frame ends.
//! - [`headless::HeadlessDevice`] has no GPU at all. It records every call,
//!   which is what the renderer's tests assert against.
//!
//! ## Resource Lifetime
//!
//! `create_*` returns plain ids. Owners wrap them in [`Owned`], which queues
//! the id on the device's [`ReleaseQueue`] when dropped; the device destroys
//! queued resources in [`GraphicsDevice::collect_released`].
//!
//! ## Comparison
//!
//! - **glow / raw GL**: Same state model, but ids are bare `u32`s and
//!   deletion is manual.
//! - **wgpu**: Immutable pipelines and explicit bind groups. The wgpu
//!   backend here is the adapter between the two worlds.

pub mod desc;
pub mod handle;
pub mod headless;
pub mod wgpu_backend;

pub use desc::*;
pub use handle::{
    BufferId, FramebufferId, GeometryId, GpuHandle, Owned, ProgramId, ReleaseQueue, Resource,
    TextureId,
};

use crate::error::RenderError;

/// Immediate-mode style access to a GPU.
///
/// All methods are called from the render thread. State-setting methods
/// affect every following draw until changed again.
pub trait GraphicsDevice {
    // ── Resources ──

    /// Queue that [`Owned`] handles push to when dropped.
    fn release_queue(&self) -> ReleaseQueue;

    /// Destroy everything queued for release.
    fn collect_released(&mut self);

    fn create_geometry(&mut self, desc: &GeometryDesc<'_>) -> GeometryId;

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> BufferId;

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]);

    /// Create a texture, optionally with initial texel data
    /// (face-major for cubemaps, see [`TextureDesc::data_len`]).
    fn create_texture(&mut self, desc: &TextureDesc, data: Option<&[u8]>) -> TextureId;

    fn texture_desc(&self, texture: TextureId) -> Option<&TextureDesc>;

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> FramebufferId;

    fn framebuffer_status(&self, framebuffer: FramebufferId) -> FramebufferStatus;

    fn create_program(&mut self, desc: &ProgramDesc) -> Result<ProgramId, RenderError>;

    // ── Frame ──

    fn begin_frame(&mut self) -> Result<(), RenderError>;

    /// Submit everything recorded since `begin_frame`.
    fn end_frame(&mut self);

    /// Size of [`RenderTarget::Screen`].
    fn screen_size(&self) -> (u32, u32);

    // ── State ──

    fn bind_target(&mut self, target: RenderTarget);

    fn set_viewport(&mut self, viewport: Viewport);

    fn clear(&mut self, clear: Clear);

    /// `None` disables culling.
    fn set_cull_face(&mut self, face: Option<Face>);

    fn set_depth_test(&mut self, enabled: bool);

    /// `None` disables blending.
    fn set_blend(&mut self, blend: Option<BlendMode>);

    fn use_program(&mut self, program: ProgramId);

    fn active_program(&self) -> Option<ProgramId>;

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> UniformLocation;

    /// Write a uniform of the *active* program. Ignored for `NOT_FOUND`.
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    /// Bind `texture` to a texture unit. `TextureId::INVALID` unbinds.
    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    fn bind_uniform_buffer(&mut self, binding: u32, buffer: BufferId);

    fn draw(&mut self, call: &DrawCall);

    /// Resolve a multisampled framebuffer's color into a single-sampled one.
    fn resolve(&mut self, source: FramebufferId, destination: FramebufferId);
}
