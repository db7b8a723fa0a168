//! # Renderer — Shadow Passes, Lit Pass, Gizmos
//!
//! The [`Renderer`] owns the scene it draws: one active light per kind, a
//! list of [`RenderObject`]s (plain geometry + one texture), loaded
//! [`Model`]s with their transforms, instanced models and an optional
//! skybox. Each frame runs the same fixed sequence:
//!
//! ```text
//!   Idle
//!    │ run_shadow_pass
//!    ▼
//!   ShadowDirectional   shadow program, 2D depth map, front faces culled
//!    ▼
//!   ShadowPoint         point_shadow program, 6 cube faces, front faces culled
//!    │ run_main_pass
//!    ▼
//!   Main                shadow maps on units 4/5, skybox (no depth test),
//!    │                  objects, models, instanced models, back faces culled
//!    ▼
//!   Gizmo               flat cube at the point and spot light positions
//!    ▼
//!   Idle
//! ```
//!
//! A shadow pass is skipped for lights that do not cast shadows; the phase
//! is still entered so the sequence stays the same every frame. The main
//! pass may also run straight from `Idle` (no shadow pass this frame).
//!
//! ## Shared Matrices
//!
//! View and projection live in one uniform buffer bound at binding 0, with
//! `view` at byte 0 and `projection` at byte 64. Every program reads it;
//! [`Renderer::update_frame_matrices`] rewrites it once per frame.
//!
//! ## Comparison
//!
//! - **LearnOpenGL**: The same forward renderer with a shadow pre-pass and a
//!   `Matrices` uniform block.
//! - **Bevy**: Render graph nodes for shadow and main passes, extracted into
//!   a separate render world instead of owned by one struct.

use std::path::Path;

use glam::{Mat4, Vec3};

use crate::camera::CameraView;
use crate::config::RendererConfig;
use crate::error::RenderError;
use crate::geometry::GeometryBuffer;
use crate::gpu::{
    BufferDesc, BufferId, BufferUsage, Clear, DrawCall, Face, GeometryId, GraphicsDevice, Owned,
    RenderTarget, TextureId, UniformLocation, Viewport,
};
use crate::light::{Light, LightDesc, LightKind};
use crate::model::Model;
use crate::programs::{
    DIRECTIONAL_SHADOW_UNIT, POINT_SHADOW_UNIT, ProgramSet, SHADOW_MATRIX_NAMES,
};
use crate::shader::{CachedLocation, Program};
use crate::shadow::{
    OrthoShadowVolume, PointShadowRange, directional_shadow_matrix, point_shadow_matrices,
};
use crate::texture::load_skybox;
use crate::vertex::{InstanceTransform, MatricesUniform, PROJECTION_OFFSET, VIEW_OFFSET};

/// Uniform buffer binding of the shared view/projection block.
pub const MATRICES_BINDING: u32 = 0;

// ── Frame phases ───────────────────────────────────────────────────────────

/// Where the renderer is inside the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    ShadowDirectional,
    ShadowPoint,
    Main,
    Gizmo,
}

impl FramePhase {
    /// Whether `next` may follow `self`.
    pub fn can_advance_to(self, next: FramePhase) -> bool {
        use FramePhase::*;
        matches!(
            (self, next),
            (Idle, ShadowDirectional)
                | (Idle, Main)
                | (ShadowDirectional, ShadowPoint)
                | (ShadowPoint, Main)
                | (Main, Gizmo)
                | (Gizmo, Idle)
        )
    }
}

// ── Render objects ─────────────────────────────────────────────────────────

/// Plain geometry drawn with a single diffuse texture.
///
/// Geometry and texture are borrowed by id; whoever created them keeps
/// them alive for as long as the object is rendered.
#[derive(Debug, Clone)]
pub struct RenderObject {
    pub geometry: GeometryId,
    pub texture: TextureId,
    pub index_count: u32,
    pub transform: Mat4,
    model_location: CachedLocation,
}

impl RenderObject {
    pub fn new(geometry: GeometryId, texture: TextureId, index_count: u32, transform: Mat4) -> Self {
        Self {
            geometry,
            texture,
            index_count,
            transform,
            model_location: CachedLocation::Unresolved,
        }
    }

    /// Object drawing all of `geometry`.
    pub fn from_geometry(geometry: &GeometryBuffer, texture: TextureId, transform: Mat4) -> Self {
        Self::new(geometry.id(), texture, geometry.element_count(), transform)
    }

    /// Write the transform into `program`'s `model` uniform. The location is
    /// looked up on the first call only.
    pub fn set_model_uniform(&mut self, dev: &mut dyn GraphicsDevice, program: &Program) {
        let location = self.model_location.resolve(dev, program, "model");
        program.set_at(dev, location, self.transform);
    }

    pub fn draw_call(&self) -> DrawCall {
        DrawCall::new(self.geometry, self.index_count)
    }
}

struct InstancedModel {
    model: Model,
    count: u32,
    _stream: Owned<BufferId>,
}

/// Per-draw locations resolved once when the programs are created.
struct DrawLocations {
    lit_model: UniformLocation,
    lit_diffuse: UniformLocation,
    lit_specular: UniformLocation,
    lit_emission: UniformLocation,
    shadow_matrix: UniformLocation,
    shadow_model: UniformLocation,
    point_matrices: [UniformLocation; 6],
    point_model: UniformLocation,
    point_face: UniformLocation,
    gizmo_model: UniformLocation,
    gizmo_color: UniformLocation,
}

impl DrawLocations {
    fn resolve(dev: &mut dyn GraphicsDevice, programs: &ProgramSet) -> Self {
        let lit = &programs.lit;
        let point = &programs.point_shadow;
        Self {
            lit_model: lit.location(dev, "model"),
            lit_diffuse: lit.location(dev, "material.diffuse1"),
            lit_specular: lit.location(dev, "material.specular1"),
            lit_emission: lit.location(dev, "material.emission1"),
            shadow_matrix: programs.shadow.location(dev, "shadowSpaceMatrix"),
            shadow_model: programs.shadow.location(dev, "model"),
            point_matrices: SHADOW_MATRIX_NAMES.map(|name| point.location(dev, name)),
            point_model: point.location(dev, "model"),
            point_face: point.location(dev, "face"),
            gizmo_model: programs.gizmo.location(dev, "model"),
            gizmo_color: programs.gizmo.location(dev, "lightColor"),
        }
    }
}

// ── Renderer ───────────────────────────────────────────────────────────────

pub struct Renderer {
    config: RendererConfig,
    programs: ProgramSet,
    locations: DrawLocations,
    matrices: Owned<BufferId>,
    directional: Option<Light>,
    point: Option<Light>,
    spot: Option<Light>,
    objects: Vec<RenderObject>,
    models: Vec<(Model, Mat4)>,
    instanced: Vec<InstancedModel>,
    skybox: GeometryBuffer,
    skybox_texture: Option<Owned<TextureId>>,
    gizmo: GeometryBuffer,
    phase: FramePhase,
}

impl Renderer {
    /// Compile the built-in programs and allocate the shared matrices block.
    pub fn new(dev: &mut dyn GraphicsDevice, config: RendererConfig) -> Result<Self, RenderError> {
        let programs = ProgramSet::new(dev)?;
        let locations = DrawLocations::resolve(dev, &programs);

        let identity = MatricesUniform {
            view: Mat4::IDENTITY.to_cols_array_2d(),
            projection: Mat4::IDENTITY.to_cols_array_2d(),
        };
        let matrices = dev.create_buffer(&BufferDesc {
            label: "matrices",
            usage: BufferUsage::Uniform,
            contents: bytemuck::bytes_of(&identity),
        });
        dev.bind_uniform_buffer(MATRICES_BINDING, matrices);

        let skybox = GeometryBuffer::skybox(dev);
        let gizmo = GeometryBuffer::cube(dev);
        log::info!("renderer ready ({} MSAA samples)", config.msaa_samples);

        Ok(Self {
            config,
            programs,
            locations,
            matrices: Owned::new(matrices, dev.release_queue()),
            directional: None,
            point: None,
            spot: None,
            objects: Vec::new(),
            models: Vec::new(),
            instanced: Vec::new(),
            skybox,
            skybox_texture: None,
            gizmo,
            phase: FramePhase::Idle,
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn programs(&self) -> &ProgramSet {
        &self.programs
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn matrices_buffer(&self) -> BufferId {
        self.matrices.id()
    }

    fn enter(&mut self, next: FramePhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "frame phase {:?} cannot follow {:?}",
            next,
            self.phase
        );
        log::trace!("frame phase {:?} -> {next:?}", self.phase);
        self.phase = next;
    }

    // ── Lights ──

    /// Directional light sized by the config's shadow map resolution.
    pub fn create_directional_light(&self, dev: &mut dyn GraphicsDevice, desc: LightDesc) -> Light {
        Light::directional(
            dev,
            LightDesc {
                shadow_size: desc.shadow_size.or(Some(self.config.directional_shadow_size)),
                ..desc
            },
        )
    }

    /// Point light sized by the config's cube face resolution.
    pub fn create_point_light(&self, dev: &mut dyn GraphicsDevice, desc: LightDesc) -> Light {
        Light::point(
            dev,
            LightDesc {
                shadow_size: desc.shadow_size.or(Some(self.config.point_shadow_size)),
                ..desc
            },
        )
    }

    /// Make `light` the active directional light, returning the previous one.
    pub fn set_directional_light(&mut self, light: Light) -> Option<Light> {
        debug_assert!(matches!(light.kind(), LightKind::Directional), "not a directional light");
        self.directional.replace(light)
    }

    pub fn set_point_light(&mut self, light: Light) -> Option<Light> {
        debug_assert!(matches!(light.kind(), LightKind::Point { .. }), "not a point light");
        self.point.replace(light)
    }

    pub fn set_spot_light(&mut self, light: Light) -> Option<Light> {
        debug_assert!(matches!(light.kind(), LightKind::Spot { .. }), "not a spot light");
        self.spot.replace(light)
    }

    pub fn directional_light(&self) -> Option<&Light> {
        self.directional.as_ref()
    }

    pub fn directional_light_mut(&mut self) -> Option<&mut Light> {
        self.directional.as_mut()
    }

    pub fn point_light(&self) -> Option<&Light> {
        self.point.as_ref()
    }

    pub fn point_light_mut(&mut self) -> Option<&mut Light> {
        self.point.as_mut()
    }

    pub fn spot_light(&self) -> Option<&Light> {
        self.spot.as_ref()
    }

    pub fn spot_light_mut(&mut self) -> Option<&mut Light> {
        self.spot.as_mut()
    }

    /// The three light slots with their uniform prefixes.
    fn light_slots(&self) -> [(&'static str, Option<&Light>); 3] {
        [
            ("dirlight", self.directional.as_ref()),
            ("pointlight", self.point.as_ref()),
            ("spotlight", self.spot.as_ref()),
        ]
    }

    // ── Scene ──

    pub fn add_render_object(&mut self, object: RenderObject) {
        self.objects.push(object);
    }

    pub fn render_objects(&self) -> &[RenderObject] {
        &self.objects
    }

    pub fn render_objects_mut(&mut self) -> &mut [RenderObject] {
        &mut self.objects
    }

    pub fn add_model(&mut self, model: Model, transform: Mat4) {
        log::debug!("added model '{}' ({} meshes)", model.label(), model.meshes().len());
        self.models.push((model, transform));
    }

    pub fn models(&self) -> &[(Model, Mat4)] {
        &self.models
    }

    /// Set the transform of the model at `index` (insertion order).
    pub fn set_model_transform(&mut self, index: usize, transform: Mat4) {
        match self.models.get_mut(index) {
            Some((_, t)) => *t = transform,
            None => log::warn!("no model at index {index}"),
        }
    }

    /// Draw `model` once per transform with the instanced lit program.
    ///
    /// Instanced models are lit and shadowed but do not cast shadows.
    pub fn add_instanced_model(&mut self, dev: &mut dyn GraphicsDevice, mut model: Model, transforms: &[Mat4]) {
        if transforms.is_empty() {
            log::warn!("instanced model '{}' has no instances, not added", model.label());
            return;
        }
        let instances: Vec<InstanceTransform> = transforms.iter().map(|&m| m.into()).collect();
        let stream = dev.create_buffer(&BufferDesc {
            label: "instance transforms",
            usage: BufferUsage::Instance,
            contents: bytemuck::cast_slice(&instances),
        });
        model.set_instance_stream(stream);
        log::debug!("added model '{}' with {} instances", model.label(), instances.len());
        self.instanced.push(InstancedModel {
            model,
            count: instances.len() as u32,
            _stream: Owned::new(stream, dev.release_queue()),
        });
    }

    /// Load a skybox from `<dir>/{right,left,top,bottom,front,back}.<extension>`.
    ///
    /// A failed load is logged and leaves the current skybox in place.
    pub fn set_skybox(&mut self, dev: &mut dyn GraphicsDevice, dir: impl AsRef<Path>, extension: &str) {
        let texture = load_skybox(dev, dir, extension, true);
        if texture.is_valid() {
            self.set_skybox_texture(Owned::new(texture, dev.release_queue()));
        }
    }

    /// Use an already loaded cubemap as the skybox.
    pub fn set_skybox_texture(&mut self, texture: Owned<TextureId>) {
        self.skybox_texture = Some(texture);
    }

    pub fn skybox_texture(&self) -> Option<TextureId> {
        self.skybox_texture.as_ref().map(Owned::id)
    }

    // ── Per-frame uniforms ──

    /// Rewrite the shared view/projection block.
    pub fn update_frame_matrices(&self, dev: &mut dyn GraphicsDevice, view: Mat4, projection: Mat4) {
        let buffer = self.matrices.id();
        dev.write_buffer(buffer, VIEW_OFFSET, bytemuck::cast_slice(&view.to_cols_array()));
        dev.write_buffer(
            buffer,
            PROJECTION_OFFSET,
            bytemuck::cast_slice(&projection.to_cols_array()),
        );
    }

    /// Publish every active light into the lit programs under `dirlight`,
    /// `pointlight` and `spotlight`.
    pub fn update_light_uniforms(&self, dev: &mut dyn GraphicsDevice) {
        for program in self.programs.lit_programs() {
            program.use_program(dev);
            for (prefix, light) in self.light_slots() {
                debug_assert!(light.is_some(), "no active {prefix} light");
                if let Some(light) = light {
                    light.publish(dev, program, prefix);
                }
            }
        }
    }

    fn ortho_volume(&self) -> OrthoShadowVolume {
        OrthoShadowVolume {
            extent: self.config.shadow_extent,
            near: self.config.shadow_near,
            far: self.config.shadow_far,
        }
    }

    fn point_range(&self) -> PointShadowRange {
        PointShadowRange {
            near: self.config.point_shadow_near,
            far: self.config.point_shadow_far,
        }
    }

    /// World → light clip space of the directional light, if it casts shadows.
    pub fn directional_shadow_matrix(&self) -> Option<Mat4> {
        let light = self.directional.as_ref().filter(|l| l.casts_shadow())?;
        Some(directional_shadow_matrix(light.position, light.direction, self.ortho_volume()))
    }

    // ── Shadow pass ──

    /// Render depth for every shadow-casting light, then rebind the screen.
    pub fn run_shadow_pass(&mut self, dev: &mut dyn GraphicsDevice) {
        self.enter(FramePhase::ShadowDirectional);
        self.draw_directional_shadow(dev);
        self.enter(FramePhase::ShadowPoint);
        self.draw_point_shadow(dev);
        dev.bind_target(RenderTarget::Screen);
    }

    fn draw_directional_shadow(&self, dev: &mut dyn GraphicsDevice) {
        let Some(light) = self.directional.as_ref() else {
            return;
        };
        let Some(target) = light.shadow() else {
            return;
        };
        dev.set_cull_face(Some(Face::Front));
        dev.set_depth_test(true);
        dev.set_viewport(target.viewport());
        dev.bind_target(RenderTarget::Framebuffer(target.framebuffer()));
        dev.clear(Clear::depth());

        let program = &self.programs.shadow;
        program.use_program(dev);
        let matrix = directional_shadow_matrix(light.position, light.direction, self.ortho_volume());
        program.set_at(dev, self.locations.shadow_matrix, matrix);
        self.draw_casters(dev, program, self.locations.shadow_model);
    }

    fn draw_point_shadow(&self, dev: &mut dyn GraphicsDevice) {
        let Some(light) = self.point.as_ref() else {
            return;
        };
        let Some(target) = light.shadow() else {
            return;
        };
        dev.set_cull_face(Some(Face::Front));
        dev.set_depth_test(true);
        dev.set_viewport(target.viewport());

        let program = &self.programs.point_shadow;
        program.use_program(dev);
        let range = self.point_range();
        let matrices = point_shadow_matrices(light.position, range);
        for (&location, matrix) in self.locations.point_matrices.iter().zip(matrices) {
            program.set_at(dev, location, matrix);
        }
        program.set(dev, "light_pos", light.position);
        program.set(dev, "far_plane", range.far);

        for face in 0..6u32 {
            dev.bind_target(RenderTarget::Face(target.framebuffer(), face));
            dev.clear(Clear::depth());
            program.set_at(dev, self.locations.point_face, face as i32);
            self.draw_casters(dev, program, self.locations.point_model);
        }
    }

    /// Geometry of every object and model, with `model_location` set per draw.
    fn draw_casters(&self, dev: &mut dyn GraphicsDevice, program: &Program, model_location: UniformLocation) {
        for object in &self.objects {
            program.set_at(dev, model_location, object.transform);
            dev.draw(&object.draw_call());
        }
        for (model, transform) in &self.models {
            program.set_at(dev, model_location, *transform);
            model.draw_depth(dev);
        }
    }

    // ── Main pass ──

    /// Draw the lit scene, skybox and light gizmos into `target`.
    ///
    /// `target` is expected to match the screen size; the viewport is reset
    /// to it after the shadow pass shrank it.
    pub fn run_main_pass(&mut self, dev: &mut dyn GraphicsDevice, target: RenderTarget, camera_position: Vec3) {
        self.enter(FramePhase::Main);

        dev.bind_target(target);
        let (width, height) = dev.screen_size();
        dev.set_viewport(Viewport::sized(width, height));
        dev.set_cull_face(Some(Face::Back));
        dev.set_depth_test(true);
        dev.set_blend(None);

        for program in self.programs.lit_programs() {
            program.use_program(dev);
            self.set_frame_uniforms(dev, program, camera_position);
        }
        self.bind_shadow_maps(dev);

        self.draw_skybox(dev);
        self.draw_objects(dev);
        self.draw_models(dev);

        self.enter(FramePhase::Gizmo);
        self.draw_gizmos(dev);
        self.enter(FramePhase::Idle);
    }

    fn set_frame_uniforms(&self, dev: &mut dyn GraphicsDevice, program: &Program, camera_position: Vec3) {
        program.set(dev, "viewPos", camera_position);
        program.set(dev, "far_plane", self.config.point_shadow_far);
        if let Some(matrix) = self.directional_shadow_matrix() {
            program.set(dev, "shadow_projection", matrix);
            program.set(dev, "dirlight.shadow_map", DIRECTIONAL_SHADOW_UNIT as i32);
        }
        if self.point.as_ref().is_some_and(Light::casts_shadow) {
            program.set(dev, "pointlight.shadow_map", POINT_SHADOW_UNIT as i32);
        }
    }

    /// Depth maps of casting lights on their units; other units are cleared
    /// so a stale map from a replaced light is never sampled.
    fn bind_shadow_maps(&self, dev: &mut dyn GraphicsDevice) {
        let depth = |light: Option<&Light>| {
            light
                .and_then(Light::shadow)
                .map_or(TextureId::INVALID, |target| target.depth_texture())
        };
        dev.bind_texture(DIRECTIONAL_SHADOW_UNIT, depth(self.directional.as_ref()));
        dev.bind_texture(POINT_SHADOW_UNIT, depth(self.point.as_ref()));
    }

    fn draw_skybox(&self, dev: &mut dyn GraphicsDevice) {
        let Some(texture) = &self.skybox_texture else {
            return;
        };
        dev.set_depth_test(false);
        self.programs.skybox.use_program(dev);
        dev.bind_texture(0, texture.id());
        self.skybox.draw(dev);
        dev.set_depth_test(true);
    }

    fn draw_objects(&mut self, dev: &mut dyn GraphicsDevice) {
        let program = &self.programs.lit;
        program.use_program(dev);

        // Model draws move material samplers around; objects only use diffuse1.
        let loc = &self.locations;
        program.set_at(dev, loc.lit_diffuse, 0);
        program.set_at(dev, loc.lit_specular, 1);
        program.set_at(dev, loc.lit_emission, 3);
        dev.bind_texture(1, TextureId::INVALID);
        dev.bind_texture(3, TextureId::INVALID);

        for object in &mut self.objects {
            object.set_model_uniform(dev, program);
            dev.bind_texture(0, object.texture);
            log::trace!("draw {} ({} indices)", object.geometry, object.index_count);
            dev.draw(&object.draw_call());
        }
    }

    fn draw_models(&mut self, dev: &mut dyn GraphicsDevice) {
        let program = &self.programs.lit;
        program.use_program(dev);
        for (model, transform) in &mut self.models {
            program.set_at(dev, self.locations.lit_model, *transform);
            model.draw(dev, program);
        }

        if self.instanced.is_empty() {
            return;
        }
        let program = &self.programs.lit_instanced;
        program.use_program(dev);
        for instanced in &mut self.instanced {
            instanced.model.draw_instanced(dev, program, instanced.count);
        }
    }

    fn draw_gizmos(&self, dev: &mut dyn GraphicsDevice) {
        let program = &self.programs.gizmo;
        program.use_program(dev);
        for light in [self.point.as_ref(), self.spot.as_ref()].into_iter().flatten() {
            program.set_at(dev, self.locations.gizmo_color, light.color);
            program.set_at(dev, self.locations.gizmo_model, Mat4::from_translation(light.position));
            self.gizmo.draw(dev);
        }
    }

    /// Matrices, light uniforms, shadow pass and main pass for one frame.
    ///
    /// Target setup (clearing, multisample resolve, presenting) is left to
    /// the caller; see [`MainTarget`](crate::present::MainTarget).
    pub fn render_frame(&mut self, dev: &mut dyn GraphicsDevice, camera: &dyn CameraView, target: RenderTarget) {
        let (width, height) = dev.screen_size();
        let aspect = width as f32 / height.max(1) as f32;
        self.update_frame_matrices(dev, camera.view(), camera.projection(aspect));
        self.update_light_uniforms(dev);
        self.run_shadow_pass(dev);
        self.run_main_pass(dev, target, camera.position());
    }
}
