//! # Programs — The Renderer's Built-In Shaders
//!
//! Every program the renderer draws with, described once:
//!
//! | Program         | Source              | Used in                        |
//! |-----------------|---------------------|--------------------------------|
//! | `lit`           | `lit.wgsl`          | main pass, objects and models  |
//! | `lit_instanced` | `lit.wgsl`          | main pass, instanced models    |
//! | `shadow`        | `shadow.wgsl`       | directional shadow pass        |
//! | `point_shadow`  | `point_shadow.wgsl` | point shadow pass, per face    |
//! | `gizmo`         | `light.wgsl`        | light gizmos                   |
//! | `skybox`        | `skybox.wgsl`       | skybox, before scene geometry  |
//! | `screen`        | `screen.wgsl`       | presenting the resolved frame  |
//!
//! The uniform lists below are the names the rest of the crate writes
//! (`"dirlight.ambient"`, `"model"`, ...). Their order must match the field
//! order of each shader's `Uniforms` struct: the device packs values in
//! declaration order.
//!
//! Texture units of the lit programs:
//!
//! ```text
//!   0  material.diffuse1     (white when empty)
//!   1  material.specular1    (black when empty)
//!   3  material.emission1    (black when empty)
//!   4  dirlight.shadow_map
//!   5  pointlight.shadow_map
//!   6  spotlight.shadow_map  (reserved, never bound)
//!   7  material samplers a mesh has no texture for (never bound)
//! ```

use crate::error::RenderError;
use crate::gpu::{
    Fallback, FrontFace, GraphicsDevice, ProgramDesc, SlotKind, TextureSlot, UniformDecl,
    UniformKind::{Bool, Float, Int, Mat4, Vec3},
    VertexLayout,
};
use crate::shader::Program;

/// Unit the directional shadow map is bound to.
pub const DIRECTIONAL_SHADOW_UNIT: u32 = 4;
/// Unit the point shadow cubemap is bound to.
pub const POINT_SHADOW_UNIT: u32 = 5;
/// Reserved for spot shadows.
pub const SPOT_SHADOW_UNIT: u32 = 6;
/// Never bound. Material samplers without a texture point here and read
/// their fallback.
pub const EMPTY_MATERIAL_UNIT: u32 = 7;

const LIT_SOURCE: &str = include_str!("shaders/lit.wgsl");

const LIT_UNIFORMS: [UniformDecl; 27] = [
    UniformDecl::new("model", Mat4),
    UniformDecl::new("shadow_projection", Mat4),
    UniformDecl::new("viewPos", Vec3),
    UniformDecl::new("far_plane", Float),
    UniformDecl::new("dirlight.direction", Vec3),
    UniformDecl::new("dirlight.casts_shadow", Bool),
    UniformDecl::new("dirlight.ambient", Vec3),
    UniformDecl::new("dirlight.diffuse", Vec3),
    UniformDecl::new("dirlight.specular", Vec3),
    UniformDecl::new("pointlight.position", Vec3),
    UniformDecl::new("pointlight.casts_shadow", Bool),
    UniformDecl::new("pointlight.ambient", Vec3),
    UniformDecl::new("pointlight.constant", Float),
    UniformDecl::new("pointlight.diffuse", Vec3),
    UniformDecl::new("pointlight.linear", Float),
    UniformDecl::new("pointlight.specular", Vec3),
    UniformDecl::new("pointlight.quadratic", Float),
    UniformDecl::new("spotlight.position", Vec3),
    UniformDecl::new("spotlight.innercutoff", Float),
    UniformDecl::new("spotlight.direction", Vec3),
    UniformDecl::new("spotlight.outercutoff", Float),
    UniformDecl::new("spotlight.ambient", Vec3),
    UniformDecl::new("spotlight.constant", Float),
    UniformDecl::new("spotlight.diffuse", Vec3),
    UniformDecl::new("spotlight.linear", Float),
    UniformDecl::new("spotlight.specular", Vec3),
    UniformDecl::new("spotlight.quadratic", Float),
];

const LIT_TEXTURES: [TextureSlot; 6] = [
    TextureSlot::new("material.diffuse1", 0, SlotKind::Color2d, Fallback::White),
    TextureSlot::new("material.specular1", 1, SlotKind::Color2d, Fallback::Black),
    TextureSlot::new("material.emission1", 3, SlotKind::Color2d, Fallback::Black),
    TextureSlot::new("dirlight.shadow_map", DIRECTIONAL_SHADOW_UNIT, SlotKind::Depth2d, Fallback::White),
    TextureSlot::new("pointlight.shadow_map", POINT_SHADOW_UNIT, SlotKind::DepthCube, Fallback::White),
    TextureSlot::new("spotlight.shadow_map", SPOT_SHADOW_UNIT, SlotKind::Depth2d, Fallback::White),
];

/// Forward-lit program; `instanced` reads the model matrix from the
/// per-instance stream instead of the `model` uniform.
pub fn lit_desc(instanced: bool) -> ProgramDesc {
    ProgramDesc {
        label: if instanced { "lit_instanced" } else { "lit" }.into(),
        source: LIT_SOURCE.into(),
        vertex_entry: if instanced { "vs_instanced" } else { "vs_main" },
        fragment_entry: Some("fs_main"),
        vertex_layout: VertexLayout::Mesh,
        instanced,
        front_face: FrontFace::Ccw,
        uniforms: LIT_UNIFORMS.to_vec(),
        textures: LIT_TEXTURES.to_vec(),
    }
}

pub fn shadow_desc() -> ProgramDesc {
    ProgramDesc {
        label: "shadow".into(),
        source: include_str!("shaders/shadow.wgsl").into(),
        vertex_entry: "vs_main",
        fragment_entry: None,
        vertex_layout: VertexLayout::Mesh,
        instanced: false,
        front_face: FrontFace::Ccw,
        uniforms: vec![
            UniformDecl::new("shadowSpaceMatrix", Mat4),
            UniformDecl::new("model", Mat4),
        ],
        textures: vec![],
    }
}

/// Names of the six point-shadow face matrices, in face order.
pub const SHADOW_MATRIX_NAMES: [&str; 6] = [
    "shadow_matrices[0]",
    "shadow_matrices[1]",
    "shadow_matrices[2]",
    "shadow_matrices[3]",
    "shadow_matrices[4]",
    "shadow_matrices[5]",
];

pub fn point_shadow_desc() -> ProgramDesc {
    let mut uniforms: Vec<UniformDecl> = SHADOW_MATRIX_NAMES
        .iter()
        .map(|&name| UniformDecl::new(name, Mat4))
        .collect();
    uniforms.extend([
        UniformDecl::new("model", Mat4),
        UniformDecl::new("light_pos", Vec3),
        UniformDecl::new("far_plane", Float),
        UniformDecl::new("face", Int),
    ]);
    ProgramDesc {
        label: "point_shadow".into(),
        source: include_str!("shaders/point_shadow.wgsl").into(),
        vertex_entry: "vs_main",
        fragment_entry: Some("fs_main"),
        vertex_layout: VertexLayout::Mesh,
        instanced: false,
        front_face: FrontFace::Cw,
        uniforms,
        textures: vec![],
    }
}

pub fn gizmo_desc() -> ProgramDesc {
    ProgramDesc {
        label: "gizmo".into(),
        source: include_str!("shaders/light.wgsl").into(),
        vertex_entry: "vs_main",
        fragment_entry: Some("fs_main"),
        vertex_layout: VertexLayout::Mesh,
        instanced: false,
        front_face: FrontFace::Ccw,
        uniforms: vec![
            UniformDecl::new("model", Mat4),
            UniformDecl::new("lightColor", Vec3),
        ],
        textures: vec![],
    }
}

pub fn skybox_desc() -> ProgramDesc {
    ProgramDesc {
        label: "skybox".into(),
        source: include_str!("shaders/skybox.wgsl").into(),
        vertex_entry: "vs_main",
        fragment_entry: Some("fs_main"),
        vertex_layout: VertexLayout::Position,
        instanced: false,
        front_face: FrontFace::Ccw,
        uniforms: vec![],
        textures: vec![TextureSlot::new("skybox", 0, SlotKind::ColorCube, Fallback::Black)],
    }
}

pub fn screen_desc() -> ProgramDesc {
    ProgramDesc {
        label: "screen".into(),
        source: include_str!("shaders/screen.wgsl").into(),
        vertex_entry: "vs_main",
        fragment_entry: Some("fs_main"),
        vertex_layout: VertexLayout::ScreenQuad,
        instanced: false,
        front_face: FrontFace::Ccw,
        uniforms: vec![],
        textures: vec![TextureSlot::new("screenTexture", 0, SlotKind::Color2d, Fallback::Black)],
    }
}

/// All programs the renderer owns.
#[derive(Debug)]
pub struct ProgramSet {
    pub lit: Program,
    pub lit_instanced: Program,
    pub shadow: Program,
    pub point_shadow: Program,
    pub gizmo: Program,
    pub skybox: Program,
}

impl ProgramSet {
    pub fn new(dev: &mut dyn GraphicsDevice) -> Result<Self, RenderError> {
        Ok(Self {
            lit: Program::new(dev, &lit_desc(false))?,
            lit_instanced: Program::new(dev, &lit_desc(true))?,
            shadow: Program::new(dev, &shadow_desc())?,
            point_shadow: Program::new(dev, &point_shadow_desc())?,
            gizmo: Program::new(dev, &gizmo_desc())?,
            skybox: Program::new(dev, &skybox_desc())?,
        })
    }

    /// Programs that receive light uniforms.
    pub fn lit_programs(&self) -> [&Program; 2] {
        [&self.lit, &self.lit_instanced]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::UniformLocation;
    use crate::gpu::headless::HeadlessDevice;

    #[test]
    fn lit_uniform_names_are_unique() {
        let desc = lit_desc(false);
        for (i, decl) in desc.uniforms.iter().enumerate() {
            assert_eq!(desc.location_of(&decl.name), UniformLocation(i as i32));
        }
    }

    #[test]
    fn lit_source_declares_every_slot() {
        let desc = lit_desc(false);
        for slot in &desc.textures {
            let field = slot.name.replace('.', "_");
            assert!(desc.source.contains(&format!("var {field}:")), "missing {field}");
        }
    }

    #[test]
    fn lit_source_has_a_field_per_uniform_in_order() {
        let desc = lit_desc(false);
        let mut cursor = 0;
        for decl in &desc.uniforms {
            let field = format!("{}:", decl.name.replace('.', "_"));
            let found = desc.source[cursor..]
                .find(&field)
                .unwrap_or_else(|| panic!("{field} missing or out of order"));
            cursor += found + field.len();
        }
    }

    #[test]
    fn point_shadow_names_face_matrices() {
        let desc = point_shadow_desc();
        assert_eq!(desc.location_of("shadow_matrices[5]"), UniformLocation(5));
        assert_eq!(desc.location_of("model"), UniformLocation(6));
        assert_eq!(desc.front_face, FrontFace::Cw);
    }

    #[test]
    fn program_set_compiles_on_headless() {
        let mut dev = HeadlessDevice::default();
        let set = ProgramSet::new(&mut dev).unwrap();
        assert_ne!(set.lit.id(), set.lit_instanced.id());
        assert_eq!(dev.sampler_unit(set.lit.id(), "pointlight.shadow_map"), Some(POINT_SHADOW_UNIT));
    }
}
