//! # Model — Meshes with Material Textures
//!
//! A [`Model`] is a list of [`Mesh`]es loaded from one file. Each mesh owns
//! its geometry and refers to the textures its material uses.
//!
//! ## Loading
//!
//! ```text
//!   file ──MeshImporter──▶ ImportedScene ──Model::from_scene──▶ Model
//!                          (plain data)      walk nodes: own meshes first,
//!                                            then children, depth first
//! ```
//!
//! Textures are deduplicated by path across the whole model: the first
//! mesh that references `wood.png` loads it, every later reference shares
//! the same GPU texture. Each reference keeps its own [`TextureKind`], so
//! one image can be the diffuse map of one mesh and the specular map of
//! another. Paths are resolved relative to the model file's directory and
//! loaded as sRGB.
//!
//! ## Sampler Binding
//!
//! Sampler names are derived from the texture list with a counter per kind:
//!
//! ```text
//!   textures: [diffuse, diffuse, specular, emission]
//!   samplers: material.diffuse1, material.diffuse2, material.specular1, material.emission1
//!   units:    0                  1                  2                   3
//! ```
//!
//! Locations are looked up on the first draw and cached:
//!
//! ```text
//!   Unresolved ──first draw──▶ Resolved { program, locations }
//! ```
//!
//! Every draw then writes sampler *i* = unit *i*, binds texture *i* to unit
//! *i* and enables alpha blending. Names the program doesn't declare
//! resolve to `NOT_FOUND`; their texture is still bound.
//!
//! Units from [`MATERIAL_UNITS`] up belong to shadow maps, so a mesh binds
//! at most that many textures.

pub mod import;

#[cfg(feature = "gltf")]
pub mod gltf;

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use std::time::Instant;

pub use import::{
    EmbeddedImage, ImportedMaterial, ImportedMesh, ImportedNode, ImportedScene, MeshImporter,
    TextureKind, TextureRef, TextureSource,
};

#[cfg(feature = "gltf")]
pub use self::gltf::GltfImporter;

use crate::error::RenderError;
use crate::geometry::GeometryBuffer;
use crate::gpu::{
    BlendMode, BufferId, DrawCall, GraphicsDevice, Owned, ProgramId, TextureId, UniformLocation,
};
use crate::programs::EMPTY_MATERIAL_UNIT;
use crate::shader::Program;
use crate::texture::{DecodedImage, PixelFormatTable, load_texture, upload_image};
use crate::vertex::MeshVertex;

/// Texture units available to material textures.
pub const MATERIAL_UNITS: usize = 4;

/// A texture referenced by a mesh. Shared between meshes of the same model.
#[derive(Debug, Clone)]
pub struct MeshTexture {
    texture: Rc<Owned<TextureId>>,
    pub kind: TextureKind,
    /// Path (or embedded image key) the texture was loaded from.
    pub key: String,
}

impl MeshTexture {
    pub fn id(&self) -> TextureId {
        self.texture.id()
    }
}

/// Sampler locations of one program, resolved on the mesh's first draw with it.
#[derive(Debug, Clone, PartialEq)]
struct SamplerBindings {
    program: ProgramId,
    /// One per mesh texture, in unit order.
    locations: Vec<UniformLocation>,
    /// `material.<kind>1` for the kinds this mesh has no texture of.
    missing: Vec<UniformLocation>,
}

#[derive(Debug)]
pub struct Mesh {
    geometry: GeometryBuffer,
    textures: Vec<MeshTexture>,
    bindings: Vec<SamplerBindings>,
    instance_buffer: Option<BufferId>,
}

impl Mesh {
    pub fn new(geometry: GeometryBuffer, mut textures: Vec<MeshTexture>) -> Self {
        if textures.len() > MATERIAL_UNITS {
            log::warn!(
                "mesh has {} textures, only the first {MATERIAL_UNITS} are bound",
                textures.len()
            );
            textures.truncate(MATERIAL_UNITS);
        }
        Self {
            geometry,
            textures,
            bindings: Vec::new(),
            instance_buffer: None,
        }
    }

    pub fn geometry(&self) -> &GeometryBuffer {
        &self.geometry
    }

    pub fn textures(&self) -> &[MeshTexture] {
        &self.textures
    }

    /// `material.<kind><n>` for each texture, `n` counting per kind from 1.
    pub fn sampler_names(&self) -> Vec<String> {
        let mut counters: HashMap<TextureKind, u32> = HashMap::new();
        self.textures
            .iter()
            .map(|t| {
                let n = counters.entry(t.kind).or_insert(0);
                *n += 1;
                format!("material.{}{n}", t.kind.uniform_stem())
            })
            .collect()
    }

    pub fn is_resolved(&self) -> bool {
        !self.bindings.is_empty()
    }

    /// Per-instance transform stream read by [`Mesh::draw_instanced`].
    pub fn set_instance_stream(&mut self, buffer: BufferId) {
        self.instance_buffer = Some(buffer);
    }

    fn resolve_samplers(&mut self, dev: &mut dyn GraphicsDevice, program: &Program) -> usize {
        if let Some(i) = self.bindings.iter().position(|b| b.program == program.id()) {
            return i;
        }
        let mut lookup = |name: &str| {
            let location = program.location(dev, name);
            log::debug!("found {name} at {location:?} in '{}'", program.label());
            location
        };
        let locations = self.sampler_names().iter().map(|name| lookup(name.as_str())).collect();
        let missing = TextureKind::ALL
            .iter()
            .filter(|kind| !self.textures.iter().any(|t| t.kind == **kind))
            .map(|kind| lookup(format!("material.{}1", kind.uniform_stem()).as_str()))
            .filter(|location| location.is_found())
            .collect();
        self.bindings.push(SamplerBindings {
            program: program.id(),
            locations,
            missing,
        });
        self.bindings.len() - 1
    }

    /// Texture `i` goes to unit `i`. Material units past the mesh's textures
    /// are unbound and samplers of absent kinds read [`EMPTY_MATERIAL_UNIT`],
    /// so nothing left over from the previous draw is sampled.
    fn bind_textures(&mut self, dev: &mut dyn GraphicsDevice, program: &Program) {
        let i = self.resolve_samplers(dev, program);
        let bindings = &self.bindings[i];
        dev.set_blend(Some(BlendMode::Alpha));
        for (unit, (texture, &location)) in self.textures.iter().zip(&bindings.locations).enumerate() {
            program.set_at(dev, location, unit as i32);
            dev.bind_texture(unit as u32, texture.id());
        }
        for unit in self.textures.len()..MATERIAL_UNITS {
            dev.bind_texture(unit as u32, TextureId::INVALID);
        }
        for &location in &bindings.missing {
            program.set_at(dev, location, EMPTY_MATERIAL_UNIT as i32);
        }
    }

    /// Bind material textures and draw. `program` must be active.
    pub fn draw(&mut self, dev: &mut dyn GraphicsDevice, program: &Program) {
        self.bind_textures(dev, program);
        dev.draw(&self.geometry.draw_call());
    }

    /// Like [`Mesh::draw`], `instances` times, reading transforms from the
    /// instance stream.
    pub fn draw_instanced(&mut self, dev: &mut dyn GraphicsDevice, program: &Program, instances: u32) {
        let Some(buffer) = self.instance_buffer else {
            log::error!("instanced draw of a mesh without an instance stream");
            return;
        };
        self.bind_textures(dev, program);
        let geometry = &self.geometry;
        dev.draw(&DrawCall::instanced(
            geometry.id(),
            geometry.element_count(),
            instances,
            buffer,
        ));
    }

    /// Geometry only, for depth passes.
    pub fn draw_depth(&self, dev: &mut dyn GraphicsDevice) {
        self.geometry.draw(dev);
    }
}

#[derive(Debug, Default)]
pub struct Model {
    label: String,
    meshes: Vec<Mesh>,
}

impl Model {
    /// Import and upload `path`. Failures are logged and give an empty model.
    pub fn load(dev: &mut dyn GraphicsDevice, importer: &dyn MeshImporter, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load(dev, importer, path) {
            Ok(model) => model,
            Err(e) => {
                log::error!("{e}");
                Self {
                    label: path.display().to_string(),
                    meshes: Vec::new(),
                }
            }
        }
    }

    pub fn try_load(
        dev: &mut dyn GraphicsDevice,
        importer: &dyn MeshImporter,
        path: impl AsRef<Path>,
    ) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let started = Instant::now();
        let scene = importer.import(path)?;
        let directory = path.parent().unwrap_or_else(|| Path::new(""));
        let model = Self::from_scene(dev, &scene, directory, &path.display().to_string());
        log::info!(
            "loaded model {} ({} meshes) in {:?}",
            path.display(),
            model.meshes.len(),
            started.elapsed()
        );
        Ok(model)
    }

    /// Upload an imported scene. File textures are looked up in `directory`.
    pub fn from_scene(dev: &mut dyn GraphicsDevice, scene: &ImportedScene, directory: &Path, label: &str) -> Self {
        let mut loaded: HashMap<&str, Rc<Owned<TextureId>>> = HashMap::new();
        let mut meshes = Vec::new();

        for index in scene.mesh_order() {
            let Some(imported) = scene.meshes.get(index) else {
                log::warn!("{label}: node refers to missing mesh {index}");
                continue;
            };
            let geometry = GeometryBuffer::from_mesh(
                dev,
                &format!("{label} mesh {index}"),
                &mesh_vertices(imported),
                &imported.indices,
            );

            let textures = scene
                .textures_of(imported)
                .into_iter()
                .map(|reference| {
                    let texture = match loaded.get(reference.key.as_str()) {
                        Some(shared) => Rc::clone(shared),
                        None => {
                            let id = load_reference(dev, directory, reference);
                            let shared = Rc::new(Owned::new(id, dev.release_queue()));
                            loaded.insert(&reference.key, Rc::clone(&shared));
                            shared
                        }
                    };
                    MeshTexture {
                        texture,
                        kind: reference.kind,
                        key: reference.key.clone(),
                    }
                })
                .collect();

            meshes.push(Mesh::new(geometry, textures));
        }

        log::debug!("{label}: {} meshes, {} unique textures", meshes.len(), loaded.len());
        Self {
            label: label.to_owned(),
            meshes,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Draw every mesh with `program`, which must be active.
    pub fn draw(&mut self, dev: &mut dyn GraphicsDevice, program: &Program) {
        for mesh in &mut self.meshes {
            mesh.draw(dev, program);
        }
    }

    pub fn draw_instanced(&mut self, dev: &mut dyn GraphicsDevice, program: &Program, instances: u32) {
        for mesh in &mut self.meshes {
            mesh.draw_instanced(dev, program, instances);
        }
    }

    /// Point every mesh at the same per-instance transform stream.
    pub fn set_instance_stream(&mut self, buffer: BufferId) {
        for mesh in &mut self.meshes {
            mesh.set_instance_stream(buffer);
        }
    }

    pub fn draw_depth(&self, dev: &mut dyn GraphicsDevice) {
        for mesh in &self.meshes {
            mesh.draw_depth(dev);
        }
    }
}

fn mesh_vertices(mesh: &ImportedMesh) -> Vec<MeshVertex> {
    mesh.positions
        .iter()
        .enumerate()
        .map(|(i, &position)| MeshVertex {
            position,
            normal: mesh.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
            uv: mesh.uvs.get(i).copied().unwrap_or([0.0, 0.0]),
        })
        .collect()
}

fn load_reference(dev: &mut dyn GraphicsDevice, directory: &Path, reference: &TextureRef) -> TextureId {
    match &reference.source {
        TextureSource::File(path) => load_texture(dev, directory.join(path), true),
        TextureSource::Embedded(image) => {
            let Some(format) = PixelFormatTable::lookup(image.channels, true) else {
                log::error!("{}: unsupported channel count {}", reference.key, image.channels);
                return TextureId::INVALID;
            };
            // Flip to bottom row first, like file textures.
            let row = image.width as usize * image.channels as usize;
            let data = if row == 0 {
                Vec::new()
            } else {
                image.pixels.chunks_exact(row).rev().flatten().copied().collect()
            };
            upload_image(
                dev,
                &reference.key,
                &DecodedImage {
                    width: image.width,
                    height: image.height,
                    format,
                    data,
                },
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::{Command, HeadlessDevice, RecordedDraw};
    use crate::gpu::Resource;
    use crate::programs::ProgramSet;
    use std::path::PathBuf;

    struct StaticImporter(ImportedScene);

    impl MeshImporter for StaticImporter {
        fn import(&self, _path: &Path) -> Result<ImportedScene, RenderError> {
            Ok(self.0.clone())
        }
    }

    struct FailingImporter;

    impl MeshImporter for FailingImporter {
        fn import(&self, path: &Path) -> Result<ImportedScene, RenderError> {
            Err(RenderError::Import {
                path: path.to_path_buf(),
                message: "broken".into(),
            })
        }
    }

    fn triangle(vertex_count: usize, material: Option<usize>) -> ImportedMesh {
        ImportedMesh {
            positions: vec![[0.0; 3]; vertex_count],
            normals: vec![[0.0, 1.0, 0.0]; vertex_count],
            uvs: vec![],
            indices: (0..vertex_count as u32).collect(),
            material,
        }
    }

    fn embedded(kind: TextureKind, key: &str) -> TextureRef {
        TextureRef {
            kind,
            key: key.into(),
            source: TextureSource::Embedded(EmbeddedImage {
                width: 1,
                height: 1,
                channels: 4,
                pixels: vec![255, 255, 255, 255],
            }),
        }
    }

    fn write_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 100, 50, 255]))
            .save(&path)
            .unwrap();
        path
    }

    fn shared_texture_scene() -> ImportedScene {
        ImportedScene {
            root: ImportedNode {
                name: None,
                meshes: vec![0],
                children: vec![ImportedNode {
                    meshes: vec![1],
                    ..Default::default()
                }],
            },
            meshes: vec![triangle(3, Some(0)), triangle(6, Some(1))],
            materials: vec![
                ImportedMaterial {
                    textures: vec![
                        TextureRef::file(TextureKind::Diffuse, "wood.png"),
                        TextureRef::file(TextureKind::Specular, "wood_spec.png"),
                    ],
                },
                ImportedMaterial {
                    textures: vec![TextureRef::file(TextureKind::Diffuse, "wood.png")],
                },
            ],
        }
    }

    #[test]
    fn textures_shared_by_path_upload_once() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "wood.png");
        write_png(dir.path(), "wood_spec.png");

        let mut dev = HeadlessDevice::default();
        let importer = StaticImporter(shared_texture_scene());
        let model = Model::load(&mut dev, &importer, dir.path().join("crate.obj"));

        assert_eq!(model.meshes().len(), 2);
        assert_eq!(dev.texture_uploads(), 2, "wood.png must be uploaded once");
        let first = model.meshes()[0].textures()[0].id();
        let second = model.meshes()[1].textures()[0].id();
        assert!(first.is_valid());
        assert_eq!(first, second);
    }

    #[test]
    fn shared_texture_is_released_once_with_the_model() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "wood.png");
        write_png(dir.path(), "wood_spec.png");
        let mut dev = HeadlessDevice::default();
        let model = Model::load(
            &mut dev,
            &StaticImporter(shared_texture_scene()),
            dir.path().join("crate.obj"),
        );
        let wood = model.meshes()[0].textures()[0].id();

        drop(model);
        dev.collect_released();
        let released = dev
            .destroyed()
            .iter()
            .filter(|r| **r == Resource::Texture(wood))
            .count();
        assert_eq!(released, 1);
    }

    #[test]
    fn meshes_follow_node_order() {
        let scene = ImportedScene {
            root: ImportedNode {
                name: None,
                meshes: vec![2],
                children: vec![
                    ImportedNode {
                        meshes: vec![0],
                        ..Default::default()
                    },
                    ImportedNode {
                        meshes: vec![1],
                        ..Default::default()
                    },
                ],
            },
            meshes: vec![triangle(3, None), triangle(6, None), triangle(9, None)],
            materials: vec![],
        };
        let mut dev = HeadlessDevice::default();
        let model = Model::from_scene(&mut dev, &scene, Path::new("."), "ordered");
        let counts: Vec<u32> = model.meshes().iter().map(|m| m.geometry().vertex_count()).collect();
        assert_eq!(counts, vec![9, 3, 6]);
    }

    #[test]
    fn samplers_resolve_on_first_draw_only() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "wood.png");
        write_png(dir.path(), "wood_spec.png");
        let mut dev = HeadlessDevice::default();
        let programs = ProgramSet::new(&mut dev).unwrap();
        let mut model = Model::load(
            &mut dev,
            &StaticImporter(shared_texture_scene()),
            dir.path().join("crate.obj"),
        );

        programs.lit.use_program(&mut dev);
        model.draw(&mut dev, &programs.lit);
        assert_eq!(dev.location_queries_for("material.diffuse1"), 2, "one per mesh");
        assert_eq!(
            dev.location_queries_for("material.specular1"),
            2,
            "bound by the first mesh, pointed away by the second"
        );

        dev.clear_commands();
        model.draw(&mut dev, &programs.lit);
        model.draw(&mut dev, &programs.lit);
        assert_eq!(dev.location_queries_for("material.diffuse1"), 2);
        assert_eq!(dev.location_queries_for("material.specular1"), 2);
        assert!(model.meshes().iter().all(Mesh::is_resolved));

        let wood = model.meshes()[0].textures()[0].id();
        let rebinds = dev
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::BindTexture { unit: 0, texture } if *texture == wood))
            .count();
        assert_eq!(rebinds, 4, "every later draw binds its textures again");
    }

    #[test]
    fn sampler_locations_are_kept_per_program() {
        let mut dev = HeadlessDevice::default();
        let programs = ProgramSet::new(&mut dev).unwrap();
        let scene = ImportedScene {
            root: ImportedNode {
                meshes: vec![0],
                ..Default::default()
            },
            meshes: vec![triangle(3, Some(0))],
            materials: vec![ImportedMaterial {
                textures: vec![embedded(TextureKind::Diffuse, "#image0")],
            }],
        };
        let mut model = Model::from_scene(&mut dev, &scene, Path::new("."), "shared");
        let buffer = dev.create_buffer(&crate::gpu::BufferDesc {
            label: "instances",
            usage: crate::gpu::BufferUsage::Instance,
            contents: &[0; 64],
        });
        model.set_instance_stream(buffer);

        for _ in 0..2 {
            programs.lit.use_program(&mut dev);
            model.draw(&mut dev, &programs.lit);
            programs.lit_instanced.use_program(&mut dev);
            model.draw_instanced(&mut dev, &programs.lit_instanced, 1);
        }
        assert_eq!(dev.location_queries_for("material.diffuse1"), 2, "one per program");
    }

    #[test]
    fn absent_material_kinds_never_sample_a_previous_texture() {
        let mut dev = HeadlessDevice::default();
        let programs = ProgramSet::new(&mut dev).unwrap();
        let scene = ImportedScene {
            root: ImportedNode {
                meshes: vec![0, 1],
                ..Default::default()
            },
            meshes: vec![triangle(3, Some(0)), triangle(3, Some(1))],
            materials: vec![
                ImportedMaterial {
                    textures: vec![
                        embedded(TextureKind::Diffuse, "#image0"),
                        embedded(TextureKind::Normal, "#image1"),
                    ],
                },
                ImportedMaterial {
                    textures: vec![embedded(TextureKind::Diffuse, "#image2")],
                },
            ],
        };
        let mut model = Model::from_scene(&mut dev, &scene, Path::new("."), "normal mapped");
        let normal = model.meshes()[0].textures()[1].id();
        assert!(normal.is_valid());

        programs.lit.use_program(&mut dev);
        model.draw(&mut dev, &programs.lit);

        let slot = |draw: &RecordedDraw, name: &str| {
            draw.slots
                .iter()
                .find(|(slot, _)| slot == name)
                .map(|(_, texture)| *texture)
        };
        assert_eq!(dev.draws().count(), 2);
        for (i, draw) in dev.draws().enumerate() {
            assert_eq!(
                slot(draw, "material.diffuse1"),
                Some(model.meshes()[i].textures()[0].id())
            );
            assert_eq!(slot(draw, "material.specular1"), Some(TextureId::INVALID), "mesh {i}");
            assert_eq!(slot(draw, "material.emission1"), Some(TextureId::INVALID), "mesh {i}");
        }
        assert_eq!(dev.bound_texture(1), TextureId::INVALID, "second mesh unbinds the normal map");
        assert_eq!(
            dev.sampler_unit(programs.lit.id(), "material.specular1"),
            Some(EMPTY_MATERIAL_UNIT)
        );
    }

    #[test]
    fn draw_binds_texture_i_to_unit_i_with_blending() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "wood.png");
        write_png(dir.path(), "wood_spec.png");
        let mut dev = HeadlessDevice::default();
        let programs = ProgramSet::new(&mut dev).unwrap();
        let mut model = Model::load(
            &mut dev,
            &StaticImporter(shared_texture_scene()),
            dir.path().join("crate.obj"),
        );
        programs.lit.use_program(&mut dev);
        model.meshes[0].draw(&mut dev, &programs.lit);

        let textures = model.meshes()[0].textures();
        assert_eq!(dev.bound_texture(0), textures[0].id());
        assert_eq!(dev.bound_texture(1), textures[1].id());
        assert_eq!(dev.sampler_unit(programs.lit.id(), "material.specular1"), Some(1));
        let draw = dev.draws().last().unwrap();
        assert_eq!(draw.blend, Some(BlendMode::Alpha));
        assert_eq!(draw.count, 3);
    }

    #[test]
    fn sampler_names_count_per_kind() {
        let mut dev = HeadlessDevice::default();
        let geometry = GeometryBuffer::cube(&mut dev);
        let texture = |kind| MeshTexture {
            texture: Rc::new(Owned::new(TextureId::INVALID, dev.release_queue())),
            kind,
            key: String::new(),
        };
        let textures = vec![
            texture(TextureKind::Diffuse),
            texture(TextureKind::Diffuse),
            texture(TextureKind::Specular),
            texture(TextureKind::Emission),
        ];
        let mesh = Mesh::new(geometry, textures);
        assert_eq!(
            mesh.sampler_names(),
            [
                "material.diffuse1",
                "material.diffuse2",
                "material.specular1",
                "material.emission1"
            ]
        );
    }

    #[test]
    fn instanced_draw_needs_a_stream() {
        let mut dev = HeadlessDevice::default();
        let programs = ProgramSet::new(&mut dev).unwrap();
        let mut mesh = Mesh::new(GeometryBuffer::cube(&mut dev), Vec::new());
        programs.lit_instanced.use_program(&mut dev);

        mesh.draw_instanced(&mut dev, &programs.lit_instanced, 4);
        assert_eq!(dev.draws().count(), 0);

        let buffer = dev.create_buffer(&crate::gpu::BufferDesc {
            label: "instances",
            usage: crate::gpu::BufferUsage::Instance,
            contents: &[0; 64 * 4],
        });
        mesh.set_instance_stream(buffer);
        mesh.draw_instanced(&mut dev, &programs.lit_instanced, 4);
        let draw = dev.draws().last().unwrap();
        assert_eq!((draw.count, draw.instances), (36, 4));
    }

    #[test]
    fn failed_import_gives_empty_model() {
        let mut dev = HeadlessDevice::default();
        let model = Model::load(&mut dev, &FailingImporter, "missing.gltf");
        assert!(model.is_empty());
        assert_eq!(model.label(), "missing.gltf");
    }

    #[test]
    fn embedded_images_are_flipped_and_uploaded() {
        let scene = ImportedScene {
            root: ImportedNode {
                meshes: vec![0],
                ..Default::default()
            },
            meshes: vec![triangle(3, Some(0))],
            materials: vec![ImportedMaterial {
                textures: vec![TextureRef {
                    kind: TextureKind::Diffuse,
                    key: "#image0".into(),
                    source: TextureSource::Embedded(EmbeddedImage {
                        width: 1,
                        height: 2,
                        channels: 4,
                        pixels: vec![255, 0, 0, 255, 0, 0, 255, 255],
                    }),
                }],
            }],
        };
        let mut dev = HeadlessDevice::default();
        let model = Model::from_scene(&mut dev, &scene, Path::new("."), "embedded");
        let id = model.meshes()[0].textures()[0].id();
        assert!(id.is_valid());
        assert_eq!(dev.texture_uploads(), 1);
        assert_eq!(
            dev.texture_desc(id).map(|d| d.format),
            Some(crate::gpu::PixelFormat::Rgba8Srgb)
        );
    }
}
