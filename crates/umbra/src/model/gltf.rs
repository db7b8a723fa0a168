//! # glTF — Importing Models
//!
//! [glTF 2.0](https://www.khronos.org/gltf/) `.gltf` and `.glb` files,
//! flattened into an [`ImportedScene`].
//!
//! ## What We Extract
//!
//! - The default scene's node tree (or the first scene's). Node transforms
//!   are not applied; the model is placed by the transform it is drawn with.
//! - Each triangle primitive becomes one submesh: `POSITION`, `NORMAL`
//!   (default +Y), `TEXCOORD_0` (default 0, 0), indices (generated when the
//!   primitive has none).
//! - Material textures, in binding order:
//!
//! | glTF slot            | [`TextureKind`]      |
//! |----------------------|----------------------|
//! | `baseColorTexture`   | `Diffuse`            |
//! | `normalTexture`      | `Normal`             |
//! | `emissiveTexture`    | `Emission`           |
//!
//!   Core glTF has no specular map, so `Specular` is never produced.
//!
//! glTF puts the UV origin at the top-left of an image. Textures are
//! flipped on load, so V is flipped here to match.
//!
//! ## What We Skip
//!
//! - Animations, skins, morph targets
//! - Points and lines
//! - Image formats other than 8-bit R / RGB / RGBA

use std::collections::HashMap;
use std::path::Path;

use super::import::{
    EmbeddedImage, ImportedMaterial, ImportedMesh, ImportedNode, ImportedScene, MeshImporter,
    TextureKind, TextureRef, TextureSource,
};
use crate::error::RenderError;

/// [`MeshImporter`] for glTF 2.0 files.
#[derive(Debug, Clone, Copy, Default)]
pub struct GltfImporter;

impl MeshImporter for GltfImporter {
    fn import(&self, path: &Path) -> Result<ImportedScene, RenderError> {
        let (document, buffers, images) = ::gltf::import(path).map_err(|e| RenderError::Import {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        // (mesh index, primitive index) -> flat submesh index
        let mut submeshes: HashMap<(usize, usize), usize> = HashMap::new();
        let mut meshes = Vec::new();
        for mesh in document.meshes() {
            for primitive in mesh.primitives() {
                if primitive.mode() != ::gltf::mesh::Mode::Triangles {
                    log::warn!(
                        "{}: skipping {:?} primitive of mesh {}",
                        path.display(),
                        primitive.mode(),
                        mesh.index()
                    );
                    continue;
                }
                let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
                let Some(positions) = reader.read_positions() else {
                    log::warn!("{}: mesh {} has no positions", path.display(), mesh.index());
                    continue;
                };
                let positions: Vec<[f32; 3]> = positions.collect();
                let normals: Vec<[f32; 3]> = reader
                    .read_normals()
                    .map(|iter| iter.collect())
                    .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; positions.len()]);
                let uvs: Vec<[f32; 2]> = reader
                    .read_tex_coords(0)
                    .map(|iter| iter.into_f32().map(|[u, v]| [u, 1.0 - v]).collect())
                    .unwrap_or_default();
                let indices: Vec<u32> = match reader.read_indices() {
                    Some(indices) => indices.into_u32().collect(),
                    None => (0..positions.len() as u32).collect(),
                };

                submeshes.insert((mesh.index(), primitive.index()), meshes.len());
                meshes.push(ImportedMesh {
                    positions,
                    normals,
                    uvs,
                    indices,
                    material: primitive.material().index(),
                });
            }
        }

        let materials = document
            .materials()
            .map(|material| {
                let pbr = material.pbr_metallic_roughness();
                let slots = [
                    (TextureKind::Diffuse, pbr.base_color_texture().map(|info| info.texture())),
                    (TextureKind::Normal, material.normal_texture().map(|info| info.texture())),
                    (TextureKind::Emission, material.emissive_texture().map(|info| info.texture())),
                ];
                let textures = slots
                    .into_iter()
                    .filter_map(|(kind, texture)| {
                        let image = texture?.source();
                        texture_ref(path, kind, &image, &images[image.index()])
                    })
                    .collect();
                ImportedMaterial { textures }
            })
            .collect();

        let scene = document.default_scene().or_else(|| document.scenes().next());
        let root = ImportedNode {
            name: scene.as_ref().and_then(|s| s.name()).map(str::to_owned),
            meshes: Vec::new(),
            children: scene
                .map(|s| s.nodes().map(|node| import_node(&node, &submeshes)).collect())
                .unwrap_or_default(),
        };

        Ok(ImportedScene {
            root,
            meshes,
            materials,
        })
    }
}

fn import_node(node: &::gltf::Node<'_>, submeshes: &HashMap<(usize, usize), usize>) -> ImportedNode {
    let meshes = node
        .mesh()
        .map(|mesh| {
            mesh.primitives()
                .filter_map(|p| submeshes.get(&(mesh.index(), p.index())).copied())
                .collect()
        })
        .unwrap_or_default();
    ImportedNode {
        name: node.name().map(str::to_owned),
        meshes,
        children: node.children().map(|child| import_node(&child, submeshes)).collect(),
    }
}

fn texture_ref(
    path: &Path,
    kind: TextureKind,
    image: &::gltf::Image<'_>,
    data: &::gltf::image::Data,
) -> Option<TextureRef> {
    if let ::gltf::image::Source::Uri { uri, .. } = image.source()
        && !uri.starts_with("data:")
    {
        return Some(TextureRef::file(kind, uri));
    }

    let channels = match data.format {
        ::gltf::image::Format::R8 => 1,
        ::gltf::image::Format::R8G8B8 => 3,
        ::gltf::image::Format::R8G8B8A8 => 4,
        other => {
            log::warn!(
                "{}: image {} has unsupported format {other:?}",
                path.display(),
                image.index()
            );
            return None;
        }
    };
    Some(TextureRef {
        kind,
        key: format!("#image{}", image.index()),
        source: TextureSource::Embedded(EmbeddedImage {
            width: data.width,
            height: data.height,
            channels,
            pixels: data.pixels.clone(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_import_error() {
        let err = GltfImporter
            .import(Path::new("definitely/not/here.gltf"))
            .unwrap_err();
        assert!(matches!(err, RenderError::Import { .. }), "got {err:?}");
    }

    #[test]
    fn imports_minimal_triangle() {
        use std::io::Write;

        // One triangle: 3 positions (36 bytes) + 3 u16 indices (6 bytes, padded to 8).
        let mut bin = Vec::new();
        for p in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in p {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        for i in [0u16, 1, 2] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        bin.extend_from_slice(&[0, 0]);

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tri.bin"), &bin).unwrap();
        let json = r#"{
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "name": "parent", "children": [1] }, { "mesh": 0 }],
            "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }] }],
            "buffers": [{ "uri": "tri.bin", "byteLength": 44 }],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
                { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
            ],
            "accessors": [
                { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                  "min": [0, 0, 0], "max": [1, 1, 0] },
                { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
            ]
        }"#;
        let path = dir.path().join("tri.gltf");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(json.as_bytes())
            .unwrap();

        let scene = GltfImporter.import(&path).unwrap();
        assert_eq!(scene.meshes.len(), 1);
        assert_eq!(scene.meshes[0].indices, vec![0, 1, 2]);
        assert_eq!(scene.meshes[0].normals, vec![[0.0, 1.0, 0.0]; 3]);
        assert_eq!(scene.root.children[0].name.as_deref(), Some("parent"));
        assert_eq!(scene.mesh_order(), vec![0]);
    }
}
