//! The contract between model files and [`Model`](super::Model).
//!
//! An importer turns a file into a plain-data [`ImportedScene`]: a node
//! tree that indexes into flat mesh and material lists. Nothing here
//! touches the GPU; uploading is the model's job.

use std::path::Path;

use crate::error::RenderError;

/// What a material texture is used for. Order here is binding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Diffuse,
    Specular,
    Normal,
    Emission,
}

impl TextureKind {
    /// All kinds, in the order a mesh binds them.
    pub const ALL: [TextureKind; 4] = [
        TextureKind::Diffuse,
        TextureKind::Specular,
        TextureKind::Normal,
        TextureKind::Emission,
    ];

    /// Sampler name stem, as in `material.<stem><n>`.
    pub fn uniform_stem(self) -> &'static str {
        match self {
            TextureKind::Diffuse => "diffuse",
            TextureKind::Specular => "specular",
            TextureKind::Normal => "normal",
            TextureKind::Emission => "emission",
        }
    }
}

/// Raw 8-bit pixels embedded in a model file, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextureSource {
    /// Path relative to the model file's directory.
    File(String),
    Embedded(EmbeddedImage),
}

/// One texture reference of a material.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureRef {
    pub kind: TextureKind,
    /// Identity used for deduplication across the model. For files this is
    /// the path as written in the model.
    pub key: String,
    pub source: TextureSource,
}

impl TextureRef {
    pub fn file(kind: TextureKind, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            kind,
            key: path.clone(),
            source: TextureSource::File(path),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedMaterial {
    pub textures: Vec<TextureRef>,
}

/// One triangulated submesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedMesh {
    pub positions: Vec<[f32; 3]>,
    /// Same length as `positions`.
    pub normals: Vec<[f32; 3]>,
    /// First UV set, bottom-left origin. Empty if the mesh has none.
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub material: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedNode {
    pub name: Option<String>,
    /// Indices into [`ImportedScene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<ImportedNode>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedScene {
    pub root: ImportedNode,
    pub meshes: Vec<ImportedMesh>,
    pub materials: Vec<ImportedMaterial>,
}

impl ImportedScene {
    /// Mesh indices in load order: a node's own meshes, then its children,
    /// depth first.
    pub fn mesh_order(&self) -> Vec<usize> {
        fn walk(node: &ImportedNode, out: &mut Vec<usize>) {
            out.extend_from_slice(&node.meshes);
            for child in &node.children {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.root, &mut out);
        out
    }

    /// Material textures of `mesh` grouped by kind, in [`TextureKind::ALL`] order.
    pub fn textures_of(&self, mesh: &ImportedMesh) -> Vec<&TextureRef> {
        let Some(material) = mesh.material.and_then(|m| self.materials.get(m)) else {
            return Vec::new();
        };
        TextureKind::ALL
            .iter()
            .flat_map(|kind| material.textures.iter().filter(move |t| t.kind == *kind))
            .collect()
    }
}

/// Turns a model file into an [`ImportedScene`].
pub trait MeshImporter {
    fn import(&self, path: &Path) -> Result<ImportedScene, RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(meshes: Vec<usize>) -> ImportedNode {
        ImportedNode {
            meshes,
            ..Default::default()
        }
    }

    #[test]
    fn mesh_order_is_node_meshes_then_children() {
        let scene = ImportedScene {
            root: ImportedNode {
                name: Some("root".into()),
                meshes: vec![3],
                children: vec![
                    ImportedNode {
                        meshes: vec![0],
                        children: vec![leaf(vec![4])],
                        ..Default::default()
                    },
                    leaf(vec![1, 2]),
                ],
            },
            ..Default::default()
        };
        assert_eq!(scene.mesh_order(), vec![3, 0, 4, 1, 2]);
    }

    #[test]
    fn textures_are_grouped_by_kind() {
        let scene = ImportedScene {
            materials: vec![ImportedMaterial {
                textures: vec![
                    TextureRef::file(TextureKind::Emission, "glow.png"),
                    TextureRef::file(TextureKind::Diffuse, "albedo.png"),
                    TextureRef::file(TextureKind::Specular, "spec.png"),
                ],
            }],
            ..Default::default()
        };
        let mesh = ImportedMesh {
            material: Some(0),
            ..Default::default()
        };
        let keys: Vec<&str> = scene.textures_of(&mesh).iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, ["albedo.png", "spec.png", "glow.png"]);
    }
}
