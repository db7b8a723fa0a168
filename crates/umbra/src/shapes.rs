//! # Shapes — Built-In Primitive Generators
//!
//! The renderer needs a handful of primitives of its own, independent of
//! any loaded model:
//!
//! | Shape        | Used for                                   | Format       |
//! |--------------|--------------------------------------------|--------------|
//! | `cube`       | light gizmos, scene boxes                  | `MeshVertex` |
//! | `sphere`     | scene spheres                              | `MeshVertex` |
//! | `skybox`     | skybox background, drawn without indices   | `[f32; 3]`   |
//! | `screen_quad`| presenting the resolved frame              | `ScreenVertex` |
//!
//! ## Winding Order and Normals
//!
//! Triangles are counter-clockwise when seen from outside, so back-face
//! culling removes the inside. The cube keeps 4 vertices per face (24 total)
//! so every face gets its own flat normal.
//!
//! UVs put (0, 0) at the bottom-left, matching 2D textures, which are
//! flipped on load.
//!
//! The skybox cube is the exception: it is seen from *inside* and drawn with
//! depth testing off, so its winding only has to face inwards. It uses 36
//! unindexed vertices at ±1, which is the size the skybox shader expects.

use crate::vertex::{MeshVertex, ScreenVertex};

/// Unit cube centered at the origin (side length 1.0).
///
/// Returns 24 vertices (4 per face for correct normals) and 36 indices.
pub fn cube() -> (Vec<MeshVertex>, Vec<u32>) {
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    // (normal, tangent_u, tangent_v) per face; u × v == normal keeps CCW.
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let corners = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];
    let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
    let h = 0.5_f32;

    for (normal, u_dir, v_dir) in &faces {
        let base = vertices.len() as u32;
        for (corner, uv) in corners.iter().zip(uvs) {
            let position = std::array::from_fn(|axis| {
                normal[axis] * h + u_dir[axis] * corner[0] * h + v_dir[axis] * corner[1] * h
            });
            vertices.push(MeshVertex {
                position,
                normal: *normal,
                uv,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    (vertices, indices)
}

/// UV sphere of radius `radius` centered at the origin.
///
/// `segments` divides longitude, `rings` latitude. U wraps around the
/// equator, V runs from the south pole (0) to the north pole (1).
pub fn sphere(segments: u32, rings: u32, radius: f32) -> (Vec<MeshVertex>, Vec<u32>) {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
    let mut indices = Vec::with_capacity((rings * segments * 6) as usize);

    for ring in 0..=rings {
        let t = ring as f32 / rings as f32;
        let phi = t * std::f32::consts::PI;
        let v = 1.0 - t;

        for seg in 0..=segments {
            let u = seg as f32 / segments as f32;
            let theta = u * std::f32::consts::TAU;

            let x = phi.sin() * theta.cos();
            let y = phi.cos();
            let z = phi.sin() * theta.sin();

            vertices.push(MeshVertex {
                position: [x * radius, y * radius, z * radius],
                normal: [x, y, z],
                uv: [u, v],
            });
        }
    }

    for ring in 0..rings {
        for seg in 0..segments {
            let current = ring * (segments + 1) + seg;
            let next = current + segments + 1;
            indices.extend_from_slice(&[current, current + 1, next]);
            indices.extend_from_slice(&[current + 1, next + 1, next]);
        }
    }

    (vertices, indices)
}

/// 36 positions of a ±1 cube, two triangles per face, wound to face inwards.
pub fn skybox() -> Vec<[f32; 3]> {
    // Corner k has bit 0 → x, bit 1 → y, bit 2 → z (set = +1).
    let corner = |k: usize| -> [f32; 3] {
        [
            if k & 1 != 0 { 1.0 } else { -1.0 },
            if k & 2 != 0 { 1.0 } else { -1.0 },
            if k & 4 != 0 { 1.0 } else { -1.0 },
        ]
    };
    // Quads listed counter-clockwise as seen from inside the cube.
    let quads: [[usize; 4]; 6] = [
        [1, 5, 7, 3], // +X
        [4, 0, 2, 6], // -X
        [2, 3, 7, 6], // +Y
        [4, 5, 1, 0], // -Y
        [5, 4, 6, 7], // +Z
        [0, 1, 3, 2], // -Z
    ];
    let mut out = Vec::with_capacity(36);
    for [a, b, c, d] in quads {
        for k in [a, b, c, a, c, d] {
            out.push(corner(k));
        }
    }
    out
}

/// Two triangles covering clip space, uv origin at the top-left.
pub fn screen_quad() -> (Vec<ScreenVertex>, Vec<u32>) {
    let vertices = vec![
        ScreenVertex { position: [-1.0, 1.0], uv: [0.0, 0.0] },
        ScreenVertex { position: [-1.0, -1.0], uv: [0.0, 1.0] },
        ScreenVertex { position: [1.0, -1.0], uv: [1.0, 1.0] },
        ScreenVertex { position: [1.0, 1.0], uv: [1.0, 0.0] },
    ];
    (vertices, vec![0, 1, 2, 0, 2, 3])
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> Vec3 {
        let (a, b, c) = (Vec3::from(a), Vec3::from(b), Vec3::from(c));
        (b - a).cross(c - a)
    }

    #[test]
    fn cube_has_correct_counts() {
        let (verts, idxs) = cube();
        assert_eq!(verts.len(), 24, "cube should have 24 vertices (4 per face)");
        assert_eq!(idxs.len(), 36, "cube should have 36 indices (6 per face)");
    }

    #[test]
    fn cube_triangles_face_outwards() {
        let (verts, idxs) = cube();
        for tri in idxs.chunks(3) {
            let n = face_normal(
                verts[tri[0] as usize].position,
                verts[tri[1] as usize].position,
                verts[tri[2] as usize].position,
            );
            let declared = Vec3::from(verts[tri[0] as usize].normal);
            assert!(n.dot(declared) > 0.0, "triangle {tri:?} is wound inwards");
        }
    }

    #[test]
    fn sphere_has_correct_counts() {
        let (verts, idxs) = sphere(40, 40, 1.0);
        assert_eq!(verts.len(), 41 * 41);
        assert_eq!(idxs.len(), 40 * 40 * 6);
    }

    #[test]
    fn sphere_respects_radius() {
        let (verts, _) = sphere(8, 4, 2.5);
        for v in &verts {
            let len = Vec3::from(v.position).length();
            assert!((len - 2.5).abs() < 1e-4, "vertex off the surface: {len}");
        }
    }

    #[test]
    fn sphere_triangles_face_outwards() {
        let (verts, idxs) = sphere(16, 8, 1.0);
        for tri in idxs.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|k| verts[tri[k] as usize].position);
            let n = face_normal(a, b, c);
            // Pole triangles collapse to zero area.
            if n.length() < 1e-6 {
                continue;
            }
            assert!(n.dot(Vec3::from(a)) > 0.0, "triangle {tri:?} is wound inwards");
        }
    }

    #[test]
    fn sphere_indices_in_range() {
        let (verts, idxs) = sphere(8, 4, 1.0);
        assert!(idxs.iter().all(|&i| (i as usize) < verts.len()));
    }

    #[test]
    fn skybox_triangles_face_inwards() {
        let verts = skybox();
        assert_eq!(verts.len(), 36);
        for tri in verts.chunks(3) {
            let n = face_normal(tri[0], tri[1], tri[2]);
            let center = (Vec3::from(tri[0]) + Vec3::from(tri[1]) + Vec3::from(tri[2])) / 3.0;
            assert!(n.dot(center) < 0.0, "skybox triangle {tri:?} faces outwards");
        }
    }

    #[test]
    fn screen_quad_covers_clip_space() {
        let (verts, idxs) = screen_quad();
        assert_eq!(idxs.len(), 6);
        let min_x = verts.iter().map(|v| v.position[0]).fold(f32::MAX, f32::min);
        let max_y = verts.iter().map(|v| v.position[1]).fold(f32::MIN, f32::max);
        assert_eq!((min_x, max_y), (-1.0, 1.0));
    }
}
