//! # Shadow — Depth-Only Render Targets and Light-Space Matrices
//!
//! Shadow mapping renders the scene twice: once from the light into a
//! depth-only target, once from the camera while sampling that depth to
//! decide whether each fragment is occluded.
//!
//! ```text
//!   Directional light                       Point light
//!   ─────────────────                       ───────────
//!   ortho(-r..r, -r..r, near..far)          6 × perspective(90°, 1:1, near, far)
//!     × lookAt(pos, pos + dir, +Y)            × lookAt(pos, pos + axis, up[axis])
//!            │                                        │
//!            ▼                                        ▼
//!   2D depth texture                        depth cubemap, one face per axis
//!   clamp-to-border, border = 1.0           nearest, clamp-to-edge
//! ```
//!
//! The directional volume is a fixed box of half-extent `r` around the
//! light's position instead of a frustum fitted to the scene. That is enough
//! for bounded scenes; casters outside `[-r, r]` in the light's XY plane do
//! not shadow anything. Sampling outside the map hits the white border, i.e.
//! depth 1.0, i.e. "lit".
//!
//! Point-light faces follow the cubemap convention `+X, -X, +Y, -Y, +Z, -Z`
//! with the up vectors cubemap addressing expects, so face seams line up.
//!
//! ## Comparison
//!
//! - **Bevy**: Cascaded shadow maps for directional lights, cube shadow maps
//!   for point lights, one texture array for all lights.
//! - **three.js**: `DirectionalLightShadow` uses an orthographic camera with
//!   a user-set box, just like this module.

use glam::{Mat4, Vec3};

use crate::gpu::{
    BorderColor, Filter, FramebufferDesc, FramebufferId, GraphicsDevice, Owned, PixelFormat,
    Sampling, TextureDesc, TextureDimension, TextureId, Viewport, Wrap,
};

/// Which kind of light a target was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowKind {
    /// One 2D depth map.
    Directional,
    /// A depth cubemap rendered face by face.
    Omnidirectional,
}

/// A framebuffer whose only attachment is a depth texture.
///
/// Both resources are released when the target drops.
#[derive(Debug)]
pub struct ShadowTarget {
    framebuffer: Owned<FramebufferId>,
    depth: Owned<TextureId>,
    width: u32,
    height: u32,
    kind: ShadowKind,
}

impl ShadowTarget {
    pub fn framebuffer(&self) -> FramebufferId {
        self.framebuffer.id()
    }

    pub fn depth_texture(&self) -> TextureId {
        self.depth.id()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn kind(&self) -> ShadowKind {
        self.kind
    }

    /// Viewport covering the whole map (one face, for cubemaps).
    pub fn viewport(&self) -> Viewport {
        Viewport::sized(self.width, self.height)
    }
}

fn depth_target(
    dev: &mut dyn GraphicsDevice,
    label: &str,
    dimension: TextureDimension,
    width: u32,
    height: u32,
    sampling: Sampling,
    kind: ShadowKind,
) -> ShadowTarget {
    debug_assert!(width > 0 && height > 0, "shadow target needs a positive size");

    let depth = dev.create_texture(
        &TextureDesc {
            label: format!("{label} depth"),
            dimension,
            format: PixelFormat::Depth32,
            width,
            height,
            samples: 1,
            sampling,
            render_target: true,
        },
        None,
    );
    let framebuffer = dev.create_framebuffer(&FramebufferDesc {
        label: label.into(),
        color: None,
        depth: Some(depth),
    });

    let status = dev.framebuffer_status(framebuffer);
    if status.is_complete() {
        log::debug!("created {label} ({width}x{height}) as {framebuffer}");
    } else {
        log::error!("{label} framebuffer is not complete: {status:?}");
    }

    let queue = dev.release_queue();
    ShadowTarget {
        framebuffer: Owned::new(framebuffer, queue.clone()),
        depth: Owned::new(depth, queue),
        width,
        height,
        kind,
    }
}

/// 2D depth map for a directional light.
///
/// Sampling outside the map reads the white border (depth 1.0, unshadowed).
pub fn create_directional_target(dev: &mut dyn GraphicsDevice, width: u32, height: u32) -> ShadowTarget {
    depth_target(
        dev,
        "directional shadow map",
        TextureDimension::D2,
        width,
        height,
        Sampling {
            wrap: Wrap::ClampToBorder,
            filter: Filter::Linear,
            border: Some(BorderColor::OpaqueWhite),
            compare: true,
        },
        ShadowKind::Directional,
    )
}

/// Depth cubemap for a point light, `size × size` per face.
pub fn create_omnidirectional_target(dev: &mut dyn GraphicsDevice, size: u32) -> ShadowTarget {
    depth_target(
        dev,
        "omnidirectional shadow map",
        TextureDimension::Cube,
        size,
        size,
        Sampling {
            wrap: Wrap::ClampToEdge,
            filter: Filter::Nearest,
            border: None,
            compare: true,
        },
        ShadowKind::Omnidirectional,
    )
}

// ── Light-space matrices ───────────────────────────────────────────────────

/// Orthographic shadow volume of a directional light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthoShadowVolume {
    /// Half-extent `r` of the box in the light's XY plane.
    pub extent: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for OrthoShadowVolume {
    fn default() -> Self {
        Self {
            extent: 10.0,
            near: -20.0,
            far: 20.0,
        }
    }
}

/// Perspective range of a point light's cube faces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointShadowRange {
    pub near: f32,
    pub far: f32,
}

impl Default for PointShadowRange {
    fn default() -> Self {
        Self { near: 0.1, far: 25.0 }
    }
}

/// View direction and up vector for each cube face, `+X -X +Y -Y +Z -Z`.
pub const CUBE_FACES: [(Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Y),
    (Vec3::NEG_X, Vec3::NEG_Y),
    (Vec3::Y, Vec3::Z),
    (Vec3::NEG_Y, Vec3::NEG_Z),
    (Vec3::Z, Vec3::NEG_Y),
    (Vec3::NEG_Z, Vec3::NEG_Y),
];

/// World → light clip space for a directional light.
///
/// Pure function of its inputs; the same arguments give a bit-identical
/// matrix.
pub fn directional_shadow_matrix(position: Vec3, direction: Vec3, volume: OrthoShadowVolume) -> Mat4 {
    let r = volume.extent;
    let projection = Mat4::orthographic_rh_gl(-r, r, -r, r, volume.near, volume.far);
    let view = Mat4::look_at_rh(position, position + direction, Vec3::Y);
    projection * view
}

/// World → clip space for each cube face of a point light, in face order.
pub fn point_shadow_matrices(position: Vec3, range: PointShadowRange) -> [Mat4; 6] {
    let projection =
        Mat4::perspective_rh_gl(90f32.to_radians(), 1.0, range.near, range.far);
    CUBE_FACES.map(|(dir, up)| projection * Mat4::look_at_rh(position, position + dir, up))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::Resource;
    use crate::gpu::headless::HeadlessDevice;

    #[test]
    fn directional_target_is_complete_with_white_border() {
        let mut dev = HeadlessDevice::default();
        let target = create_directional_target(&mut dev, 2048, 2048);

        assert!(dev.framebuffer_status(target.framebuffer()).is_complete());
        let desc = dev.texture_desc(target.depth_texture()).unwrap();
        assert_eq!(desc.format, PixelFormat::Depth32);
        assert_eq!((desc.width, desc.height), (2048, 2048));
        assert_eq!(desc.sampling.wrap, Wrap::ClampToBorder);
        assert_eq!(desc.sampling.border, Some(BorderColor::OpaqueWhite));

        let fb = dev.framebuffer_desc(target.framebuffer()).unwrap();
        assert_eq!(fb.color, None, "shadow target must not have a color attachment");
        assert_eq!(fb.depth, Some(target.depth_texture()));
    }

    #[test]
    fn omnidirectional_target_is_a_nearest_clamped_cubemap() {
        let mut dev = HeadlessDevice::default();
        let target = create_omnidirectional_target(&mut dev, 1024);

        assert!(dev.framebuffer_status(target.framebuffer()).is_complete());
        let desc = dev.texture_desc(target.depth_texture()).unwrap();
        assert_eq!(desc.dimension, TextureDimension::Cube);
        assert_eq!(desc.sampling.filter, Filter::Nearest);
        assert_eq!(desc.sampling.wrap, Wrap::ClampToEdge);
        assert_eq!(target.kind(), ShadowKind::Omnidirectional);
    }

    #[test]
    fn dropping_target_releases_both_resources_once() {
        let mut dev = HeadlessDevice::default();
        let target = create_directional_target(&mut dev, 64, 64);
        let (fb, depth) = (target.framebuffer(), target.depth_texture());
        drop(target);
        dev.collect_released();
        dev.collect_released();
        assert_eq!(
            dev.destroyed(),
            &[Resource::Framebuffer(fb), Resource::Texture(depth)]
        );
    }

    #[test]
    fn directional_matrix_is_deterministic() {
        let pos = Vec3::new(1.0, 4.0, -2.0);
        let dir = Vec3::new(1.0, -1.0, 1.4);
        let a = directional_shadow_matrix(pos, dir, OrthoShadowVolume::default());
        let b = directional_shadow_matrix(pos, dir, OrthoShadowVolume::default());
        assert_eq!(a.to_cols_array(), b.to_cols_array());
    }

    #[test]
    fn directional_matrix_centers_the_light_axis() {
        let pos = Vec3::new(0.0, 5.0, 0.0);
        let dir = Vec3::new(0.3, -1.0, 0.2);
        let m = directional_shadow_matrix(pos, dir, OrthoShadowVolume::default());
        let clip = m * (pos + dir.normalize() * 3.0).extend(1.0);
        assert!(clip.x.abs() < 1e-5 && clip.y.abs() < 1e-5, "got {clip:?}");
        assert!(clip.z > -1.0 && clip.z < 1.0);
    }

    #[test]
    fn point_matrices_follow_face_order() {
        for pos in [Vec3::ZERO, Vec3::new(0.7, 0.2, 2.0), Vec3::splat(-30.0)] {
            let faces = point_shadow_matrices(pos, PointShadowRange::default());
            assert_eq!(faces.len(), 6);
            for (i, (dir, _)) in CUBE_FACES.iter().enumerate() {
                let clip = faces[i] * (pos + *dir * 5.0).extend(1.0);
                let ndc = clip.truncate() / clip.w;
                assert!(clip.w > 0.0, "face {i} looks the wrong way");
                assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4, "face {i}: {ndc:?}");
            }
        }
    }

    #[test]
    fn point_face_up_vectors_match_cubemap_convention() {
        let faces = point_shadow_matrices(Vec3::ZERO, PointShadowRange::default());
        // +X face: a point above the light lands in the lower half (up is -Y).
        let clip = faces[0] * Vec3::new(5.0, 1.0, 0.0).extend(1.0);
        assert!(clip.y / clip.w < 0.0);
        // +Y face: up is +Z.
        let clip = faces[2] * Vec3::new(0.0, 5.0, 1.0).extend(1.0);
        assert!(clip.y / clip.w > 0.0);
    }
}
