//! # Light — Directional, Point and Spot Lights
//!
//! One [`Light`] type with a closed set of variants in [`LightKind`]. The
//! fields every light has (color, position, direction, ambient strength,
//! shadow target) live on `Light`; variant-specific parameters live in the
//! enum, so a directional light simply has no attenuation to leave
//! uninitialised.
//!
//! ## Shadow Ownership
//!
//! Whether a light casts shadows is decided at construction and never
//! changes. A shadow-casting light allocates exactly one
//! [`ShadowTarget`] up front and owns it; the target is released when the
//! light drops. A non-casting light allocates nothing.
//!
//! | Variant     | Shadow target                  |
//! |-------------|--------------------------------|
//! | Directional | 2D depth map (default 2048²)   |
//! | Point       | depth cubemap (default 1024²)  |
//! | Spot        | never; spot shadows are not implemented |
//!
//! ## Publishing
//!
//! [`Light::publish`] writes the light into a program's uniform namespace
//! as `<prefix>.<field>`:
//!
//! ```text
//! Directional: direction ambient diffuse specular casts_shadow
//! Point:       position ambient diffuse specular constant linear quadratic casts_shadow
//! Spot:        position direction innercutoff outercutoff ambient diffuse specular
//!              constant linear quadratic
//! ```
//!
//! `ambient = color * ambient_strength`; diffuse and specular are both the
//! plain color. Shadow-map samplers are never touched here: binding depth
//! textures to units is the renderer's job.
//!
//! ## Comparison
//!
//! - **LearnOpenGL**: The same three light structs and uniform names, with
//!   inheritance instead of an enum.
//! - **Bevy**: Separate `DirectionalLight` / `PointLight` / `SpotLight`
//!   components, shadows toggled with a `shadows_enabled` flag.

use glam::Vec3;

use crate::gpu::GraphicsDevice;
use crate::shader::Program;
use crate::shadow::{ShadowTarget, create_directional_target, create_omnidirectional_target};

/// Default edge length of a directional light's depth map.
pub const DIRECTIONAL_SHADOW_SIZE: u32 = 2048;
/// Default edge length of each point-light cube face.
pub const POINT_SHADOW_SIZE: u32 = 1024;

/// Distance falloff `1 / (constant + linear·d + quadratic·d²)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional,
    Point {
        attenuation: Attenuation,
    },
    Spot {
        attenuation: Attenuation,
        /// Cosine of the inner cone half-angle.
        inner_cutoff: f32,
        /// Cosine of the outer cone half-angle.
        outer_cutoff: f32,
    },
}

impl LightKind {
    /// Spot cone with the default 12.5° / 17.5° half-angles.
    pub fn default_spot() -> Self {
        LightKind::Spot {
            attenuation: Attenuation::default(),
            inner_cutoff: 12.5f32.to_radians().cos(),
            outer_cutoff: 17.5f32.to_radians().cos(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LightKind::Directional => "directional",
            LightKind::Point { .. } => "point",
            LightKind::Spot { .. } => "spot",
        }
    }
}

/// Construction parameters shared by every variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightDesc {
    pub color: Vec3,
    pub position: Vec3,
    /// Ignored by point lights.
    pub direction: Vec3,
    pub ambient_strength: f32,
    /// Ignored by spot lights.
    pub casts_shadow: bool,
    /// Shadow map edge length; `None` picks the per-variant default.
    pub shadow_size: Option<u32>,
}

impl Default for LightDesc {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            position: Vec3::ZERO,
            direction: Vec3::NEG_Y,
            ambient_strength: 0.1,
            casts_shadow: false,
            shadow_size: None,
        }
    }
}

#[derive(Debug)]
pub struct Light {
    kind: LightKind,
    pub color: Vec3,
    pub position: Vec3,
    pub direction: Vec3,
    pub ambient_strength: f32,
    shadow: Option<ShadowTarget>,
}

impl Light {
    pub fn directional(dev: &mut dyn GraphicsDevice, desc: LightDesc) -> Self {
        let shadow = desc.casts_shadow.then(|| {
            let size = desc.shadow_size.unwrap_or(DIRECTIONAL_SHADOW_SIZE);
            create_directional_target(dev, size, size)
        });
        Self::build(LightKind::Directional, desc, shadow)
    }

    pub fn point(dev: &mut dyn GraphicsDevice, desc: LightDesc) -> Self {
        let shadow = desc.casts_shadow.then(|| {
            create_omnidirectional_target(dev, desc.shadow_size.unwrap_or(POINT_SHADOW_SIZE))
        });
        Self::build(
            LightKind::Point {
                attenuation: Attenuation::default(),
            },
            LightDesc {
                direction: Vec3::ZERO,
                ..desc
            },
            shadow,
        )
    }

    /// Spot lights never allocate a shadow target.
    pub fn spot(desc: LightDesc) -> Self {
        if desc.casts_shadow {
            log::warn!("spot light shadows are not implemented; light will not cast shadows");
        }
        Self::build(LightKind::default_spot(), desc, None)
    }

    fn build(kind: LightKind, desc: LightDesc, shadow: Option<ShadowTarget>) -> Self {
        log::debug!(
            "created {} light at {} (shadow: {})",
            kind.name(),
            desc.position,
            shadow.is_some()
        );
        Self {
            kind,
            color: desc.color,
            position: desc.position,
            direction: desc.direction,
            ambient_strength: desc.ambient_strength,
            shadow,
        }
    }

    pub fn kind(&self) -> &LightKind {
        &self.kind
    }

    pub fn casts_shadow(&self) -> bool {
        self.shadow.is_some()
    }

    pub fn shadow(&self) -> Option<&ShadowTarget> {
        self.shadow.as_ref()
    }

    pub fn set_color(&mut self, r: f32, g: f32, b: f32) {
        self.color = Vec3::new(r, g, b);
    }

    /// Replace the falloff of a point or spot light. No-op for directional.
    pub fn set_attenuation(&mut self, value: Attenuation) {
        match &mut self.kind {
            LightKind::Point { attenuation } | LightKind::Spot { attenuation, .. } => {
                *attenuation = value;
            }
            LightKind::Directional => {
                log::warn!("directional lights have no attenuation");
            }
        }
    }

    pub fn ambient(&self) -> Vec3 {
        self.color * self.ambient_strength
    }

    /// Write every parameter of this light under `prefix`.
    ///
    /// `program` must be the active program.
    pub fn publish(&self, dev: &mut dyn GraphicsDevice, program: &Program, prefix: &str) {
        debug_assert!(
            program.is_active(dev),
            "publish of {prefix} needs '{}' active",
            program.label()
        );
        let mut set = |field: &str, value: crate::gpu::UniformValue| {
            program.set(dev, &format!("{prefix}.{field}"), value);
        };

        match self.kind {
            LightKind::Directional => {
                set("direction", self.direction.into());
            }
            LightKind::Point { .. } => {
                set("position", self.position.into());
            }
            LightKind::Spot {
                inner_cutoff,
                outer_cutoff,
                ..
            } => {
                set("position", self.position.into());
                set("direction", self.direction.into());
                set("innercutoff", inner_cutoff.into());
                set("outercutoff", outer_cutoff.into());
            }
        }

        set("ambient", self.ambient().into());
        set("diffuse", self.color.into());
        set("specular", self.color.into());

        if let LightKind::Point { attenuation } | LightKind::Spot { attenuation, .. } = self.kind {
            set("constant", attenuation.constant.into());
            set("linear", attenuation.linear.into());
            set("quadratic", attenuation.quadratic.into());
        }

        if !matches!(self.kind, LightKind::Spot { .. }) {
            set("casts_shadow", self.casts_shadow().into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::{Command, HeadlessDevice};
    use crate::gpu::{Resource, UniformValue};
    use crate::programs::ProgramSet;

    fn scene_lights(dev: &mut HeadlessDevice) -> (Light, Light) {
        let dir = Light::directional(
            dev,
            LightDesc {
                color: Vec3::splat(0.1),
                direction: Vec3::new(1.0, -1.0, 1.4),
                ambient_strength: 0.1,
                casts_shadow: false,
                ..Default::default()
            },
        );
        let point = Light::point(
            dev,
            LightDesc {
                color: Vec3::ONE,
                position: Vec3::new(0.7, 0.2, 2.0),
                ambient_strength: 0.1,
                casts_shadow: false,
                ..Default::default()
            },
        );
        (dir, point)
    }

    #[test]
    fn publish_scenario_values() {
        let mut dev = HeadlessDevice::default();
        let programs = ProgramSet::new(&mut dev).unwrap();
        let lit = &programs.lit;
        let (dir, point) = scene_lights(&mut dev);

        lit.use_program(&mut dev);
        dir.publish(&mut dev, lit, "dirlight");
        point.publish(&mut dev, lit, "pointlight");

        let get = |name: &str| dev.uniform(lit.id(), name);
        let ambient = get("dirlight.ambient").and_then(|v| v.as_vec3()).unwrap();
        assert!((ambient - Vec3::splat(0.01)).abs().max_element() < 1e-7, "got {ambient}");
        assert_eq!(get("dirlight.diffuse"), Some(UniformValue::Vec3(Vec3::splat(0.1))));
        assert_eq!(get("dirlight.casts_shadow"), Some(UniformValue::Bool(false)));
        assert_eq!(get("pointlight.constant"), Some(UniformValue::Float(1.0)));
        assert_eq!(get("pointlight.linear"), Some(UniformValue::Float(0.09)));
        assert_eq!(get("pointlight.quadratic"), Some(UniformValue::Float(0.032)));
        assert_eq!(
            get("pointlight.position"),
            Some(UniformValue::Vec3(Vec3::new(0.7, 0.2, 2.0)))
        );
    }

    #[test]
    fn non_casting_lights_allocate_nothing_and_never_write_samplers() {
        let mut dev = HeadlessDevice::default();
        let programs = ProgramSet::new(&mut dev).unwrap();
        let created_before = dev.created().len();
        let (dir, point) = scene_lights(&mut dev);
        let spot = Light::spot(LightDesc::default());
        assert_eq!(dev.created().len(), created_before, "no GPU resources expected");
        assert!(!dir.casts_shadow() && !point.casts_shadow() && !spot.casts_shadow());

        programs.lit.use_program(&mut dev);
        dir.publish(&mut dev, &programs.lit, "dirlight");
        point.publish(&mut dev, &programs.lit, "pointlight");
        spot.publish(&mut dev, &programs.lit, "spotlight");

        let sampler_writes = dev.commands().iter().filter(|c| {
            matches!(c, Command::SetUniform { name, .. } if name.ends_with("shadow_map"))
        });
        assert_eq!(sampler_writes.count(), 0);
    }

    #[test]
    fn casting_light_creates_one_target_and_releases_it_once() {
        let mut dev = HeadlessDevice::default();
        let light = Light::directional(
            &mut dev,
            LightDesc {
                casts_shadow: true,
                ..Default::default()
            },
        );
        assert_eq!(dev.created().len(), 2, "one depth texture and one framebuffer");
        let shadow = light.shadow().unwrap();
        assert_eq!(shadow.size(), (DIRECTIONAL_SHADOW_SIZE, DIRECTIONAL_SHADOW_SIZE));
        let (fb, depth) = (shadow.framebuffer(), shadow.depth_texture());

        drop(light);
        dev.collect_released();
        assert_eq!(
            dev.destroyed(),
            &[Resource::Framebuffer(fb), Resource::Texture(depth)]
        );
    }

    #[test]
    fn point_shadow_uses_cubemap_size() {
        let mut dev = HeadlessDevice::default();
        let light = Light::point(
            &mut dev,
            LightDesc {
                casts_shadow: true,
                shadow_size: Some(256),
                ..Default::default()
            },
        );
        assert_eq!(light.shadow().unwrap().size(), (256, 256));
        assert_eq!(light.direction, Vec3::ZERO);
    }

    #[test]
    fn spot_ignores_shadow_request() {
        let spot = Light::spot(LightDesc {
            casts_shadow: true,
            ..Default::default()
        });
        assert!(!spot.casts_shadow());
        let LightKind::Spot {
            inner_cutoff,
            outer_cutoff,
            ..
        } = *spot.kind()
        else {
            panic!("expected a spot light");
        };
        assert!((inner_cutoff - 12.5f32.to_radians().cos()).abs() < 1e-7);
        assert!(inner_cutoff > outer_cutoff);
    }

    #[test]
    fn spot_publishes_cone_without_casts_shadow() {
        let mut dev = HeadlessDevice::default();
        let programs = ProgramSet::new(&mut dev).unwrap();
        let spot = Light::spot(LightDesc::default());
        programs.lit.use_program(&mut dev);
        spot.publish(&mut dev, &programs.lit, "spotlight");
        assert!(dev.uniform(programs.lit.id(), "spotlight.innercutoff").is_some());
        assert_eq!(dev.uniform_writes("spotlight.casts_shadow").count(), 0);
    }

    #[test]
    fn set_attenuation_reaches_published_falloff() {
        let mut dev = HeadlessDevice::default();
        let programs = ProgramSet::new(&mut dev).unwrap();
        let (mut dir, mut point) = scene_lights(&mut dev);
        let falloff = Attenuation {
            constant: 1.0,
            linear: 0.22,
            quadratic: 0.2,
        };
        point.set_attenuation(falloff);
        dir.set_attenuation(falloff);
        assert_eq!(*point.kind(), LightKind::Point { attenuation: falloff });
        assert_eq!(*dir.kind(), LightKind::Directional);

        programs.lit.use_program(&mut dev);
        point.publish(&mut dev, &programs.lit, "pointlight");
        assert_eq!(
            dev.uniform(programs.lit.id(), "pointlight.linear"),
            Some(UniformValue::Float(0.22))
        );
        assert_eq!(
            dev.uniform(programs.lit.id(), "pointlight.quadratic"),
            Some(UniformValue::Float(0.2))
        );
    }

    #[test]
    fn set_color_changes_all_terms() {
        let mut dev = HeadlessDevice::default();
        let (mut dir, _) = scene_lights(&mut dev);
        dir.set_color(1.0, 0.5, 0.0);
        assert_eq!(dir.ambient(), Vec3::new(0.1, 0.05, 0.0));
    }
}
