//! # Shader — Program Handles and Uniform Locations
//!
//! [`Program`] is the named-uniform face of a compiled program: make it
//! active, look up a uniform by name, write a value. Writes always go to
//! the *active* program, so callers use the program before setting
//! anything on it.
//!
//! ## Cached Locations
//!
//! Name lookups are cheap but not free, and hot draw loops repeat the same
//! name every frame. [`CachedLocation`] stores a location the first time
//! it is needed:
//!
//! ```text
//!   Unresolved ──resolve(program, name)──▶ Resolved(location)
//!                                              │
//!                                              └──resolve again──▶ same location, no query
//! ```
//!
//! A location that resolved to `NOT_FOUND` stays resolved; writes through it
//! are silently dropped by the device.

use crate::error::RenderError;
use crate::gpu::{GraphicsDevice, Owned, ProgramDesc, ProgramId, UniformLocation, UniformValue};

/// A compiled program owned by whoever created it.
#[derive(Debug)]
pub struct Program {
    id: Owned<ProgramId>,
    label: String,
}

impl Program {
    pub fn new(dev: &mut dyn GraphicsDevice, desc: &ProgramDesc) -> Result<Self, RenderError> {
        let id = dev.create_program(desc)?;
        log::debug!("compiled program '{}' as {id}", desc.label);
        Ok(Self {
            id: Owned::new(id, dev.release_queue()),
            label: desc.label.to_string(),
        })
    }

    pub fn id(&self) -> ProgramId {
        self.id.id()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Make this the active program.
    pub fn use_program(&self, dev: &mut dyn GraphicsDevice) {
        dev.use_program(self.id());
    }

    pub fn is_active(&self, dev: &dyn GraphicsDevice) -> bool {
        dev.active_program() == Some(self.id())
    }

    /// Location of `name`, or [`UniformLocation::NOT_FOUND`].
    pub fn location(&self, dev: &mut dyn GraphicsDevice, name: &str) -> UniformLocation {
        dev.uniform_location(self.id(), name)
    }

    /// Look up `name` and write `value`. The program must be active.
    pub fn set(&self, dev: &mut dyn GraphicsDevice, name: &str, value: impl Into<UniformValue>) {
        debug_assert!(
            self.is_active(dev),
            "program '{}' must be active before setting '{name}'",
            self.label
        );
        let location = self.location(dev, name);
        if !location.is_found() {
            log::trace!("program '{}' has no uniform '{name}'", self.label);
        }
        dev.set_uniform(location, value.into());
    }

    /// Write through an already resolved location. The program must be active.
    pub fn set_at(&self, dev: &mut dyn GraphicsDevice, location: UniformLocation, value: impl Into<UniformValue>) {
        debug_assert!(self.is_active(dev), "program '{}' must be active", self.label);
        dev.set_uniform(location, value.into());
    }
}

/// A uniform location resolved on first use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachedLocation {
    #[default]
    Unresolved,
    Resolved(UniformLocation),
}

impl CachedLocation {
    /// The cached location, querying the program only the first time.
    pub fn resolve(&mut self, dev: &mut dyn GraphicsDevice, program: &Program, name: &str) -> UniformLocation {
        match *self {
            CachedLocation::Resolved(location) => location,
            CachedLocation::Unresolved => {
                let location = program.location(dev, name);
                *self = CachedLocation::Resolved(location);
                location
            }
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, CachedLocation::Resolved(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::HeadlessDevice;
    use crate::gpu::{FrontFace, UniformDecl, UniformKind, VertexLayout};

    fn desc() -> ProgramDesc {
        ProgramDesc {
            label: "gizmo".into(),
            source: "".into(),
            vertex_entry: "vs_main",
            fragment_entry: Some("fs_main"),
            vertex_layout: VertexLayout::Mesh,
            instanced: false,
            front_face: FrontFace::Ccw,
            uniforms: vec![
                UniformDecl::new("model", UniformKind::Mat4),
                UniformDecl::new("lightColor", UniformKind::Vec3),
            ],
            textures: vec![],
        }
    }

    #[test]
    fn set_by_name_reaches_the_device() {
        let mut dev = HeadlessDevice::default();
        let program = Program::new(&mut dev, &desc()).unwrap();
        program.use_program(&mut dev);
        program.set(&mut dev, "lightColor", glam::Vec3::ONE);
        assert_eq!(
            dev.uniform(program.id(), "lightColor"),
            Some(UniformValue::Vec3(glam::Vec3::ONE))
        );
    }

    #[test]
    fn cached_location_queries_once() {
        let mut dev = HeadlessDevice::default();
        let program = Program::new(&mut dev, &desc()).unwrap();
        let mut cached = CachedLocation::default();
        assert!(!cached.is_resolved());

        let first = cached.resolve(&mut dev, &program, "model");
        let second = cached.resolve(&mut dev, &program, "model");
        assert_eq!(first, second);
        assert_eq!(dev.location_queries_for("model"), 1);
    }

    #[test]
    fn not_found_stays_resolved() {
        let mut dev = HeadlessDevice::default();
        let program = Program::new(&mut dev, &desc()).unwrap();
        let mut cached = CachedLocation::default();
        assert_eq!(cached.resolve(&mut dev, &program, "nope"), UniformLocation::NOT_FOUND);
        cached.resolve(&mut dev, &program, "nope");
        assert_eq!(dev.location_queries(), 1);
    }
}
