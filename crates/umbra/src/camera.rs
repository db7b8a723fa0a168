//! # Camera — View and Projection for the Main Pass
//!
//! The renderer only needs three things from a camera: a view matrix, a
//! projection matrix and the eye position (for specular highlights). That
//! contract is [`CameraView`]. [`FlyCamera`] is a free-flying yaw/pitch
//! camera that implements it, enough for demos and debugging.
//!
//! Projections use the `[-1, 1]` clip depth convention (`*_gl`); the
//! shaders remap depth to `[0, 1]` themselves.
//!
//! ```text
//!            +Y
//!             │   pitch (clamped to ±89°)
//!             │  ╱
//!             │ ╱
//!             └──────── +X
//!            ╱
//!          +Z      yaw = -90° looks down -Z
//! ```
//!
//! ## Comparison
//!
//! - **Bevy**: `Camera3d` + `Transform`, projection as a separate component.
//! - **LearnOpenGL**: The same Euler-angle fly camera.

use glam::{Mat4, Vec3};

/// What the renderer reads from a camera each frame.
pub trait CameraView {
    fn view(&self) -> Mat4;

    /// Projection for a viewport of the given aspect ratio (width / height).
    fn projection(&self, aspect: f32) -> Mat4;

    fn position(&self) -> Vec3;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlyCamera {
    pub position: Vec3,
    /// Degrees around +Y. -90 looks down -Z.
    pub yaw: f32,
    /// Degrees above the horizon.
    pub pitch: f32,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    /// World units per second.
    pub speed: f32,
    /// Degrees per pixel of mouse movement.
    pub sensitivity: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            yaw: -90.0,
            pitch: 0.0,
            fov_y: 45.0,
            near: 0.1,
            far: 100.0,
            speed: 2.5,
            sensitivity: 0.1,
        }
    }
}

impl FlyCamera {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn front(&self) -> Vec3 {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.front().cross(Vec3::Y).normalize()
    }

    pub fn up(&self) -> Vec3 {
        self.right().cross(self.front()).normalize()
    }

    pub fn process_movement(&mut self, movement: Movement, dt: f32) {
        let step = self.speed * dt;
        let delta = match movement {
            Movement::Forward => self.front(),
            Movement::Backward => -self.front(),
            Movement::Left => -self.right(),
            Movement::Right => self.right(),
            Movement::Up => Vec3::Y,
            Movement::Down => Vec3::NEG_Y,
        };
        self.position += delta * step;
    }

    /// Turn by a mouse delta in pixels. Positive `dy` looks down.
    pub fn process_mouse(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch = (self.pitch - dy * self.sensitivity).clamp(-89.0, 89.0);
    }

    /// Zoom by narrowing the field of view.
    pub fn process_scroll(&mut self, delta: f32) {
        self.fov_y = (self.fov_y - delta).clamp(1.0, 45.0);
    }
}

impl CameraView for FlyCamera {
    fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front(), Vec3::Y)
    }

    fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y.to_radians(), aspect.max(f32::EPSILON), self.near, self.far)
    }

    fn position(&self) -> Vec3 {
        self.position
    }
}
