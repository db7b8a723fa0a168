//! Convenience re-exports: `use umbra::prelude::*` for the common items.

pub use crate::camera::{CameraView, FlyCamera, Movement};
pub use crate::config::RendererConfig;
pub use crate::error::RenderError;
pub use crate::geometry::GeometryBuffer;
pub use crate::gpu::headless::HeadlessDevice;
pub use crate::gpu::wgpu_backend::WgpuDevice;
pub use crate::gpu::{GraphicsDevice, Owned, RenderTarget, TextureId};
pub use crate::light::{Attenuation, Light, LightDesc, LightKind};
pub use crate::logging::{LoggingConfig, init_logging};
pub use crate::model::Model;
pub use crate::present::MainTarget;
pub use crate::renderer::{FramePhase, RenderObject, Renderer};
pub use crate::texture::{load_skybox, load_texture};
pub use glam::{Mat4, Quat, Vec3, Vec4};
