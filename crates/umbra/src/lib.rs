//! # Umbra — Forward Renderer with Shadow Mapping
//!
//! A small real-time 3D renderer: textured meshes and imported models lit by
//! one directional, one point and one spot light, with directional and
//! omnidirectional shadow maps, a cubemap skybox and light gizmos.
//!
//! Start with `use umbra::prelude::*`, open a [`WgpuDevice`](gpu::wgpu_backend::WgpuDevice)
//! on a window, then build a [`Renderer`](renderer::Renderer) and a
//! [`MainTarget`](present::MainTarget).

pub mod camera;
pub mod config;
pub mod error;
pub mod geometry;
pub mod gpu;
pub mod light;
pub mod logging;
pub mod model;
pub mod prelude;
pub mod present;
pub mod programs;
pub mod renderer;
pub mod shader;
pub mod shadow;
pub mod shapes;
pub mod texture;
pub mod vertex;
