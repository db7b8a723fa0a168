//! # Geometry — Owned Vertex/Index Buffers
//!
//! A [`GeometryBuffer`] owns one device geometry (vertex buffer, optional
//! index buffer, attribute layout) and remembers how many elements to draw.
//! The renderer's built-in primitives come from [`crate::shapes`]; model
//! meshes build theirs from imported data.
//!
//! Dropping a `GeometryBuffer` queues its GPU storage for release.
//! Anything that only *refers* to geometry (a
//! [`RenderObject`](crate::renderer::RenderObject)) copies the
//! [`GeometryId`] instead and must not outlive the owner.

use crate::gpu::{DrawCall, GeometryDesc, GeometryId, GraphicsDevice, Owned, VertexLayout};
use crate::shapes;
use crate::vertex::{MeshVertex, ScreenVertex};

#[derive(Debug)]
pub struct GeometryBuffer {
    geometry: Owned<GeometryId>,
    layout: VertexLayout,
    vertex_count: u32,
    index_count: Option<u32>,
}

impl GeometryBuffer {
    fn upload(
        dev: &mut dyn GraphicsDevice,
        label: &str,
        layout: VertexLayout,
        vertices: &[u8],
        indices: Option<&[u32]>,
    ) -> Self {
        let id = dev.create_geometry(&GeometryDesc {
            label,
            layout,
            vertices,
            indices,
        });
        Self {
            geometry: Owned::new(id, dev.release_queue()),
            layout,
            vertex_count: (vertices.len() / layout.stride()) as u32,
            index_count: indices.map(|i| i.len() as u32),
        }
    }

    /// Indexed lit-mesh geometry.
    pub fn from_mesh(
        dev: &mut dyn GraphicsDevice,
        label: &str,
        vertices: &[MeshVertex],
        indices: &[u32],
    ) -> Self {
        Self::upload(
            dev,
            label,
            VertexLayout::Mesh,
            bytemuck::cast_slice(vertices),
            Some(indices),
        )
    }

    /// Unindexed position-only geometry.
    pub fn from_positions(dev: &mut dyn GraphicsDevice, label: &str, positions: &[[f32; 3]]) -> Self {
        Self::upload(
            dev,
            label,
            VertexLayout::Position,
            bytemuck::cast_slice(positions),
            None,
        )
    }

    pub fn from_screen_vertices(
        dev: &mut dyn GraphicsDevice,
        label: &str,
        vertices: &[ScreenVertex],
        indices: &[u32],
    ) -> Self {
        Self::upload(
            dev,
            label,
            VertexLayout::ScreenQuad,
            bytemuck::cast_slice(vertices),
            Some(indices),
        )
    }

    pub fn cube(dev: &mut dyn GraphicsDevice) -> Self {
        let (vertices, indices) = shapes::cube();
        Self::from_mesh(dev, "cube", &vertices, &indices)
    }

    pub fn sphere(dev: &mut dyn GraphicsDevice, segments: u32, rings: u32, radius: f32) -> Self {
        let (vertices, indices) = shapes::sphere(segments, rings, radius);
        Self::from_mesh(dev, "sphere", &vertices, &indices)
    }

    pub fn skybox(dev: &mut dyn GraphicsDevice) -> Self {
        Self::from_positions(dev, "skybox", &shapes::skybox())
    }

    pub fn screen_quad(dev: &mut dyn GraphicsDevice) -> Self {
        let (vertices, indices) = shapes::screen_quad();
        Self::from_screen_vertices(dev, "screen quad", &vertices, &indices)
    }

    pub fn id(&self) -> GeometryId {
        self.geometry.id()
    }

    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> Option<u32> {
        self.index_count
    }

    /// Elements one draw covers: indices when indexed, vertices otherwise.
    pub fn element_count(&self) -> u32 {
        self.index_count.unwrap_or(self.vertex_count)
    }

    pub fn draw_call(&self) -> DrawCall {
        DrawCall::new(self.id(), self.element_count())
    }

    /// Draw everything with the currently bound program and state.
    pub fn draw(&self, dev: &mut dyn GraphicsDevice) {
        dev.draw(&self.draw_call());
    }
}
