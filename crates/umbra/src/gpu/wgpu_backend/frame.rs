//! Frame recording for the wgpu backend.
//!
//! Draws are not encoded as they arrive. Each one is captured as a
//! [`RecordedDraw`] (pipeline key, uniform snapshot offset, resolved
//! textures) inside a [`RecordedPass`], and the whole frame is encoded in
//! `end_frame` once the uniform arena has been uploaded.
//!
//! ```text
//!   bind_target(A)  clear  draw  draw  bind_target(B)  draw  resolve
//!   └───────── pass 0 (A, clear) ──────┘└── pass 1 (B, load) ─┘└ pass 2 ┘
//! ```

use crate::gpu::{BufferId, FramebufferId, GeometryId, RenderTarget, SlotKind, Fallback, TextureId, Viewport};

use super::program::PipelineKey;

/// Texture a sampler slot reads for one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotSource {
    Texture(TextureId),
    Fallback(SlotKind, Fallback),
}

pub struct RecordedDraw {
    pub pipeline: PipelineKey,
    pub viewport: Viewport,
    pub geometry: GeometryId,
    pub count: u32,
    pub instances: u32,
    pub instance_buffer: Option<BufferId>,
    /// Offset of this draw's uniform snapshot in the arena.
    pub uniform_offset: u32,
    pub slots: Vec<SlotSource>,
}

pub struct DrawPass {
    pub target: RenderTarget,
    pub clear_color: Option<[f32; 4]>,
    pub clear_depth: Option<f32>,
    pub draws: Vec<RecordedDraw>,
}

pub enum RecordedPass {
    Draws(DrawPass),
    Resolve {
        source: FramebufferId,
        destination: FramebufferId,
    },
}

/// Passes recorded between `begin_frame` and `end_frame`.
#[derive(Default)]
pub struct FrameRecording {
    passes: Vec<RecordedPass>,
    /// The pass draws are still appended to.
    open: Option<DrawPass>,
}

impl FrameRecording {
    /// Draw list of the open pass for `target`, starting one with load ops
    /// if needed.
    pub fn pass_for(&mut self, target: RenderTarget) -> &mut Vec<RecordedDraw> {
        if self.open.as_ref().is_some_and(|pass| pass.target != target) {
            self.seal();
        }
        let pass = self.open.get_or_insert_with(|| DrawPass {
            target,
            clear_color: None,
            clear_depth: None,
            draws: Vec::new(),
        });
        &mut pass.draws
    }

    /// Clear `target`. Folds into the open pass if nothing was drawn yet.
    pub fn clear(&mut self, target: RenderTarget, color: Option<[f32; 4]>, depth: Option<f32>) {
        if self.open.as_ref().is_some_and(|pass| !pass.draws.is_empty()) {
            self.seal();
        }
        self.pass_for(target);
        if let Some(pass) = &mut self.open {
            pass.clear_color = color.or(pass.clear_color);
            pass.clear_depth = depth.or(pass.clear_depth);
        }
    }

    /// End the open pass.
    pub fn seal(&mut self) {
        if let Some(pass) = self.open.take() {
            self.passes.push(RecordedPass::Draws(pass));
        }
    }

    pub fn resolve(&mut self, source: FramebufferId, destination: FramebufferId) {
        self.seal();
        self.passes.push(RecordedPass::Resolve { source, destination });
    }

    /// Every pass in recording order.
    pub fn finish(mut self) -> Vec<RecordedPass> {
        self.seal();
        self.passes
    }
}

// ── Uniform arena ──────────────────────────────────────────────────────────

fn align_up(value: u64, align: u64) -> u64 {
    value.div_ceil(align) * align
}

/// Per-draw uniform snapshots, uploaded once per frame and bound at
/// group 1 with a dynamic offset.
pub struct UniformArena {
    data: Vec<u8>,
    alignment: u64,
    /// Binding size: the largest program block.
    window: u64,
    buffer: wgpu::Buffer,
    capacity: u64,
    bind_group: wgpu::BindGroup,
    bound_window: u64,
}

impl UniformArena {
    const INITIAL_CAPACITY: u64 = 64 * 1024;

    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> Self {
        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let window = 16;
        let (buffer, bind_group) = Self::allocate(device, layout, Self::INITIAL_CAPACITY, window);
        Self {
            data: Vec::new(),
            alignment,
            window,
            buffer,
            capacity: Self::INITIAL_CAPACITY,
            bind_group,
            bound_window: window,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        capacity: u64,
        window: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform arena"),
            size: capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform arena"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(window),
                }),
            }],
        });
        (buffer, bind_group)
    }

    /// Make room for blocks of up to `size` bytes.
    pub fn fit_block(&mut self, size: u32) {
        self.window = self.window.max(u64::from(size));
    }

    /// Append a snapshot and return its offset.
    pub fn push(&mut self, block: &[u8]) -> u32 {
        let offset = self.data.len();
        self.data.extend_from_slice(block);
        let end = align_up(self.data.len() as u64, self.alignment) as usize;
        self.data.resize(end, 0);
        offset as u32
    }

    pub fn reset(&mut self) {
        self.data.clear();
    }

    /// Grow if needed and write this frame's snapshots.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, layout: &wgpu::BindGroupLayout) {
        let needed = self.data.len() as u64 + self.window;
        if needed > self.capacity || self.window != self.bound_window {
            let capacity = needed.max(self.capacity).next_power_of_two();
            let (buffer, bind_group) = Self::allocate(device, layout, capacity, self.window);
            log::debug!("uniform arena grown to {capacity} bytes");
            self.buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
            self.bound_window = self.window;
        }
        if !self.data.is_empty() {
            queue.write_buffer(&self.buffer, 0, &self.data);
        }
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: RenderTarget = RenderTarget::Screen;
    const SHADOW: RenderTarget = RenderTarget::Framebuffer(FramebufferId(7));

    fn summary(frame: FrameRecording) -> Vec<(Option<RenderTarget>, Option<f32>, usize)> {
        frame
            .finish()
            .into_iter()
            .map(|p| match p {
                RecordedPass::Draws(pass) => (Some(pass.target), pass.clear_depth, pass.draws.len()),
                RecordedPass::Resolve { .. } => (None, None, 0),
            })
            .collect()
    }

    fn draw() -> RecordedDraw {
        RecordedDraw {
            pipeline: PipelineKey {
                program: crate::gpu::ProgramId(1),
                color: None,
                depth: None,
                samples: 1,
                cull: None,
                depth_test: true,
                blend: None,
            },
            viewport: Viewport::sized(1, 1),
            geometry: GeometryId(1),
            count: 3,
            instances: 1,
            instance_buffer: None,
            uniform_offset: 0,
            slots: Vec::new(),
        }
    }

    #[test]
    fn clear_before_draws_folds_into_the_pass() {
        let mut frame = FrameRecording::default();
        frame.pass_for(SHADOW);
        frame.clear(SHADOW, None, Some(1.0));
        frame.pass_for(SHADOW).push(draw());
        assert_eq!(summary(frame), vec![(Some(SHADOW), Some(1.0), 1)]);
    }

    #[test]
    fn retargeting_starts_a_new_pass() {
        let mut frame = FrameRecording::default();
        frame.clear(SHADOW, None, Some(1.0));
        frame.pass_for(SCREEN).push(draw());
        assert_eq!(summary(frame), vec![(Some(SHADOW), Some(1.0), 0), (Some(SCREEN), None, 1)]);
    }

    #[test]
    fn clear_after_draws_opens_another_pass() {
        let mut frame = FrameRecording::default();
        frame.clear(SCREEN, None, Some(1.0));
        frame.pass_for(SCREEN).push(draw());
        frame.clear(SCREEN, None, Some(1.0));
        frame.pass_for(SCREEN).push(draw());
        assert_eq!(
            summary(frame),
            vec![(Some(SCREEN), Some(1.0), 1), (Some(SCREEN), Some(1.0), 1)]
        );
    }

    #[test]
    fn resolve_closes_the_open_pass() {
        let mut frame = FrameRecording::default();
        frame.pass_for(SCREEN).push(draw());
        frame.resolve(FramebufferId(1), FramebufferId(2));
        frame.pass_for(SCREEN).push(draw());
        assert_eq!(
            summary(frame),
            vec![(Some(SCREEN), None, 1), (None, None, 0), (Some(SCREEN), None, 1)]
        );
    }
}
