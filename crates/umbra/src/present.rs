//! # Present — Multisampled Main Target and Screen Blit
//!
//! The main pass does not draw to the window directly. It draws into a
//! multisampled color + depth framebuffer, which is resolved into a
//! single-sampled texture and then drawn onto the screen with a full-screen
//! quad:
//!
//! ```text
//!   begin()                       present()
//!   ───────                       ─────────
//!   bind MSAA target              resolve MSAA color ──▶ resolved color
//!   clear color + depth           bind screen, depth test off
//!        │                        screen program samples resolved color
//!        ▼                        draw quad, depth test back on
//!   renderer.run_main_pass(target())
//! ```
//!
//! With `msaa_samples == 1` there is no resolve step; the quad samples the
//! render target's own color attachment.

use crate::config::RendererConfig;
use crate::error::RenderError;
use crate::geometry::GeometryBuffer;
use crate::gpu::{
    Clear, FramebufferDesc, FramebufferId, GraphicsDevice, Owned, RenderTarget, TextureId, Viewport,
};
use crate::programs::screen_desc;
use crate::shader::Program;
use crate::texture::{create_color_target, create_depth_target};

struct Attachments {
    framebuffer: Owned<FramebufferId>,
    color: Owned<TextureId>,
    _depth: Option<Owned<TextureId>>,
}

impl Attachments {
    fn create(
        dev: &mut dyn GraphicsDevice,
        label: &str,
        (width, height): (u32, u32),
        samples: u32,
        with_depth: bool,
    ) -> Self {
        let color = create_color_target(dev, &format!("{label} color"), width, height, samples);
        let depth = with_depth
            .then(|| create_depth_target(dev, &format!("{label} depth"), width, height, samples));
        let framebuffer = dev.create_framebuffer(&FramebufferDesc {
            label: label.into(),
            color: Some(color),
            depth,
        });
        let status = dev.framebuffer_status(framebuffer);
        if !status.is_complete() {
            log::error!("{label} framebuffer is not complete: {status:?}");
        }
        let queue = dev.release_queue();
        Self {
            framebuffer: Owned::new(framebuffer, queue.clone()),
            color: Owned::new(color, queue.clone()),
            _depth: depth.map(|d| Owned::new(d, queue)),
        }
    }
}

/// Off-screen target the main pass renders into, plus what it takes to put
/// the result on screen.
pub struct MainTarget {
    samples: u32,
    size: (u32, u32),
    clear_color: [f32; 4],
    render: Attachments,
    resolved: Option<Attachments>,
    quad: GeometryBuffer,
    program: Program,
}

impl MainTarget {
    /// Targets sized to the current screen, sampled per `config.msaa_samples`.
    pub fn new(dev: &mut dyn GraphicsDevice, config: &RendererConfig) -> Result<Self, RenderError> {
        let samples = config.msaa_samples.max(1);
        let size = dev.screen_size();
        let program = Program::new(dev, &screen_desc())?;
        let quad = GeometryBuffer::screen_quad(dev);
        let (render, resolved) = Self::attachments(dev, size, samples);
        log::debug!("main target {}x{} with {samples} samples", size.0, size.1);
        Ok(Self {
            samples,
            size,
            clear_color: config.clear_color,
            render,
            resolved,
            quad,
            program,
        })
    }

    fn attachments(dev: &mut dyn GraphicsDevice, size: (u32, u32), samples: u32) -> (Attachments, Option<Attachments>) {
        let size = (size.0.max(1), size.1.max(1));
        let render = Attachments::create(dev, "main target", size, samples, true);
        let resolved = (samples > 1).then(|| Attachments::create(dev, "resolve target", size, 1, false));
        (render, resolved)
    }

    /// What [`Renderer::run_main_pass`](crate::renderer::Renderer::run_main_pass) should draw into.
    pub fn target(&self) -> RenderTarget {
        RenderTarget::Framebuffer(self.render.framebuffer.id())
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Texture the screen quad samples.
    pub fn display_texture(&self) -> TextureId {
        self.resolved.as_ref().unwrap_or(&self.render).color.id()
    }

    /// Recreate the attachments if the screen size changed. Old attachments
    /// are released through the device queue.
    pub fn resize(&mut self, dev: &mut dyn GraphicsDevice) {
        let size = dev.screen_size();
        if size == self.size {
            return;
        }
        let (render, resolved) = Self::attachments(dev, size, self.samples);
        self.render = render;
        self.resolved = resolved;
        self.size = size;
        log::debug!("main target resized to {}x{}", size.0, size.1);
    }

    /// Bind and clear the main target.
    pub fn begin(&self, dev: &mut dyn GraphicsDevice) {
        dev.bind_target(self.target());
        dev.set_viewport(Viewport::sized(self.size.0, self.size.1));
        dev.clear(Clear::color_and_depth(self.clear_color));
    }

    /// Resolve (when multisampled) and draw the frame onto the screen.
    pub fn present(&self, dev: &mut dyn GraphicsDevice) {
        if let Some(resolved) = &self.resolved {
            dev.resolve(self.render.framebuffer.id(), resolved.framebuffer.id());
        }

        dev.bind_target(RenderTarget::Screen);
        let (width, height) = dev.screen_size();
        dev.set_viewport(Viewport::sized(width, height));
        dev.clear(Clear {
            color: Some(self.clear_color),
            depth: None,
        });
        dev.set_depth_test(false);
        dev.set_cull_face(None);
        dev.set_blend(None);

        self.program.use_program(dev);
        dev.bind_texture(0, self.display_texture());
        self.quad.draw(dev);
        dev.set_depth_test(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::Resource;
    use crate::gpu::headless::{Command, HeadlessDevice};

    #[test]
    fn multisampled_target_resolves_before_blit() {
        let mut dev = HeadlessDevice::new(640, 480);
        let target = MainTarget::new(&mut dev, &RendererConfig::default()).unwrap();
        assert!(dev.framebuffer_status(target.render.framebuffer.id()).is_complete());
        assert_eq!(dev.texture_desc(target.render.color.id()).unwrap().samples, 4);
        assert_eq!(dev.texture_desc(target.display_texture()).unwrap().samples, 1);

        target.begin(&mut dev);
        target.present(&mut dev);

        let resolve = dev
            .commands()
            .iter()
            .position(|c| matches!(c, Command::Resolve { .. }))
            .unwrap();
        let blit = dev.commands().iter().position(|c| matches!(c, Command::Draw(_))).unwrap();
        assert!(resolve < blit);

        let draw = dev.draws().next().unwrap();
        assert_eq!(draw.target, RenderTarget::Screen);
        assert!(!draw.depth_test);
        assert_eq!(draw.slots, vec![("screenTexture".to_string(), target.display_texture())]);
        assert_eq!(dev.commands().last(), Some(&Command::DepthTest(true)));
    }

    #[test]
    fn begin_clears_with_config_color() {
        let mut dev = HeadlessDevice::default();
        let config = RendererConfig {
            clear_color: [0.1, 0.2, 0.3, 1.0],
            ..Default::default()
        };
        let target = MainTarget::new(&mut dev, &config).unwrap();
        target.begin(&mut dev);
        assert!(dev.commands().contains(&Command::BindTarget(target.target())));
        assert!(dev
            .commands()
            .contains(&Command::Clear(Clear::color_and_depth([0.1, 0.2, 0.3, 1.0]))));
    }

    #[test]
    fn single_sample_skips_resolve() {
        let mut dev = HeadlessDevice::default();
        let config = RendererConfig {
            msaa_samples: 1,
            ..Default::default()
        };
        let target = MainTarget::new(&mut dev, &config).unwrap();
        target.present(&mut dev);
        assert!(!dev.commands().iter().any(|c| matches!(c, Command::Resolve { .. })));
        assert_eq!(target.display_texture(), target.render.color.id());
    }

    #[test]
    fn resize_replaces_and_releases_attachments() {
        let mut dev = HeadlessDevice::new(320, 240);
        let mut target = MainTarget::new(&mut dev, &RendererConfig::default()).unwrap();
        let old = target.render.framebuffer.id();

        target.resize(&mut dev);
        assert_eq!(target.render.framebuffer.id(), old, "same size keeps the targets");

        dev.set_screen_size(800, 600);
        target.resize(&mut dev);
        dev.collect_released();
        assert_eq!(target.size(), (800, 600));
        assert!(dev.destroyed().contains(&Resource::Framebuffer(old)));
        let color = dev.texture_desc(target.render.color.id()).unwrap();
        assert_eq!((color.width, color.height), (800, 600));
    }
}
