//! # Handles — Typed GPU Resource Ids and Scoped Ownership
//!
//! Every GPU object the device creates is referred to by a small `Copy` id
//! (`GeometryId`, `TextureId`, ...). Ids are plain numbers: copying one does
//! not keep the resource alive and dropping one does not free it. That makes
//! them cheap to store in non-owning places like a
//! [`RenderObject`](crate::renderer::RenderObject).
//!
//! Ownership lives in [`Owned<H>`]. An `Owned` wraps one id together with the
//! device's [`ReleaseQueue`]. When it drops, the id is pushed onto the queue
//! exactly once; the device destroys queued resources the next time
//! [`collect_released`](super::GraphicsDevice::collect_released) runs (the
//! wgpu backend does this after each submitted frame).
//!
//! ```text
//!   Light ──owns──▶ ShadowTarget ──owns──▶ Owned<FramebufferId> ─┐
//!                                  └────▶ Owned<TextureId> ─────┤ drop
//!                                                                ▼
//!                                                   ReleaseQueue (Rc<RefCell<Vec>>)
//!                                                                │ collect_released()
//!                                                                ▼
//!                                                   device destroys each id once
//! ```
//!
//! Deferring the destroy has two benefits: resources dropped while a frame is
//! still being recorded stay valid until the frame is submitted, and owners
//! never need a `&mut` device in their `Drop` impl.
//!
//! ## Comparison
//!
//! - **wgpu**: Resources are reference counted and freed when the last
//!   handle drops. We sit one level above that with index handles.
//! - **Bevy**: `Handle<T>` strong/weak handles with an asset-event channel
//!   for drops. Our queue is the single-threaded version of that channel.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident, $variant:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// The zero id. Never returned for a live resource.
            pub const INVALID: Self = Self(0);

            /// True unless this is [`Self::INVALID`].
            pub fn is_valid(self) -> bool {
                self.0 != 0
            }

            /// Raw numeric value, mostly useful for logging.
            pub fn raw(self) -> u32 {
                self.0
            }
        }

        impl GpuHandle for $name {
            fn into_resource(self) -> Resource {
                Resource::$variant(self)
            }

            fn is_valid(self) -> bool {
                self.0 != 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($variant), self.0)
            }
        }
    };
}

gpu_handle!(
    /// Vertex buffer + optional index buffer + attribute layout.
    GeometryId,
    Geometry
);
gpu_handle!(
    /// Raw GPU buffer (uniform blocks, per-instance streams).
    BufferId,
    Buffer
);
gpu_handle!(
    /// 2D texture or cubemap. `TextureId::INVALID` is what failed loads return.
    TextureId,
    Texture
);
gpu_handle!(
    /// Render target made of color and/or depth attachments.
    FramebufferId,
    Framebuffer
);
gpu_handle!(
    /// Compiled shader program.
    ProgramId,
    Program
);

/// Any GPU resource id, as queued for destruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Geometry(GeometryId),
    Buffer(BufferId),
    Texture(TextureId),
    Framebuffer(FramebufferId),
    Program(ProgramId),
}

/// Implemented by every id newtype so [`Owned`] can release it generically.
pub trait GpuHandle: Copy + fmt::Debug {
    fn into_resource(self) -> Resource;

    fn is_valid(self) -> bool;
}

/// Shared list of resources waiting to be destroyed by the device.
///
/// Cloning shares the same underlying list. Not `Send`: the renderer is
/// single-threaded and everything that owns GPU state lives on that thread.
#[derive(Clone, Default)]
pub struct ReleaseQueue(Rc<RefCell<Vec<Resource>>>);

impl ReleaseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, resource: Resource) {
        self.0.borrow_mut().push(resource);
    }

    /// Take every pending resource, leaving the queue empty.
    pub fn drain(&self) -> Vec<Resource> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Copy of the pending list without draining it.
    pub fn pending(&self) -> Vec<Resource> {
        self.0.borrow().clone()
    }
}

impl fmt::Debug for ReleaseQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReleaseQueue").field(&self.0.borrow()).finish()
    }
}

/// Scoped owner of one GPU resource.
///
/// Released exactly once: on drop, or earlier through [`Owned::release`].
/// Owning an invalid id is allowed and releases nothing.
/// Not `Clone`; share the raw id with [`Owned::id`] instead.
pub struct Owned<H: GpuHandle> {
    id: H,
    queue: ReleaseQueue,
}

impl<H: GpuHandle> Owned<H> {
    pub fn new(id: H, queue: ReleaseQueue) -> Self {
        Self { id, queue }
    }

    pub fn id(&self) -> H {
        self.id
    }

    /// Explicit teardown. Equivalent to dropping.
    pub fn release(self) {}
}

impl<H: GpuHandle> Drop for Owned<H> {
    fn drop(&mut self) {
        if !GpuHandle::is_valid(self.id) {
            return;
        }
        log::trace!("queueing {:?} for release", self.id);
        self.queue.push(self.id.into_resource());
    }
}

impl<H: GpuHandle> fmt::Debug for Owned<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Owned").field(&self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owned_releases_once_on_drop() {
        let queue = ReleaseQueue::new();
        let owned = Owned::new(TextureId(7), queue.clone());
        assert!(queue.is_empty());
        drop(owned);
        assert_eq!(queue.drain(), vec![Resource::Texture(TextureId(7))]);
        assert!(queue.is_empty(), "drain should empty the queue");
    }

    #[test]
    fn explicit_release_does_not_double_queue() {
        let queue = ReleaseQueue::new();
        Owned::new(FramebufferId(3), queue.clone()).release();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn owning_an_invalid_id_releases_nothing() {
        let queue = ReleaseQueue::new();
        drop(Owned::new(TextureId::INVALID, queue.clone()));
        assert!(queue.is_empty());
    }

    #[test]
    fn invalid_ids() {
        assert!(!TextureId::INVALID.is_valid());
        assert!(TextureId(1).is_valid());
        assert_eq!(ProgramId(4).to_string(), "Program#4");
    }
}
