//! Depth Buffer Pool
//!
//! Depth/stencil buffers are shared between render targets that can use the
//! same storage. Every render target carries a [`PoolId`]; a target looking
//! for a depth buffer first walks the buffers of its pool and takes the
//! first compatible one, and only allocates when none fits.
//!
//! # Back-references
//!
//! ```text
//!   RenderTarget ──depth_buffer──▶ DepthBufferId
//!         ▲                              │
//!         └──────── attached[] ◀─────────┘
//! ```
//!
//! Both sides are arena handles. [`DepthBufferPool::attach`] and
//! [`DepthBufferPool::detach`] maintain the buffer side; the render system
//! keeps the target side in step.
//!
//! # Lifetime
//!
//! - **Manual** buffers are created on request and are never destroyed by
//!   the pool. They must be released with [`DepthBufferPool::release_manual`].
//! - **Pooled** buffers are destroyed by [`DepthBufferPool::cleanup`] once no
//!   target references them.

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;

use glint_core::errors::{GlintError, Result};
use glint_core::format::DepthStencilMode;
use glint_core::handles::{ContextId, DepthBufferId, PoolId, RenderTargetId};

use crate::driver::GlDriver;
use crate::fbo::DepthAttachment;
use crate::state::StateCache;
use crate::surface::RenderBuffer;

/// Bit depth recorded for depth surfaces owned by a window or pbuffer.
pub const SURFACE_DEPTH_BITS: u32 = 24;

// ─── DepthStorage ─────────────────────────────────────────────────────────────

/// Renderbuffers backing a framebuffer-object depth buffer.
///
/// A packed buffer holds depth and stencil in one renderbuffer, which is
/// attached at both attachment points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthStorage {
    pub depth: Option<RenderBuffer>,
    pub stencil: Option<RenderBuffer>,
    pub packed: bool,
}

impl DepthStorage {
    /// Allocates renderbuffers for `mode`.
    ///
    /// Allocation failure is fatal: the error is returned as-is and nothing
    /// already allocated is leaked.
    pub fn create(
        gl: &mut dyn GlDriver,
        state: &mut StateCache,
        mode: DepthStencilMode,
        width: u32,
        height: u32,
        samples: u32,
    ) -> Result<Self> {
        let depth = match mode.depth.gl_token() {
            Some(token) => Some(RenderBuffer::create(gl, state, "depth buffer", token, width, height, samples)?),
            None => None,
        };

        if mode.depth.is_packed() {
            return Ok(Self {
                depth,
                stencil: depth,
                packed: true,
            });
        }

        let stencil = match mode.stencil.gl_token() {
            Some(token) => {
                match RenderBuffer::create(gl, state, "stencil buffer", token, width, height, samples) {
                    Ok(rb) => Some(rb),
                    Err(err) => {
                        if let Some(depth) = depth {
                            depth.destroy(gl, state);
                        }
                        return Err(err);
                    }
                }
            }
            None => None,
        };

        Ok(Self {
            depth,
            stencil,
            packed: false,
        })
    }

    #[must_use]
    pub fn attachment(&self) -> DepthAttachment {
        DepthAttachment {
            depth: self.depth.map_or(0, |rb| rb.name),
            stencil: self.stencil.map_or(0, |rb| rb.name),
        }
    }

    pub fn destroy(self, gl: &mut dyn GlDriver, state: &mut StateCache) {
        if let Some(depth) = self.depth {
            depth.destroy(gl, state);
        }
        if !self.packed
            && let Some(stencil) = self.stencil
        {
            stencil.destroy(gl, state);
        }
    }
}

// ─── DepthRequest ─────────────────────────────────────────────────────────────

/// What a render target needs from a depth buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthRequest {
    pub pool_id: PoolId,
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    pub bit_depth: u32,
    /// Depth/stencil mode for framebuffer-object targets. `None` for targets
    /// rendering into a window or pbuffer surface.
    pub mode: Option<DepthStencilMode>,
    pub context: Option<ContextId>,
}

// ─── DepthBuffer ──────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct DepthBuffer {
    pool_id: PoolId,
    bit_depth: u32,
    width: u32,
    height: u32,
    samples: u32,
    manual: bool,
    mode: Option<DepthStencilMode>,
    storage: Option<DepthStorage>,
    context: Option<ContextId>,
    attached: SmallVec<[RenderTargetId; 4]>,
}

impl DepthBuffer {
    /// A depth buffer backed by renderbuffers.
    #[must_use]
    pub fn with_storage(
        pool_id: PoolId,
        mode: DepthStencilMode,
        storage: DepthStorage,
        width: u32,
        height: u32,
        samples: u32,
        context: Option<ContextId>,
        manual: bool,
    ) -> Self {
        Self {
            pool_id,
            bit_depth: mode.depth.bits(),
            width,
            height,
            samples,
            manual,
            mode: Some(mode),
            storage: Some(storage),
            context,
            attached: SmallVec::new(),
        }
    }

    /// A record standing for the depth surface of a window or pbuffer. It
    /// owns no storage.
    #[must_use]
    pub fn surface(
        pool_id: PoolId,
        width: u32,
        height: u32,
        samples: u32,
        context: Option<ContextId>,
        manual: bool,
    ) -> Self {
        Self {
            pool_id,
            bit_depth: SURFACE_DEPTH_BITS,
            width,
            height,
            samples,
            manual,
            mode: None,
            storage: None,
            context,
            attached: SmallVec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    #[inline]
    #[must_use]
    pub fn bit_depth(&self) -> u32 {
        self.bit_depth
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn samples(&self) -> u32 {
        self.samples
    }

    #[inline]
    #[must_use]
    pub fn is_manual(&self) -> bool {
        self.manual
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> Option<DepthStencilMode> {
        self.mode
    }

    #[inline]
    #[must_use]
    pub fn storage(&self) -> Option<&DepthStorage> {
        self.storage.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> Option<ContextId> {
        self.context
    }

    #[inline]
    #[must_use]
    pub fn attached(&self) -> &[RenderTargetId] {
        &self.attached
    }

    /// Whether this buffer can serve `req`.
    ///
    /// - same pool
    /// - at least as large as the target with `lessequal`, exactly as large
    ///   without it
    /// - same sample count and bit depth
    /// - same depth/stencil mode; framebuffer-object targets never take a
    ///   storage-less surface record and vice versa
    /// - created in the same context
    #[must_use]
    pub fn is_compatible(&self, req: &DepthRequest, lessequal: bool) -> bool {
        if self.pool_id != req.pool_id {
            return false;
        }
        let size_ok = if lessequal {
            self.width >= req.width && self.height >= req.height
        } else {
            self.width == req.width && self.height == req.height
        };
        size_ok
            && self.samples == req.samples
            && self.bit_depth == req.bit_depth
            && self.mode == req.mode
            && self.context == req.context
    }

    /// Frees the storage.
    pub fn destroy(mut self, gl: &mut dyn GlDriver, state: &mut StateCache) {
        if let Some(storage) = self.storage.take() {
            storage.destroy(gl, state);
        }
    }
}

// ─── DepthBufferPool ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct DepthBufferPool {
    buffers: SlotMap<DepthBufferId, DepthBuffer>,
    pools: FxHashMap<PoolId, Vec<DepthBufferId>>,
    lessequal: bool,
}

impl DepthBufferPool {
    /// `lessequal`: targets may use depth buffers larger than themselves.
    #[must_use]
    pub fn new(lessequal: bool) -> Self {
        Self {
            lessequal,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn allows_larger(&self) -> bool {
        self.lessequal
    }

    /// First buffer in the request's pool that can serve it. Pool
    /// [`PoolId::NO_DEPTH`] never matches.
    #[must_use]
    pub fn find_compatible(&self, req: &DepthRequest) -> Option<DepthBufferId> {
        if req.pool_id.is_no_depth() {
            return None;
        }
        self.pools.get(&req.pool_id)?.iter().copied().find(|&id| {
            self.buffers
                .get(id)
                .is_some_and(|b| b.is_compatible(req, self.lessequal))
        })
    }

    /// Whether the buffer `id` can serve `req`.
    #[must_use]
    pub fn is_compatible(&self, id: DepthBufferId, req: &DepthRequest) -> bool {
        self.buffers
            .get(id)
            .is_some_and(|b| b.is_compatible(req, self.lessequal))
    }

    pub fn insert(&mut self, buffer: DepthBuffer) -> DepthBufferId {
        let pool = buffer.pool_id;
        log::debug!(
            "Depth buffer {}x{} ({} samples, {}-bit) added to {pool}",
            buffer.width,
            buffer.height,
            buffer.samples,
            buffer.bit_depth
        );
        let id = self.buffers.insert(buffer);
        self.pools.entry(pool).or_default().push(id);
        id
    }

    /// Records that `target` uses the buffer.
    pub fn attach(&mut self, id: DepthBufferId, target: RenderTargetId) -> Result<()> {
        let buffer = self.buffers.get_mut(id).ok_or(GlintError::UnknownDepthBuffer)?;
        if !buffer.attached.contains(&target) {
            buffer.attached.push(target);
        }
        Ok(())
    }

    /// Removes the back-reference from the buffer. The buffer itself is
    /// left alone.
    pub fn detach(&mut self, id: DepthBufferId, target: RenderTargetId) -> Result<()> {
        let buffer = self.buffers.get_mut(id).ok_or(GlintError::UnknownDepthBuffer)?;
        buffer.attached.retain(|t| *t != target);
        Ok(())
    }

    /// Removes a manual buffer so its storage can be freed.
    ///
    /// Fails for pooled buffers, which [`cleanup`](Self::cleanup) owns, and
    /// while any target still uses the buffer.
    pub fn release_manual(&mut self, id: DepthBufferId) -> Result<DepthBuffer> {
        let buffer = self.buffers.get(id).ok_or(GlintError::UnknownDepthBuffer)?;
        if !buffer.manual {
            return Err(GlintError::IncompatibleDepthBuffer);
        }
        if !buffer.attached.is_empty() {
            return Err(GlintError::DepthBufferInUse {
                attached: buffer.attached.len(),
            });
        }
        self.remove(id).ok_or(GlintError::UnknownDepthBuffer)
    }

    /// Turns a manual buffer into a pooled one, so the first
    /// [`cleanup`](Self::cleanup) after its last user detaches destroys it.
    pub fn hand_over(&mut self, id: DepthBufferId) -> Result<()> {
        let buffer = self.buffers.get_mut(id).ok_or(GlintError::UnknownDepthBuffer)?;
        buffer.manual = false;
        Ok(())
    }

    /// Destroys every pooled buffer no target references. Returns how many
    /// were destroyed.
    pub fn cleanup(&mut self, gl: &mut dyn GlDriver, state: &mut StateCache) -> usize {
        let orphans: Vec<DepthBufferId> = self
            .buffers
            .iter()
            .filter(|(_, b)| !b.manual && b.attached.is_empty())
            .map(|(id, _)| id)
            .collect();
        for &id in &orphans {
            if let Some(buffer) = self.remove(id) {
                log::debug!("Destroying unused depth buffer {}x{} from {}", buffer.width, buffer.height, buffer.pool_id);
                buffer.destroy(gl, state);
            }
        }
        orphans.len()
    }

    /// Destroys every buffer, manual ones included.
    pub fn clear(&mut self, gl: &mut dyn GlDriver, state: &mut StateCache) {
        self.pools.clear();
        for (_, buffer) in self.buffers.drain() {
            buffer.destroy(gl, state);
        }
    }

    fn remove(&mut self, id: DepthBufferId) -> Option<DepthBuffer> {
        let buffer = self.buffers.remove(id)?;
        if let Some(list) = self.pools.get_mut(&buffer.pool_id) {
            list.retain(|b| *b != id);
            if list.is_empty() {
                self.pools.remove(&buffer.pool_id);
            }
        }
        Some(buffer)
    }

    #[must_use]
    pub fn get(&self, id: DepthBufferId) -> Option<&DepthBuffer> {
        self.buffers.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: DepthBufferId) -> bool {
        self.buffers.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Number of buffers in `pool`.
    #[must_use]
    pub fn pool_len(&self, pool: PoolId) -> usize {
        self.pools.get(&pool).map_or(0, Vec::len)
    }

    /// Number of targets attached to `id`; 0 for unknown buffers.
    #[must_use]
    pub fn attached_count(&self, id: DepthBufferId) -> usize {
        self.buffers.get(id).map_or(0, |b| b.attached.len())
    }
}
