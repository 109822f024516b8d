//! Glint render-state layer.
//!
//! Everything between the renderer and the GL driver: the per-context
//! [`StateCache`], framebuffer objects and their surfaces, the startup
//! [`CapabilityProbe`], the [`DepthBufferPool`], the render-to-texture paths
//! and the [`RenderSystem`] facade that ties them together.
//!
//! All native calls go through the [`GlDriver`] trait; [`HeadlessDriver`]
//! implements it without a GPU.

pub mod context;
pub mod depth;
pub mod driver;
pub mod fbo;
pub mod probe;
pub mod render_system;
pub mod rtt;
pub mod state;
pub mod surface;
pub mod target;

pub use context::{ContextGroup, ContextKind, ContextSet, GlContext};
pub use depth::{DepthBuffer, DepthBufferPool, DepthRequest, DepthStorage};
pub use driver::{GlDriver, HeadlessDriver, HeadlessProfile, MaterialParam, NativeContext};
pub use fbo::{ContextFramebuffers, DepthAttachment, FrameBufferObject, MAX_COLOUR_ATTACHMENTS};
pub use probe::{CapabilityProbe, FormatCompatibilityTable, FormatProperties};
pub use render_system::{RenderSystem, RenderTextureDesc, WindowDesc};
pub use rtt::{CopyingManager, FboManager, PBufferManager, RttManager};
pub use state::{BlendState, CacheStats, StateCache};
pub use surface::{RenderBuffer, RenderBufferPool, SurfaceDesc, SurfaceSource};
pub use target::{AttributeValue, RenderTarget, RttBacking, TargetAttribute, TargetKind};
