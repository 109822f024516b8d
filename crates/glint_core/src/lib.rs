//! Glint core types.
//!
//! Plain data shared by every Glint crate: the typed GL vocabulary, pixel and
//! depth/stencil formats, arena handles, driver capabilities, startup settings
//! and the error type.

pub mod capabilities;
pub mod errors;
pub mod format;
pub mod gl_types;
pub mod handles;
pub mod settings;

pub use capabilities::{DriverCapabilities, DriverQuirks, RenderCapabilities};
pub use errors::{GlintError, Result};
pub use format::{DepthFormat, DepthStencilMode, PixelFormat, StencilFormat};
pub use handles::{ContextId, DepthBufferId, FboId, PoolId, RenderTargetId};
pub use settings::{RenderSystemSettings, RttPreference};
