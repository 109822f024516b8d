//! Render System Settings
//!
//! Startup configuration for a render system. Settings are plain data and can
//! be loaded from JSON; every field has a documented default, so a partial
//! document only overrides what it names.
//!
//! ```rust,ignore
//! use glint::{RenderSystemSettings, RttPreference};
//!
//! let settings = RenderSystemSettings {
//!     rtt_preference: RttPreference::Copy,
//!     fsaa: 4,
//!     ..Default::default()
//! };
//!
//! let from_file = RenderSystemSettings::from_json(r#"{ "fsaa": 2 }"#)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{GlintError, Result};

// ---------------------------------------------------------------------------
// RttPreference
// ---------------------------------------------------------------------------

/// Preferred render-to-texture strategy.
///
/// The render system walks down the list `Fbo → PBuffer → Copy`, starting at
/// the preference, and settles on the first strategy the driver supports.
/// `Copy` is always available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RttPreference {
    /// Framebuffer objects.
    #[default]
    Fbo,
    /// Off-screen pbuffer contexts.
    PBuffer,
    /// Render into the back buffer and copy into the texture.
    Copy,
}

// ---------------------------------------------------------------------------
// RenderSystemSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSystemSettings {
    /// Render-to-texture strategy to try first. Default: `Fbo`.
    pub rtt_preference: RttPreference,
    /// Default multisample count for new render textures; 0 disables MSAA.
    /// Clamped to the driver maximum. Default: 0.
    pub fsaa: u32,
    /// Rank packed depth24/stencil8 above every other depth/stencil mode.
    /// When false, packed formats compete on their depth and stencil bits
    /// alone. Default: true.
    pub prefer_packed_depth_stencil: bool,
    /// Edge length of the scratch surface used by the format probe.
    /// Default: 16.
    pub probe_size: u32,
    /// Run the empirical format probe at startup. When false, every
    /// uncompressed format with a native token is assumed valid with the
    /// no-depth mode only. Default: true.
    pub probe_formats: bool,
}

impl Default for RenderSystemSettings {
    fn default() -> Self {
        Self {
            rtt_preference: RttPreference::Fbo,
            fsaa: 0,
            prefer_packed_depth_stencil: true,
            probe_size: 16,
            probe_formats: true,
        }
    }
}

impl RenderSystemSettings {
    /// Parses settings from a JSON document. Missing fields keep their
    /// defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| GlintError::InvalidSettings(e.to_string()))
    }

    /// Serializes the settings to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| GlintError::InvalidSettings(e.to_string()))
    }
}
