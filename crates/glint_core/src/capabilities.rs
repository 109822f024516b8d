//! Driver capability reporting.
//!
//! [`DriverCapabilities`] is filled once from the driver when a render system
//! starts. [`DriverQuirks`] lists known driver bugs the probe and the FBO code
//! must work around.

use bitflags::bitflags;

bitflags! {
    /// Features the active driver reports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RenderCapabilities: u32 {
        /// Framebuffer objects.
        const FRAMEBUFFER_OBJECT = 1 << 0;
        /// Off-screen pbuffer contexts.
        const PBUFFER = 1 << 1;
        /// Render targets can be sampled directly as textures.
        const HWRENDER_TO_TEXTURE = 1 << 2;
        /// A depth buffer may be larger than the target it is attached to.
        const RTT_DEPTHBUFFER_RESOLUTION_LESSEQUAL = 1 << 3;
        /// Multisample rendering into a separate buffer followed by a blit.
        const SEPARATE_MULTISAMPLE_RESOLVE = 1 << 4;
        /// Combined depth/stencil storage formats.
        const PACKED_DEPTH_STENCIL = 1 << 5;
        /// `glBlendEquationSeparate` / `glBlendFuncSeparate`.
        const BLEND_EQUATION_SEPARATE = 1 << 6;
        /// `glGetInternalformativ(GL_FRAMEBUFFER_RENDERABLE)`.
        const INTERNAL_FORMAT_QUERY = 1 << 7;
        /// Multiple simultaneous colour attachments.
        const MULTI_RENDER_TARGETS = 1 << 8;
        /// sRGB-encoded framebuffer writes.
        const FRAMEBUFFER_SRGB = 1 << 9;
    }
}

bitflags! {
    /// Known driver bugs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DriverQuirks: u32 {
        /// Crashes when probing colour formats lacking red, green or blue.
        const ATI_NON_RGB_CRASH = 1 << 0;
        /// A failed completeness check corrupts the bound framebuffer until the
        /// pipeline is flushed and the framebuffer recreated.
        const CORRUPT_AFTER_FAILED_PROBE = 1 << 1;
        /// Needs `glFinish` between probed formats.
        const FINISH_BETWEEN_PROBES = 1 << 2;
    }
}

/// Everything the render system needs to know about the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverCapabilities {
    pub flags: RenderCapabilities,
    pub quirks: DriverQuirks,
    pub num_texture_units: u32,
    pub max_samples: u32,
    pub num_multi_render_targets: u32,
    pub vendor: String,
}

impl DriverCapabilities {
    #[inline]
    #[must_use]
    pub fn has(&self, flag: RenderCapabilities) -> bool {
        self.flags.contains(flag)
    }

    #[inline]
    #[must_use]
    pub fn has_quirk(&self, quirk: DriverQuirks) -> bool {
        self.quirks.contains(quirk)
    }
}

impl Default for DriverCapabilities {
    /// A GL 3.3-class desktop driver.
    fn default() -> Self {
        Self {
            flags: RenderCapabilities::FRAMEBUFFER_OBJECT
                | RenderCapabilities::HWRENDER_TO_TEXTURE
                | RenderCapabilities::RTT_DEPTHBUFFER_RESOLUTION_LESSEQUAL
                | RenderCapabilities::SEPARATE_MULTISAMPLE_RESOLVE
                | RenderCapabilities::PACKED_DEPTH_STENCIL
                | RenderCapabilities::BLEND_EQUATION_SEPARATE
                | RenderCapabilities::MULTI_RENDER_TARGETS
                | RenderCapabilities::FRAMEBUFFER_SRGB,
            quirks: DriverQuirks::empty(),
            num_texture_units: 16,
            max_samples: 8,
            num_multi_render_targets: 8,
            vendor: String::from("generic"),
        }
    }
}
