//! Error Types
//!
//! The main error type [`GlintError`] covers every failure this workspace
//! reports:
//! - Surface configuration errors, raised by the call that introduced the
//!   inconsistency
//! - Resource exhaustion, which is fatal and never retried
//! - Lookup failures for stale arena handles
//! - Context registration failures
//!
//! Capability shortfalls (texture unit out of range, unsupported FSAA level)
//! are not errors; they are reported through `bool`/`Option` results.
//!
//! All fallible APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, GlintError>`.

use thiserror::Error;

use crate::format::PixelFormat;
use crate::gl_types::{FramebufferStatus, GlError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GlintError {
    // ========================================================================
    // Surface Configuration Errors
    // ========================================================================
    /// A framebuffer object was initialised without a colour surface in
    /// slot 0.
    #[error("Attachment 0 must have a surface attached")]
    MissingColourAttachment,

    /// A colour surface does not match the size or sample count of the
    /// surfaces already attached.
    #[error(
        "Attachment {slot} has incompatible size {found_width}x{found_height} ({found_samples} samples); \
         it must be {width}x{height} ({samples} samples)"
    )]
    AttachmentSizeMismatch {
        slot: usize,
        width: u32,
        height: u32,
        samples: u32,
        found_width: u32,
        found_height: u32,
        found_samples: u32,
    },

    /// A colour surface does not share the format of slot 0.
    #[error("Attachment {slot} has incompatible format {found}; it must be {expected}")]
    AttachmentFormatMismatch {
        slot: usize,
        expected: PixelFormat,
        found: PixelFormat,
    },

    /// Colour slot beyond the maximum number of attachments.
    #[error("Attachment slot {slot} out of range (max {max})")]
    AttachmentSlotOutOfRange { slot: usize, max: usize },

    /// The driver rejected the combination of attached formats.
    #[error("All framebuffer formats with this texture internal format {format} unsupported")]
    UnsupportedFormatCombination { format: PixelFormat },

    /// The framebuffer is incomplete for a reason other than its formats.
    #[error("Framebuffer incomplete: {status:?}")]
    IncompleteFramebuffer { status: FramebufferStatus },

    /// The format cannot be used as a render target on this driver.
    #[error("Pixel format {0} is not renderable on this driver")]
    UnsupportedFormat(PixelFormat),

    /// Multiple render targets need framebuffer objects.
    #[error("Multi render targets are not supported by the {0} render-to-texture path")]
    MultiRenderTargetUnsupported(&'static str),

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// The driver ran out of memory allocating storage.
    #[error("Out of GPU memory allocating {what} ({width}x{height})")]
    OutOfMemory {
        what: &'static str,
        width: u32,
        height: u32,
    },

    /// The render target handle does not resolve.
    #[error("Unknown render target")]
    UnknownRenderTarget,

    /// The depth buffer handle does not resolve.
    #[error("Unknown depth buffer")]
    UnknownDepthBuffer,

    /// The framebuffer object handle does not resolve.
    #[error("Unknown framebuffer object")]
    UnknownFramebuffer,

    /// The depth buffer cannot serve the render target.
    #[error("Depth buffer is not compatible with the render target")]
    IncompatibleDepthBuffer,

    /// A manual depth buffer was released while still attached.
    #[error("Depth buffer is still attached to {attached} render target(s)")]
    DepthBufferInUse { attached: usize },

    /// A driver call raised an error other than exhaustion.
    #[error("GL error {error:?} in {call}")]
    DriverError { call: &'static str, error: GlError },

    // ========================================================================
    // Context Errors
    // ========================================================================
    /// Thread registration needs a main context to clone.
    #[error("Cannot register a background thread: no main context is registered")]
    NoMainContext,

    /// The context handle does not resolve.
    #[error("Unknown GL context")]
    UnknownContext,

    /// The driver failed to create a shared context.
    #[error("Failed to create GL context: {0}")]
    ContextCreationFailed(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Settings could not be parsed.
    #[error("Invalid render system settings: {0}")]
    InvalidSettings(String),
}

impl GlintError {
    /// Whether the error is resource exhaustion.
    ///
    /// Fatal errors propagate to the caller unchanged; nothing in this
    /// workspace retries or downgrades the request.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::OutOfMemory { .. } | Self::ContextCreationFailed(_)
        )
    }
}

/// Alias for `Result<T, GlintError>`.
pub type Result<T> = std::result::Result<T, GlintError>;
