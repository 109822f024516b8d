//! Arena handles.
//!
//! Render targets, depth buffers, framebuffer objects and contexts live in
//! `slotmap` arenas and refer to each other only through these keys. A
//! destroyed record leaves its key dangling but never aliased: a stale key
//! simply fails to resolve.

use std::fmt;

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Handle to a render target record (window, render texture or MRT).
    pub struct RenderTargetId;

    /// Handle to a pooled or manual depth buffer.
    pub struct DepthBufferId;

    /// Handle to a framebuffer object.
    pub struct FboId;

    /// Handle to a logical GL context registered with a context group.
    pub struct ContextId;
}

/// Depth-buffer pool tag.
///
/// Render targets with the same pool id may share depth storage. Pool
/// [`PoolId::NO_DEPTH`] is never matched automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolId(pub u16);

impl PoolId {
    /// Targets in this pool render without a depth buffer unless one is
    /// attached explicitly.
    pub const NO_DEPTH: Self = Self(0);
    /// Pool used by targets that do not ask for anything else.
    pub const DEFAULT: Self = Self(1);

    #[inline]
    #[must_use]
    pub fn is_no_depth(self) -> bool {
        self == Self::NO_DEPTH
    }
}

impl Default for PoolId {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool#{}", self.0)
    }
}
