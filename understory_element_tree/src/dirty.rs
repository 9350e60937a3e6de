// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty bits for cached geometry and the scopes that set them.

bitflags::bitflags! {
    /// Cached values of a node that must be recomputed before the next read.
    ///
    /// The three bits are independent: a node can have a valid rect and a stale
    /// viewport transform, for example after the canvas-to-viewport matrix changed.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct DirtyFlags: u8 {
        /// Untransformed canvas-space rect.
        const RECT               = 0b0000_0001;
        /// Transform from the node's untransformed space to canvas space.
        const CANVAS_TRANSFORM   = 0b0000_0010;
        /// Transform from the node's untransformed space to the viewport.
        const VIEWPORT_TRANSFORM = 0b0000_0100;
    }
}

impl Default for DirtyFlags {
    /// Everything is stale until computed once.
    fn default() -> Self {
        Self::all()
    }
}

/// How much of a node's cached geometry a change invalidates.
///
/// The scope passed to [`Tree::mark_dirty`](crate::Tree::mark_dirty) applies to
/// the node and all of its descendants.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Recompute {
    /// Anchors, offsets or a parent rect changed.
    ///
    /// Upgraded to [`Recompute::RectAndTransform`] on a node with rotation or
    /// scale, because its pivot moves with its rect.
    RectOnly,
    /// Rotation, scale, pivot or device scale changed.
    TransformOnly,
    /// Only the canvas-to-viewport matrix changed.
    ViewportTransformOnly,
    /// Both the rect and the transforms are stale.
    RectAndTransform,
}

impl Recompute {
    /// The dirty bits this scope sets.
    pub fn flags(self) -> DirtyFlags {
        match self {
            Self::RectOnly => DirtyFlags::RECT,
            Self::TransformOnly => DirtyFlags::CANVAS_TRANSFORM | DirtyFlags::VIEWPORT_TRANSFORM,
            Self::ViewportTransformOnly => DirtyFlags::VIEWPORT_TRANSFORM,
            Self::RectAndTransform => DirtyFlags::all(),
        }
    }

    /// True if this scope invalidates the rect.
    pub fn touches_rect(self) -> bool {
        matches!(self, Self::RectOnly | Self::RectAndTransform)
    }
}
