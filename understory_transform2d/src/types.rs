// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Value types describing how an element attaches to its parent.

use core::ops::{Add, AddAssign};

use kurbo::Vec2;

/// Normalized attachment points of an element on its parent's rectangle.
///
/// Each value is a fraction of the parent's width (`left`, `right`) or height
/// (`top`, `bottom`). Values are conceptually in `[0, 1]` but are not clamped;
/// the only enforced rule is that a pair never ends up flipped
/// (see [`repair_anchors`](crate::repair_anchors)).
///
/// When `left == right` the element's horizontal extent does not follow the
/// parent and the horizontal [`Offsets`] encode a position and a size instead of
/// two independent edges. The same holds vertically for `top == bottom`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Anchors {
    /// Left edge as a fraction of the parent width.
    pub left: f64,
    /// Top edge as a fraction of the parent height.
    pub top: f64,
    /// Right edge as a fraction of the parent width.
    pub right: f64,
    /// Bottom edge as a fraction of the parent height.
    pub bottom: f64,
}

impl Anchors {
    /// Anchors stretched over the whole parent.
    pub const STRETCH: Self = Self::new(0.0, 0.0, 1.0, 1.0);
    /// All four anchors together at the parent's top-left corner.
    pub const TOP_LEFT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    /// All four anchors together at the parent's center.
    pub const CENTER: Self = Self::new(0.5, 0.5, 0.5, 0.5);

    /// Creates anchors from the four edges.
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Anchors with both pairs together at `(x, y)`.
    pub const fn at(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    /// True if the horizontal anchors coincide.
    pub fn together_x(&self) -> bool {
        self.left == self.right
    }

    /// True if the vertical anchors coincide.
    pub fn together_y(&self) -> bool {
        self.top == self.bottom
    }

    /// True if neither pair is flipped.
    pub fn is_ordered(&self) -> bool {
        self.left <= self.right && self.top <= self.bottom
    }
}

impl Default for Anchors {
    fn default() -> Self {
        Self::CENTER
    }
}

/// Pixel displacements added to the anchor-derived edges.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Offsets {
    /// Offset of the left edge.
    pub left: f64,
    /// Offset of the top edge.
    pub top: f64,
    /// Offset of the right edge.
    pub right: f64,
    /// Offset of the bottom edge.
    pub bottom: f64,
}

impl Offsets {
    /// All offsets zero.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Creates offsets from the four edges.
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rounds each offset down to a whole pixel.
    #[must_use]
    pub fn floor(self) -> Self {
        Self::new(
            self.left.floor(),
            self.top.floor(),
            self.right.floor(),
            self.bottom.floor(),
        )
    }
}

impl Default for Offsets {
    /// A 100×100 box centered on the anchors.
    fn default() -> Self {
        Self::new(-50.0, -50.0, 50.0, 50.0)
    }
}

impl Add<Vec2> for Offsets {
    type Output = Self;

    /// Moves all four edges by `delta` without resizing.
    fn add(self, delta: Vec2) -> Self {
        Self::new(
            self.left + delta.x,
            self.top + delta.y,
            self.right + delta.x,
            self.bottom + delta.y,
        )
    }
}

impl AddAssign<Vec2> for Offsets {
    fn add_assign(&mut self, delta: Vec2) {
        *self = *self + delta;
    }
}

/// How an element's scale follows the canvas device scale.
///
/// The device scale is the ratio of the actual output resolution to the
/// authored canvas resolution, per axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DeviceScaleMode {
    /// Scale is not affected by the device.
    #[default]
    None,
    /// Uniform scale by the smaller of the two axis factors.
    UniformScaleToFit,
    /// Uniform scale by the larger of the two axis factors.
    UniformScaleToFill,
    /// Uniform scale by the horizontal factor.
    UniformScaleToFitX,
    /// Uniform scale by the vertical factor.
    UniformScaleToFitY,
    /// Each axis scaled by its own factor.
    NonUniformScale,
    /// Only the horizontal axis is scaled.
    ScaleXOnly,
    /// Only the vertical axis is scaled.
    ScaleYOnly,
}

impl DeviceScaleMode {
    /// True if this mode changes the horizontal scale.
    pub fn affects_x(self) -> bool {
        !matches!(self, Self::None | Self::ScaleYOnly)
    }

    /// True if this mode changes the vertical scale.
    pub fn affects_y(self) -> bool {
        !matches!(self, Self::None | Self::ScaleXOnly)
    }

    /// True if both modes scale at least one common axis.
    pub fn shares_dimension_with(self, other: Self) -> bool {
        (self.affects_x() && other.affects_x()) || (self.affects_y() && other.affects_y())
    }

    /// Folds `device_scale` into an element's own `scale` according to this mode.
    pub fn apply(self, scale: Vec2, device_scale: Vec2) -> Vec2 {
        match self {
            Self::None => scale,
            Self::UniformScaleToFit => scale * device_scale.x.min(device_scale.y),
            Self::UniformScaleToFill => scale * device_scale.x.max(device_scale.y),
            Self::UniformScaleToFitX => scale * device_scale.x,
            Self::UniformScaleToFitY => scale * device_scale.y,
            Self::NonUniformScale => Vec2::new(scale.x * device_scale.x, scale.y * device_scale.y),
            Self::ScaleXOnly => Vec2::new(scale.x * device_scale.x, scale.y),
            Self::ScaleYOnly => Vec2::new(scale.x, scale.y * device_scale.y),
        }
    }
}
