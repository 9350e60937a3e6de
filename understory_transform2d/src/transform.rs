// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rotation and scale about a pivot.

use kurbo::{Affine, Point, Rect, Vec2};

use crate::{DeviceScaleMode, pivot_point};

/// Scale factors with a smaller magnitude are treated as zero.
pub const SCALE_EPSILON: f64 = f32::EPSILON as f64;

/// The rotate/scale part of an element's transform data.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    /// Normalized pivot within the element's own rect.
    pub pivot: Point,
    /// Rotation about the pivot, in degrees. Positive values turn clockwise on a y-down canvas.
    pub rotation: f64,
    /// Scale about the pivot.
    pub scale: Vec2,
    /// How the canvas device scale is folded into `scale`.
    pub device_scale_mode: DeviceScaleMode,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            pivot: Point::new(0.5, 0.5),
            rotation: 0.0,
            scale: Vec2::new(1.0, 1.0),
            device_scale_mode: DeviceScaleMode::None,
        }
    }
}

impl Pose {
    /// True if this pose can produce anything other than the identity transform.
    pub fn has_scale_or_rotation(&self) -> bool {
        self.device_scale_mode != DeviceScaleMode::None
            || self.scale.x != 1.0
            || self.scale.y != 1.0
            || self.rotation != 0.0
    }

    /// The scale after folding in `device_scale` according to the device mode.
    pub fn effective_scale(&self, device_scale: Vec2) -> Vec2 {
        self.device_scale_mode.apply(self.scale, device_scale)
    }

    /// Maps points of the element's untransformed rect into its parent's space.
    ///
    /// Identity when the pose has no rotation, scale or device mode. Otherwise
    /// `T(pivot) · R(rotation) · S(scale) · T(-pivot)`, where `pivot` is the
    /// pivot's position inside `rect`.
    pub fn local_transform(&self, rect: Rect, device_scale: Vec2) -> Affine {
        if !self.has_scale_or_rotation() {
            return Affine::IDENTITY;
        }
        rotate_scale_about(
            pivot_point(rect, self.pivot),
            self.rotation,
            self.effective_scale(device_scale),
        )
    }

    /// Inverse of [`local_transform`](Self::local_transform).
    ///
    /// A scale component too close to zero to invert is treated as 1, so the
    /// result is always finite.
    pub fn local_inverse_transform(&self, rect: Rect, device_scale: Vec2) -> Affine {
        if !self.has_scale_or_rotation() {
            return Affine::IDENTITY;
        }
        inverse_rotate_scale_about(
            pivot_point(rect, self.pivot),
            self.rotation,
            self.effective_scale(device_scale),
        )
    }
}

fn snap(component: f64) -> f64 {
    if component.abs() < SCALE_EPSILON {
        0.0
    } else {
        component
    }
}

fn reciprocal(component: f64) -> f64 {
    if component.abs() > SCALE_EPSILON {
        1.0 / component
    } else {
        1.0
    }
}

/// `T(pivot) · R(degrees) · S(scale) · T(-pivot)`.
///
/// Scale components with a magnitude below [`SCALE_EPSILON`] are snapped to zero.
///
/// ```
/// use kurbo::{Point, Vec2};
/// use understory_transform2d::rotate_scale_about;
///
/// // A quarter turn about (50, 50) takes the middle of the right edge to the middle of the bottom.
/// let t = rotate_scale_about(Point::new(50.0, 50.0), 90.0, Vec2::new(1.0, 1.0));
/// let p = t * Point::new(100.0, 50.0);
/// assert!((p - Point::new(50.0, 100.0)).hypot() < 1e-9);
/// ```
pub fn rotate_scale_about(pivot: Point, degrees: f64, scale: Vec2) -> Affine {
    let to_pivot = pivot.to_vec2();
    Affine::translate(to_pivot)
        * Affine::rotate(degrees.to_radians())
        * Affine::scale_non_uniform(snap(scale.x), snap(scale.y))
        * Affine::translate(-to_pivot)
}

/// `T(pivot) · S(1/scale) · R(-degrees) · T(-pivot)`.
///
/// A scale component with a magnitude at or below [`SCALE_EPSILON`] inverts to 1.
pub fn inverse_rotate_scale_about(pivot: Point, degrees: f64, scale: Vec2) -> Affine {
    let to_pivot = pivot.to_vec2();
    Affine::translate(to_pivot)
        * Affine::scale_non_uniform(reciprocal(scale.x), reciprocal(scale.y))
        * Affine::rotate(-degrees.to_radians())
        * Affine::translate(-to_pivot)
}
