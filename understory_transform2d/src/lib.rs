// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Transform 2D: Kurbo-native anchor layout and pivot transforms.
//!
//! This crate holds the pure math behind anchored 2D UI elements. It has no
//! tree, no caching and no notion of identity; [`understory_element_tree`] builds
//! those on top.
//!
//! [`understory_element_tree`]: https://docs.rs/understory_element_tree
//!
//! ## Model
//!
//! An element's untransformed rect is derived from its parent's rect:
//!
//! - [`Anchors`] pick a region of the parent, as fractions of its width and height.
//! - [`Offsets`] push each edge of that region by a number of pixels.
//! - [`anchored_rect`] combines the two and never returns a flipped rect.
//!
//! On top of that rect a [`Pose`] rotates and scales the element about its
//! pivot, optionally folding in a canvas-wide device scale through a
//! [`DeviceScaleMode`]. [`Pose::local_transform`] and
//! [`Pose::local_inverse_transform`] produce the matching [`kurbo::Affine`] pair.
//!
//! Editing helpers keep the data consistent when a caller changes one field at
//! a time: [`repair_anchors`], [`shift_offsets_for_anchors`],
//! [`collapse_flipped_offsets`] and [`repair_offsets`].
//!
//! Finally [`RectPoints`] carries the four corners through transforms and
//! [`quad_overlaps_box`] tests a transformed element against an axis-aligned
//! box.
//!
//! ## Example
//!
//! ```
//! use kurbo::{Point, Rect, Vec2};
//! use understory_transform2d::{anchored_rect, Anchors, Offsets, Pose, RectPoints};
//!
//! let canvas = Rect::new(0.0, 0.0, 800.0, 600.0);
//!
//! // A 100×100 panel centered in the canvas, turned a quarter turn.
//! let rect = anchored_rect(canvas, Anchors::CENTER, Offsets::default());
//! assert_eq!(rect, Rect::new(350.0, 250.0, 450.0, 350.0));
//!
//! let pose = Pose { rotation: 90.0, ..Pose::default() };
//! let to_canvas = pose.local_transform(rect, Vec2::new(1.0, 1.0));
//! let corners = RectPoints::from_rect(rect).transform(to_canvas);
//!
//! // The top-left corner ends up at the top-right.
//! assert!((corners.top_left() - Point::new(450.0, 250.0)).hypot() < 1e-9);
//! ```
//!
//! ## Features
//!
//! - `serde`: derives `Serialize`/`Deserialize` for the value types and turns on
//!   Kurbo's `serde` support.

mod layout;
mod overlap;
mod points;
mod transform;
mod types;

pub use layout::{
    anchor_box, anchored_rect, collapse_flipped, collapse_flipped_offsets, pivot_point,
    repair_anchors, repair_offsets, shift_offsets_for_anchors, with_height_about_pivot,
    with_width_about_pivot,
};
pub use overlap::{boxes_intersect, quad_overlaps_box, rect_contains_inclusive};
pub use points::RectPoints;
pub use transform::{Pose, SCALE_EPSILON, inverse_rotate_scale_about, rotate_scale_about};
pub use types::{Anchors, DeviceScaleMode, Offsets};
