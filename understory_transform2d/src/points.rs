// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Four-corner point sets.

use kurbo::{Affine, Point, Rect};

/// The four corners of a (possibly rotated or scaled) rectangle.
///
/// Corners are stored in the order top-left, top-right, bottom-right,
/// bottom-left, as seen before any transform is applied. After a transform the
/// names still refer to the original corners, so a quad rotated by 180° has its
/// "top-left" corner at the bottom right.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RectPoints {
    /// Corners in top-left, top-right, bottom-right, bottom-left order.
    pub corners: [Point; 4],
}

impl RectPoints {
    /// Corners of `rect`, taking `x0`/`y0` as the top-left edge even if the rect is flipped.
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            corners: [
                Point::new(rect.x0, rect.y0),
                Point::new(rect.x1, rect.y0),
                Point::new(rect.x1, rect.y1),
                Point::new(rect.x0, rect.y1),
            ],
        }
    }

    /// Maps every corner through `transform`.
    #[must_use]
    pub fn transform(&self, transform: Affine) -> Self {
        Self {
            corners: self.corners.map(|p| transform * p),
        }
    }

    /// Top-left corner.
    pub fn top_left(&self) -> Point {
        self.corners[0]
    }

    /// Top-right corner.
    pub fn top_right(&self) -> Point {
        self.corners[1]
    }

    /// Bottom-right corner.
    pub fn bottom_right(&self) -> Point {
        self.corners[2]
    }

    /// Bottom-left corner.
    pub fn bottom_left(&self) -> Point {
        self.corners[3]
    }

    /// True if the quad is an axis-aligned rectangle with its top-left corner
    /// above and to the left of its bottom-right corner.
    pub fn is_axis_aligned_unflipped(&self) -> bool {
        let [tl, tr, br, bl] = self.corners;
        tl.y == tr.y && bl.y == br.y && tl.x == bl.x && tr.x == br.x && tl.x <= br.x && tl.y <= br.y
    }

    /// Smallest axis-aligned rectangle containing all four corners.
    pub fn bounding_rect(&self) -> Rect {
        let [a, b, c, d] = self.corners;
        Rect::from_points(a, b).union_pt(c).union_pt(d)
    }
}

impl From<Rect> for RectPoints {
    fn from(rect: Rect) -> Self {
        Self::from_rect(rect)
    }
}
