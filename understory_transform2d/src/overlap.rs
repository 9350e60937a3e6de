// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Point and overlap tests between quads and axis-aligned boxes.

use kurbo::{Point, Rect, Vec2};

use crate::RectPoints;

/// True if `point` lies in `rect`, edges included.
///
/// A flipped rect is tested as if its bounds were swapped.
pub fn rect_contains_inclusive(rect: Rect, point: Point) -> bool {
    let rect = rect.abs();
    point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
}

/// True if two axis-aligned boxes touch or overlap.
///
/// Each box is given by two opposite corners in any order.
pub fn boxes_intersect(a0: Point, a1: Point, b0: Point, b1: Point) -> bool {
    let a = Rect::from_points(a0, a1);
    let b = Rect::from_points(b0, b1);
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

/// True if the quad `quad` touches or overlaps the axis-aligned box spanned by
/// `bound0` and `bound1`.
///
/// An axis-aligned, unflipped quad takes the box-box fast path. Anything else
/// goes through a separating axis test over the two box axes and the quad's
/// edge normals; touching counts as overlapping.
///
/// ```
/// use kurbo::{Point, Rect, Vec2};
/// use understory_transform2d::{quad_overlaps_box, rotate_scale_about, RectPoints};
///
/// let node = Rect::new(9.0, 9.0, 19.0, 19.0);
/// let b0 = Point::new(0.0, 0.0);
/// let b1 = Point::new(10.0, 10.0);
/// assert!(quad_overlaps_box(&RectPoints::from_rect(node), b0, b1));
///
/// // Turned 45° about its center the square's corner points at the box but no longer reaches it.
/// let turned = RectPoints::from_rect(node)
///     .transform(rotate_scale_about(node.center(), 45.0, Vec2::new(1.0, 1.0)));
/// assert!(!quad_overlaps_box(&turned, b0, b1));
/// ```
pub fn quad_overlaps_box(quad: &RectPoints, bound0: Point, bound1: Point) -> bool {
    if quad.is_axis_aligned_unflipped() {
        return boxes_intersect(bound0, bound1, quad.top_left(), quad.bottom_right());
    }

    let bounds = Rect::from_points(bound0, bound1);
    let box_corners = RectPoints::from_rect(bounds).corners;

    let mut axes = [Vec2::ZERO; 6];
    axes[0] = Vec2::new(1.0, 0.0);
    axes[1] = Vec2::new(0.0, 1.0);
    for (i, axis) in axes[2..].iter_mut().enumerate() {
        let edge = quad.corners[(i + 1) % 4] - quad.corners[i];
        *axis = Vec2::new(-edge.y, edge.x);
    }

    for axis in axes {
        // A degenerate edge has no normal to separate along.
        if axis.hypot2() == 0.0 {
            continue;
        }
        let (a_min, a_max) = project(&box_corners, axis);
        let (b_min, b_max) = project(&quad.corners, axis);
        if a_max < b_min || b_max < a_min {
            return false;
        }
    }
    true
}

fn project(points: &[Point; 4], axis: Vec2) -> (f64, f64) {
    points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        let d = p.to_vec2().dot(axis);
        (lo.min(d), hi.max(d))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotate_scale_about;

    const ONE: Vec2 = Vec2::new(1.0, 1.0);

    #[test]
    fn contains_includes_edges_and_handles_flipped() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect_contains_inclusive(rect, Point::new(10.0, 0.0)));
        assert!(!rect_contains_inclusive(rect, Point::new(10.1, 0.0)));
        let flipped = Rect::new(10.0, 10.0, 0.0, 0.0);
        assert!(rect_contains_inclusive(flipped, Point::new(5.0, 5.0)));
    }

    #[test]
    fn unrotated_overlap_uses_fast_path() {
        let node = RectPoints::from_rect(Rect::new(5.0, 5.0, 15.0, 15.0));
        assert!(quad_overlaps_box(&node, Point::new(0.0, 0.0), Point::new(10.0, 10.0)));
        // Reversed bounds describe the same box.
        assert!(quad_overlaps_box(&node, Point::new(10.0, 10.0), Point::new(0.0, 0.0)));
        assert!(!quad_overlaps_box(&node, Point::new(20.0, 0.0), Point::new(30.0, 10.0)));
    }

    #[test]
    fn rotated_quad_separated_along_its_own_normal() {
        let node = Rect::new(9.0, 9.0, 19.0, 19.0);
        let quad = RectPoints::from_rect(node)
            .transform(rotate_scale_about(node.center(), 45.0, ONE));
        // The AABB of the turned square still overlaps the box.
        let aabb = quad.bounding_rect();
        assert!(boxes_intersect(
            aabb.origin(),
            Point::new(aabb.x1, aabb.y1),
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0)
        ));
        assert!(!quad_overlaps_box(&quad, Point::new(0.0, 0.0), Point::new(10.0, 10.0)));
    }

    #[test]
    fn rotated_quad_overlapping_box() {
        let node = Rect::new(5.0, 5.0, 15.0, 15.0);
        let quad = RectPoints::from_rect(node)
            .transform(rotate_scale_about(node.center(), 45.0, ONE));
        assert!(quad_overlaps_box(&quad, Point::new(0.0, 0.0), Point::new(10.0, 10.0)));
    }

    #[test]
    fn rotated_quad_far_away() {
        let node = Rect::new(100.0, 100.0, 110.0, 110.0);
        let quad = RectPoints::from_rect(node)
            .transform(rotate_scale_about(node.center(), 30.0, ONE));
        assert!(!quad_overlaps_box(&quad, Point::new(0.0, 0.0), Point::new(10.0, 10.0)));
    }

    #[test]
    fn flipped_quad_takes_separating_axis_path() {
        let quad = RectPoints::from_rect(Rect::new(0.0, 0.0, 10.0, 10.0))
            .transform(kurbo::Affine::scale_non_uniform(-1.0, 1.0));
        assert!(!quad.is_axis_aligned_unflipped());
        assert!(quad_overlaps_box(&quad, Point::new(-5.0, 2.0), Point::new(-1.0, 3.0)));
        assert!(!quad_overlaps_box(&quad, Point::new(1.0, 2.0), Point::new(5.0, 3.0)));
    }

    #[test]
    fn zero_area_quad_is_handled() {
        let quad = RectPoints::from_rect(Rect::new(5.0, 5.0, 5.0, 5.0))
            .transform(rotate_scale_about(Point::new(5.0, 5.0), 10.0, ONE));
        assert!(quad_overlaps_box(&quad, Point::new(0.0, 0.0), Point::new(10.0, 10.0)));
        assert!(!quad_overlaps_box(&quad, Point::new(6.0, 6.0), Point::new(10.0, 10.0)));
    }
}
