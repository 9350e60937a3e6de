// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Anchor/offset layout math.
//!
//! Everything here works on "untransformed" canvas space: the rectangles an
//! element would occupy if no ancestor (and not the element itself) were rotated
//! or scaled. Rotation and scale are applied afterwards by
//! [`local_transform`](crate::local_transform).

use kurbo::{Point, Rect, Size};

use crate::{Anchors, Offsets};

/// The anchor box: the region of `parent` the anchors select, before offsets.
///
/// The result is not normalized; flipped anchors produce a flipped rect.
pub fn anchor_box(parent: Rect, anchors: Anchors) -> Rect {
    let size = parent.size();
    Rect::new(
        parent.x0 + size.width * anchors.left,
        parent.y0 + size.height * anchors.top,
        parent.x0 + size.width * anchors.right,
        parent.y0 + size.height * anchors.bottom,
    )
}

/// Collapses a flipped dimension of `rect` to its center.
///
/// The returned rect always satisfies `x0 <= x1` and `y0 <= y1`. Unlike
/// [`Rect::abs`], a flipped rect is not mirrored: it becomes zero-sized.
pub fn collapse_flipped(rect: Rect) -> Rect {
    let mut rect = rect;
    if rect.x0 > rect.x1 {
        let cx = (rect.x0 + rect.x1) * 0.5;
        rect.x0 = cx;
        rect.x1 = cx;
    }
    if rect.y0 > rect.y1 {
        let cy = (rect.y0 + rect.y1) * 0.5;
        rect.y0 = cy;
        rect.y1 = cy;
    }
    rect
}

/// Computes an element's untransformed canvas-space rect from its parent's.
///
/// Each edge is `parent.origin + parent.extent * anchor + offset`. A dimension
/// whose resulting edges are flipped collapses to its center, so the result is
/// never flipped.
///
/// ```
/// use kurbo::Rect;
/// use understory_transform2d::{anchored_rect, Anchors, Offsets};
///
/// let parent = Rect::new(0.0, 0.0, 800.0, 600.0);
/// let rect = anchored_rect(parent, Anchors::TOP_LEFT, Offsets::new(0.0, 0.0, 100.0, 50.0));
/// assert_eq!(rect, Rect::new(0.0, 0.0, 100.0, 50.0));
/// ```
pub fn anchored_rect(parent: Rect, anchors: Anchors, offsets: Offsets) -> Rect {
    let anchor = anchor_box(parent, anchors);
    collapse_flipped(Rect::new(
        anchor.x0 + offsets.left,
        anchor.y0 + offsets.top,
        anchor.x1 + offsets.right,
        anchor.y1 + offsets.bottom,
    ))
}

/// The point at normalized position `pivot` within `rect`.
pub fn pivot_point(rect: Rect, pivot: Point) -> Point {
    Point::new(
        rect.x0 + rect.width() * pivot.x,
        rect.y0 + rect.height() * pivot.y,
    )
}

/// Repairs a requested anchor change so that neither pair is flipped.
///
/// `current` is the value before the change. For each flipped pair the edge
/// that differs from `current` is treated as the one being edited; when both
/// differ, the second edge (`right`/`bottom`) is treated as edited. With
/// `allow_push == false` the edited edge is clamped to the other one; with
/// `allow_push == true` the edited edge wins and pushes the other one along.
///
/// ```
/// use understory_transform2d::{repair_anchors, Anchors};
///
/// let current = Anchors::new(0.2, 0.0, 0.4, 1.0);
/// let requested = Anchors::new(0.6, 0.0, 0.4, 1.0);
/// assert_eq!(repair_anchors(current, requested, false).left, 0.4);
/// assert_eq!(repair_anchors(current, requested, true).right, 0.6);
/// ```
pub fn repair_anchors(current: Anchors, requested: Anchors, allow_push: bool) -> Anchors {
    let mut anchors = requested;
    if anchors.right < anchors.left {
        let right_edited = anchors.right != current.right;
        match (right_edited, allow_push) {
            (true, true) => anchors.left = anchors.right,
            (true, false) => anchors.right = anchors.left,
            (false, true) => anchors.right = anchors.left,
            (false, false) => anchors.left = anchors.right,
        }
    }
    if anchors.bottom < anchors.top {
        let bottom_edited = anchors.bottom != current.bottom;
        match (bottom_edited, allow_push) {
            (true, true) => anchors.top = anchors.bottom,
            (true, false) => anchors.bottom = anchors.top,
            (false, true) => anchors.bottom = anchors.top,
            (false, false) => anchors.top = anchors.bottom,
        }
    }
    anchors
}

/// Shifts offsets so that moving anchors from `from` to `to` leaves the rect in place.
pub fn shift_offsets_for_anchors(
    offsets: Offsets,
    from: Anchors,
    to: Anchors,
    parent_size: Size,
) -> Offsets {
    Offsets::new(
        offsets.left - parent_size.width * (to.left - from.left),
        offsets.top - parent_size.height * (to.top - from.top),
        offsets.right - parent_size.width * (to.right - from.right),
        offsets.bottom - parent_size.height * (to.bottom - from.bottom),
    )
}

/// Where anchors are together, collapses flipped offsets to their midpoint.
///
/// With coincident anchors the offsets alone determine the size, so flipped
/// offsets would mean a negative width or height.
pub fn collapse_flipped_offsets(anchors: Anchors, offsets: Offsets) -> Offsets {
    let mut offsets = offsets;
    if anchors.together_x() && offsets.left > offsets.right {
        let mid = (offsets.left + offsets.right) * 0.5;
        offsets.left = mid;
        offsets.right = mid;
    }
    if anchors.together_y() && offsets.top > offsets.bottom {
        let mid = (offsets.top + offsets.bottom) * 0.5;
        offsets.top = mid;
        offsets.bottom = mid;
    }
    offsets
}

/// Repairs a requested offset change so the resulting rect is not flipped.
///
/// Flipping is detected on the absolute edges inside `parent`. If only one
/// edge of a flipped dimension changed relative to `current`, that edge is
/// moved onto the other. If both changed, both move to the point between them
/// weighted by `pivot`, which keeps the pivot where it was for a resize about
/// the pivot. A flipped dimension in which neither edge changed is left alone:
/// that state comes from the parent shrinking and is handled by
/// [`anchored_rect`].
pub fn repair_offsets(
    parent: Rect,
    anchors: Anchors,
    pivot: Point,
    current: Offsets,
    requested: Offsets,
) -> Offsets {
    let anchor = anchor_box(parent, anchors);
    let mut offsets = requested;

    let left = anchor.x0 + offsets.left;
    let right = anchor.x1 + offsets.right;
    if left > right {
        let left_changed = offsets.left != current.left;
        let right_changed = offsets.right != current.right;
        if left_changed && right_changed {
            let meet = left * (1.0 - pivot.x) + right * pivot.x;
            offsets.left = meet - anchor.x0;
            offsets.right = meet - anchor.x1;
        } else if right_changed {
            offsets.right = left - anchor.x1;
        } else if left_changed {
            offsets.left = right - anchor.x0;
        }
    }

    let top = anchor.y0 + offsets.top;
    let bottom = anchor.y1 + offsets.bottom;
    if top > bottom {
        let top_changed = offsets.top != current.top;
        let bottom_changed = offsets.bottom != current.bottom;
        if top_changed && bottom_changed {
            let meet = top * (1.0 - pivot.y) + bottom * pivot.y;
            offsets.top = meet - anchor.y0;
            offsets.bottom = meet - anchor.y1;
        } else if bottom_changed {
            offsets.bottom = top - anchor.y1;
        } else if top_changed {
            offsets.top = bottom - anchor.y0;
        }
    }

    offsets
}

/// Offsets resized horizontally to `width`, growing or shrinking about the pivot.
pub fn with_width_about_pivot(offsets: Offsets, pivot: Point, width: f64) -> Offsets {
    let diff = width - (offsets.right - offsets.left);
    Offsets {
        left: offsets.left - diff * pivot.x,
        right: offsets.right + diff * (1.0 - pivot.x),
        ..offsets
    }
}

/// Offsets resized vertically to `height`, growing or shrinking about the pivot.
pub fn with_height_about_pivot(offsets: Offsets, pivot: Point, height: f64) -> Offsets {
    let diff = height - (offsets.bottom - offsets.top);
    Offsets {
        top: offsets.top - diff * pivot.y,
        bottom: offsets.bottom + diff * (1.0 - pivot.y),
        ..offsets
    }
}
