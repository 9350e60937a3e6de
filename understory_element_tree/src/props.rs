// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transform properties and position helpers.

use kurbo::{Point, Vec2};
use understory_transform2d::{
    Anchors, DeviceScaleMode, Offsets, RectPoints, anchor_box, collapse_flipped_offsets,
    pivot_point, repair_anchors, repair_offsets, shift_offsets_for_anchors,
    with_height_about_pivot, with_width_about_pivot,
};

use crate::state::TransformState;
use crate::{NodeId, Recompute, Tree};

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

impl Tree {
    /// The node's anchors.
    pub fn anchors(&self, id: NodeId) -> Option<Anchors> {
        self.get(id).map(|n| n.transform.anchors)
    }

    /// The node's offsets.
    pub fn offsets(&self, id: NodeId) -> Option<Offsets> {
        self.get(id).map(|n| n.transform.offsets)
    }

    /// The node's normalized pivot.
    pub fn pivot(&self, id: NodeId) -> Option<Point> {
        self.get(id).map(|n| n.transform.pose.pivot)
    }

    /// Rotation about the pivot, in degrees.
    pub fn rotation(&self, id: NodeId) -> Option<f64> {
        self.get(id).map(|n| n.transform.pose.rotation)
    }

    /// Scale about the pivot, before device scale.
    pub fn scale(&self, id: NodeId) -> Option<Vec2> {
        self.get(id).map(|n| n.transform.pose.scale)
    }

    /// How the node's scale follows the canvas device scale.
    pub fn device_scale_mode(&self, id: NodeId) -> Option<DeviceScaleMode> {
        self.get(id).map(|n| n.transform.pose.device_scale_mode)
    }

    /// Returns true if rect invalidations floor the node's offsets.
    pub fn is_flooring_offsets(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.transform.flooring_offsets)
    }

    /// Returns true if the node has rotation, scale or a device scale mode.
    pub fn has_scale_or_rotation(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| n.transform.pose.has_scale_or_rotation())
    }

    /// Set the node's anchors.
    ///
    /// Flipped pairs are repaired first: the edge that changed is clamped to
    /// the other, or pushes the other along when `allow_push` is set. With
    /// `adjust_offsets` the offsets compensate so the rect does not move.
    /// Where the new anchors are together, flipped offsets collapse to their
    /// midpoint.
    pub fn set_anchors(
        &mut self,
        id: NodeId,
        anchors: Anchors,
        adjust_offsets: bool,
        allow_push: bool,
    ) {
        let Some(node) = self.get(id) else {
            return;
        };
        let (old_anchors, old_offsets, parent) =
            (node.transform.anchors, node.transform.offsets, node.parent);
        let anchors = repair_anchors(old_anchors, anchors, allow_push);
        let mut offsets = old_offsets;
        if adjust_offsets {
            if let Some(parent) = parent {
                let parent_size = self.rect_of(parent).size();
                offsets = shift_offsets_for_anchors(offsets, old_anchors, anchors, parent_size);
            }
        }
        let offsets = collapse_flipped_offsets(anchors, offsets);
        self.edit_transform(id, Recompute::RectOnly, |t| {
            t.anchors = anchors;
            t.offsets = offsets;
            anchors != old_anchors || offsets != old_offsets
        });
    }

    /// Set the node's offsets.
    ///
    /// Ignored on canvas roots, whose rect always covers the canvas. An edit
    /// that would flip the rect is repaired: a single changed edge is moved
    /// onto the other, and when both edges changed they meet at the point
    /// the pivot weights between them.
    pub fn set_offsets(&mut self, id: NodeId, offsets: Offsets) {
        let Some(node) = self.get(id) else {
            return;
        };
        let Some(parent) = node.parent else {
            return;
        };
        let (anchors, pivot, current) = (
            node.transform.anchors,
            node.transform.pose.pivot,
            node.transform.offsets,
        );
        let parent_rect = self.rect_of(parent);
        let offsets = repair_offsets(parent_rect, anchors, pivot, current, offsets);
        self.edit_transform(id, Recompute::RectOnly, |t| replace(&mut t.offsets, offsets));
    }

    /// Set the pivot. The rect stays put; a rotated or scaled node appears to move.
    pub fn set_pivot(&mut self, id: NodeId, pivot: Point) {
        self.edit_transform(id, Recompute::TransformOnly, |t| {
            replace(&mut t.pose.pivot, pivot)
        });
    }

    /// Set the rotation in degrees.
    pub fn set_rotation(&mut self, id: NodeId, degrees: f64) {
        self.edit_transform(id, Recompute::TransformOnly, |t| {
            replace(&mut t.pose.rotation, degrees)
        });
    }

    /// Set the scale.
    pub fn set_scale(&mut self, id: NodeId, scale: Vec2) {
        self.edit_transform(id, Recompute::TransformOnly, |t| {
            replace(&mut t.pose.scale, scale)
        });
    }

    /// Set how the node's scale follows the canvas device scale.
    pub fn set_device_scale_mode(&mut self, id: NodeId, mode: DeviceScaleMode) {
        self.edit_transform(id, Recompute::TransformOnly, |t| {
            replace(&mut t.pose.device_scale_mode, mode)
        });
    }

    /// Floor the offsets whenever the rect is invalidated.
    pub fn set_flooring_offsets(&mut self, id: NodeId, flooring: bool) {
        self.edit_transform(id, Recompute::RectOnly, |t| {
            replace(&mut t.flooring_offsets, flooring)
        });
    }

    /// Change the pivot without moving the node on screen.
    ///
    /// For a rotated or scaled node the offsets are shifted so the transformed
    /// corners stay where they were.
    pub fn set_pivot_and_adjust_offsets(&mut self, id: NodeId, pivot: Point) {
        let Some(node) = self.get(id) else {
            return;
        };
        if node.transform.pose.pivot == pivot {
            return;
        }
        if !node.transform.pose.has_scale_or_rotation() {
            self.set_pivot(id, pivot);
            return;
        }

        let old_rect = self.rect_of(id);
        let moved = RectPoints::from_rect(old_rect).transform(self.local_transform_of(id));
        self.set_pivot(id, pivot);

        // Where the pivot must sit, untransformed, to produce the same corners.
        let right = moved.top_right() - moved.top_left();
        let down = moved.bottom_left() - moved.top_left();
        let canvas_pivot = moved.top_left() + right * pivot.x + down * pivot.y;
        let size = old_rect.size();
        let delta = Vec2::new(
            canvas_pivot.x - size.width * pivot.x - old_rect.x0,
            canvas_pivot.y - size.height * pivot.y - old_rect.y0,
        );
        self.edit_transform(id, Recompute::RectOnly, |t| {
            t.offsets += delta;
            true
        });
    }

    /// Width of the node. Set by the offsets alone when the horizontal anchors
    /// are together, otherwise read from the rect.
    pub fn local_width(&mut self, id: NodeId) -> f64 {
        let Some(node) = self.get(id) else {
            return 0.0;
        };
        let (anchors, offsets) = (node.transform.anchors, node.transform.offsets);
        if anchors.together_x() {
            offsets.right - offsets.left
        } else {
            self.rect_of(id).width()
        }
    }

    /// Resize horizontally about the pivot. Ignored unless the horizontal
    /// anchors are together.
    pub fn set_local_width(&mut self, id: NodeId, width: f64) {
        let Some(node) = self.get(id) else {
            return;
        };
        let t = &node.transform;
        if t.anchors.together_x() {
            let offsets = with_width_about_pivot(t.offsets, t.pose.pivot, width);
            self.set_offsets(id, offsets);
        }
    }

    /// Height of the node. Set by the offsets alone when the vertical anchors
    /// are together, otherwise read from the rect.
    pub fn local_height(&mut self, id: NodeId) -> f64 {
        let Some(node) = self.get(id) else {
            return 0.0;
        };
        let (anchors, offsets) = (node.transform.anchors, node.transform.offsets);
        if anchors.together_y() {
            offsets.bottom - offsets.top
        } else {
            self.rect_of(id).height()
        }
    }

    /// Resize vertically about the pivot. Ignored unless the vertical anchors
    /// are together.
    pub fn set_local_height(&mut self, id: NodeId, height: f64) {
        let Some(node) = self.get(id) else {
            return;
        };
        let t = &node.transform;
        if t.anchors.together_y() {
            let offsets = with_height_about_pivot(t.offsets, t.pose.pivot, height);
            self.set_offsets(id, offsets);
        }
    }

    /// Pivot position relative to the center of the anchors, untransformed.
    pub fn local_position(&mut self, id: NodeId) -> Vec2 {
        let Some(node) = self.get(id) else {
            return Vec2::ZERO;
        };
        let (parent, anchors) = (node.parent, node.transform.anchors);
        let pivot = self.untransformed_pivot(id);
        let anchors_center = match parent {
            Some(parent) => anchor_box(self.rect_of(parent), anchors).center(),
            None => Point::ZERO,
        };
        pivot - anchors_center
    }

    /// Move the node so [`Tree::local_position`] becomes `position`.
    pub fn set_local_position(&mut self, id: NodeId, position: Vec2) {
        let current = self.local_position(id);
        self.shift_offsets(id, position - current);
    }

    /// Move the node by `delta` in its parent's untransformed space.
    pub fn move_local_position_by(&mut self, id: NodeId, delta: Vec2) {
        let position = self.local_position(id) + delta;
        self.set_local_position(id, position);
    }

    /// Pivot position in canvas space, including ancestors' rotation and scale.
    pub fn canvas_position(&mut self, id: NodeId) -> Point {
        let pivot = self.untransformed_pivot(id);
        match self.parent(id) {
            Some(parent) => self.canvas_transform_of(parent) * pivot,
            None => pivot,
        }
    }

    /// Move the node so its pivot lands on `position` in canvas space.
    /// Ignored on canvas roots.
    pub fn set_canvas_position(&mut self, id: NodeId, position: Point) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        let target = self.from_canvas_of(parent) * position;
        let current = self.untransformed_pivot(id);
        self.shift_offsets(id, target - current);
    }

    /// Move the node by `delta` in canvas space.
    pub fn move_canvas_position_by(&mut self, id: NodeId, delta: Vec2) {
        let position = self.canvas_position(id) + delta;
        self.set_canvas_position(id, position);
    }

    /// Pivot position in viewport space.
    pub fn viewport_position(&mut self, id: NodeId) -> Point {
        let pivot = self.untransformed_pivot(id);
        match self.parent(id) {
            Some(parent) => self.viewport_transform_of(parent) * pivot,
            None => self.viewport_transform_of(id) * pivot,
        }
    }

    /// Move the node so its pivot lands on `position` in viewport space.
    /// Ignored on canvas roots.
    pub fn set_viewport_position(&mut self, id: NodeId, position: Point) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        let target = self.from_viewport_of(parent) * position;
        let current = self.untransformed_pivot(id);
        self.shift_offsets(id, target - current);
    }

    /// Move the node by `delta` in viewport space.
    pub fn move_viewport_position_by(&mut self, id: NodeId, delta: Vec2) {
        let position = self.viewport_position(id) + delta;
        self.set_viewport_position(id, position);
    }

    // --- internals ---

    /// Pivot inside the node's own untransformed canvas-space rect.
    pub(crate) fn untransformed_pivot(&mut self, id: NodeId) -> Point {
        let rect = self.rect_of(id);
        let pivot = self.pivot(id).unwrap_or(Point::new(0.5, 0.5));
        pivot_point(rect, pivot)
    }

    fn shift_offsets(&mut self, id: NodeId, delta: Vec2) {
        if delta == Vec2::ZERO {
            return;
        }
        self.edit_transform(id, Recompute::RectOnly, |t| {
            t.offsets += delta;
            true
        });
    }

    /// Applies `edit` and marks the node dirty with `scope` if it reports a change.
    fn edit_transform(
        &mut self,
        id: NodeId,
        scope: Recompute,
        edit: impl FnOnce(&mut TransformState) -> bool,
    ) {
        let Some(node) = self.get_mut(id) else {
            return;
        };
        if edit(&mut node.transform) {
            self.mark_dirty(id, scope);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CanvasConfig, DirtyFlags};
    use kurbo::{Rect, Size};

    fn canvas_800x600() -> (Tree, NodeId) {
        let mut tree = Tree::new();
        let size = Size::new(800.0, 600.0);
        let root = tree.create_canvas(
            "canvas",
            CanvasConfig {
                authored_size: size,
                target_size: size,
                ..CanvasConfig::default()
            },
        );
        (tree, root)
    }

    fn close(a: Point, b: Point) -> bool {
        (a - b).hypot() < 1e-6
    }

    #[test]
    fn anchor_change_with_adjusted_offsets_keeps_rect() {
        let (mut tree, root) = canvas_800x600();
        let child = tree.create_child(root, "child").unwrap();
        let before = tree.resolve_rect(child);

        tree.set_anchors(child, Anchors::new(0.0, 0.0, 0.5, 0.5), true, false);
        assert_eq!(
            tree.offsets(child),
            Some(Offsets::new(350.0, 250.0, 50.0, 50.0))
        );
        assert_eq!(tree.resolve_rect(child), before);
    }

    #[test]
    fn flipped_anchor_edits_are_clamped_or_pushed() {
        let (mut tree, root) = canvas_800x600();
        let child = tree.create_child(root, "child").unwrap();
        tree.set_anchors(child, Anchors::new(0.2, 0.0, 0.4, 1.0), false, false);

        tree.set_anchors(child, Anchors::new(0.6, 0.0, 0.4, 1.0), false, false);
        assert_eq!(tree.anchors(child), Some(Anchors::new(0.4, 0.0, 0.4, 1.0)));

        tree.set_anchors(child, Anchors::new(0.4, 0.0, 0.1, 1.0), false, true);
        assert_eq!(tree.anchors(child), Some(Anchors::new(0.1, 0.0, 0.1, 1.0)));
        let a = tree.anchors(child).unwrap();
        assert!(a.is_ordered());
    }

    #[test]
    fn flipping_offset_edit_is_repaired() {
        let (mut tree, root) = canvas_800x600();
        let child = tree.create_child(root, "child").unwrap();
        tree.set_anchors(child, Anchors::TOP_LEFT, false, false);
        tree.set_offsets(child, Offsets::new(0.0, 0.0, 100.0, 50.0));

        // Only the left edge moved past the right one: it is pulled back.
        tree.set_offsets(child, Offsets::new(150.0, 0.0, 100.0, 50.0));
        assert_eq!(
            tree.offsets(child),
            Some(Offsets::new(100.0, 0.0, 100.0, 50.0))
        );
    }

    #[test]
    fn root_offsets_cannot_be_set() {
        let (mut tree, root) = canvas_800x600();
        let before = tree.offsets(root);
        tree.set_offsets(root, Offsets::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(tree.offsets(root), before);
    }

    #[test]
    fn transform_setters_skip_unchanged_values() {
        let (mut tree, root) = canvas_800x600();
        let child = tree.create_child(root, "child").unwrap();
        tree.commit(root);
        tree.set_rotation(child, 0.0);
        tree.set_scale(child, Vec2::new(1.0, 1.0));
        assert_eq!(tree.pending_count(root), 0);
        tree.set_device_scale_mode(child, DeviceScaleMode::UniformScaleToFit);
        assert_eq!(
            tree.dirty_flags(child),
            Some(DirtyFlags::CANVAS_TRANSFORM | DirtyFlags::VIEWPORT_TRANSFORM)
        );
    }

    #[test]
    fn local_size_follows_pivot() {
        let (mut tree, root) = canvas_800x600();
        let child = tree.create_child(root, "child").unwrap();
        tree.set_pivot(child, Point::new(0.0, 1.0));
        tree.set_local_width(child, 300.0);
        tree.set_local_height(child, 200.0);
        assert_eq!(
            tree.offsets(child),
            Some(Offsets::new(-50.0, -150.0, 250.0, 50.0))
        );
        assert_eq!(tree.local_width(child), 300.0);
        assert_eq!(tree.local_height(child), 200.0);

        // Stretched anchors: width comes from the rect and cannot be set.
        tree.set_anchors(child, Anchors::STRETCH, false, false);
        tree.set_offsets(child, Offsets::ZERO);
        tree.set_local_width(child, 10.0);
        assert_eq!(tree.local_width(child), 800.0);
    }

    #[test]
    fn positions_move_the_pivot() {
        let (mut tree, root) = canvas_800x600();
        let panel = tree.create_child(root, "panel").unwrap();
        let label = tree.create_child(panel, "label").unwrap();
        assert_eq!(tree.local_position(label), Vec2::ZERO);

        tree.set_local_position(label, Vec2::new(10.0, -20.0));
        assert_eq!(tree.local_position(label), Vec2::new(10.0, -20.0));
        assert_eq!(tree.canvas_position(label), Point::new(410.0, 280.0));

        // A half turn of the parent mirrors canvas-space moves.
        tree.set_rotation(panel, 180.0);
        tree.move_canvas_position_by(label, Vec2::new(5.0, 0.0));
        assert!(close(tree.canvas_position(label), Point::new(395.0, 320.0)));
        assert!(close(
            Point::ZERO + tree.local_position(label),
            Point::new(5.0, -20.0)
        ));
    }

    #[test]
    fn viewport_positions_go_through_the_viewport_matrix() {
        let (mut tree, root) = canvas_800x600();
        tree.set_canvas_to_viewport(root, kurbo::Affine::scale(2.0))
            .unwrap();
        let child = tree.create_child(root, "child").unwrap();
        assert_eq!(tree.viewport_position(child), Point::new(800.0, 600.0));
        // The root's pivot goes through the same matrix.
        assert_eq!(tree.viewport_position(root), Point::new(800.0, 600.0));
        assert_eq!(tree.canvas_position(root), Point::new(400.0, 300.0));
        tree.set_viewport_position(child, Point::new(0.0, 0.0));
        assert_eq!(tree.canvas_position(child), Point::ZERO);
        assert_eq!(tree.resolve_rect(child), Rect::new(-50.0, -50.0, 50.0, 50.0));
        tree.move_viewport_position_by(child, Vec2::new(20.0, 0.0));
        assert_eq!(tree.canvas_position(child), Point::new(10.0, 0.0));
    }

    #[test]
    fn pivot_change_keeps_rotated_corners_in_place() {
        let (mut tree, root) = canvas_800x600();
        let child = tree.create_child(root, "child").unwrap();
        tree.set_rotation(child, 90.0);
        let corners = |tree: &mut Tree| {
            let rect = tree.resolve_rect(child);
            RectPoints::from_rect(rect).transform(tree.resolve_canvas_transform(child))
        };
        let before = corners(&mut tree);

        tree.set_pivot_and_adjust_offsets(child, Point::new(0.0, 0.0));
        assert_eq!(tree.pivot(child), Some(Point::new(0.0, 0.0)));
        let after = corners(&mut tree);
        for (a, b) in before.corners.iter().zip(after.corners.iter()) {
            assert!(close(*a, *b), "{a:?} != {b:?}");
        }
    }

    #[test]
    fn flooring_offsets_floors_on_rect_changes() {
        let (mut tree, root) = canvas_800x600();
        let child = tree.create_child(root, "child").unwrap();
        tree.set_flooring_offsets(child, true);
        tree.move_local_position_by(child, Vec2::new(0.75, 0.25));
        assert_eq!(
            tree.offsets(child),
            Some(Offsets::new(-50.0, -50.0, 50.0, 50.0))
        );
        assert!(tree.is_flooring_offsets(child));
    }
}
