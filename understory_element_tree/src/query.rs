// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Corner points, hit testing, overlap queries and device-scale diagnostics.

use kurbo::{Point, Rect};
use understory_transform2d::{
    DeviceScaleMode, RectPoints, quad_overlaps_box, rect_contains_inclusive,
};

use crate::{HitMode, NodeId, Tree};

/// Why an element's device scale mode is likely a mistake.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DeviceScaleWarning {
    /// The anchors are apart in a dimension the mode scales, so the element
    /// already stretches with its parent there.
    AnchorsApart,
    /// An ancestor scales a shared dimension, so the device scale is applied twice.
    DoubleScaledByAncestor,
    /// A descendant scales a shared dimension, so the descendant is scaled twice.
    DoubleScalesDescendants,
}

impl Tree {
    /// The node's corners in canvas space, with rotation and scale of the node
    /// and its ancestors applied.
    pub fn canvas_space_points(&mut self, id: NodeId) -> RectPoints {
        if !self.check_ready(id) {
            return RectPoints::from_rect(Rect::ZERO);
        }
        let rect = self.rect_of(id);
        RectPoints::from_rect(rect).transform(self.canvas_transform_of(id))
    }

    /// The node's untransformed canvas-space corners.
    pub fn canvas_space_points_no_scale_rotate(&mut self, id: NodeId) -> RectPoints {
        if !self.check_ready(id) {
            return RectPoints::from_rect(Rect::ZERO);
        }
        RectPoints::from_rect(self.rect_of(id))
    }

    /// The node's corners in viewport space.
    pub fn viewport_space_points(&mut self, id: NodeId) -> RectPoints {
        if !self.check_ready(id) {
            return RectPoints::from_rect(Rect::ZERO);
        }
        let rect = self.rect_of(id);
        RectPoints::from_rect(rect).transform(self.viewport_transform_of(id))
    }

    /// The node's pivot inside its untransformed canvas-space rect.
    pub fn canvas_space_pivot_no_scale_rotate(&mut self, id: NodeId) -> Point {
        if !self.check_ready(id) {
            return Point::ZERO;
        }
        self.untransformed_pivot(id)
    }

    /// Returns true if the viewport-space `point` lies on the node, edges included.
    pub fn point_in_rect(&mut self, id: NodeId, point: Point) -> bool {
        if !self.check_ready(id) {
            return false;
        }
        let local = self.from_viewport_of(id) * point;
        rect_contains_inclusive(self.rect_of(id), local)
    }

    /// Returns true if the node's viewport-space quad touches the axis-aligned
    /// box spanned by `bound0` and `bound1`.
    pub fn rect_overlaps(&mut self, id: NodeId, bound0: Point, bound1: Point) -> bool {
        if !self.check_ready(id) {
            return false;
        }
        let quad = self.viewport_space_points(id);
        quad_overlaps_box(&quad, bound0, bound1)
    }

    /// The front-most descendant of `id` containing the viewport-space `point`.
    ///
    /// Later children draw in front of earlier ones, and a descendant draws in
    /// front of its ancestors, so children are searched last to first and each
    /// child's subtree before the child itself.
    pub fn find_frontmost_child_containing_point(
        &mut self,
        id: NodeId,
        point: Point,
        mode: HitMode,
    ) -> Option<NodeId> {
        if !self.check_ready(id) {
            return None;
        }
        self.frontmost_in(id, point, mode)
    }

    /// Every descendant of `id` whose viewport-space quad touches the box
    /// spanned by `bound0` and `bound1`, in post-order.
    pub fn find_children_intersecting_rect(
        &mut self,
        id: NodeId,
        bound0: Point,
        bound1: Point,
        mode: HitMode,
    ) -> Vec<NodeId> {
        let mut out = Vec::new();
        if self.check_ready(id) {
            self.intersecting_in(id, bound0, bound1, mode, &mut out);
        }
        out
    }

    /// The nearest ancestor whose device scale mode scales a dimension this
    /// node's mode also scales.
    pub fn ancestor_with_same_dimension_device_scale(&self, id: NodeId) -> Option<NodeId> {
        let mode = self.device_scale_mode(id)?;
        let mut current = self.parent(id);
        while let Some(p) = current {
            if self
                .device_scale_mode(p)
                .is_some_and(|m| m.shares_dimension_with(mode))
            {
                return Some(p);
            }
            current = self.parent(p);
        }
        None
    }

    /// Every descendant whose device scale mode scales a dimension this node's
    /// mode also scales, in pre-order.
    pub fn descendants_with_same_dimension_device_scale(&self, id: NodeId) -> Vec<NodeId> {
        let Some(mode) = self.device_scale_mode(id) else {
            return Vec::new();
        };
        if mode == DeviceScaleMode::None {
            return Vec::new();
        }
        self.find_descendants(id, |d| {
            self.device_scale_mode(d)
                .is_some_and(|m| m.shares_dimension_with(mode))
        })
    }

    /// Returns true if the anchors are apart in a dimension the device scale mode scales.
    pub fn are_anchors_apart_in_device_scale_dimension(&self, id: NodeId) -> bool {
        let Some(node) = self.get(id) else {
            return false;
        };
        let (anchors, mode) = (node.transform.anchors, node.transform.pose.device_scale_mode);
        (mode.affects_x() && !anchors.together_x()) || (mode.affects_y() && !anchors.together_y())
    }

    /// The most important problem with the node's device scale mode, if any.
    pub fn device_scale_warning(&self, id: NodeId) -> Option<DeviceScaleWarning> {
        match self.device_scale_mode(id)? {
            DeviceScaleMode::None => None,
            _ if self.are_anchors_apart_in_device_scale_dimension(id) => {
                Some(DeviceScaleWarning::AnchorsApart)
            }
            _ if self.ancestor_with_same_dimension_device_scale(id).is_some() => {
                Some(DeviceScaleWarning::DoubleScaledByAncestor)
            }
            _ if !self.descendants_with_same_dimension_device_scale(id).is_empty() => {
                Some(DeviceScaleWarning::DoubleScalesDescendants)
            }
            _ => None,
        }
    }

    fn hit_candidate(&self, id: NodeId, mode: HitMode) -> bool {
        mode == HitMode::Game || self.is_selectable_in_editor(id)
    }

    fn frontmost_in(&mut self, id: NodeId, point: Point, mode: HitMode) -> Option<NodeId> {
        for child in self.live_children(id).into_iter().rev() {
            if mode == HitMode::Editor && !self.is_visible_in_editor(child) {
                continue;
            }
            if let Some(hit) = self.frontmost_in(child, point, mode) {
                return Some(hit);
            }
            if self.hit_candidate(child, mode) && self.point_in_rect(child, point) {
                return Some(child);
            }
        }
        None
    }

    fn intersecting_in(
        &mut self,
        id: NodeId,
        bound0: Point,
        bound1: Point,
        mode: HitMode,
        out: &mut Vec<NodeId>,
    ) {
        for child in self.live_children(id) {
            if mode == HitMode::Editor && !self.is_visible_in_editor(child) {
                continue;
            }
            self.intersecting_in(child, bound0, bound1, mode, out);
            if self.hit_candidate(child, mode) && self.rect_overlaps(child, bound0, bound1) {
                out.push(child);
            }
        }
    }
}
