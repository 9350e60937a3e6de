// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty propagation, lazy resolution and the once-per-frame commit.

use kurbo::{Affine, Point, Rect, Vec2};
use tracing::{debug, warn};
use understory_transform2d::anchored_rect;

use crate::{
    CanvasConfig, DirtyFlags, EntityId, NodeId, NodeState, Notification, Recompute, Tree,
};

/// A rect change reported by [`Tree::commit`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RectChange {
    /// The node whose rect changed.
    pub node: NodeId,
    /// The owning entity.
    pub entity: EntityId,
    /// The rect reported by the previous commit, `None` the first time.
    pub old: Option<Rect>,
    /// The new untransformed canvas-space rect.
    pub new: Rect,
}

/// Summary of one [`Tree::commit`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameChanges {
    /// Rect changes, in worklist order.
    pub changes: Vec<RectChange>,
    /// Number of nodes taken off the worklist and resolved.
    pub resolved: usize,
}

impl FrameChanges {
    /// Returns true if no rect changed.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Union of every old and new rect, in untransformed canvas space.
    pub fn union_rect(&self) -> Option<Rect> {
        self.changes
            .iter()
            .flat_map(|c| c.old.into_iter().chain(core::iter::once(c.new)))
            .reduce(|a, b| a.union(b))
    }
}

impl Tree {
    /// Invalidate cached geometry of a node and its whole subtree.
    ///
    /// Does nothing for nodes that are not initialized yet: they are resolved
    /// from scratch once [`fixup_after_load`](Tree::fixup_after_load) runs.
    /// With flooring enabled, a scope that touches the rect floors the node's
    /// offsets first. [`Recompute::RectOnly`] on a node with rotation or scale
    /// becomes [`Recompute::RectAndTransform`] for the node and its subtree.
    /// The node then queues itself on its canvas worklist, at most once.
    pub fn mark_dirty(&mut self, id: NodeId, scope: Recompute) {
        let Some(node) = self.get_mut(id) else {
            return;
        };
        if !node.initialized || node.canvas.is_none() {
            return;
        }
        let state = &mut node.transform;
        if state.flooring_offsets && scope.touches_rect() {
            state.offsets = state.offsets.floor();
        }
        let scope = if scope == Recompute::RectOnly && state.pose.has_scale_or_rotation() {
            Recompute::RectAndTransform
        } else {
            scope
        };

        for child in self.live_children(id) {
            self.mark_dirty(child, scope);
        }

        let Some(node) = self.get_mut(id) else {
            return;
        };
        node.transform.dirty |= scope.flags();
        if core::mem::replace(&mut node.scheduled, true) {
            return;
        }
        if let Some(canvas) = self.canvas_data_of_mut(id) {
            canvas.worklist.push_back(id);
        }
    }

    /// Resolve every node queued on the canvas worklist.
    ///
    /// Each queued node gets its rect and viewport transform resolved once. A
    /// rect that differs from the one reported by the previous commit queues
    /// [`Notification::RectChanged`] and is listed in the result. The worklist
    /// is empty afterwards.
    #[tracing::instrument(skip(self))]
    pub fn commit(&mut self, canvas: NodeId) -> FrameChanges {
        let mut frame = FrameChanges::default();
        let queue = match self.get_mut(canvas).and_then(|n| n.canvas_data.as_deref_mut()) {
            Some(data) => core::mem::take(&mut data.worklist),
            None => {
                warn!(?canvas, "commit called on something that is not a canvas");
                return frame;
            }
        };
        for id in queue {
            // Destroyed since it was queued.
            let Some(node) = self.get_mut(id) else {
                continue;
            };
            node.scheduled = false;
            if self.state(id) != NodeState::FullyInitialized {
                continue;
            }
            self.prune_orphans(id);
            self.rect_of(id);
            let Some(node) = self.get_mut(id) else {
                continue;
            };
            let entity = node.entity;
            if let Some((old, new)) = node.transform.take_rect_change() {
                self.notifications.push(Notification::RectChanged {
                    entity,
                    node: id,
                    old,
                    new,
                });
                frame.changes.push(RectChange {
                    node: id,
                    entity,
                    old,
                    new,
                });
            }
            self.viewport_transform_of(id);
            frame.resolved += 1;
        }
        debug!(
            resolved = frame.resolved,
            changed = frame.changes.len(),
            "frame committed"
        );
        frame
    }

    /// The dirty bits of a node.
    pub fn dirty_flags(&self, id: NodeId) -> Option<DirtyFlags> {
        self.get(id).map(|n| n.transform.dirty)
    }

    /// Number of nodes waiting on the canvas worklist.
    pub fn pending_count(&self, canvas: NodeId) -> usize {
        self.canvas_data(canvas).map_or(0, |c| c.worklist.len())
    }

    /// Untransformed canvas-space rect of a node.
    ///
    /// Resolves ancestors lazily as needed. Nodes that are not fully
    /// initialized log a warning and return [`Rect::ZERO`].
    pub fn resolve_rect(&mut self, id: NodeId) -> Rect {
        if !self.check_ready(id) {
            return Rect::ZERO;
        }
        self.rect_of(id)
    }

    /// Transform from the node's untransformed space to canvas space.
    pub fn resolve_canvas_transform(&mut self, id: NodeId) -> Affine {
        if !self.check_ready(id) {
            return Affine::IDENTITY;
        }
        self.canvas_transform_of(id)
    }

    /// Transform from the node's untransformed space to viewport space.
    pub fn resolve_viewport_transform(&mut self, id: NodeId) -> Affine {
        if !self.check_ready(id) {
            return Affine::IDENTITY;
        }
        self.viewport_transform_of(id)
    }

    /// Transform from canvas space to the node's untransformed space.
    ///
    /// Built from the ancestors' local inverses, so it stays finite even when a
    /// scale is zero.
    pub fn from_canvas_transform(&mut self, id: NodeId) -> Affine {
        if !self.check_ready(id) {
            return Affine::IDENTITY;
        }
        self.from_canvas_of(id)
    }

    /// Transform from viewport space to the node's untransformed space.
    pub fn from_viewport_transform(&mut self, id: NodeId) -> Affine {
        if !self.check_ready(id) {
            return Affine::IDENTITY;
        }
        self.from_viewport_of(id)
    }

    /// The node's own rotate/scale about its pivot, in canvas space.
    pub fn local_transform(&mut self, id: NodeId) -> Affine {
        if !self.check_ready(id) {
            return Affine::IDENTITY;
        }
        self.local_transform_of(id)
    }

    /// Inverse of [`Tree::local_transform`].
    pub fn local_inverse_transform(&mut self, id: NodeId) -> Affine {
        if !self.check_ready(id) {
            return Affine::IDENTITY;
        }
        self.local_inverse_of(id)
    }

    /// Returns true if the rect differs from the one last reported by
    /// [`Tree::commit`], or has never been reported.
    pub fn has_rect_changed(&mut self, id: NodeId) -> bool {
        if !self.check_ready(id) {
            return false;
        }
        self.rect_of(id);
        self.get(id).is_some_and(|n| n.transform.has_rect_changed())
    }

    /// Like [`Tree::has_rect_changed`], ignoring size differences of up to 0.05.
    pub fn has_size_changed(&mut self, id: NodeId) -> bool {
        if !self.check_ready(id) {
            return false;
        }
        self.rect_of(id);
        self.get(id).is_some_and(|n| n.transform.has_size_changed())
    }

    /// Returns true while the first rect ever computed has not been reported.
    pub fn has_rect_changed_by_initialization(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.transform.changed_by_init)
    }

    // --- internals ---

    pub(crate) fn check_ready(&self, id: NodeId) -> bool {
        match self.state(id) {
            NodeState::FullyInitialized => true,
            state => {
                warn!(node = ?id, ?state, "element used before it is fully initialized");
                false
            }
        }
    }

    pub(crate) fn device_scale_of(&self, id: NodeId) -> Vec2 {
        self.canvas_data_of(id)
            .map_or(Vec2::new(1.0, 1.0), |c| c.device_scale)
    }

    pub(crate) fn rect_of(&mut self, id: NodeId) -> Rect {
        let Some(node) = self.get(id) else {
            return Rect::ZERO;
        };
        let state = &node.transform;
        if !state.dirty.contains(DirtyFlags::RECT) {
            return state.rect;
        }
        let (anchors, offsets, parent) = (state.anchors, state.offsets, node.parent);
        let rect = match parent {
            Some(parent) => anchored_rect(self.rect_of(parent), anchors, offsets),
            None => {
                let size = match self.canvas_data_of(id) {
                    Some(canvas) => canvas.target_size,
                    None => {
                        warn!(node = ?id, "element has no canvas, using the default canvas size");
                        CanvasConfig::default().target_size
                    }
                };
                Rect::from_origin_size(Point::ZERO, size)
            }
        };
        if let Some(node) = self.get_mut(id) {
            node.transform.store_rect(rect);
        }
        rect
    }

    pub(crate) fn local_transform_of(&mut self, id: NodeId) -> Affine {
        let rect = self.rect_of(id);
        let device = self.device_scale_of(id);
        self.get(id)
            .map_or(Affine::IDENTITY, |n| n.transform.pose.local_transform(rect, device))
    }

    pub(crate) fn local_inverse_of(&mut self, id: NodeId) -> Affine {
        let rect = self.rect_of(id);
        let device = self.device_scale_of(id);
        self.get(id).map_or(Affine::IDENTITY, |n| {
            n.transform.pose.local_inverse_transform(rect, device)
        })
    }

    pub(crate) fn canvas_transform_of(&mut self, id: NodeId) -> Affine {
        let Some(node) = self.get(id) else {
            return Affine::IDENTITY;
        };
        if !node.transform.dirty.contains(DirtyFlags::CANVAS_TRANSFORM) {
            return node.transform.to_canvas;
        }
        let parent = node.parent;
        let transform = match parent {
            Some(parent) => self.canvas_transform_of(parent) * self.local_transform_of(id),
            None => Affine::IDENTITY,
        };
        if let Some(node) = self.get_mut(id) {
            node.transform.to_canvas = transform;
            node.transform.dirty.remove(DirtyFlags::CANVAS_TRANSFORM);
        }
        transform
    }

    pub(crate) fn viewport_transform_of(&mut self, id: NodeId) -> Affine {
        let Some(node) = self.get(id) else {
            return Affine::IDENTITY;
        };
        if !node.transform.dirty.contains(DirtyFlags::VIEWPORT_TRANSFORM) {
            return node.transform.to_viewport;
        }
        let to_canvas = self.canvas_transform_of(id);
        let canvas_to_viewport = self
            .canvas_data_of(id)
            .map_or(Affine::IDENTITY, |c| c.canvas_to_viewport);
        let transform = canvas_to_viewport * to_canvas;
        if let Some(node) = self.get_mut(id) {
            node.transform.to_viewport = transform;
            node.transform.dirty.remove(DirtyFlags::VIEWPORT_TRANSFORM);
            let entity = node.entity;
            self.notifications
                .push(Notification::ViewportTransformChanged { entity, node: id });
        }
        transform
    }

    pub(crate) fn from_canvas_of(&mut self, id: NodeId) -> Affine {
        match self.parent(id) {
            Some(parent) => self.local_inverse_of(id) * self.from_canvas_of(parent),
            None => Affine::IDENTITY,
        }
    }

    pub(crate) fn from_viewport_of(&mut self, id: NodeId) -> Affine {
        let viewport_to_canvas = self
            .canvas_data_of(id)
            .map_or(Affine::IDENTITY, |c| c.viewport_to_canvas);
        self.from_canvas_of(id) * viewport_to_canvas
    }
}
