// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Outbound notifications and the layout-manager collaborator.

use kurbo::Rect;

use crate::{EntityId, NodeId};

/// Something observers of the tree may want to react to.
///
/// Notifications are queued in the order they happen and handed out by
/// [`Tree::drain_notifications`](crate::Tree::drain_notifications).
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    /// A node's untransformed canvas-space rect changed since the previous frame.
    ///
    /// Sent at most once per node per [`commit`](crate::Tree::commit).
    RectChanged {
        /// The owning entity.
        entity: EntityId,
        /// The node.
        node: NodeId,
        /// The rect reported last frame; `None` the first time the rect is reported.
        old: Option<Rect>,
        /// The current rect.
        new: Rect,
    },
    /// A node's transform to viewport space was recomputed.
    ViewportTransformChanged {
        /// The owning entity.
        entity: EntityId,
        /// The node.
        node: NodeId,
    },
    /// A node is about to be destroyed. Its children have already been destroyed.
    BeingDestroyed {
        /// The owning entity.
        entity: EntityId,
        /// The node, stale once the notification is observed.
        node: NodeId,
    },
    /// [`fixup_after_load`](crate::Tree::fixup_after_load) finished for a node.
    Fixup {
        /// The owning entity.
        entity: EntityId,
        /// The node.
        node: NodeId,
        /// The canvas the node now belongs to.
        canvas: EntityId,
        /// The node's parent, `None` for a canvas root.
        parent: Option<EntityId>,
    },
    /// A canvas's target size or device scale changed.
    CanvasSizeOrScaleChanged {
        /// The canvas root's entity.
        entity: EntityId,
        /// The canvas root.
        canvas: NodeId,
    },
    /// A node's own enabled flag changed.
    EnabledChanged {
        /// The owning entity.
        entity: EntityId,
        /// The node.
        node: NodeId,
        /// The new value.
        enabled: bool,
    },
    /// The combined enabled state of a node and all its ancestors changed.
    EnabledInHierarchyChanged {
        /// The owning entity.
        entity: EntityId,
        /// The node.
        node: NodeId,
        /// The new combined value.
        enabled: bool,
    },
}

/// Receives requests to re-run layouts when a child set changes.
///
/// Layout policies (grids, stacks and so on) live outside the tree. The tree only
/// tells the installed manager which elements need their layout recomputed.
pub trait LayoutManager {
    /// The children of `element` changed, so its own layout must be recomputed.
    fn mark_to_recompute_layout(&mut self, element: NodeId);

    /// Layouts that size themselves from `element`'s layout cell must be recomputed.
    fn mark_layouts_affected_by_cell_change(&mut self, element: NodeId, is_default_layout_cell: bool);
}
