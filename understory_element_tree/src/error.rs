// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{EntityId, NodeId};

/// Convenience result type used across the element tree.
pub type TreeResult<T> = Result<T, TreeError>;

/// Structural errors reported by [`Tree`](crate::Tree) operations.
///
/// Every refused operation leaves the tree unchanged.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The id does not refer to a live node.
    #[error("stale node id {0:?}")]
    StaleNode(NodeId),

    /// The entity is not registered.
    #[error("unknown entity {0:?}")]
    UnknownEntity(EntityId),

    /// An entity with this id is already registered.
    #[error("entity {0:?} is already registered")]
    DuplicateEntity(EntityId),

    /// The entity already owns element data.
    #[error("entity {0:?} already has element data")]
    DuplicateElement(EntityId),

    /// The child is already in the parent's child list.
    #[error("{child:?} is already a child of {parent:?}")]
    DuplicateChild {
        /// The parent the child was being added to.
        parent: NodeId,
        /// The child being added.
        child: NodeId,
    },

    /// The child already has a different parent.
    #[error("{child:?} already has parent {parent:?}")]
    ChildHasParent {
        /// The child's current parent.
        parent: NodeId,
        /// The child being added.
        child: NodeId,
    },

    /// The requested insertion point is not a child of the parent.
    #[error("{before:?} is not a child of {parent:?}")]
    InsertBeforeNotFound {
        /// The parent the child was being added to.
        parent: NodeId,
        /// The sibling the child was supposed to precede.
        before: NodeId,
    },

    /// The node is not a child of the parent.
    #[error("{child:?} is not a child of {parent:?}")]
    NotAChild {
        /// The supposed parent.
        parent: NodeId,
        /// The supposed child.
        child: NodeId,
    },

    /// A node cannot become its own parent.
    #[error("{0:?} cannot be its own parent")]
    SelfParent(NodeId),

    /// The move would make a node its own ancestor.
    #[error("moving {node:?} under {parent:?} would create a cycle")]
    WouldCycle {
        /// The node being moved.
        node: NodeId,
        /// The requested parent, a descendant of `node`.
        parent: NodeId,
    },

    /// Elements cannot move between canvases.
    #[error("{node:?} belongs to a different canvas than {parent:?}")]
    CrossCanvas {
        /// The node being moved.
        node: NodeId,
        /// The requested parent.
        parent: NodeId,
    },

    /// The node is not a canvas root.
    #[error("{0:?} is not a canvas")]
    NotACanvas(NodeId),

    /// The operation needs a fully initialized node.
    #[error("{0:?} is not fully initialized")]
    NotInitialized(NodeId),

    /// A child entity exists but carries no element data, so the hierarchy cannot be loaded.
    #[error("child entity {0:?} has no element data")]
    MissingElementData(EntityId),

    /// A matrix that must be invertible is singular.
    #[error("canvas-to-viewport matrix is not invertible")]
    SingularMatrix,
}
