// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the element tree: identifiers, flags, child entries and lifecycle states.

use serde::{Deserialize, Serialize};

/// Identifier for a node in the tree.
///
/// This is a small, copyable handle that stays stable across updates but becomes
/// invalid when the underlying slot is reused.
/// It consists of a slot index and a generation counter.
///
/// ## Semantics
///
/// - On creation, a fresh slot is allocated with generation `1`.
/// - On [`destroy`](crate::Tree::destroy), the slot is freed; any existing `NodeId` that pointed to that slot is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new, distinct `NodeId`.
///
/// ### Liveness
///
/// Use [`Tree::is_alive`](crate::Tree::is_alive) to check whether a `NodeId` still refers to a live node.
/// Stale `NodeId`s never alias a different live node because the generation must match.
///
/// `NodeId`s are process-local handles. The persisted identity of an element is
/// its owning [`EntityId`] together with its [`ElementId`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Identifier of the external entity that owns an element.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

/// Element identifier, unique within one canvas.
///
/// Generated by the canvas when an element is created in it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u32);

bitflags::bitflags! {
    /// Persisted per-element flags.
    ///
    /// The `*_IN_EDITOR` flags only affect editor-mode queries
    /// (see [`HitMode::Editor`]).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ElementFlags: u8 {
        /// The element itself is enabled.
        const ENABLED              = 0b0000_0001;
        /// The element is shown in the editor.
        const VISIBLE_IN_EDITOR    = 0b0000_0010;
        /// The element can be picked in the editor.
        const SELECTABLE_IN_EDITOR = 0b0000_0100;
        /// The element is currently selected in the editor.
        const SELECTED_IN_EDITOR   = 0b0000_1000;
        /// The element's children are expanded in the editor's hierarchy view.
        const EXPANDED_IN_EDITOR   = 0b0001_0000;
    }
}

impl Default for ElementFlags {
    fn default() -> Self {
        Self::ENABLED | Self::VISIBLE_IN_EDITOR | Self::SELECTABLE_IN_EDITOR
    }
}

/// One entry of an element's ordered child list.
///
/// `sort_index` equals the entry's position after every structural change made
/// through the tree. It is the persisted ordering key: when child lists are
/// merged or patched outside the tree, entries are re-sorted by it (see
/// [`ElementData::normalize_child_order`](crate::ElementData::normalize_child_order)).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChildEntry {
    /// The child's owning entity.
    pub entity: EntityId,
    /// Position of the child among its siblings.
    pub sort_index: u64,
}

/// Lifecycle state of a node.
///
/// ```text
/// Constructed → Attached → FullyInitialized → Detached → Destroyed
/// ```
///
/// Only [`NodeState::FullyInitialized`] nodes answer geometry queries; the others
/// log a warning and return a default.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum NodeState {
    /// Element data is attached to an entity, but the node has no parent or canvas yet.
    Constructed,
    /// Linked into a hierarchy whose caches have not been resolved by
    /// [`fixup_after_load`](crate::Tree::fixup_after_load).
    Attached,
    /// Linked into a canvas and ready for queries.
    FullyInitialized,
    /// Was initialized, but it or one of its ancestors has since been removed
    /// from its parent.
    Detached,
    /// The id no longer refers to a live node.
    Destroyed,
}

/// Which elements take part in hit and overlap queries.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum HitMode {
    /// Every element takes part.
    #[default]
    Game,
    /// Elements hidden in the editor are skipped together with their
    /// descendants, and elements not selectable in the editor never match.
    Editor,
}
