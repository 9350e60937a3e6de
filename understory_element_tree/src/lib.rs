// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Element Tree: a hierarchy of anchored 2D UI elements.
//!
//! Each element's rect is derived from its parent's rect through anchors and
//! offsets, then rotated and scaled about a pivot. The tree caches every
//! element's rect and its transforms to canvas and viewport space, and
//! recomputes them lazily.
//!
//! - Elements live in canvases. A canvas root covers `(0, 0)` to the canvas
//!   size and maps canvas space to the viewport with an affine matrix.
//! - Edits mark the element and its subtree dirty with a [`Recompute`] scope
//!   and queue the element on its canvas worklist, once per frame.
//! - Reads resolve whatever is stale on demand. [`Tree::commit`] resolves the
//!   worklist at the end of a frame and reports rect changes.
//!
//! The layout math itself (anchors, offsets, pivots, quad overlap) lives in
//! [`understory_transform2d`]. Layout policies such as grids or stacks are not
//! part of this crate; an installed [`LayoutManager`] is told when a child set
//! changes.
//!
//! ## API overview
//!
//! - [`Tree`]: node arena, hierarchy edits, transform properties and queries.
//! - [`NodeId`]: generational handle of a node. [`EntityId`] names the owning
//!   entity and [`ElementId`] the element within its canvas.
//! - [`EntityRegistry`]: the entities the tree resolves child references through.
//! - [`Notification`]: queued events, taken with [`Tree::drain_notifications`].
//! - [`ElementData`], [`TransformData`] and [`SavedCanvas`]: persisted state.
//!
//! Key operations:
//! - [`Tree::create_canvas`], [`Tree::create_child`], [`Tree::reparent`], [`Tree::destroy`]
//! - [`Tree::set_anchors`], [`Tree::set_offsets`], [`Tree::set_rotation`], [`Tree::set_scale`]
//! - [`Tree::commit`] → [`FrameChanges`]
//! - [`Tree::point_in_rect`], [`Tree::rect_overlaps`],
//!   [`Tree::find_frontmost_child_containing_point`]
//!
//! Elements that are not fully initialized (see [`NodeState`]) answer
//! geometry queries with defaults and log a warning through `tracing`.
//!
//! ## Example
//!
//! ```
//! use kurbo::{Point, Rect, Size};
//! use understory_element_tree::{Anchors, CanvasConfig, HitMode, Offsets, Tree};
//!
//! let mut tree = Tree::new();
//! let size = Size::new(800.0, 600.0);
//! let canvas = tree.create_canvas(
//!     "hud",
//!     CanvasConfig { authored_size: size, target_size: size, ..CanvasConfig::default() },
//! );
//!
//! // A 200×50 button 20 pixels in from the top-left corner.
//! let button = tree.create_child(canvas, "button")?;
//! tree.set_anchors(button, Anchors::TOP_LEFT, false, false);
//! tree.set_offsets(button, Offsets::new(20.0, 20.0, 220.0, 70.0));
//!
//! let frame = tree.commit(canvas);
//! let change = frame.changes.iter().find(|c| c.node == button).unwrap();
//! assert_eq!(change.new, Rect::new(20.0, 20.0, 220.0, 70.0));
//!
//! let hit = tree.find_frontmost_child_containing_point(canvas, Point::new(30.0, 30.0), HitMode::Game);
//! assert_eq!(hit, Some(button));
//! # Ok::<(), understory_element_tree::TreeError>(())
//! ```

mod canvas;
mod dirty;
mod error;
mod events;
mod flags;
mod invalidate;
mod persist;
mod props;
mod query;
mod registry;
mod state;
mod tree;
mod types;

pub use canvas::CanvasConfig;
pub use dirty::{DirtyFlags, Recompute};
pub use error::{TreeError, TreeResult};
pub use events::{LayoutManager, Notification};
pub use invalidate::{FrameChanges, RectChange};
pub use persist::{ElementData, SavedCanvas, SavedElement, TransformData};
pub use query::DeviceScaleWarning;
pub use registry::EntityRegistry;
pub use tree::Tree;
pub use types::{ChildEntry, ElementFlags, ElementId, EntityId, HitMode, NodeId, NodeState};

pub use understory_transform2d::{Anchors, DeviceScaleMode, Offsets, RectPoints};
