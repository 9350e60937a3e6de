// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canvas context: sizes, device scale, the viewport matrix and the frame worklist.

use std::collections::VecDeque;

use kurbo::{Affine, Size, Vec2};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{ElementId, Notification, NodeId, Recompute, Tree, TreeError, TreeResult};

/// Tolerance used when comparing canvas-to-viewport matrices.
const MATRIX_TOLERANCE: f64 = 1e-6;

/// Configuration for a new canvas, passed to [`Tree::create_canvas`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// The size the canvas was authored at.
    pub authored_size: Size,
    /// The size the canvas is displayed at. Device scale is `target / authored`.
    pub target_size: Size,
    /// Maps canvas space to viewport space.
    pub canvas_to_viewport: Affine,
    /// The element id given to the first element created in the canvas.
    pub first_element_id: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            authored_size: Size::new(1280.0, 720.0),
            target_size: Size::new(1280.0, 720.0),
            canvas_to_viewport: Affine::IDENTITY,
            first_element_id: 1,
        }
    }
}

/// Per-canvas state stored on the canvas root node.
#[derive(Clone, Debug)]
pub(crate) struct Canvas {
    pub(crate) authored_size: Size,
    pub(crate) target_size: Size,
    pub(crate) device_scale: Vec2,
    pub(crate) canvas_to_viewport: Affine,
    pub(crate) viewport_to_canvas: Affine,
    /// Nodes with dirty geometry, each queued at most once.
    pub(crate) worklist: VecDeque<NodeId>,
    pub(crate) last_element_id: u32,
}

impl Canvas {
    /// A singular `canvas_to_viewport` matrix must be replaced before this is called.
    pub(crate) fn new(config: &CanvasConfig) -> Self {
        Self {
            authored_size: config.authored_size,
            target_size: config.target_size,
            device_scale: device_scale(config.target_size, config.authored_size),
            canvas_to_viewport: config.canvas_to_viewport,
            viewport_to_canvas: invert(config.canvas_to_viewport).unwrap_or(Affine::IDENTITY),
            worklist: VecDeque::new(),
            last_element_id: config.first_element_id.saturating_sub(1),
        }
    }

    /// Like [`Canvas::new`], replacing a singular matrix by the identity with a warning.
    pub(crate) fn checked(mut config: CanvasConfig) -> Self {
        if invert(config.canvas_to_viewport).is_err() {
            warn!("canvas-to-viewport matrix is singular, using identity");
            config.canvas_to_viewport = Affine::IDENTITY;
        }
        Self::new(&config)
    }

    /// The configuration that recreates this canvas, continuing its element ids.
    pub(crate) fn config(&self) -> CanvasConfig {
        CanvasConfig {
            authored_size: self.authored_size,
            target_size: self.target_size,
            canvas_to_viewport: self.canvas_to_viewport,
            first_element_id: self.last_element_id.saturating_add(1),
        }
    }

    pub(crate) fn generate_id(&mut self) -> ElementId {
        self.last_element_id = self.last_element_id.saturating_add(1);
        ElementId(self.last_element_id)
    }
}

fn device_scale(target: Size, authored: Size) -> Vec2 {
    let axis = |t: f64, a: f64| if a == 0.0 { 1.0 } else { t / a };
    Vec2::new(
        axis(target.width, authored.width),
        axis(target.height, authored.height),
    )
}

fn invert(matrix: Affine) -> TreeResult<Affine> {
    let det = matrix.determinant();
    if det == 0.0 || !det.is_finite() || !matrix.is_finite() {
        return Err(TreeError::SingularMatrix);
    }
    Ok(matrix.inverse())
}

fn affine_is_close(a: Affine, b: Affine) -> bool {
    a.as_coeffs()
        .iter()
        .zip(b.as_coeffs().iter())
        .all(|(x, y)| (x - y).abs() <= MATRIX_TOLERANCE)
}

impl Tree {
    /// Create a new canvas and return its root node.
    ///
    /// The root's rect is `(0, 0)` to the target size. A singular
    /// `canvas_to_viewport` matrix in the configuration is replaced by the
    /// identity with a warning.
    pub fn create_canvas(&mut self, name: impl Into<String>, config: CanvasConfig) -> NodeId {
        let canvas = Canvas::checked(config);
        let entity = self.registry.spawn(name);
        let id = self.alloc_canvas_root(entity, canvas);
        self.mark_dirty(id, Recompute::RectAndTransform);
        id
    }

    /// Replace the canvas-to-viewport matrix.
    ///
    /// Nothing changes if the matrix is within tolerance of the current one.
    /// Otherwise every node's viewport transform is invalidated.
    pub fn set_canvas_to_viewport(&mut self, canvas: NodeId, matrix: Affine) -> TreeResult<()> {
        let data = self.canvas_data_mut(canvas)?;
        if affine_is_close(data.canvas_to_viewport, matrix) {
            return Ok(());
        }
        let inverse = invert(matrix).inspect_err(|_| {
            warn!(?canvas, "refusing singular canvas-to-viewport matrix");
        })?;
        data.canvas_to_viewport = matrix;
        data.viewport_to_canvas = inverse;
        self.mark_dirty(canvas, Recompute::ViewportTransformOnly);
        Ok(())
    }

    /// Set the size the canvas is displayed at.
    ///
    /// In game the target size becomes `size` and the device scale is
    /// `size / authored size`. In the editor the target size is always the
    /// authored size and the device scale is left alone.
    pub fn set_target_canvas_size(
        &mut self,
        canvas: NodeId,
        size: Size,
        in_game: bool,
    ) -> TreeResult<()> {
        let data = self.canvas_data_mut(canvas)?;
        let old_target = data.target_size;
        let old_scale = data.device_scale;
        if in_game {
            data.target_size = size;
            data.device_scale = device_scale(size, data.authored_size);
        } else {
            data.target_size = data.authored_size;
        }
        let target_changed = data.target_size != old_target;
        let scale_changed = data.device_scale != old_scale;
        let scope = match (target_changed, scale_changed) {
            (false, false) => return Ok(()),
            (true, false) => Recompute::RectOnly,
            (true, true) => Recompute::RectAndTransform,
            (false, true) => Recompute::TransformOnly,
        };
        self.mark_dirty(canvas, scope);
        if let Some(entity) = self.entity(canvas) {
            self.notifications
                .push(Notification::CanvasSizeOrScaleChanged { entity, canvas });
        }
        Ok(())
    }

    /// Size the canvas is displayed at.
    pub fn canvas_size(&self, canvas: NodeId) -> Option<Size> {
        self.canvas_data(canvas).map(|c| c.target_size)
    }

    /// Size the canvas was authored at.
    pub fn authored_canvas_size(&self, canvas: NodeId) -> Option<Size> {
        self.canvas_data(canvas).map(|c| c.authored_size)
    }

    /// Per-axis ratio of target size to authored size.
    pub fn device_scale(&self, canvas: NodeId) -> Option<Vec2> {
        self.canvas_data(canvas).map(|c| c.device_scale)
    }

    /// The canvas-to-viewport matrix.
    pub fn canvas_to_viewport(&self, canvas: NodeId) -> Option<Affine> {
        self.canvas_data(canvas).map(|c| c.canvas_to_viewport)
    }

    /// The inverse of [`Tree::canvas_to_viewport`].
    pub fn viewport_to_canvas(&self, canvas: NodeId) -> Option<Affine> {
        self.canvas_data(canvas).map(|c| c.viewport_to_canvas)
    }

    /// Canvas state stored on a canvas root.
    pub(crate) fn canvas_data(&self, canvas: NodeId) -> Option<&Canvas> {
        self.get(canvas)?.canvas_data.as_deref()
    }

    fn canvas_data_mut(&mut self, canvas: NodeId) -> TreeResult<&mut Canvas> {
        let node = self.get_mut(canvas).ok_or(TreeError::StaleNode(canvas))?;
        node.canvas_data
            .as_deref_mut()
            .ok_or(TreeError::NotACanvas(canvas))
    }

    /// Canvas state of the canvas a node belongs to.
    pub(crate) fn canvas_data_of(&self, id: NodeId) -> Option<&Canvas> {
        let canvas = self.get(id)?.canvas?;
        self.canvas_data(canvas)
    }

    pub(crate) fn canvas_data_of_mut(&mut self, id: NodeId) -> Option<&mut Canvas> {
        let canvas = self.get(id)?.canvas?;
        self.get_mut(canvas)?.canvas_data.as_deref_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;

    #[test]
    fn in_game_target_size_sets_device_scale() {
        let mut tree = Tree::new();
        let root = tree.create_canvas("canvas", CanvasConfig::default());
        tree.commit(root);

        tree.set_target_canvas_size(root, Size::new(2560.0, 1440.0), true)
            .unwrap();
        assert_eq!(tree.device_scale(root), Some(Vec2::new(2.0, 2.0)));
        assert_eq!(tree.canvas_size(root), Some(Size::new(2560.0, 1440.0)));
        assert_eq!(
            tree.resolve_rect(root),
            Rect::new(0.0, 0.0, 2560.0, 1440.0)
        );
        assert!(
            tree.drain_notifications()
                .iter()
                .any(|n| matches!(n, Notification::CanvasSizeOrScaleChanged { .. }))
        );
    }

    #[test]
    fn editor_target_size_is_authored_size() {
        let mut tree = Tree::new();
        let root = tree.create_canvas(
            "canvas",
            CanvasConfig {
                target_size: Size::new(640.0, 360.0),
                ..CanvasConfig::default()
            },
        );
        tree.set_target_canvas_size(root, Size::new(100.0, 100.0), false)
            .unwrap();
        assert_eq!(tree.canvas_size(root), Some(Size::new(1280.0, 720.0)));
        // Device scale keeps its in-game value.
        assert_eq!(tree.device_scale(root), Some(Vec2::new(0.5, 0.5)));
    }

    #[test]
    fn singular_viewport_matrix_is_refused() {
        let mut tree = Tree::new();
        let root = tree.create_canvas("canvas", CanvasConfig::default());
        tree.commit(root);
        assert_eq!(
            tree.set_canvas_to_viewport(root, Affine::scale(0.0)),
            Err(TreeError::SingularMatrix)
        );
        assert_eq!(tree.canvas_to_viewport(root), Some(Affine::IDENTITY));
        assert_eq!(tree.pending_count(root), 0);
    }

    #[test]
    fn viewport_matrix_change_only_dirties_viewport_transforms() {
        let mut tree = Tree::new();
        let root = tree.create_canvas("canvas", CanvasConfig::default());
        let child = tree.create_child(root, "child").unwrap();
        tree.commit(root);

        let m = Affine::translate((10.0, 20.0));
        tree.set_canvas_to_viewport(root, m).unwrap();
        assert_eq!(
            tree.dirty_flags(child),
            Some(crate::DirtyFlags::VIEWPORT_TRANSFORM)
        );
        assert_eq!(tree.viewport_to_canvas(root), Some(m.inverse()));

        // Setting an equal matrix is a no-op.
        tree.commit(root);
        tree.set_canvas_to_viewport(root, m).unwrap();
        assert_eq!(tree.pending_count(root), 0);
    }

    #[test]
    fn element_ids_start_at_seed() {
        let mut tree = Tree::new();
        let root = tree.create_canvas(
            "canvas",
            CanvasConfig {
                first_element_id: 10,
                ..CanvasConfig::default()
            },
        );
        let child = tree.create_child(root, "child").unwrap();
        assert_eq!(tree.element_id(root), Some(ElementId(10)));
        assert_eq!(tree.element_id(child), Some(ElementId(11)));
    }
}
