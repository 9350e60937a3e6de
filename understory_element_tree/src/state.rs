// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node transform data plus its cached geometry.

use kurbo::{Affine, Rect};
use understory_transform2d::{Anchors, Offsets, Pose};

use crate::{DirtyFlags, TransformData};

/// Sizes closer than this on both axes count as unchanged.
const SIZE_CHANGE_TOLERANCE: f64 = 0.05;

#[derive(Clone, Debug)]
pub(crate) struct TransformState {
    pub(crate) anchors: Anchors,
    pub(crate) offsets: Offsets,
    pub(crate) pose: Pose,
    pub(crate) flooring_offsets: bool,

    // Cached geometry, valid for the bits not set in `dirty`.
    pub(crate) rect: Rect,
    pub(crate) to_canvas: Affine,
    pub(crate) to_viewport: Affine,
    pub(crate) dirty: DirtyFlags,

    // Rect last reported by the frame pass.
    pub(crate) prev_rect: Rect,
    pub(crate) rect_initialized: bool,
    pub(crate) changed_by_init: bool,
}

impl Default for TransformState {
    fn default() -> Self {
        Self::from_data(&TransformData::default())
    }
}

impl TransformState {
    pub(crate) fn from_data(data: &TransformData) -> Self {
        Self {
            anchors: data.anchors,
            offsets: data.offsets,
            pose: Pose {
                pivot: data.pivot,
                rotation: data.rotation,
                scale: data.scale,
                device_scale_mode: data.device_scale_mode,
            },
            flooring_offsets: data.flooring_offsets,
            rect: Rect::ZERO,
            to_canvas: Affine::IDENTITY,
            to_viewport: Affine::IDENTITY,
            dirty: DirtyFlags::all(),
            prev_rect: Rect::ZERO,
            rect_initialized: false,
            changed_by_init: false,
        }
    }

    pub(crate) fn to_data(&self) -> TransformData {
        TransformData {
            anchors: self.anchors,
            offsets: self.offsets,
            pivot: self.pose.pivot,
            rotation: self.pose.rotation,
            scale: self.pose.scale,
            device_scale_mode: self.pose.device_scale_mode,
            flooring_offsets: self.flooring_offsets,
        }
    }

    /// Stores a freshly computed rect and clears the rect bit.
    ///
    /// The first rect ever stored also becomes the previous rect and is flagged
    /// as a change caused by initialization. Until that change is reported, the
    /// previous rect follows the current one.
    pub(crate) fn store_rect(&mut self, rect: Rect) {
        self.rect = rect;
        if !self.rect_initialized {
            self.prev_rect = rect;
            self.changed_by_init = true;
            self.rect_initialized = true;
        } else if self.changed_by_init {
            self.prev_rect = rect;
        }
        self.dirty.remove(DirtyFlags::RECT);
    }

    pub(crate) fn has_rect_changed(&self) -> bool {
        self.changed_by_init || self.rect != self.prev_rect
    }

    pub(crate) fn has_size_changed(&self) -> bool {
        if !self.has_rect_changed() {
            return false;
        }
        if self.changed_by_init {
            return true;
        }
        let old = self.prev_rect.size();
        let new = self.rect.size();
        (old.width - new.width).abs() > SIZE_CHANGE_TOLERANCE
            || (old.height - new.height).abs() > SIZE_CHANGE_TOLERANCE
    }

    /// Marks the current rect as reported and returns the change to report, if any.
    pub(crate) fn take_rect_change(&mut self) -> Option<(Option<Rect>, Rect)> {
        if !self.has_rect_changed() {
            return None;
        }
        let old = (!self.changed_by_init).then_some(self.prev_rect);
        self.prev_rect = self.rect;
        self.changed_by_init = false;
        Some((old, self.rect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_rect_is_a_change_from_nothing() {
        let mut state = TransformState::default();
        assert!(!state.has_rect_changed());
        state.store_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(state.has_rect_changed());
        assert!(state.has_size_changed());

        // Recomputed again before the first report: still reported as initial.
        state.store_rect(Rect::new(0.0, 0.0, 20.0, 10.0));
        assert_eq!(
            state.take_rect_change(),
            Some((None, Rect::new(0.0, 0.0, 20.0, 10.0)))
        );
        assert_eq!(state.take_rect_change(), None);
    }

    #[test]
    fn later_changes_report_previous_rect() {
        let mut state = TransformState::default();
        state.store_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        let _ = state.take_rect_change();

        state.store_rect(Rect::new(5.0, 0.0, 15.0, 10.0));
        assert!(state.has_rect_changed());
        assert!(!state.has_size_changed(), "pure moves keep the size");
        assert_eq!(
            state.take_rect_change(),
            Some((
                Some(Rect::new(0.0, 0.0, 10.0, 10.0)),
                Rect::new(5.0, 0.0, 15.0, 10.0)
            ))
        );
    }

    #[test]
    fn tiny_size_changes_are_ignored() {
        let mut state = TransformState::default();
        state.store_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        let _ = state.take_rect_change();
        state.store_rect(Rect::new(0.0, 0.0, 10.01, 10.0));
        assert!(state.has_rect_changed());
        assert!(!state.has_size_changed());
    }
}
