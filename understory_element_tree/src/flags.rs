// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Enabled state and editor flags.

use crate::{ElementFlags, NodeId, Notification, Tree};

impl Tree {
    /// The node's persisted flags.
    pub fn flags(&self, id: NodeId) -> Option<ElementFlags> {
        self.get(id).map(|n| n.flags)
    }

    /// Returns true if the node's own enabled flag is set.
    pub fn is_enabled(&self, id: NodeId) -> bool {
        self.has_flag(id, ElementFlags::ENABLED)
    }

    /// Returns true if the node and all of its ancestors are enabled.
    pub fn is_enabled_in_hierarchy(&self, id: NodeId) -> bool {
        self.is_enabled(id) && self.ancestors_enabled(id)
    }

    /// Set the node's own enabled flag.
    ///
    /// Queues [`Notification::EnabledChanged`]. If all ancestors are enabled the
    /// hierarchy state changed too, so [`Notification::EnabledInHierarchyChanged`]
    /// is queued for the node and every descendant reachable through enabled
    /// children.
    pub fn set_enabled(&mut self, id: NodeId, enabled: bool) {
        let Some(node) = self.get_mut(id) else {
            return;
        };
        if node.flags.contains(ElementFlags::ENABLED) == enabled {
            return;
        }
        node.flags.set(ElementFlags::ENABLED, enabled);
        let entity = node.entity;
        self.notifications.push(Notification::EnabledChanged {
            entity,
            node: id,
            enabled,
        });
        if !self.ancestors_enabled(id) {
            return;
        }
        for target in self.enabled_hierarchy_targets(id) {
            if let Some(entity) = self.entity(target) {
                self.notifications
                    .push(Notification::EnabledInHierarchyChanged {
                        entity,
                        node: target,
                        enabled,
                    });
            }
        }
    }

    /// The node followed by every descendant whose enabled-in-hierarchy state
    /// follows the node's, in pre-order. Disabled children and their subtrees
    /// are left out.
    pub fn enabled_hierarchy_targets(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(
                self.child_nodes(n)
                    .into_iter()
                    .rev()
                    .filter(|&c| self.is_enabled(c)),
            );
        }
        out
    }

    /// Returns true if the node is visible in the editor.
    pub fn is_visible_in_editor(&self, id: NodeId) -> bool {
        self.has_flag(id, ElementFlags::VISIBLE_IN_EDITOR)
    }

    /// Show or hide the node in the editor.
    pub fn set_visible_in_editor(&mut self, id: NodeId, visible: bool) {
        self.set_flag(id, ElementFlags::VISIBLE_IN_EDITOR, visible);
    }

    /// Returns true if the node can be picked in the editor.
    pub fn is_selectable_in_editor(&self, id: NodeId) -> bool {
        self.has_flag(id, ElementFlags::SELECTABLE_IN_EDITOR)
    }

    /// Allow or forbid picking the node in the editor.
    pub fn set_selectable_in_editor(&mut self, id: NodeId, selectable: bool) {
        self.set_flag(id, ElementFlags::SELECTABLE_IN_EDITOR, selectable);
    }

    /// Returns true if the node is selected in the editor.
    pub fn is_selected_in_editor(&self, id: NodeId) -> bool {
        self.has_flag(id, ElementFlags::SELECTED_IN_EDITOR)
    }

    /// Mark the node as selected in the editor.
    pub fn set_selected_in_editor(&mut self, id: NodeId, selected: bool) {
        self.set_flag(id, ElementFlags::SELECTED_IN_EDITOR, selected);
    }

    /// Returns true if the node's children are expanded in the editor's hierarchy view.
    pub fn is_expanded_in_editor(&self, id: NodeId) -> bool {
        self.has_flag(id, ElementFlags::EXPANDED_IN_EDITOR)
    }

    /// Expand or collapse the node in the editor's hierarchy view.
    pub fn set_expanded_in_editor(&mut self, id: NodeId, expanded: bool) {
        self.set_flag(id, ElementFlags::EXPANDED_IN_EDITOR, expanded);
    }

    /// Returns true if no ancestor of the node is hidden in the editor.
    pub fn are_all_ancestors_visible(&self, id: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(p) = current {
            if !self.is_visible_in_editor(p) {
                return false;
            }
            current = self.parent(p);
        }
        true
    }

    fn ancestors_enabled(&self, id: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(p) = current {
            if !self.is_enabled(p) {
                return false;
            }
            current = self.parent(p);
        }
        true
    }

    fn has_flag(&self, id: NodeId, flag: ElementFlags) -> bool {
        self.get(id).is_some_and(|n| n.flags.contains(flag))
    }

    fn set_flag(&mut self, id: NodeId, flag: ElementFlags, on: bool) {
        if let Some(n) = self.get_mut(id) {
            n.flags.set(flag, on);
        }
    }
}
