// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Persisted element data and whole-canvas save/load.

use std::collections::HashSet;

use kurbo::{Point, Vec2};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;
use understory_transform2d::{Anchors, DeviceScaleMode, Offsets};

use crate::canvas::Canvas;
use crate::state::TransformState;
use crate::tree::Node;
use crate::{
    CanvasConfig, ChildEntry, ElementFlags, ElementId, EntityId, NodeId, NodeState, Tree,
    TreeError, TreeResult,
};

/// Persisted hierarchy data of one element.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementData {
    /// Id of the element within its canvas.
    pub element_id: ElementId,
    /// Enabled and editor flags.
    pub flags: ElementFlags,
    /// Ordered child references.
    pub children: Vec<ChildEntry>,
}

impl ElementData {
    /// Put child entries back into a consistent order after an outside merge.
    ///
    /// Entries are stably sorted by sort index, later duplicates of an entity
    /// are dropped and the sort indices are renumbered from zero.
    pub fn normalize_child_order(&mut self) {
        self.children.sort_by_key(|e| e.sort_index);
        let mut seen = HashSet::new();
        self.children.retain(|e| seen.insert(e.entity));
        for (i, entry) in self.children.iter_mut().enumerate() {
            entry.sort_index = i as u64;
        }
    }
}

/// Persisted transform properties of one element.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformData {
    /// Attachment points on the parent.
    pub anchors: Anchors,
    /// Edge displacements from the anchors.
    pub offsets: Offsets,
    /// Normalized pivot.
    pub pivot: Point,
    /// Rotation in degrees.
    pub rotation: f64,
    /// Scale about the pivot.
    pub scale: Vec2,
    /// How the scale follows the device scale. Older data stored a bool here.
    #[serde(deserialize_with = "device_scale_mode_or_bool")]
    pub device_scale_mode: DeviceScaleMode,
    /// Floor offsets whenever the rect is invalidated.
    pub flooring_offsets: bool,
}

impl Default for TransformData {
    /// A 100×100 element centered on its parent.
    fn default() -> Self {
        Self {
            anchors: Anchors::CENTER,
            offsets: Offsets::new(-50.0, -50.0, 50.0, 50.0),
            pivot: Point::new(0.5, 0.5),
            rotation: 0.0,
            scale: Vec2::new(1.0, 1.0),
            device_scale_mode: DeviceScaleMode::None,
            flooring_offsets: false,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredDeviceScaleMode {
    Legacy(bool),
    Mode(DeviceScaleMode),
}

/// `true` in older data meant "scale uniformly to fit".
fn device_scale_mode_or_bool<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DeviceScaleMode, D::Error> {
    Ok(match StoredDeviceScaleMode::deserialize(deserializer)? {
        StoredDeviceScaleMode::Legacy(true) => DeviceScaleMode::UniformScaleToFit,
        StoredDeviceScaleMode::Legacy(false) => DeviceScaleMode::None,
        StoredDeviceScaleMode::Mode(mode) => mode,
    })
}

/// One element of a [`SavedCanvas`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedElement {
    /// The owning entity.
    pub entity: EntityId,
    /// The owning entity's name.
    #[serde(default)]
    pub name: String,
    /// Hierarchy data.
    #[serde(default)]
    pub element: ElementData,
    /// Transform properties.
    #[serde(default)]
    pub transform: TransformData,
}

/// A canvas and all of its elements, as written by [`Tree::save_canvas`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedCanvas {
    /// Canvas sizes, viewport matrix and the next element id.
    pub config: CanvasConfig,
    /// Entity of the canvas root. Its element is listed in `elements`.
    pub root: EntityId,
    /// Every element, root first, then the rest in pre-order.
    pub elements: Vec<SavedElement>,
}

impl Tree {
    /// Attach element data to a registered entity.
    ///
    /// The new node is [`NodeState::Constructed`]: it takes part in nothing
    /// until a parent that lists it is loaded with
    /// [`fixup_after_load`](Tree::fixup_after_load).
    pub fn attach_element(
        &mut self,
        entity: EntityId,
        element: ElementData,
        transform: TransformData,
    ) -> TreeResult<NodeId> {
        if !self.registry.is_alive(entity) {
            return Err(TreeError::UnknownEntity(entity));
        }
        if self.node_of(entity).is_some() {
            return Err(TreeError::DuplicateElement(entity));
        }
        Ok(self.alloc(Node::new(
            entity,
            element.element_id,
            element.flags,
            element.children,
            TransformState::from_data(&transform),
        )))
    }

    /// Snapshot a canvas and all of its elements.
    pub fn save_canvas(&self, root: NodeId) -> TreeResult<SavedCanvas> {
        let config = self
            .canvas_data(root)
            .map(Canvas::config)
            .ok_or(TreeError::NotACanvas(root))?;
        let root_entity = self.entity(root).ok_or(TreeError::StaleNode(root))?;
        let elements = core::iter::once(root)
            .chain(self.descendants(root))
            .filter_map(|id| self.saved_element(id))
            .collect();
        Ok(SavedCanvas {
            config,
            root: root_entity,
            elements,
        })
    }

    /// Recreate a saved canvas and return its root.
    ///
    /// Entities are registered under their saved ids, elements are attached and
    /// the hierarchy is resolved with one [`fixup_after_load`](Tree::fixup_after_load)
    /// call. Child entries naming entities that were not saved are dropped.
    /// Saved elements that no entry reaches are destroyed. If the load fails,
    /// nothing it created is kept.
    pub fn load_canvas(&mut self, saved: SavedCanvas) -> TreeResult<NodeId> {
        let mut seen = HashSet::new();
        for element in &saved.elements {
            if !seen.insert(element.entity) || self.registry.is_alive(element.entity) {
                return Err(TreeError::DuplicateEntity(element.entity));
            }
        }

        let notifications = self.notifications.len();
        let mut created = Vec::with_capacity(saved.elements.len());
        let mut root = None;
        let mut max_element_id = 0;
        for element in saved.elements {
            if let Err(err) = self.registry.spawn_with_id(element.entity, element.name) {
                self.discard(&created, notifications);
                return Err(err);
            }
            max_element_id = max_element_id.max(element.element.element_id.0);
            let node = Node::new(
                element.entity,
                element.element.element_id,
                element.element.flags,
                element.element.children,
                TransformState::from_data(&element.transform),
            );
            let id = self.alloc(node);
            created.push(id);
            if element.entity == saved.root {
                root = Some(id);
            }
        }
        let Some(root) = root else {
            self.discard(&created, notifications);
            return Err(TreeError::UnknownEntity(saved.root));
        };

        let mut canvas = Canvas::checked(saved.config);
        canvas.last_element_id = canvas.last_element_id.max(max_element_id);
        if let Some(n) = self.get_mut(root) {
            n.canvas_data = Some(Box::new(canvas));
            n.canvas = Some(root);
        }

        if let Err(err) = self.fixup_after_load(root, None) {
            self.discard(&created, notifications);
            return Err(err);
        }

        for id in created {
            if self.state(id) == NodeState::Constructed {
                warn!(node = ?id, entity = ?self.entity(id), "saved element is not referenced, destroying it");
                self.destroy(id);
            }
        }
        Ok(root)
    }

    fn saved_element(&self, id: NodeId) -> Option<SavedElement> {
        let node = self.get(id)?;
        let children = node
            .children
            .iter()
            .copied()
            .filter(|e| self.registry.is_alive(e.entity))
            .collect();
        Some(SavedElement {
            entity: node.entity,
            name: self.registry.name(node.entity).unwrap_or_default().to_owned(),
            element: ElementData {
                element_id: node.element_id,
                flags: node.flags,
                children,
            },
            transform: node.transform.to_data(),
        })
    }

    /// Undo a partial load: free the nodes, forget their entities and drop
    /// the notifications queued since `notifications`.
    fn discard(&mut self, created: &[NodeId], notifications: usize) {
        for &id in created {
            if let Some(entity) = self.entity(id) {
                self.free(id);
                self.registry.despawn(entity);
            }
        }
        self.notifications.truncate(notifications);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Notification;
    use kurbo::{Rect, Size};

    fn sample() -> (Tree, NodeId, Vec<NodeId>) {
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
        let panel = tree.create_child(root, "panel").unwrap();
        let ok = tree.create_child(panel, "ok").unwrap();
        let cancel = tree.create_child(panel, "cancel").unwrap();
        tree.set_rotation(panel, 30.0);
        tree.move_local_position_by(ok, Vec2::new(-60.0, 0.0));
        tree.set_enabled(cancel, false);
        tree.set_device_scale_mode(cancel, DeviceScaleMode::ScaleXOnly);
        (tree, root, vec![panel, ok, cancel])
    }

    #[test]
    fn saved_canvas_loads_into_an_identical_tree() {
        let (mut tree, root, nodes) = sample();
        let saved = tree.save_canvas(root).unwrap();
        let json = serde_json::to_string(&saved).unwrap();
        let saved: SavedCanvas = serde_json::from_str(&json).unwrap();

        let mut copy = Tree::new();
        let loaded = copy.load_canvas(saved).unwrap();
        assert_eq!(copy.state(loaded), NodeState::FullyInitialized);
        assert_eq!(copy.name(loaded), Some("canvas"));

        let panel = copy.find_child_by_name(loaded, "panel").unwrap();
        let names: Vec<_> = copy
            .children(panel)
            .into_iter()
            .map(|c| copy.name(c).unwrap().to_owned())
            .collect();
        assert_eq!(names, ["ok", "cancel"]);

        for original in nodes {
            let entity = tree.entity(original).unwrap();
            let twin = copy.node_of(entity).unwrap();
            assert_eq!(copy.element_id(twin), tree.element_id(original));
            assert_eq!(copy.flags(twin), tree.flags(original));
            assert_eq!(copy.device_scale_mode(twin), tree.device_scale_mode(original));
            assert_eq!(copy.resolve_rect(twin), tree.resolve_rect(original));
            assert_eq!(
                copy.resolve_viewport_transform(twin),
                tree.resolve_viewport_transform(original)
            );
        }

        // Ids 1 to 4 are taken by the loaded elements.
        let extra = copy.create_child(loaded, "extra").unwrap();
        assert_eq!(copy.element_id(extra), Some(ElementId(5)));
    }

    #[test]
    fn missing_children_are_dropped_and_strays_destroyed() {
        let (tree, root, _) = sample();
        let mut saved = tree.save_canvas(root).unwrap();
        // The root lists an entity that was never saved.
        saved.elements[0].element.children.push(ChildEntry {
            entity: EntityId(900),
            sort_index: 7,
        });
        // An element nothing refers to.
        saved.elements.push(SavedElement {
            entity: EntityId(901),
            name: "stray".into(),
            element: ElementData::default(),
            transform: TransformData::default(),
        });

        let mut copy = Tree::new();
        let loaded = copy.load_canvas(saved).unwrap();
        assert_eq!(copy.child_count(loaded), 1);
        assert_eq!(copy.child_entries(loaded)[0].sort_index, 0);
        assert!(!copy.registry().is_alive(EntityId(901)));
        assert!(copy.drain_notifications().iter().any(|n| matches!(
            n,
            Notification::BeingDestroyed { entity, .. } if *entity == EntityId(901)
        )));
    }

    #[test]
    fn child_without_element_data_fails_the_whole_load() {
        let (tree, root, _) = sample();
        let mut saved = tree.save_canvas(root).unwrap();
        saved.elements[0].element.children.push(ChildEntry {
            entity: EntityId(77),
            sort_index: 1,
        });

        let mut copy = Tree::new();
        copy.registry_mut()
            .spawn_with_id(EntityId(77), "bare")
            .unwrap();
        assert_eq!(
            copy.load_canvas(saved.clone()),
            Err(TreeError::MissingElementData(EntityId(77)))
        );
        assert_eq!(copy.registry().len(), 1);
        assert!(copy.drain_notifications().is_empty());

        // Loading the same canvas twice collides on entity ids.
        let mut other = Tree::new();
        saved.elements[0].element.children.pop();
        other.load_canvas(saved.clone()).unwrap();
        assert_eq!(
            other.load_canvas(saved.clone()),
            Err(TreeError::DuplicateEntity(saved.elements[0].entity))
        );
    }

    #[test]
    fn element_listed_under_two_parents_keeps_the_first() {
        let (tree, root, nodes) = sample();
        let mut saved = tree.save_canvas(root).unwrap();
        let ok = tree.entity(nodes[1]).unwrap();
        // The root lists `ok` as well, after the panel that already owns it.
        saved.elements[0].element.children.push(ChildEntry {
            entity: ok,
            sort_index: 1,
        });

        let mut copy = Tree::new();
        let loaded = copy.load_canvas(saved).unwrap();
        let panel = copy.find_child_by_name(loaded, "panel").unwrap();
        let ok = copy.node_of(ok).unwrap();
        assert_eq!(copy.children(loaded), vec![panel]);
        assert_eq!(copy.child_count(loaded), 1);
        assert_eq!(copy.parent(ok), Some(panel));
        assert_eq!(copy.children(panel)[0], ok);

        copy.destroy(panel);
        assert!(!copy.is_alive(ok));
        assert_eq!(copy.child_count(loaded), 0);
    }

    #[test]
    fn failed_fixup_leaves_the_subtree_untouched() {
        let mut tree = Tree::new();
        let root = tree.create_canvas("canvas", CanvasConfig::default());
        let [a, b, bare] = ["a", "b", "bare"].map(|name| tree.registry_mut().spawn(name));
        let entry = |entity, sort_index| ChildEntry { entity, sort_index };
        let a_node = tree
            .attach_element(
                a,
                ElementData {
                    children: vec![entry(b, 0), entry(bare, 1)],
                    ..ElementData::default()
                },
                TransformData::default(),
            )
            .unwrap();
        let b_node = tree
            .attach_element(b, ElementData::default(), TransformData::default())
            .unwrap();
        tree.drain_notifications();

        assert_eq!(
            tree.fixup_after_load(a_node, Some(root)),
            Err(TreeError::MissingElementData(bare))
        );
        for id in [a_node, b_node] {
            assert_eq!(tree.state(id), NodeState::Constructed);
            assert_eq!(tree.parent(id), None);
            assert_eq!(tree.canvas_of(id), None);
        }
        assert!(tree.drain_notifications().is_empty());
    }

    #[test]
    fn attach_requires_a_free_registered_entity() {
        let mut tree = Tree::new();
        assert_eq!(
            tree.attach_element(EntityId(5), ElementData::default(), TransformData::default()),
            Err(TreeError::UnknownEntity(EntityId(5)))
        );
        let entity = tree.registry_mut().spawn("thing");
        let id = tree
            .attach_element(entity, ElementData::default(), TransformData::default())
            .unwrap();
        assert_eq!(tree.state(id), NodeState::Constructed);
        assert_eq!(
            tree.attach_element(entity, ElementData::default(), TransformData::default()),
            Err(TreeError::DuplicateElement(entity))
        );
        assert_eq!(tree.resolve_rect(id), Rect::ZERO);
    }

    #[test]
    fn normalize_sorts_dedups_and_renumbers() {
        let entry = |entity, sort_index| ChildEntry {
            entity: EntityId(entity),
            sort_index,
        };
        let mut data = ElementData {
            children: vec![entry(3, 5), entry(1, 0), entry(2, 5), entry(1, 9)],
            ..ElementData::default()
        };
        data.normalize_child_order();
        assert_eq!(data.children, vec![entry(1, 0), entry(3, 1), entry(2, 2)]);
    }

    #[test]
    fn legacy_bool_device_scale_is_read() {
        let on: TransformData = serde_json::from_str(r#"{"device_scale_mode": true}"#).unwrap();
        assert_eq!(on.device_scale_mode, DeviceScaleMode::UniformScaleToFit);
        assert_eq!(on.anchors, Anchors::CENTER);
        let off: TransformData = serde_json::from_str(r#"{"device_scale_mode": false}"#).unwrap();
        assert_eq!(off.device_scale_mode, DeviceScaleMode::None);
        let named: TransformData =
            serde_json::from_str(r#"{"device_scale_mode": "scale_y_only"}"#).unwrap();
        assert_eq!(named.device_scale_mode, DeviceScaleMode::ScaleYOnly);
    }
}
