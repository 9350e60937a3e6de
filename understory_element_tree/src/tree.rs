// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core tree implementation: node arena, hierarchy edits and lookups.

use std::collections::HashSet;

use tracing::{error, warn};
use understory_transform2d::{Anchors, Offsets};

use crate::canvas::Canvas;
use crate::state::TransformState;
use crate::{
    ChildEntry, ElementFlags, ElementId, EntityId, EntityRegistry, LayoutManager, NodeId,
    NodeState, Notification, Recompute, TreeError, TreeResult,
};

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// Top-level element tree.
///
/// Holds any number of canvases. Each canvas is a root node created with
/// [`Tree::create_canvas`]; every other node belongs to exactly one canvas.
pub struct Tree {
    nodes: Vec<Option<Node>>, // slots
    generations: Vec<u32>,    // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    pub(crate) registry: EntityRegistry,
    pub(crate) notifications: Vec<Notification>,
    layout_manager: Option<Box<dyn LayoutManager>>,
}

impl core::fmt::Debug for Tree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        let free = self.free_list.len();
        f.debug_struct("Tree")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &free)
            .field("entities", &self.registry.len())
            .field("pending_notifications", &self.notifications.len())
            .field("has_layout_manager", &self.layout_manager.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    generation: u32,
    pub(crate) entity: EntityId,
    pub(crate) element_id: ElementId,
    pub(crate) flags: ElementFlags,
    pub(crate) parent: Option<NodeId>,
    pub(crate) canvas: Option<NodeId>,
    /// Persisted child order.
    pub(crate) children: Vec<ChildEntry>,
    /// Resolved `children`, present once the node is initialized.
    pub(crate) child_cache: Option<Vec<NodeId>>,
    pub(crate) initialized: bool,
    /// Queued on the canvas worklist.
    pub(crate) scheduled: bool,
    pub(crate) transform: TransformState,
    pub(crate) canvas_data: Option<Box<Canvas>>,
}

impl Node {
    pub(crate) fn new(
        entity: EntityId,
        element_id: ElementId,
        flags: ElementFlags,
        children: Vec<ChildEntry>,
        transform: TransformState,
    ) -> Self {
        Self {
            generation: 0,
            entity,
            element_id,
            flags,
            parent: None,
            canvas: None,
            children,
            child_cache: None,
            initialized: false,
            scheduled: false,
            transform,
            canvas_data: None,
        }
    }

    fn renumber_children(&mut self) {
        for (i, entry) in self.children.iter_mut().enumerate() {
            entry.sort_index = i as u64;
        }
    }
}

/// Links computed by [`Tree::fixup_after_load`] before any are written.
#[derive(Default)]
struct FixupPlan {
    steps: Vec<FixupStep>,
    /// Nodes given a parent in this pass.
    placed: HashSet<NodeId>,
    /// Nodes on the current path from the subtree root.
    path: Vec<NodeId>,
    /// The existing parent the subtree is loaded under.
    above: Option<NodeId>,
}

struct FixupStep {
    node: NodeId,
    parent: Option<NodeId>,
    kept: Vec<ChildEntry>,
    resolved: Vec<NodeId>,
}

impl Tree {
    /// Create a new empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            registry: EntityRegistry::new(),
            notifications: Vec::new(),
            layout_manager: None,
        }
    }

    /// The entity registry the tree resolves child references through.
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Mutable access to the entity registry.
    ///
    /// Despawning an entity here without destroying its node first orphans the
    /// node. The orphan is torn down the next time its parent's children are
    /// walked, and an error is logged.
    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    /// Install the collaborator told about child-set changes.
    pub fn set_layout_manager(&mut self, manager: Box<dyn LayoutManager>) {
        self.layout_manager = Some(manager);
    }

    /// Take all queued notifications, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        core::mem::take(&mut self.notifications)
    }

    /// Returns true if `id` refers to a live node.
    ///
    /// A `NodeId` is considered live if its slot exists and its generation matches
    /// the current generation stored in that slot.
    /// See [`NodeId`] docs for the generational semantics.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// The entity that owns the node.
    pub fn entity(&self, id: NodeId) -> Option<EntityId> {
        self.get(id).map(|n| n.entity)
    }

    /// The live node owned by an entity.
    pub fn node_of(&self, entity: EntityId) -> Option<NodeId> {
        self.registry.node(entity).filter(|&id| self.is_alive(id))
    }

    /// The name of the node's entity.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.registry.name(self.get(id)?.entity)
    }

    /// The node's element id.
    pub fn element_id(&self, id: NodeId) -> Option<ElementId> {
        self.get(id).map(|n| n.element_id)
    }

    /// Lifecycle state of a node.
    ///
    /// An initialized node is [`NodeState::Detached`] unless its parent chain
    /// reaches a canvas root, so the descendants of a removed node are
    /// detached along with it.
    pub fn state(&self, id: NodeId) -> NodeState {
        let Some(node) = self.get(id) else {
            return NodeState::Destroyed;
        };
        match (node.initialized, node.parent.is_some()) {
            (false, true) => NodeState::Attached,
            (false, false) if node.canvas.is_some() => NodeState::Attached,
            (false, false) => NodeState::Constructed,
            (true, _) if self.reaches_canvas_root(id) => NodeState::FullyInitialized,
            (true, _) => NodeState::Detached,
        }
    }

    /// Create a child element at the end of `parent`'s children.
    ///
    /// A new entity named `name` is spawned to own it. If `parent` is
    /// initialized, so is the child.
    pub fn create_child(&mut self, parent: NodeId, name: impl Into<String>) -> TreeResult<NodeId> {
        let p = self.get(parent).ok_or(TreeError::StaleNode(parent))?;
        let (canvas, initialized) = (p.canvas, p.initialized);
        let element_id = self
            .canvas_data_of_mut(parent)
            .map(Canvas::generate_id)
            .unwrap_or_default();
        let entity = self.registry.spawn(name);
        let mut node = Node::new(
            entity,
            element_id,
            ElementFlags::default(),
            Vec::new(),
            TransformState::default(),
        );
        node.parent = Some(parent);
        node.canvas = canvas;
        node.initialized = initialized;
        if initialized {
            node.child_cache = Some(Vec::new());
        }
        let id = self.alloc(node);
        if let Some(p) = self.get_mut(parent) {
            let sort_index = p.children.len() as u64;
            p.children.push(ChildEntry { entity, sort_index });
            if let Some(cache) = p.child_cache.as_mut() {
                cache.push(id);
            }
        }
        self.notify_child_set_changed(parent);
        self.mark_dirty(id, Recompute::RectAndTransform);
        Ok(id)
    }

    /// Add `child` to `parent`'s children, before `before` or at the end.
    ///
    /// The child must not have a parent already.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        before: Option<NodeId>,
    ) -> TreeResult<()> {
        let p = self.get(parent).ok_or(TreeError::StaleNode(parent))?;
        let c = self.get(child).ok_or(TreeError::StaleNode(child))?;
        if parent == child {
            return Err(TreeError::SelfParent(child));
        }
        if p.children.iter().any(|e| e.entity == c.entity) {
            error!(?parent, ?child, "element is already a child");
            return Err(TreeError::DuplicateChild { parent, child });
        }
        if let Some(current) = c.parent {
            return Err(TreeError::ChildHasParent {
                parent: current,
                child,
            });
        }
        if let (Some(a), Some(b)) = (p.canvas, c.canvas) {
            if a != b {
                return Err(TreeError::CrossCanvas {
                    node: child,
                    parent,
                });
            }
        }
        if self.is_ancestor(child, parent) {
            return Err(TreeError::WouldCycle {
                node: child,
                parent,
            });
        }
        let index = self.insertion_index(parent, before)?;
        self.link(parent, child, index);
        self.notify_child_set_changed(parent);
        self.mark_dirty(child, Recompute::RectAndTransform);
        Ok(())
    }

    /// Remove `child` from `parent`'s children.
    ///
    /// The child keeps its subtree. An initialized child becomes
    /// [`NodeState::Detached`] until it is added somewhere again.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        if !self.is_alive(parent) {
            return Err(TreeError::StaleNode(parent));
        }
        if !self.is_alive(child) {
            return Err(TreeError::StaleNode(child));
        }
        if self.child_index(parent, child).is_none() {
            return Err(TreeError::NotAChild { parent, child });
        }
        self.unlink(parent, child);
        self.notify_child_set_changed(parent);
        Ok(())
    }

    /// Move an initialized node under `new_parent`, or under its canvas root if `None`.
    ///
    /// The move either happens completely or not at all. Moving a node under
    /// itself, under one of its descendants or into another canvas is refused.
    pub fn reparent(
        &mut self,
        node: NodeId,
        new_parent: Option<NodeId>,
        before: Option<NodeId>,
    ) -> TreeResult<()> {
        let (target, old_parent) = self.validate_reparent(node, new_parent)?;
        if before == Some(node) {
            return Err(TreeError::InsertBeforeNotFound {
                parent: target,
                before: node,
            });
        }
        if let Some(b) = before {
            if self.child_index(target, b).is_none() {
                return Err(TreeError::InsertBeforeNotFound { parent: target, before: b });
            }
        }

        if let Some(old) = old_parent {
            self.unlink(old, node);
        }
        // `before` is still a child of `target`: it is not `node`.
        let index = self.insertion_index(target, before)?;
        self.link(target, node, index);

        if let Some(old) = old_parent {
            if old != target {
                self.notify_child_set_changed(old);
            }
        }
        self.notify_child_set_changed(target);
        self.mark_dirty(node, Recompute::RectAndTransform);
        Ok(())
    }

    /// Move an initialized node so it ends up at `index` among `new_parent`'s
    /// children (its canvas root's if `None`). Indices past the end append.
    pub fn add_to_parent_at_index(
        &mut self,
        node: NodeId,
        new_parent: Option<NodeId>,
        index: usize,
    ) -> TreeResult<()> {
        let (target, _) = self.validate_reparent(node, new_parent)?;
        match self.child_at(target, index) {
            // Already in place.
            Some(before) if before == node => Ok(()),
            before => self.reparent(node, Some(target), before),
        }
    }

    /// Remove a node from its parent's children, if it has a parent.
    pub fn remove_from_parent(&mut self, node: NodeId) -> TreeResult<()> {
        let n = self.get(node).ok_or(TreeError::StaleNode(node))?;
        match n.parent {
            Some(parent) => self.remove_child(parent, node),
            None => Ok(()),
        }
    }

    /// Destroy a node and its whole subtree.
    ///
    /// Children are destroyed first, then the node is unlinked from its parent,
    /// [`Notification::BeingDestroyed`] is queued and the owning entity is
    /// despawned. Destroying a stale id does nothing.
    pub fn destroy(&mut self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }
        for child in self.live_children(id) {
            self.destroy(child);
        }
        let Some(node) = self.get(id) else {
            return;
        };
        let (entity, parent) = (node.entity, node.parent);
        if let Some(parent) = parent.filter(|&p| self.is_alive(p)) {
            self.unlink(parent, id);
            self.notify_child_set_changed(parent);
        }
        self.notifications
            .push(Notification::BeingDestroyed { entity, node: id });
        self.registry.despawn(entity);
        self.free(id);
    }

    /// Resolve a loaded hierarchy and make it ready for queries.
    ///
    /// With `parent == None`, `node` must be a canvas root. Every persisted
    /// child entry is resolved through the entity registry, depth first.
    /// Entries are dropped with an error log when their entity no longer
    /// exists, when they repeat an entity already placed in this pass, or when
    /// the entity's element already belongs to a parent outside the subtree.
    /// An entity without element data, or an entry that would close a cycle,
    /// aborts the load.
    ///
    /// The whole subtree is checked before anything is written: on error no
    /// node is touched. On success every node in the subtree is initialized,
    /// [`Notification::Fixup`] is queued for each and the subtree is marked
    /// dirty.
    #[tracing::instrument(skip(self))]
    pub fn fixup_after_load(&mut self, node: NodeId, parent: Option<NodeId>) -> TreeResult<()> {
        let canvas = match parent {
            None => {
                let n = self.get(node).ok_or(TreeError::StaleNode(node))?;
                if n.canvas_data.is_none() {
                    return Err(TreeError::NotACanvas(node));
                }
                node
            }
            Some(p) => {
                let pn = self.get(p).ok_or(TreeError::StaleNode(p))?;
                pn.canvas.ok_or(TreeError::NotInitialized(p))?
            }
        };
        if let Some(p) = parent {
            if p == node || self.is_ancestor(node, p) {
                return Err(TreeError::WouldCycle { node, parent: p });
            }
        }
        let mut plan = FixupPlan {
            above: parent,
            ..FixupPlan::default()
        };
        self.plan_fixup(node, parent, node, &mut plan)?;

        let canvas_entity = self.entity(canvas).unwrap_or(EntityId(0));
        for step in plan.steps {
            let parent_entity = step.parent.and_then(|p| self.entity(p));
            let Some(n) = self.get_mut(step.node) else {
                continue;
            };
            n.parent = step.parent;
            n.canvas = Some(canvas);
            n.children = step.kept;
            n.renumber_children();
            n.child_cache = Some(step.resolved);
            n.initialized = true;
            let entity = n.entity;
            self.notifications.push(Notification::Fixup {
                entity,
                node: step.node,
                canvas: canvas_entity,
                parent: parent_entity,
            });
        }
        self.mark_dirty(node, Recompute::RectAndTransform);
        Ok(())
    }

    /// Collects, children first, the links `fixup_after_load` will write.
    fn plan_fixup(
        &self,
        id: NodeId,
        parent: Option<NodeId>,
        top: NodeId,
        plan: &mut FixupPlan,
    ) -> TreeResult<()> {
        let n = self.get(id).ok_or(TreeError::StaleNode(id))?;
        plan.placed.insert(id);
        plan.path.push(id);
        let mut kept = Vec::with_capacity(n.children.len());
        let mut resolved = Vec::with_capacity(n.children.len());
        for entry in &n.children {
            if !self.registry.is_alive(entry.entity) {
                error!(node = ?id, child = ?entry.entity, "child entity not found, dropping it");
                continue;
            }
            let Some(child) = self.node_of(entry.entity) else {
                error!(node = ?id, child = ?entry.entity, "child entity has no element data");
                return Err(TreeError::MissingElementData(entry.entity));
            };
            let closes_cycle = plan.path.contains(&child)
                || plan
                    .above
                    .is_some_and(|a| a == child || self.is_ancestor(child, a));
            if closes_cycle {
                error!(node = ?id, child = ?entry.entity, "child entry would create a cycle");
                return Err(TreeError::WouldCycle {
                    node: child,
                    parent: id,
                });
            }
            if plan.placed.contains(&child) {
                error!(node = ?id, child = ?entry.entity, "element already has a parent, dropping the entry");
                continue;
            }
            if let Some(owner) = self.outside_owner(child, id, top) {
                error!(
                    node = ?id,
                    child = ?entry.entity,
                    ?owner,
                    "element belongs to a parent outside the loaded subtree, dropping the entry"
                );
                continue;
            }
            self.plan_fixup(child, Some(id), top, plan)?;
            kept.push(*entry);
            resolved.push(child);
        }
        plan.path.pop();
        plan.steps.push(FixupStep {
            node: id,
            parent,
            kept,
            resolved,
        });
        Ok(())
    }

    /// The live parent of `child`, if it is neither `parent` nor inside the
    /// subtree rooted at `top`.
    fn outside_owner(&self, child: NodeId, parent: NodeId, top: NodeId) -> Option<NodeId> {
        let owner = self.get(child)?.parent?;
        if owner == parent || !self.is_alive(owner) {
            return None;
        }
        if owner == top || self.is_ancestor(top, owner) {
            return None;
        }
        Some(owner)
    }

    // --- lookups ---

    /// The node's parent.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    /// The root of the canvas the node belongs to.
    pub fn canvas_of(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.canvas
    }

    /// The node's live children in order.
    ///
    /// Children whose entity was despawned without destroying the node are
    /// left out.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.child_nodes(id)
    }

    /// The node's persisted child list.
    pub fn child_entries(&self, id: NodeId) -> &[ChildEntry] {
        self.get(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Number of child entries.
    pub fn child_count(&self, id: NodeId) -> usize {
        self.child_entries(id).len()
    }

    /// The child at `index`.
    pub fn child_at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        let entry = self.child_entries(id).get(index)?;
        self.node_of(entry.entity)
    }

    /// Position of `child` among `parent`'s children.
    pub fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        let entity = self.get(child)?.entity;
        self.child_entries(parent)
            .iter()
            .position(|e| e.entity == entity)
    }

    /// First direct child named `name`.
    pub fn find_child_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.child_nodes(id)
            .into_iter()
            .find(|&c| self.name(c) == Some(name))
    }

    /// First descendant named `name`, depth first: a child's subtree is searched
    /// before the child's later siblings.
    pub fn find_descendant_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        for child in self.child_nodes(id) {
            if self.name(child) == Some(name) {
                return Some(child);
            }
            if let Some(found) = self.find_descendant_by_name(child, name) {
                return Some(found);
            }
        }
        None
    }

    /// The node itself or its first descendant with the given element id.
    pub fn find_descendant_by_element_id(&self, id: NodeId, element_id: ElementId) -> Option<NodeId> {
        if self.element_id(id)? == element_id {
            return Some(id);
        }
        self.child_nodes(id)
            .into_iter()
            .find_map(|c| self.find_descendant_by_element_id(c, element_id))
    }

    /// All descendants matching `predicate`, in pre-order.
    pub fn find_descendants(
        &self,
        id: NodeId,
        mut predicate: impl FnMut(NodeId) -> bool,
    ) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&d| predicate(d))
            .collect()
    }

    /// All descendants of a node in pre-order, excluding the node itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.child_nodes(id).into_iter().rev().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.child_nodes(n).into_iter().rev());
        }
        out
    }

    /// Returns true if `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        // Bounded in case a corrupt load produced a parent cycle.
        for _ in 0..self.nodes.len() {
            match current {
                Some(p) if p == ancestor => return true,
                Some(p) => current = self.parent(p),
                None => return false,
            }
        }
        false
    }

    // --- internals ---

    /// Returns true if the topmost ancestor of `id` (or `id` itself) is a canvas root.
    fn reaches_canvas_root(&self, id: NodeId) -> bool {
        let mut current = id;
        // Bounded in case a corrupt load produced a parent cycle.
        for _ in 0..=self.nodes.len() {
            let Some(node) = self.get(current) else {
                return false;
            };
            match node.parent {
                Some(parent) => current = parent,
                None => return node.canvas_data.is_some(),
            }
        }
        false
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.1).then_some(n)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        (n.generation == id.1).then_some(n)
    }

    pub(crate) fn alloc(&mut self, mut node: Node) -> NodeId {
        let entity = node.entity;
        let id = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            node.generation = generation;
            self.nodes[idx] = Some(node);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            let idx = idx as u32;
            NodeId::new(idx, generation)
        } else {
            let generation = 1_u32;
            node.generation = generation;
            self.nodes.push(Some(node));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            let idx = (self.nodes.len() - 1) as u32;
            NodeId::new(idx, generation)
        };
        self.registry.set_node(entity, Some(id));
        id
    }

    pub(crate) fn alloc_canvas_root(&mut self, entity: EntityId, mut canvas: Canvas) -> NodeId {
        let element_id = canvas.generate_id();
        let mut state = TransformState::default();
        state.anchors = Anchors::STRETCH;
        state.offsets = Offsets::ZERO;
        let mut node = Node::new(entity, element_id, ElementFlags::default(), Vec::new(), state);
        node.canvas_data = Some(Box::new(canvas));
        node.initialized = true;
        node.child_cache = Some(Vec::new());
        let id = self.alloc(node);
        if let Some(n) = self.get_mut(id) {
            n.canvas = Some(id);
        }
        id
    }

    pub(crate) fn free(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.idx()).and_then(Option::take) else {
            return;
        };
        if self.registry.node(node.entity) == Some(id) {
            self.registry.set_node(node.entity, None);
        }
        self.free_list.push(id.idx());
    }

    /// Ids of every live node, in slot order.
    pub(crate) fn live_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, n)| {
            let n = n.as_ref()?;
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            let idx = i as u32;
            Some(NodeId::new(idx, n.generation))
        })
    }

    /// Resolved children, skipping entries whose entity or node is gone.
    pub(crate) fn child_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.get(id) else {
            return Vec::new();
        };
        match &node.child_cache {
            Some(cache) => cache
                .iter()
                .copied()
                .filter(|&c| {
                    self.get(c)
                        .is_some_and(|n| self.registry.is_alive(n.entity))
                })
                .collect(),
            None => node
                .children
                .iter()
                .filter_map(|e| self.node_of(e.entity))
                .collect(),
        }
    }

    /// Children after tearing down any orphans among them.
    pub(crate) fn live_children(&mut self, id: NodeId) -> Vec<NodeId> {
        self.prune_orphans(id);
        self.child_nodes(id)
    }

    /// Drops child entries whose entity was despawned behind the tree's back,
    /// and destroys the nodes those entities left behind.
    pub(crate) fn prune_orphans(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else {
            return;
        };
        let dead: Vec<EntityId> = node
            .children
            .iter()
            .map(|e| e.entity)
            .filter(|&e| !self.registry.is_alive(e))
            .collect();
        if dead.is_empty() {
            return;
        }
        error!(
            node = ?id,
            count = dead.len(),
            "child entities were destroyed without destroying their elements"
        );
        if let Some(n) = self.get_mut(id) {
            n.children.retain(|e| !dead.contains(&e.entity));
            n.renumber_children();
        }
        let orphans: Vec<NodeId> = self
            .live_ids()
            .filter(|&o| {
                self.get(o)
                    .is_some_and(|n| n.parent == Some(id) && dead.contains(&n.entity))
            })
            .collect();
        self.sync_child_cache(id);
        for orphan in orphans {
            if let Some(n) = self.get_mut(orphan) {
                n.parent = None;
            }
            self.destroy(orphan);
        }
        self.notify_child_set_changed(id);
    }

    /// Rebuilds the resolved child list of an initialized node.
    fn sync_child_cache(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else {
            return;
        };
        if node.child_cache.is_none() {
            return;
        }
        let resolved: Vec<NodeId> = node
            .children
            .iter()
            .filter_map(|e| self.node_of(e.entity))
            .collect();
        if let Some(n) = self.get_mut(id) {
            n.child_cache = Some(resolved);
        }
    }

    fn insertion_index(&self, parent: NodeId, before: Option<NodeId>) -> TreeResult<usize> {
        match before {
            None => Ok(self.child_count(parent)),
            Some(b) => self
                .child_index(parent, b)
                .ok_or(TreeError::InsertBeforeNotFound { parent, before: b }),
        }
    }

    /// Checks a reparent request and returns the resolved target and current parent.
    fn validate_reparent(
        &self,
        node: NodeId,
        new_parent: Option<NodeId>,
    ) -> TreeResult<(NodeId, Option<NodeId>)> {
        let n = self.get(node).ok_or(TreeError::StaleNode(node))?;
        let canvas = match (n.initialized, n.canvas) {
            (true, Some(canvas)) => canvas,
            _ => {
                warn!(?node, "cannot reparent an element that is not initialized");
                return Err(TreeError::NotInitialized(node));
            }
        };
        let target = new_parent.unwrap_or(canvas);
        if target == node {
            warn!(?node, "refusing to make an element its own parent");
            return Err(TreeError::SelfParent(node));
        }
        let t = self.get(target).ok_or(TreeError::StaleNode(target))?;
        if t.canvas != Some(canvas) {
            warn!(?node, parent = ?target, "refusing to move an element to another canvas");
            return Err(TreeError::CrossCanvas {
                node,
                parent: target,
            });
        }
        if self.is_ancestor(node, target) {
            warn!(?node, parent = ?target, "refusing to move an element under its own descendant");
            return Err(TreeError::WouldCycle {
                node,
                parent: target,
            });
        }
        Ok((target, n.parent))
    }

    fn link(&mut self, parent: NodeId, child: NodeId, index: usize) {
        let Some(entity) = self.entity(child) else {
            return;
        };
        let Some(p) = self.get_mut(parent) else {
            return;
        };
        let canvas = p.canvas;
        let index = index.min(p.children.len());
        p.children.insert(
            index,
            ChildEntry {
                entity,
                sort_index: 0,
            },
        );
        p.renumber_children();
        self.sync_child_cache(parent);
        if let Some(c) = self.get_mut(child) {
            c.parent = Some(parent);
            if c.canvas.is_none() {
                c.canvas = canvas;
            }
        }
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId) {
        let Some(entity) = self.entity(child) else {
            return;
        };
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|e| e.entity != entity);
            p.renumber_children();
        }
        self.sync_child_cache(parent);
        if let Some(c) = self.get_mut(child) {
            c.parent = None;
        }
    }

    fn notify_child_set_changed(&mut self, parent: NodeId) {
        if let Some(manager) = self.layout_manager.as_mut() {
            manager.mark_to_recompute_layout(parent);
            manager.mark_layouts_affected_by_cell_change(parent, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CanvasConfig;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn sort_indices(tree: &Tree, id: NodeId) -> Vec<u64> {
        tree.child_entries(id).iter().map(|e| e.sort_index).collect()
    }

    fn canvas_with(names: &[&str]) -> (Tree, NodeId, Vec<NodeId>) {
        let mut tree = Tree::new();
        let root = tree.create_canvas("canvas", CanvasConfig::default());
        let kids = names
            .iter()
            .map(|n| tree.create_child(root, *n).unwrap())
            .collect();
        (tree, root, kids)
    }

    #[derive(Default)]
    struct Recorder(Rc<RefCell<Vec<NodeId>>>);

    impl LayoutManager for Recorder {
        fn mark_to_recompute_layout(&mut self, element: NodeId) {
            self.0.borrow_mut().push(element);
        }

        fn mark_layouts_affected_by_cell_change(&mut self, _: NodeId, is_default: bool) {
            assert!(!is_default);
        }
    }

    #[test]
    fn new_children_are_initialized_and_numbered() {
        let (tree, root, kids) = canvas_with(&["a", "b", "c"]);
        assert_eq!(tree.children(root), kids);
        assert_eq!(sort_indices(&tree, root), vec![0, 1, 2]);
        assert_eq!(tree.state(kids[0]), NodeState::FullyInitialized);
        assert_eq!(tree.state(root), NodeState::FullyInitialized);
        assert_eq!(tree.canvas_of(kids[2]), Some(root));
    }

    #[test]
    fn reparent_keeps_sort_indices_contiguous() {
        let (mut tree, root, kids) = canvas_with(&["a", "b", "c"]);
        let d = tree.create_child(kids[0], "d").unwrap();

        tree.reparent(d, None, Some(kids[1])).unwrap();
        assert_eq!(tree.children(root), vec![kids[0], d, kids[1], kids[2]]);
        assert_eq!(sort_indices(&tree, root), vec![0, 1, 2, 3]);
        assert!(tree.children(kids[0]).is_empty());
        assert_eq!(tree.parent(d), Some(root));

        // Moving within the same parent.
        tree.reparent(kids[2], None, Some(kids[0])).unwrap();
        assert_eq!(tree.children(root), vec![kids[2], kids[0], d, kids[1]]);
        assert_eq!(sort_indices(&tree, root), vec![0, 1, 2, 3]);
    }

    #[test]
    fn reparent_refuses_self_cycles_and_other_canvases() {
        let (mut tree, root, kids) = canvas_with(&["a"]);
        let inner = tree.create_child(kids[0], "inner").unwrap();
        let other = tree.create_canvas("other", CanvasConfig::default());

        assert_eq!(
            tree.reparent(kids[0], Some(kids[0]), None),
            Err(TreeError::SelfParent(kids[0]))
        );
        assert_eq!(
            tree.reparent(kids[0], Some(inner), None),
            Err(TreeError::WouldCycle {
                node: kids[0],
                parent: inner
            })
        );
        assert_eq!(
            tree.reparent(kids[0], Some(other), None),
            Err(TreeError::CrossCanvas {
                node: kids[0],
                parent: other
            })
        );
        // Nothing moved.
        assert_eq!(tree.children(root), kids);
        assert_eq!(tree.parent(inner), Some(kids[0]));
    }

    #[test]
    fn add_child_rejects_duplicates_and_bad_insertion_points() {
        let (mut tree, root, kids) = canvas_with(&["a", "b"]);
        assert_eq!(
            tree.add_child(root, kids[0], None),
            Err(TreeError::DuplicateChild {
                parent: root,
                child: kids[0]
            })
        );
        tree.remove_child(root, kids[1]).unwrap();
        assert_eq!(tree.state(kids[1]), NodeState::Detached);
        let stranger = tree.create_child(kids[0], "stranger").unwrap();
        assert_eq!(
            tree.add_child(root, kids[1], Some(stranger)),
            Err(TreeError::InsertBeforeNotFound {
                parent: root,
                before: stranger
            })
        );
        tree.add_child(root, kids[1], Some(kids[0])).unwrap();
        assert_eq!(tree.children(root), vec![kids[1], kids[0]]);
        assert_eq!(sort_indices(&tree, root), vec![0, 1]);
        assert_eq!(tree.state(kids[1]), NodeState::FullyInitialized);
    }

    #[test]
    fn removing_a_node_detaches_its_whole_subtree() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let (mut tree, root, kids) = canvas_with(&["panel"]);
        let panel = kids[0];
        let label = tree.create_child(panel, "label").unwrap();
        let icon = tree.create_child(label, "icon").unwrap();
        tree.commit(root);

        tree.remove_child(root, panel).unwrap();
        for id in [panel, label, icon] {
            assert_eq!(tree.state(id), NodeState::Detached);
        }
        assert_eq!(tree.resolve_rect(icon), kurbo::Rect::ZERO);
        assert_eq!(tree.resolve_viewport_transform(label), kurbo::Affine::IDENTITY);

        // Children created under a detached node are detached too.
        let late = tree.create_child(label, "late").unwrap();
        assert_eq!(tree.state(late), NodeState::Detached);

        tree.add_child(root, panel, None).unwrap();
        for id in [panel, label, icon, late] {
            assert_eq!(tree.state(id), NodeState::FullyInitialized);
        }
        assert_eq!(
            tree.resolve_rect(icon),
            kurbo::Rect::new(590.0, 310.0, 690.0, 410.0)
        );
    }

    #[test]
    fn child_set_changes_reach_the_layout_manager() {
        let (mut tree, root, kids) = canvas_with(&["a", "b"]);
        let calls = Rc::new(RefCell::new(Vec::new()));
        tree.set_layout_manager(Box::new(Recorder(calls.clone())));

        tree.remove_child(root, kids[0]).unwrap();
        tree.add_child(root, kids[0], None).unwrap();
        tree.reparent(kids[1], Some(kids[0]), None).unwrap();
        assert_eq!(*calls.borrow(), vec![root, root, root, kids[0]]);
    }

    #[test]
    fn add_to_parent_at_index_moves_before_the_occupant() {
        let (mut tree, root, kids) = canvas_with(&["a", "b", "c"]);
        tree.add_to_parent_at_index(kids[2], None, 0).unwrap();
        assert_eq!(tree.children(root), vec![kids[2], kids[0], kids[1]]);
        // Same slot is a no-op.
        tree.add_to_parent_at_index(kids[2], None, 0).unwrap();
        assert_eq!(tree.children(root), vec![kids[2], kids[0], kids[1]]);
        tree.add_to_parent_at_index(kids[2], None, 99).unwrap();
        assert_eq!(tree.children(root), vec![kids[0], kids[1], kids[2]]);
    }

    #[test]
    fn destroy_tears_down_subtree_children_first() {
        let (mut tree, root, kids) = canvas_with(&["a", "b"]);
        let inner = tree.create_child(kids[0], "inner").unwrap();
        let inner_entity = tree.entity(inner).unwrap();
        let a_entity = tree.entity(kids[0]).unwrap();
        tree.drain_notifications();

        tree.destroy(kids[0]);
        assert!(!tree.is_alive(kids[0]));
        assert!(!tree.is_alive(inner));
        assert!(!tree.registry().is_alive(a_entity));
        assert_eq!(tree.children(root), vec![kids[1]]);
        assert_eq!(sort_indices(&tree, root), vec![0]);

        let destroyed: Vec<EntityId> = tree
            .drain_notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::BeingDestroyed { entity, .. } => Some(entity),
                _ => None,
            })
            .collect();
        assert_eq!(destroyed, vec![inner_entity, a_entity]);

        // Idempotent.
        tree.destroy(kids[0]);
        assert_eq!(tree.state(kids[0]), NodeState::Destroyed);
    }

    #[test]
    fn slots_are_reused_with_new_generation() {
        let (mut tree, root, kids) = canvas_with(&["a"]);
        tree.destroy(kids[0]);
        let again = tree.create_child(root, "again").unwrap();
        assert_eq!(again.0, kids[0].0);
        assert_ne!(again, kids[0]);
        assert!(!tree.is_alive(kids[0]));
    }

    #[test]
    fn despawned_child_entity_is_recovered() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let (mut tree, root, kids) = canvas_with(&["a", "b"]);
        let grandchild = tree.create_child(kids[0], "gc").unwrap();
        let a_entity = tree.entity(kids[0]).unwrap();
        tree.registry_mut().despawn(a_entity);

        // Orphans are invisible to lookups right away.
        assert_eq!(tree.children(root), vec![kids[1]]);

        // The next walk over the parent's children tears them down.
        tree.mark_dirty(root, Recompute::RectOnly);
        assert!(!tree.is_alive(kids[0]));
        assert!(!tree.is_alive(grandchild));
        assert_eq!(tree.child_count(root), 1);
        assert_eq!(sort_indices(&tree, root), vec![0]);
    }

    #[test]
    fn lookups_by_name_and_element_id() {
        let (mut tree, root, kids) = canvas_with(&["a", "b"]);
        let deep = tree.create_child(kids[0], "target").unwrap();
        let shallow = tree.create_child(kids[1], "target").unwrap();

        assert_eq!(tree.find_child_by_name(root, "b"), Some(kids[1]));
        assert_eq!(tree.find_child_by_name(root, "target"), None);
        // Depth first: the subtree of `a` is searched before `b`'s.
        assert_eq!(tree.find_descendant_by_name(root, "target"), Some(deep));

        let eid = tree.element_id(shallow).unwrap();
        assert_eq!(tree.find_descendant_by_element_id(root, eid), Some(shallow));
        let root_eid = tree.element_id(root).unwrap();
        assert_eq!(tree.find_descendant_by_element_id(root, root_eid), Some(root));

        assert_eq!(tree.descendants(root), vec![kids[0], deep, kids[1], shallow]);
        assert_eq!(
            tree.find_descendants(root, |n| tree.name(n) == Some("target")),
            vec![deep, shallow]
        );
        assert!(tree.is_ancestor(root, deep));
        assert!(!tree.is_ancestor(kids[1], deep));
    }
}
