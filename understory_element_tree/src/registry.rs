// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Entity registry: the owner-side view of the entities elements belong to.

use std::collections::HashMap;

use crate::{EntityId, NodeId, TreeError, TreeResult};

#[derive(Clone, Debug)]
struct EntityRecord {
    name: String,
    node: Option<NodeId>,
}

/// Registry of live entities and the element node each one owns, if any.
///
/// The tree resolves persisted child references ([`EntityId`]s) through this
/// registry. Despawning an entity directly, without
/// [`Tree::destroy`](crate::Tree::destroy), leaves its node orphaned; the tree
/// detects and tears down such nodes the next time it walks their parent.
#[derive(Clone, Debug)]
pub struct EntityRegistry {
    records: HashMap<EntityId, EntityRecord>,
    next_id: u64,
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            next_id: 1,
        }
    }

    /// Register a new entity with a fresh id.
    pub fn spawn(&mut self, name: impl Into<String>) -> EntityId {
        while self.records.contains_key(&EntityId(self.next_id)) {
            self.next_id += 1;
        }
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.records.insert(
            id,
            EntityRecord {
                name: name.into(),
                node: None,
            },
        );
        id
    }

    /// Register an entity under a given id, for example when loading saved data.
    pub fn spawn_with_id(&mut self, id: EntityId, name: impl Into<String>) -> TreeResult<EntityId> {
        if self.records.contains_key(&id) {
            return Err(TreeError::DuplicateEntity(id));
        }
        self.records.insert(
            id,
            EntityRecord {
                name: name.into(),
                node: None,
            },
        );
        Ok(id)
    }

    /// Remove an entity. Returns `false` if it was not registered.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        self.records.remove(&id).is_some()
    }

    /// Returns true if the entity is registered.
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.records.contains_key(&id)
    }

    /// The entity's name.
    pub fn name(&self, id: EntityId) -> Option<&str> {
        self.records.get(&id).map(|r| r.name.as_str())
    }

    /// Rename an entity. Returns `false` if it is not registered.
    pub fn rename(&mut self, id: EntityId, name: impl Into<String>) -> bool {
        match self.records.get_mut(&id) {
            Some(record) => {
                record.name = name.into();
                true
            }
            None => false,
        }
    }

    /// The element node owned by the entity, if any.
    pub fn node(&self, id: EntityId) -> Option<NodeId> {
        self.records.get(&id).and_then(|r| r.node)
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no entities are registered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn set_node(&mut self, id: EntityId, node: Option<NodeId>) {
        if let Some(record) = self.records.get_mut(&id) {
            record.node = node;
        }
    }
}
