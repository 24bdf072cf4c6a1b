//! Tier containers - the arena that owns every node.
//!
//! - **Near-term**: bounded and insertion-ordered; the oldest node is evicted
//!   once capacity is exceeded
//! - **Mid-term / long-term**: unbounded, keyed by id
//!
//! Nodes reference each other only by [`MemoryId`]; every dereference goes
//! through [`TierStore::get`].

use std::collections::{HashMap, VecDeque};

use crate::memory::{MemoryId, MemoryNode, MemoryTier};

/// Bounded, insertion-ordered container.
#[derive(Debug, Clone)]
pub struct NearTermTier {
    capacity: usize,
    order: VecDeque<MemoryId>,
    nodes: HashMap<MemoryId, MemoryNode>,
}

impl NearTermTier {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            nodes: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert at the newest end. Re-inserting an id replaces it and makes it newest.
    pub fn insert(&mut self, node: MemoryNode) -> Option<MemoryNode> {
        let id = node.id();
        let previous = self.nodes.insert(id, node);
        if previous.is_some() {
            self.order.retain(|existing| *existing != id);
        }
        self.order.push_back(id);
        previous
    }

    pub fn get(&self, id: MemoryId) -> Option<&MemoryNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: MemoryId) -> Option<&mut MemoryNode> {
        self.nodes.get_mut(&id)
    }

    pub fn remove(&mut self, id: MemoryId) -> Option<MemoryNode> {
        let node = self.nodes.remove(&id)?;
        self.order.retain(|existing| *existing != id);
        Some(node)
    }

    /// Evict oldest-first until within capacity.
    pub fn evict_overflow(&mut self) -> Vec<MemoryNode> {
        let mut evicted = Vec::new();
        while self.nodes.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(node) = self.nodes.remove(&oldest) {
                evicted.push(node);
            }
        }
        evicted
    }

    /// Nodes from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &MemoryNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Unbounded container keyed by id.
#[derive(Debug, Clone, Default)]
pub struct KeyedTier {
    nodes: HashMap<MemoryId, MemoryNode>,
}

impl KeyedTier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: MemoryNode) -> Option<MemoryNode> {
        self.nodes.insert(node.id(), node)
    }

    pub fn get(&self, id: MemoryId) -> Option<&MemoryNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: MemoryId) -> Option<&mut MemoryNode> {
        self.nodes.get_mut(&id)
    }

    pub fn remove(&mut self, id: MemoryId) -> Option<MemoryNode> {
        self.nodes.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// The three tiers together. Ids are unique across all of them.
#[derive(Debug, Clone)]
pub struct TierStore {
    near_term: NearTermTier,
    mid_term: KeyedTier,
    long_term: KeyedTier,
}

impl TierStore {
    pub fn new(near_term_capacity: usize) -> Self {
        Self {
            near_term: NearTermTier::new(near_term_capacity),
            mid_term: KeyedTier::new(),
            long_term: KeyedTier::new(),
        }
    }

    /// Place a node in its tier. A node already stored under the same id, in
    /// any tier, is replaced and returned.
    pub fn insert(&mut self, node: MemoryNode) -> Option<MemoryNode> {
        let replaced = match self.locate(node.id()) {
            Some(tier) if tier != node.tier() => self.remove(node.id()),
            _ => None,
        };
        let previous = match node.tier() {
            MemoryTier::NearTerm => self.near_term.insert(node),
            MemoryTier::MidTerm => self.mid_term.insert(node),
            MemoryTier::LongTerm => self.long_term.insert(node),
        };
        previous.or(replaced)
    }

    pub fn get(&self, id: MemoryId) -> Option<&MemoryNode> {
        self.near_term
            .get(id)
            .or_else(|| self.mid_term.get(id))
            .or_else(|| self.long_term.get(id))
    }

    pub fn get_mut(&mut self, id: MemoryId) -> Option<&mut MemoryNode> {
        match self.locate(id)? {
            MemoryTier::NearTerm => self.near_term.get_mut(id),
            MemoryTier::MidTerm => self.mid_term.get_mut(id),
            MemoryTier::LongTerm => self.long_term.get_mut(id),
        }
    }

    pub fn contains(&self, id: MemoryId) -> bool {
        self.locate(id).is_some()
    }

    /// Which tier holds the id, if any.
    pub fn locate(&self, id: MemoryId) -> Option<MemoryTier> {
        if self.near_term.get(id).is_some() {
            Some(MemoryTier::NearTerm)
        } else if self.mid_term.get(id).is_some() {
            Some(MemoryTier::MidTerm)
        } else if self.long_term.get(id).is_some() {
            Some(MemoryTier::LongTerm)
        } else {
            None
        }
    }

    pub fn remove(&mut self, id: MemoryId) -> Option<MemoryNode> {
        match self.locate(id)? {
            MemoryTier::NearTerm => self.near_term.remove(id),
            MemoryTier::MidTerm => self.mid_term.remove(id),
            MemoryTier::LongTerm => self.long_term.remove(id),
        }
    }

    /// Evict near-term overflow, oldest first. Other tiers are never touched.
    pub fn capacity_evict(&mut self) -> Vec<MemoryNode> {
        self.near_term.evict_overflow()
    }

    /// Every node, near-term (oldest first) then mid-term then long-term.
    pub fn all(&self) -> impl Iterator<Item = &MemoryNode> {
        self.near_term
            .iter()
            .chain(self.mid_term.iter())
            .chain(self.long_term.iter())
    }

    /// Nodes of one tier. Near-term nodes come oldest first.
    pub fn tier(&self, tier: MemoryTier) -> Box<dyn Iterator<Item = &MemoryNode> + '_> {
        match tier {
            MemoryTier::NearTerm => Box::new(self.near_term.iter()),
            MemoryTier::MidTerm => Box::new(self.mid_term.iter()),
            MemoryTier::LongTerm => Box::new(self.long_term.iter()),
        }
    }

    pub fn ids(&self) -> Vec<MemoryId> {
        self.all().map(MemoryNode::id).collect()
    }

    pub fn tier_len(&self, tier: MemoryTier) -> usize {
        match tier {
            MemoryTier::NearTerm => self.near_term.len(),
            MemoryTier::MidTerm => self.mid_term.len(),
            MemoryTier::LongTerm => self.long_term.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.near_term.len() + self.mid_term.len() + self.long_term.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn near_term_capacity(&self) -> usize {
        self.near_term.capacity()
    }
}
